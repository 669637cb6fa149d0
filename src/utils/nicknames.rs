use crate::constants::MAX_NICKNAME_LENGTH;

/// Strip a `First "Nick" Last` display name back to `First Last`
pub fn base_name(name: &str) -> String {
    match (name.split_once('"'), name.rsplit_once('"')) {
        (Some((before, _)), Some((_, after))) => {
            format!("{} {}", before.trim_end(), after.trim_start())
        }
        _ => name.to_string(),
    }
}

/// Build the `First "Nick" Last` display form, or `None` when the base
/// name has no two words or the result would exceed the nickname limit
pub fn compose_nickname(base: &str, nick: &str) -> Option<String> {
    let mut words = base.split_whitespace();
    let first = words.next()?;
    let last = words.next()?;
    if base.len() + nick.len() + 3 > MAX_NICKNAME_LENGTH {
        return None;
    }
    Some(format!("{first} \"{nick}\" {last}"))
}

/// Capitalize the first letter of every word, lowercasing the rest
pub fn capitalize_words(name: &str) -> String {
    name.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalize the first letter, lowercasing the rest
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_without_nick() {
        assert_eq!(base_name("Will Humphlett"), "Will Humphlett");
    }

    #[test]
    fn test_base_name_strips_nick() {
        assert_eq!(base_name("Will \"Hump\" Humphlett"), "Will Humphlett");
    }

    #[test]
    fn test_compose_nickname() {
        assert_eq!(
            compose_nickname("Will Humphlett", "Hump"),
            Some("Will \"Hump\" Humphlett".to_string())
        );
    }

    #[test]
    fn test_compose_nickname_respects_length_limit() {
        // 14-char base + 3 decoration chars leaves 15 for the nick
        assert!(compose_nickname("Will Humphlett", &"x".repeat(15)).is_some());
        assert!(compose_nickname("Will Humphlett", &"x".repeat(16)).is_none());
    }

    #[test]
    fn test_compose_nickname_needs_two_words() {
        assert_eq!(compose_nickname("Cher", "C"), None);
    }

    #[test]
    fn test_capitalize_words() {
        assert_eq!(capitalize_words("will humphlett"), "Will Humphlett");
        assert_eq!(capitalize_words("wILL hUMPHLETT"), "Will Humphlett");
        assert_eq!(capitalize("auburn"), "Auburn");
        assert_eq!(capitalize(""), "");
    }
}
