use poise::serenity_prelude::ReactionType;
use regex::Regex;
use tracing::{info, warn};

use crate::constants::{MAX_TEXT_ATTEMPTS, MENU_ICONS, MENU_TIMEOUT, TEXT_TIMEOUT};
use crate::models::{Context, Error};
use crate::utils::messages::{send_block_embed, send_embed};

/// Show a reaction-driven menu and wait for the invoker to pick an
/// option. Only a reaction from the invoker, on the menu message, using
/// one of the menu's icons resolves the prompt. The menu is deleted
/// either way; on timeout a notice is posted and `None` comes back.
pub async fn reaction_menu<T>(
    ctx: Context<'_>,
    title: &str,
    options: Vec<(String, T)>,
    icons: Option<&[&str]>,
) -> Result<Option<T>, Error> {
    let icons: Vec<String> = icons
        .unwrap_or(&MENU_ICONS)
        .iter()
        .take(options.len())
        .map(ToString::to_string)
        .collect();

    let lines: Vec<String> = icons
        .iter()
        .zip(&options)
        .map(|(icon, (label, _))| format!("{icon} : {label}"))
        .collect();
    let menu = send_embed(
        ctx.http(),
        ctx.channel_id(),
        title,
        &lines.join("\n"),
        None,
    )
    .await?;

    // An icon that cannot be attached leaves the menu unanswerable;
    // treat that like a timeout
    let mut armed = true;
    for icon in &icons {
        if let Err(e) = menu
            .react(ctx.http(), ReactionType::Unicode(icon.clone()))
            .await
        {
            warn!("Failed to attach menu reaction {}: {}", icon, e);
            armed = false;
            break;
        }
    }

    let accepted = icons.clone();
    let reaction = if armed {
        menu.await_reaction(ctx.serenity_context())
            .author_id(ctx.author().id)
            .filter(move |reaction| accepted.contains(&reaction.emoji.to_string()))
            .timeout(MENU_TIMEOUT)
            .await
    } else {
        None
    };

    if let Err(e) = menu.delete(ctx.http()).await {
        warn!("Failed to delete menu message: {}", e);
    }

    match reaction {
        Some(reaction) => Ok(choose(&icons, options, &reaction.emoji.to_string())),
        None => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Timeout Reached",
                "The timeout of two minutes has been reached, please retry the command",
                None,
            )
            .await?;
            Ok(None)
        }
    }
}

/// Ask the invoker for free-text input validated against `pattern`,
/// anchored at the start of their reply. Invalid input re-shows the
/// prompt, three attempts in total; a timeout ends the prompt
/// immediately. Prompt and reply messages are cleaned up (replies only
/// outside DMs, where deletion is not possible).
pub async fn text_prompt(
    ctx: Context<'_>,
    title: &str,
    description: &str,
    pattern: &Regex,
) -> Result<Option<String>, Error> {
    for attempt in 1..=MAX_TEXT_ATTEMPTS {
        let prompt = send_block_embed(ctx.http(), ctx.channel_id(), title, description, None).await?;

        let reply = ctx
            .channel_id()
            .await_reply(ctx.serenity_context())
            .author_id(ctx.author().id)
            .timeout(TEXT_TIMEOUT)
            .await;

        if let Err(e) = prompt.delete(ctx.http()).await {
            warn!("Failed to delete text prompt: {}", e);
        }

        let Some(reply) = reply else {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Timeout Reached",
                "The timeout of five minutes has been reached, please retry the command",
                None,
            )
            .await?;
            return Ok(None);
        };

        if ctx.guild_id().is_some()
            && let Err(e) = reply.delete(ctx.http()).await
        {
            warn!("Failed to delete prompt reply: {}", e);
        }

        if let Some(matched) = match_at_start(pattern, &reply.content) {
            return Ok(Some(matched.to_string()));
        }
        info!(
            "Rejected text prompt input (attempt {}/{})",
            attempt, MAX_TEXT_ATTEMPTS
        );
    }

    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Text Input Failed",
        "Text has not been successfully inputed after three tries, please retry the command",
        None,
    )
    .await?;
    Ok(None)
}

/// Map a reaction emoji back to the value bound to its menu slot
fn choose<T>(icons: &[String], options: Vec<(String, T)>, emoji: &str) -> Option<T> {
    let index = icons.iter().position(|icon| icon == emoji)?;
    options.into_iter().nth(index).map(|(_, value)| value)
}

/// Match `pattern` at the start of `text`, returning the matched prefix
pub fn match_at_start<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .find(text)
        .filter(|found| found.start() == 0)
        .map(|found| found.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<(String, u32)> {
        vec![
            ("first".to_string(), 1),
            ("second".to_string(), 2),
            ("third".to_string(), 3),
        ]
    }

    fn icons(n: usize) -> Vec<String> {
        MENU_ICONS.iter().take(n).map(ToString::to_string).collect()
    }

    #[test]
    fn test_choose_returns_bound_value() {
        assert_eq!(choose(&icons(3), options(), MENU_ICONS[1]), Some(2));
        assert_eq!(choose(&icons(3), options(), MENU_ICONS[0]), Some(1));
    }

    #[test]
    fn test_choose_rejects_unknown_emoji() {
        assert_eq!(choose(&icons(3), options(), "🦀"), None);
        // Palette icons beyond the option count resolve nothing
        assert_eq!(choose(&icons(3), options(), MENU_ICONS[7]), None);
    }

    #[test]
    fn test_menu_icons_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        assert!(MENU_ICONS.iter().all(|icon| seen.insert(icon)));
    }

    #[test]
    fn test_match_at_start_full_and_prefix() {
        let pattern = Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4}").expect("valid pattern");
        assert_eq!(match_at_start(&pattern, "05/17/2021"), Some("05/17/2021"));
        // Prefix matches win even with trailing junk
        assert_eq!(
            match_at_start(&pattern, "05/17/2021 or so"),
            Some("05/17/2021")
        );
    }

    #[test]
    fn test_match_at_start_rejects_offset_matches() {
        let pattern = Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4}").expect("valid pattern");
        assert_eq!(match_at_start(&pattern, "around 05/17/2021"), None);
        assert_eq!(match_at_start(&pattern, "no date here"), None);
    }

    #[test]
    fn test_match_at_start_name_pattern() {
        let pattern = Regex::new(r"[a-zA-Z]+\s[a-zA-Z]+").expect("valid pattern");
        assert_eq!(
            match_at_start(&pattern, "Will Humphlett"),
            Some("Will Humphlett")
        );
        assert_eq!(match_at_start(&pattern, "single"), None);
    }
}
