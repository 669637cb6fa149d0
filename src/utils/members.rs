use poise::serenity_prelude::{Member, UserId};

use crate::models::{Context, Error};
use crate::utils::messages::send_block_embed;

/// Resolve a guild member from a mention, an exact name, or a unique
/// name/nick substring. Lookup failures are reported to the invoking
/// channel and resolve to `None`.
pub async fn find_member(ctx: Context<'_>, name: &str) -> Result<Option<Member>, Error> {
    let guild_id = ctx.guild_id().ok_or("member lookup outside a guild")?;

    if let Some(user_id) = parse_user_mention(name) {
        return match guild_id.member(ctx.http(), user_id).await {
            Ok(member) => Ok(Some(member)),
            Err(_) => {
                send_block_embed(
                    ctx.http(),
                    ctx.channel_id(),
                    "Find User Error",
                    &format!("No member found with the id {user_id}"),
                    None,
                )
                .await?;
                Ok(None)
            }
        };
    }

    let members = guild_id.members(ctx.http(), None, None).await?;
    if let Some(exact) = members
        .iter()
        .find(|member| member.user.name == name || member.nick.as_deref() == Some(name))
    {
        return Ok(Some(exact.clone()));
    }

    let needle = name.to_lowercase();
    let matches: Vec<Member> = members
        .into_iter()
        .filter(|member| {
            member.user.name.to_lowercase().contains(&needle)
                || member
                    .nick
                    .as_deref()
                    .is_some_and(|nick| nick.to_lowercase().contains(&needle))
        })
        .collect();

    match matches.len() {
        1 => Ok(matches.into_iter().next()),
        0 => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Find User Error",
                &format!("No member found with the name {name}"),
                None,
            )
            .await?;
            Ok(None)
        }
        _ => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Find User Error",
                &format!("Too many members found with the name {name}"),
                None,
            )
            .await?;
            Ok(None)
        }
    }
}

/// Parse `<@123>` / `<@!123>` mention syntax
pub fn parse_user_mention(raw: &str) -> Option<UserId> {
    let inner = raw.strip_prefix("<@")?.strip_suffix('>')?;
    let inner = inner.strip_prefix('!').unwrap_or(inner);
    inner
        .parse::<u64>()
        .ok()
        .filter(|&id| id != 0)
        .map(UserId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_mention() {
        assert_eq!(parse_user_mention("<@123456>"), Some(UserId::new(123456)));
        assert_eq!(parse_user_mention("<@!123456>"), Some(UserId::new(123456)));
    }

    #[test]
    fn test_parse_user_mention_rejects_garbage() {
        assert_eq!(parse_user_mention("plain name"), None);
        assert_eq!(parse_user_mention("<@abc>"), None);
        assert_eq!(parse_user_mention("<@123"), None);
        assert_eq!(parse_user_mention("<@0>"), None);
        assert_eq!(parse_user_mention("<#123>"), None);
    }
}
