use poise::serenity_prelude::{
    CacheHttp, ChannelId, Colour, CreateEmbed, CreateEmbedFooter, CreateMessage, Message, User,
};

use crate::constants::{EMBED_COLOUR, EMBED_LINE_WIDTH};
use crate::models::Error;

/// Build the bot's standard embed
pub fn build_embed(title: &str, description: &str, footer: Option<&str>) -> CreateEmbed {
    let (r, g, b) = EMBED_COLOUR;
    let mut embed = CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(Colour::from_rgb(r, g, b));
    if let Some(footer) = footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    embed
}

/// Send a standard embed with the description left as-is (menus build
/// their own icon lines)
pub async fn send_embed(
    http: impl CacheHttp,
    channel: ChannelId,
    title: &str,
    description: &str,
    footer: Option<&str>,
) -> Result<Message, Error> {
    Ok(channel
        .send_message(
            http,
            CreateMessage::new().embed(build_embed(title, description, footer)),
        )
        .await?)
}

/// Send a standard embed with every description line padded to the full
/// embed width and wrapped in a code block
pub async fn send_block_embed(
    http: impl CacheHttp,
    channel: ChannelId,
    title: &str,
    description: &str,
    footer: Option<&str>,
) -> Result<Message, Error> {
    send_embed(http, channel, title, &block_wrap(description), footer).await
}

/// DM a standard embed to a user
pub async fn dm_embed(
    http: impl CacheHttp,
    user: &User,
    title: &str,
    description: &str,
) -> Result<Message, Error> {
    Ok(user
        .dm(
            http,
            CreateMessage::new().embed(build_embed(title, description, None)),
        )
        .await?)
}

fn block_wrap(description: &str) -> String {
    let padded: Vec<String> = description.lines().map(pad_line).collect();
    format!("```{}```", padded.join("\n"))
}

/// Pad a line so code-block descriptions render at a consistent width
fn pad_line(line: &str) -> String {
    format!("{:<width$}", line, width = EMBED_LINE_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_line_short() {
        let padded = pad_line("hello");
        assert_eq!(padded.len(), EMBED_LINE_WIDTH);
        assert!(padded.starts_with("hello"));
        assert!(padded.ends_with(' '));
    }

    #[test]
    fn test_pad_line_long_is_untouched() {
        let long = "x".repeat(EMBED_LINE_WIDTH + 10);
        assert_eq!(pad_line(&long), long);
    }

    #[test]
    fn test_block_wrap_pads_every_line() {
        let wrapped = block_wrap("one\ntwo");
        assert!(wrapped.starts_with("```"));
        assert!(wrapped.ends_with("```"));
        for line in wrapped.trim_matches('`').lines() {
            assert_eq!(line.len(), EMBED_LINE_WIDTH);
        }
    }
}
