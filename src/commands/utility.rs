use crate::models::{Context, Error};
use crate::utils::messages::send_block_embed;

/// View the about info regarding the bot
#[poise::command(prefix_command)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let app_info = ctx.http().get_current_application_info().await?;
    let footer = app_info.owner.map(|owner| owner.tag());

    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "About the Co-op Bot",
        "This bot is meant to create and rule the co-op discord server\n\
         For issues or enhancements, please contact the maintainer",
        footer.as_deref(),
    )
    .await?;
    Ok(())
}

/// Ping the bot and view the current latency
#[poise::command(prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Bot Latency",
        &format!("pong! (bot latency is {} ms)", latency.as_millis()),
        None,
    )
    .await?;
    Ok(())
}
