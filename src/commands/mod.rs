pub mod admin;
pub mod member;
pub mod owner;
pub mod utility;

pub use admin::*;
pub use member::*;
pub use owner::*;
pub use utility::*;

use crate::models::{Context, Error};

/// Admin commands are open to the bot owner and to holders of the
/// guild's configured mod role
pub async fn admin_check(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    if ctx.framework().options().owners.contains(&ctx.author().id) {
        return Ok(true);
    }
    let Some(mod_role) = ctx.data().config.guild(guild_id).and_then(|g| g.moderator) else {
        return Ok(false);
    };
    let Some(member) = ctx.author_member().await else {
        return Ok(false);
    };
    Ok(member.roles.contains(&mod_role))
}

/// Restrict a command to the guild's configured bot channel
pub async fn bot_channel_only(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(ctx
        .guild_id()
        .and_then(|guild_id| ctx.data().config.guild(guild_id))
        .and_then(|guild| guild.bot)
        .is_some_and(|channel| channel == ctx.channel_id()))
}

/// Restrict a command to the guild's configured mod channel
pub async fn mod_channel_only(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(ctx
        .guild_id()
        .and_then(|guild_id| ctx.data().config.guild(guild_id))
        .and_then(|guild| guild.mod_bot)
        .is_some_and(|channel| channel == ctx.channel_id()))
}
