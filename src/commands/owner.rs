use poise::serenity_prelude::{CreateInvite, GuildId};
use tracing::{error, info};

use super::bot_channel_only;
use crate::menu::reaction_menu;
use crate::models::{Context, Error};
use crate::utils::members::find_member;
use crate::utils::messages::send_block_embed;

/// Menu options naming every guild the bot is in
fn guild_options(ctx: Context<'_>) -> Vec<(String, GuildId)> {
    let cache = &ctx.serenity_context().cache;
    cache
        .guilds()
        .into_iter()
        .filter_map(|guild_id| guild_id.name(cache).map(|name| (name, guild_id)))
        .collect()
}

/// View a list of guilds that the bot is active in
#[poise::command(prefix_command, owners_only, dm_only)]
pub async fn guilds(ctx: Context<'_>) -> Result<(), Error> {
    let names: Vec<String> = guild_options(ctx).into_iter().map(|(name, _)| name).collect();
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Active Guilds",
        &names.join("\n"),
        None,
    )
    .await?;
    Ok(())
}

/// Generate an invite to an existing server
#[poise::command(prefix_command, owners_only, dm_only)]
pub async fn invite(ctx: Context<'_>) -> Result<(), Error> {
    let options = guild_options(ctx);
    let Some(guild_id) = reaction_menu(ctx, "Select A Guild To Join", options, None).await? else {
        return Ok(());
    };

    let guild = ctx.http().get_guild(guild_id).await?;
    let Some(system_channel) = guild.system_channel_id else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Invite Error",
            &format!("{} has no system channel to invite through", guild.name),
            None,
        )
        .await?;
        return Ok(());
    };

    let invite = system_channel
        .create_invite(ctx.http(), CreateInvite::new())
        .await?;
    ctx.say(invite.url()).await?;
    Ok(())
}

/// Delete a guild that the bot has control over
#[poise::command(prefix_command, owners_only, dm_only)]
pub async fn delguild(ctx: Context<'_>) -> Result<(), Error> {
    let options = guild_options(ctx);
    let Some(guild_id) = reaction_menu(ctx, "Select A Guild To Delete", options, None).await?
    else {
        return Ok(());
    };
    let guild_name = guild_id
        .name(&ctx.serenity_context().cache)
        .unwrap_or_else(|| guild_id.to_string());

    let confirm = reaction_menu(
        ctx,
        &format!("Confirm {guild_name} Deletion"),
        vec![
            ("Yes, delete".to_string(), true),
            ("No, don't delete".to_string(), false),
        ],
        None,
    )
    .await?;

    if confirm == Some(true) {
        guild_id.delete(ctx.http()).await?;
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Guild Deleted",
            &format!("{guild_name} has been deleted"),
            None,
        )
        .await?;
        if let Err(e) = ctx.data().config.update(|c| {
            c.guilds.remove(&guild_id);
        }) {
            error!("Failed to drop config record for {}: {}", guild_id, e);
        }
        info!("Deleted guild {}", guild_id);
    } else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Cancelled Guild Deletion",
            &format!("{guild_name} has not been deleted"),
            None,
        )
        .await?;
    }
    Ok(())
}

/// Demote someone from mod to prevent access to bot features
#[poise::command(prefix_command, owners_only, guild_only, check = "bot_channel_only")]
pub async fn demote(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("demote outside a guild")?;
    let Some(member) = find_member(ctx, &name).await? else {
        return Ok(());
    };

    let Some(mod_role) = ctx.data().config.guild(guild_id).and_then(|g| g.moderator) else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Demote Error",
            "No mod role is configured for this server",
            None,
        )
        .await?;
        return Ok(());
    };

    member.remove_role(ctx.http(), mod_role).await?;
    let display = member.nick.clone().unwrap_or_else(|| member.user.name.clone());
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Member Demoted",
        &format!("{display} has been demoted from mod"),
        None,
    )
    .await?;
    info!("Demoted {} in guild {}", member.user.id, guild_id);
    Ok(())
}
