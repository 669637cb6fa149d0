use std::collections::HashSet;

use poise::serenity_prelude::{self as serenity, Colour, EditRole, Guild, Member, UserId};
use tracing::{error, info, warn};

use crate::constants::EMBED_COLOUR;
use crate::models::Data;
use crate::utils::messages::dm_embed;

/// Handle a member joining a guild: owners and known mods get their
/// roles and a status DM, everyone else is parked behind the register
/// role and welcomed with registration instructions.
pub async fn handle_member_join(
    ctx: &serenity::Context,
    member: &Member,
    owners: &HashSet<UserId>,
    data: &Data,
) {
    let guild_id = member.guild_id;
    let guild_config = data.config.guild(guild_id).unwrap_or_default();
    let guild_name = guild_id
        .name(&ctx.cache)
        .unwrap_or_else(|| "the co-op server".to_string());

    if owners.contains(&member.user.id) {
        if let Some(admin_role) = guild_config.admin {
            if let Err(e) = member.add_role(&ctx.http, admin_role).await {
                error!("Failed to give the owner the admin role: {}", e);
            }
        } else {
            warn!("No admin role configured for guild {}", guild_id);
        }
        if let Err(e) = dm_embed(
            &ctx.http,
            &member.user,
            "Owner Status Detected",
            &format!("You are the owner, this will be represented in {guild_name}"),
        )
        .await
        {
            warn!("Failed to DM the owner: {}", e);
        }
        return;
    }

    let is_mod = data.config.read(|c| c.mods.contains(&member.user.id));
    if is_mod {
        if let Some(mod_role) = guild_config.moderator {
            if let Err(e) = member.add_role(&ctx.http, mod_role).await {
                error!("Failed to give {} the mod role: {}", member.user.id, e);
            }
        }
        if let Err(e) = dm_embed(
            &ctx.http,
            &member.user,
            "Mod Status Detected",
            &format!(
                "You have been set as a mod, this will be represented in {guild_name}\n\
                 Run !help in both bot-hell and mod-commands as you can run different commands in each channel"
            ),
        )
        .await
        {
            warn!("Failed to DM new mod {}: {}", member.user.id, e);
        }
    }

    // Mark them pending so `!register` knows which guild they belong to
    if let Err(e) = data
        .config
        .update(|c| c.members.insert(member.user.id, guild_id))
    {
        error!("Failed to record pending registration: {}", e);
    }

    if let Err(e) = dm_embed(
        &ctx.http,
        &member.user,
        "Welcome to the Co-op Discord Server!",
        &format!(
            "You have recently joined {guild_name}. When you are ready to register, please respond with `!register`"
        ),
    )
    .await
    {
        warn!("Failed to send welcome DM to {}: {}", member.user.id, e);
    }

    if let Some(register_role) = guild_config.register {
        if let Err(e) = member.add_role(&ctx.http, register_role).await {
            error!(
                "Failed to give {} the register role: {}",
                member.user.id, e
            );
        }
    } else {
        warn!("No register role configured for guild {}", guild_id);
    }

    info!("Member {} joined guild {}", member.user.id, guild_id);
}

/// Give the bot its own coloured role when it is added to a guild that
/// has no roles beyond @everyone yet
pub async fn handle_guild_create(ctx: &serenity::Context, guild: &Guild) {
    if guild.roles.len() > 1 {
        return;
    }

    let (bot_id, bot_name) = {
        let current = ctx.cache.current_user();
        (current.id, current.name.clone())
    };

    let (r, g, b) = EMBED_COLOUR;
    let role = match guild
        .id
        .create_role(
            &ctx.http,
            EditRole::new()
                .name(&bot_name)
                .hoist(true)
                .colour(Colour::from_rgb(r, g, b)),
        )
        .await
    {
        Ok(role) => role,
        Err(e) => {
            error!("Failed to create bot role in guild {}: {}", guild.id, e);
            return;
        }
    };

    match guild.id.member(&ctx.http, bot_id).await {
        Ok(me) => {
            if let Err(e) = me.add_role(&ctx.http, role.id).await {
                error!("Failed to assign bot role in guild {}: {}", guild.id, e);
            }
        }
        Err(e) => error!("Failed to fetch own membership in {}: {}", guild.id, e),
    }

    info!("Bootstrapped bot role in new guild {}", guild.id);
}
