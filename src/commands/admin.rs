use chrono::{Datelike, NaiveDate, Utc};
use poise::serenity_prelude::{
    ChannelId, ChannelType, Colour, CreateAttachment, CreateChannel, CreateInvite, EditChannel,
    EditProfile, EditRole, Guild, GuildId, PermissionOverwrite, PermissionOverwriteType,
    Permissions, RoleId,
};
use regex::Regex;
use tracing::{error, info, warn};

use super::{admin_check, bot_channel_only, mod_channel_only};
use crate::config::TermWindow;
use crate::constants::{CHANNEL_OPTIONS, EMBED_COLOUR};
use crate::menu::{reaction_menu, text_prompt};
use crate::models::{Context, Error};
use crate::utils::members::find_member;
use crate::utils::messages::{dm_embed, send_block_embed};
use crate::utils::nicknames::{base_name, compose_nickname};

/// Configure bot channels
#[poise::command(prefix_command, guild_only, check = "admin_check", rename = "config")]
pub async fn config_channel(ctx: Context<'_>, option: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("config outside a guild")?;
    let option = option.to_lowercase();

    if !CHANNEL_OPTIONS.contains(&option.as_str()) {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Config Error",
            &format!("Config option must be one of {CHANNEL_OPTIONS:?}"),
            None,
        )
        .await?;
        return Ok(());
    }

    let channel_id = ctx.channel_id();
    ctx.data().config.update(|c| {
        c.guilds
            .entry(guild_id)
            .or_default()
            .set_channel(&option, channel_id);
    })?;

    let channel_name = channel_id.name(ctx.http()).await?;
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Config Successful",
        &format!("{channel_name} has been set as the {option} channel"),
        None,
    )
    .await?;
    info!("Bound {} channel for guild {}", option, guild_id);
    Ok(())
}

/// Create a new text channel in the Text Channels category
#[poise::command(prefix_command, guild_only, check = "admin_check", check = "mod_channel_only")]
pub async fn newchannel(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("newchannel outside a guild")?;

    let channels = guild_id.channels(ctx.http()).await?;
    let category = channels
        .values()
        .filter(|channel| channel.kind == ChannelType::Category)
        .min_by_key(|channel| channel.position)
        .map(|channel| channel.id);

    let mut builder = CreateChannel::new(&name).kind(ChannelType::Text).position(2);
    if let Some(category) = category {
        builder = builder.category(category);
    }
    let channel = guild_id.create_channel(ctx.http(), builder).await?;

    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Channel Created",
        &format!("{} has been created under Text Channels", channel.name),
        None,
    )
    .await?;
    info!("Created channel {} in guild {}", channel.id, guild_id);
    Ok(())
}

/// Promote someone to mod to provide access to bot features
#[poise::command(prefix_command, guild_only, check = "admin_check", check = "mod_channel_only")]
pub async fn promote(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("promote outside a guild")?;
    let Some(member) = find_member(ctx, &name).await? else {
        return Ok(());
    };

    let Some(mod_role) = ctx.data().config.guild(guild_id).and_then(|g| g.moderator) else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Promote Error",
            "No mod role is configured for this server",
            None,
        )
        .await?;
        return Ok(());
    };

    member.add_role(ctx.http(), mod_role).await?;
    let display = member.nick.clone().unwrap_or_else(|| member.user.name.clone());
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Member Promoted",
        &format!("{display} has been promoted to mod"),
        None,
    )
    .await?;
    info!("Promoted {} in guild {}", member.user.id, guild_id);
    Ok(())
}

/// Allow a member to reregister and reset their info
#[poise::command(prefix_command, guild_only, check = "admin_check", check = "mod_channel_only")]
pub async fn rereg(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("rereg outside a guild")?;
    let Some(member) = find_member(ctx, &name).await? else {
        return Ok(());
    };

    let guild_roles = guild_id.roles(ctx.http()).await?;
    let bot_name = ctx.serenity_context().cache.current_user().name.clone();
    let to_remove: Vec<RoleId> = member
        .roles
        .iter()
        .copied()
        .filter(|role_id| {
            guild_roles.get(role_id).is_none_or(|role| {
                role.name != "Admin" && role.name != "Mod" && role.name != bot_name
            })
        })
        .collect();
    if to_remove.is_empty() {
        return Ok(());
    }
    member.remove_roles(ctx.http(), &to_remove).await?;

    if let Some(register_role) = ctx.data().config.guild(guild_id).and_then(|g| g.register) {
        member.add_role(ctx.http(), register_role).await?;
    }
    ctx.data()
        .config
        .update(|c| c.members.insert(member.user.id, guild_id))?;

    let guild_name = guild_id
        .name(&ctx.serenity_context().cache)
        .unwrap_or_else(|| "the co-op server".to_string());
    if let Err(e) = dm_embed(
        ctx.http(),
        &member.user,
        "Reregister Allowed",
        &format!(
            "You have been allowed to reregister for {guild_name}. \
             When you are ready to register, please respond with `!register`"
        ),
    )
    .await
    {
        warn!("Failed to DM {} about reregistration: {}", member.user.id, e);
    }

    let display = member.nick.clone().unwrap_or_else(|| member.user.name.clone());
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Reregister Successful",
        &format!("{display} has been set to reregister"),
        None,
    )
    .await?;
    Ok(())
}

/// Add a new emoji by commenting an uploaded image with !emoji <name>
#[poise::command(prefix_command, guild_only, check = "admin_check", check = "bot_channel_only")]
pub async fn emoji(ctx: Context<'_>, name: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("emoji outside a guild")?;
    let poise::Context::Prefix(prefix_ctx) = ctx else {
        return Ok(());
    };

    match prefix_ctx.msg.attachments.as_slice() {
        [] => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Emoji Error",
                "!emoji <name> must be used when commenting on an uploaded emoji",
                None,
            )
            .await?;
        }
        [attachment] => {
            let image = attachment.download().await?;
            let encoded = CreateAttachment::bytes(image, attachment.filename.clone()).to_base64();
            guild_id.create_emoji(ctx.http(), &name, &encoded).await?;
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Emoji Added",
                &format!(":{name}: has been added to the server"),
                None,
            )
            .await?;
            info!("Added emoji {} to guild {}", name, guild_id);
        }
        _ => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Emoji Error",
                "Multiple emoji files cannot be uploaded at once",
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Change the bot nickname to match the form First "Nick" Last
#[poise::command(prefix_command, guild_only, check = "admin_check", check = "bot_channel_only")]
pub async fn botnick(ctx: Context<'_>, #[rest] nickname: Option<String>) -> Result<(), Error> {
    let mut current_user = ctx.serenity_context().cache.current_user().clone();
    let base = base_name(&current_user.name);

    let nickname = nickname.unwrap_or_default();
    if nickname.is_empty() {
        current_user
            .edit(ctx.http(), EditProfile::new().username(&base))
            .await?;
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Nickname Reset",
            "The bot nickname has been reset",
            None,
        )
        .await?;
        return Ok(());
    }

    if nickname.contains('"') {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Nickname Error",
            "The bot nickname cannot contain '\"'",
            None,
        )
        .await?;
        return Ok(());
    }

    match compose_nickname(&base, &nickname) {
        Some(full) => {
            current_user
                .edit(ctx.http(), EditProfile::new().username(&full))
                .await?;
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Nickname Changed",
                &format!("The bot is now {full}"),
                None,
            )
            .await?;
        }
        None => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Nickname Error",
                "The bot nickname cannot be longer than 32 characters",
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Create a new co-op discord server and set it up with the bot
#[poise::command(prefix_command, guild_only, check = "admin_check", check = "mod_channel_only")]
pub async fn newguild(ctx: Context<'_>) -> Result<(), Error> {
    let this_year = Utc::now().year();
    let year_options = vec![
        (this_year.to_string(), this_year),
        ((this_year + 1).to_string(), this_year + 1),
    ];
    let Some(year) =
        reaction_menu(ctx, "Select the year of the new co-op server", year_options, None).await?
    else {
        return Ok(());
    };

    let semester_options = ["Fall", "Spring", "Summer"]
        .iter()
        .map(|s| (s.to_string(), *s))
        .collect();
    let Some(semester) = reaction_menu(
        ctx,
        "Select the semester of the new co-op server",
        semester_options,
        None,
    )
    .await?
    else {
        return Ok(());
    };

    let date_pattern = Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4}").expect("valid pattern");
    let Some(start_raw) = text_prompt(
        ctx,
        "Start Date",
        "Please provide the start date of this co-op term in the form MM/DD/YYYY (e.g. 05/17/2021)",
        &date_pattern,
    )
    .await?
    else {
        return Ok(());
    };
    let Some(end_raw) = text_prompt(
        ctx,
        "End Date",
        "Please provide the end date of this co-op term in the form MM/DD/YYYY (e.g. 08/06/2021)",
        &date_pattern,
    )
    .await?
    else {
        return Ok(());
    };
    let (Ok(start), Ok(end)) = (
        NaiveDate::parse_from_str(&start_raw, "%m/%d/%Y"),
        NaiveDate::parse_from_str(&end_raw, "%m/%d/%Y"),
    ) else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Date Error",
            "One of the provided dates does not exist, please retry the command",
            None,
        )
        .await?;
        return Ok(());
    };

    let guild = Guild::create(
        ctx.http(),
        &format!("{year} {semester} Co-op Term"),
        None,
    )
    .await?;
    info!("Created guild {} for {} {}", guild.id, year, semester);

    let invite_channel =
        provision_guild(ctx, guild.id, TermWindow { start, end }).await?;

    let invite = invite_channel
        .create_invite(ctx.http(), CreateInvite::new())
        .await?;
    ctx.say(invite.url()).await?;
    Ok(())
}

/// Everything members of a term can do in the channels their roles open up
fn term_role_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::CREATE_INSTANT_INVITE
        | Permissions::EMBED_LINKS
        | Permissions::ATTACH_FILES
        | Permissions::ADD_REACTIONS
        | Permissions::USE_EXTERNAL_EMOJIS
        | Permissions::MENTION_EVERYONE
        | Permissions::READ_MESSAGE_HISTORY
        | Permissions::USE_APPLICATION_COMMANDS
        | Permissions::CONNECT
        | Permissions::SPEAK
        | Permissions::STREAM
        | Permissions::USE_VAD
}

fn hidden_except(allowed: RoleId, everyone: RoleId) -> Vec<PermissionOverwrite> {
    vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(everyone),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(allowed),
        },
    ]
}

/// Build the standard co-op layout in a freshly created guild: term and
/// staff roles, college roles, info/text/voice channels with their
/// overwrites, and the guild's config record (written in one update)
async fn provision_guild(
    ctx: Context<'_>,
    guild_id: GuildId,
    term: TermWindow,
) -> Result<ChannelId, Error> {
    let http = ctx.http();
    let everyone = RoleId::new(guild_id.get());
    let (r, g, b) = EMBED_COLOUR;
    let brand = Colour::from_rgb(r, g, b);

    // Lock the default role down; term roles grant everything back
    guild_id
        .edit_role(http, everyone, EditRole::new().permissions(Permissions::empty()))
        .await?;

    let admin_role = guild_id
        .create_role(
            http,
            EditRole::new()
                .name("Admin")
                .mentionable(true)
                .colour(brand)
                .permissions(Permissions::ADMINISTRATOR),
        )
        .await?;
    let fourth_role = guild_id
        .create_role(
            http,
            EditRole::new()
                .name("4th Termer")
                .mentionable(true)
                .hoist(true)
                .colour(Colour::GOLD)
                .permissions(term_role_permissions()),
        )
        .await?;
    let third_role = guild_id
        .create_role(
            http,
            EditRole::new()
                .name("3rd Termer")
                .mentionable(true)
                .hoist(true)
                .colour(Colour::PURPLE)
                .permissions(term_role_permissions()),
        )
        .await?;
    guild_id
        .create_role(
            http,
            EditRole::new()
                .name("2nd Termer")
                .mentionable(true)
                .hoist(true)
                .colour(Colour::BLUE)
                .permissions(term_role_permissions()),
        )
        .await?;
    guild_id
        .create_role(
            http,
            EditRole::new()
                .name("1st Termer")
                .mentionable(true)
                .hoist(true)
                .colour(Colour::from_rgb(46, 204, 113))
                .permissions(term_role_permissions()),
        )
        .await?;
    let mod_role = guild_id
        .create_role(
            http,
            EditRole::new()
                .name("Mod")
                .mentionable(true)
                .colour(brand)
                .permissions(Permissions::MANAGE_MESSAGES),
        )
        .await?;
    let register_role = guild_id
        .create_role(
            http,
            EditRole::new()
                .name("REGISTER")
                .permissions(Permissions::READ_MESSAGE_HISTORY),
        )
        .await?;

    let colleges: Vec<(String, (u8, u8, u8))> = ctx
        .data()
        .config
        .read(|c| c.colleges.iter().map(|(name, rgb)| (name.clone(), *rgb)).collect());
    for (college, (r, g, b)) in colleges {
        if let Err(e) = guild_id
            .create_role(
                http,
                EditRole::new()
                    .name(&college)
                    .mentionable(true)
                    .colour(Colour::from_rgb(r, g, b)),
            )
            .await
        {
            error!("Failed to create college role {}: {}", college, e);
        }
    }

    // New guilds come with a text and a voice category; fall back to
    // creating them if the platform ever stops doing that
    let channels = guild_id.channels(http).await?;
    let mut categories: Vec<_> = channels
        .values()
        .filter(|channel| channel.kind == ChannelType::Category)
        .collect();
    categories.sort_by_key(|channel| channel.position);
    let text_category = match categories.first() {
        Some(category) => category.id,
        None => {
            guild_id
                .create_channel(http, CreateChannel::new("Text Channels").kind(ChannelType::Category))
                .await?
                .id
        }
    };
    let voice_category = match categories.get(1) {
        Some(category) => category.id,
        None => {
            guild_id
                .create_channel(http, CreateChannel::new("Voice Channels").kind(ChannelType::Category))
                .await?
                .id
        }
    };

    let teatime_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("tea-table")
                .kind(ChannelType::Text)
                .category(text_category)
                .position(1),
        )
        .await?;
    let games_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("games")
                .kind(ChannelType::Text)
                .category(text_category)
                .position(2),
        )
        .await?;
    guild_id
        .create_channel(
            http,
            CreateChannel::new("third-term-mafia")
                .kind(ChannelType::Text)
                .category(text_category)
                .position(3)
                .permissions(hidden_except(third_role.id, everyone)),
        )
        .await?;
    guild_id
        .create_channel(
            http,
            CreateChannel::new("fourth-term-bar")
                .kind(ChannelType::Text)
                .category(text_category)
                .position(4)
                .permissions(hidden_except(fourth_role.id, everyone)),
        )
        .await?;

    let info_category = guild_id
        .create_channel(
            http,
            CreateChannel::new("info").kind(ChannelType::Category).position(0),
        )
        .await?;
    let welcome_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("welcome")
                .kind(ChannelType::Text)
                .category(info_category.id)
                .position(0)
                .permissions(vec![PermissionOverwrite {
                    allow: Permissions::empty(),
                    deny: Permissions::SEND_MESSAGES,
                    kind: PermissionOverwriteType::Role(everyone),
                }]),
        )
        .await?;
    let important_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("important")
                .kind(ChannelType::Text)
                .category(info_category.id)
                .position(1),
        )
        .await?;
    let bot_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("bot-hell")
                .kind(ChannelType::Text)
                .category(info_category.id)
                .position(2),
        )
        .await?;
    let mod_bot_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("mod-commands")
                .kind(ChannelType::Text)
                .category(info_category.id)
                .position(3)
                .permissions(hidden_except(mod_role.id, everyone)),
        )
        .await?;
    let register_channel = guild_id
        .create_channel(
            http,
            CreateChannel::new("register-now")
                .kind(ChannelType::Text)
                .category(info_category.id)
                .position(4)
                .permissions(hidden_except(register_role.id, everyone)),
        )
        .await?;

    guild_id
        .create_channel(
            http,
            CreateChannel::new("Tea Time")
                .kind(ChannelType::Voice)
                .category(voice_category)
                .position(1),
        )
        .await?;
    guild_id
        .create_channel(
            http,
            CreateChannel::new("Co-op Tears")
                .kind(ChannelType::Voice)
                .category(voice_category)
                .position(2),
        )
        .await?;

    for (category, position) in [(text_category, 0), (info_category.id, 1), (voice_category, 2)] {
        if let Err(e) = category.edit(http, EditChannel::new().position(position)).await {
            warn!("Failed to reorder category {}: {}", category, e);
        }
    }

    // All of the new guild's bindings land in one config write
    ctx.data().config.update(|c| {
        let record = c.guilds.entry(guild_id).or_default();
        record.term = Some(term);
        record.admin = Some(admin_role.id);
        record.moderator = Some(mod_role.id);
        record.register = Some(register_role.id);
        record.bot = Some(bot_channel.id);
        record.important = Some(important_channel.id);
        record.teatime = Some(teatime_channel.id);
        record.games = Some(games_channel.id);
        record.mod_bot = Some(mod_bot_channel.id);
    })?;

    send_block_embed(
        http,
        register_channel.id,
        "Register Now",
        "You have been DM'd by the bot, please read the instructions and register in response to the DM",
        None,
    )
    .await?;

    info!("Provisioned guild {}", guild_id);
    Ok(welcome_channel.id)
}
