use std::collections::HashMap;

use chrono::{NaiveTime, Utc};
use poise::serenity_prelude::{
    ChannelType, Colour, EditMember, EditRole, GetMessages, GuildId, Role, RoleId,
};
use regex::Regex;
use tracing::{info, warn};

use super::bot_channel_only;
use crate::constants::MAX_MESSAGE_SCAN;
use crate::menu::{reaction_menu, text_prompt};
use crate::models::{Context, Error};
use crate::schedule::{EventDescriptor, TEATIME_EVENT, TIMECARD_EVENT, next_occurrence};
use crate::utils::messages::send_block_embed;
use crate::utils::nicknames::{base_name, capitalize, capitalize_words, compose_nickname};

const TERM_ROLE_NAMES: [(&str, &str); 4] = [
    ("1st Term", "1st Termer"),
    ("2nd Term", "2nd Termer"),
    ("3rd Term", "3rd Termer"),
    ("4th Term", "4th Termer"),
];

/// Register in the server with your term number, school, and team
#[poise::command(prefix_command, dm_only)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    let author_id = ctx.author().id;
    let Some(guild_id) = ctx.data().config.read(|c| c.members.get(&author_id).copied()) else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Register Error",
            "You are not eligible to register for a server at this time.\n\
             If you feel this is an error, please contact your server mod.",
            None,
        )
        .await?;
        return Ok(());
    };

    let name_pattern = Regex::new(r"[a-zA-Z]+\s[a-zA-Z]+").expect("valid pattern");
    let Some(nickname) = text_prompt(
        ctx,
        "Enter your name",
        "Please provide your name in the form First Last (e.g. Will Humphlett)",
        &name_pattern,
    )
    .await?
    else {
        return Ok(());
    };
    let nickname = capitalize_words(&nickname);

    let guild_roles = guild_id.roles(ctx.http()).await?;

    let term_options: Vec<(String, RoleId)> = TERM_ROLE_NAMES
        .iter()
        .filter_map(|(label, role_name)| {
            role_by_name(&guild_roles, role_name).map(|role| (label.to_string(), role))
        })
        .collect();
    let Some(term_role) = reaction_menu(ctx, "Select your term number", term_options, None).await?
    else {
        return Ok(());
    };

    let Some(school_role) = pick_school(ctx, guild_id, &guild_roles).await? else {
        return Ok(());
    };

    let team_pattern = Regex::new(r"[a-zA-Z\s]+").expect("valid pattern");
    let Some(team_name) = text_prompt(
        ctx,
        "Please enter the name of your team",
        "Please omit the 'Team' portion of your name. (e.g. Team HISS becomes HISS)",
        &team_pattern,
    )
    .await?
    else {
        return Ok(());
    };
    let team_role = guild_id
        .create_role(
            ctx.http(),
            EditRole::new().name(team_name.trim()).mentionable(true),
        )
        .await?;

    let member = guild_id
        .edit_member(ctx.http(), author_id, EditMember::new().nickname(&nickname))
        .await?;
    for role in [term_role, school_role, team_role.id] {
        member.add_role(ctx.http(), role).await?;
    }
    if let Some(register_role) = ctx.data().config.guild(guild_id).and_then(|g| g.register) {
        member.remove_role(ctx.http(), register_role).await?;
    }

    let guild_name = ctx
        .http()
        .get_guild(guild_id)
        .await
        .map(|guild| guild.name)
        .unwrap_or_else(|_| "the co-op".to_string());
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Successfully Registered",
        &format!(
            "You have successfully registered in the {guild_name} discord server, please enjoy!"
        ),
        None,
    )
    .await?;

    ctx.data().config.update(|c| {
        c.members.remove(&author_id);
    })?;
    info!("Registered {} in guild {}", author_id, guild_id);
    Ok(())
}

/// School selection half of the registration flow: pick a known college
/// or create a new role (and config entry) for an unknown one
async fn pick_school(
    ctx: Context<'_>,
    guild_id: GuildId,
    guild_roles: &HashMap<RoleId, Role>,
) -> Result<Option<RoleId>, Error> {
    let mut options: Vec<(String, String)> = ctx
        .data()
        .config
        .read(|c| c.colleges.keys().cloned().collect::<Vec<_>>())
        .into_iter()
        .map(|name| (name.clone(), name))
        .collect();
    options.push(("Other".to_string(), "Other".to_string()));

    let Some(choice) = reaction_menu(ctx, "Select your school", options, None).await? else {
        return Ok(None);
    };

    if choice != "Other" {
        return match role_by_name(guild_roles, &choice) {
            Some(role) => Ok(Some(role)),
            None => {
                send_block_embed(
                    ctx.http(),
                    ctx.channel_id(),
                    "Register Error",
                    &format!("The {choice} role is missing from the server, please contact your server mod"),
                    None,
                )
                .await?;
                Ok(None)
            }
        };
    }

    let school_pattern = Regex::new(r"[a-zA-Z\s]+").expect("valid pattern");
    let Some(new_school) = text_prompt(
        ctx,
        "Enter the name of your school",
        "Please omit the 'University of' portion of your school name. \
         (e.g. Auburn University becomes Auburn, UAH becomes Alabama Huntsville)",
        &school_pattern,
    )
    .await?
    else {
        return Ok(None);
    };
    let new_school = capitalize(new_school.trim());

    let existing: Vec<&str> = guild_roles.values().map(|role| role.name.as_str()).collect();
    if new_school == "Other" || existing.contains(&new_school.as_str()) {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Haha, very funny",
            "Restart your registration, that school name is taken",
            None,
        )
        .await?;
        return Ok(None);
    }

    let rgb_pattern =
        Regex::new(r"\([0-9]{1,3},[0-9]{1,3},[0-9]{1,3}\)").expect("valid pattern");
    let Some(colors) = text_prompt(
        ctx,
        "Enter the color of your school",
        "Please provide the rgb color code of your school's main color \
         in the form (###,###,###) with no leading zeros",
        &rgb_pattern,
    )
    .await?
    else {
        return Ok(None);
    };
    let Some((r, g, b)) = parse_rgb(&colors) else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Register Error",
            "Color values must be between 0 and 255, please retry the command",
            None,
        )
        .await?;
        return Ok(None);
    };

    ctx.data().config.update(|c| {
        c.colleges.insert(new_school.clone(), (r, g, b));
    })?;
    let role = guild_id
        .create_role(
            ctx.http(),
            EditRole::new()
                .name(&new_school)
                .colour(Colour::from_rgb(r, g, b))
                .mentionable(true),
        )
        .await?;
    Ok(Some(role.id))
}

fn role_by_name(roles: &HashMap<RoleId, Role>, name: &str) -> Option<RoleId> {
    roles
        .values()
        .find(|role| role.name == name)
        .map(|role| role.id)
}

/// Parse a validated `(r,g,b)` string; None when a component exceeds 255
fn parse_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let mut parts = raw
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',');
    let r = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((r, g, b))
}

/// Change your nickname to match the form First "Nick" Last
#[poise::command(prefix_command, guild_only, check = "bot_channel_only")]
pub async fn nick(ctx: Context<'_>, #[rest] nickname: Option<String>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("nick outside a guild")?;
    let Some(current) = ctx.author_member().await.and_then(|m| m.nick.clone()) else {
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Nickname Error",
            "Your nickname must first be set to First Last",
            None,
        )
        .await?;
        return Ok(());
    };
    let base = base_name(&current);

    let nickname = nickname.unwrap_or_default();
    if nickname.is_empty() {
        guild_id
            .edit_member(ctx.http(), ctx.author().id, EditMember::new().nickname(&base))
            .await?;
        send_block_embed(
            ctx.http(),
            ctx.channel_id(),
            "Nickname Reset",
            "Your name has been reset",
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
            "Your nickname cannot contain '\"'",
            None,
        )
        .await?;
        return Ok(());
    }

    match compose_nickname(&base, &nickname) {
        Some(full) => {
            guild_id
                .edit_member(ctx.http(), ctx.author().id, EditMember::new().nickname(&full))
                .await?;
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Nickname Changed",
                &format!("You are now {full}"),
                None,
            )
            .await?;
        }
        None => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Nickname Error",
                "Your nickname does not fit within the 32 character limit",
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Find the ghost op by number of messages sent
#[poise::command(prefix_command, guild_only, check = "bot_channel_only")]
pub async fn ghost(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("ghost outside a guild")?;
    let wait_msg = send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        "Please Wait",
        "Calculating the ghost op, please wait while this is done",
        None,
    )
    .await?;

    let channels = guild_id.channels(ctx.http()).await?;
    let mut tallies: HashMap<String, u32> = HashMap::new();
    for channel in channels.values().filter(|c| c.kind == ChannelType::Text) {
        let messages = match channel
            .id
            .messages(ctx.http(), GetMessages::new().limit(MAX_MESSAGE_SCAN))
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Skipping channel {} in ghost tally: {}", channel.id, e);
                continue;
            }
        };
        for message in messages {
            if message.author.bot {
                continue;
            }
            *tallies.entry(message.author.name.clone()).or_insert(0) += 1;
        }
    }

    if let Err(e) = wait_msg.delete(ctx.http()).await {
        warn!("Failed to delete ghost wait message: {}", e);
    }

    match quietest_member(&tallies) {
        Some((name, count)) => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Ghost Op Found",
                &format!("The current ghost op is {name} as they have only sent {count} messages"),
                None,
            )
            .await?;
        }
        None => {
            send_block_embed(
                ctx.http(),
                ctx.channel_id(),
                "Ghost Op Error",
                "No recent member messages were found to tally",
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Member with the fewest tallied messages, ties broken by name
fn quietest_member(tallies: &HashMap<String, u32>) -> Option<(&str, u32)> {
    tallies
        .iter()
        .min_by_key(|(name, count)| (**count, name.as_str()))
        .map(|(name, count)| (name.as_str(), *count))
}

/// View the time until the next teatime is happening
#[poise::command(prefix_command, guild_only)]
pub async fn teatime(ctx: Context<'_>) -> Result<(), Error> {
    countdown(
        ctx,
        TEATIME_EVENT,
        "Next Teatime",
        "The next teatime is happening in",
        ("No Teatime", "There are no more teatimes for you to join"),
    )
    .await
}

/// View the time until the next timecard is due
#[poise::command(prefix_command, guild_only)]
pub async fn timecard(ctx: Context<'_>) -> Result<(), Error> {
    countdown(
        ctx,
        TIMECARD_EVENT,
        "Next Timecard",
        "The next timecard is due in",
        ("No Timecard", "There are no more timecards for you to turn in"),
    )
    .await
}

async fn countdown(
    ctx: Context<'_>,
    event: EventDescriptor,
    title: &str,
    lead: &str,
    ended: (&str, &str),
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("countdown outside a guild")?;
    let now = Utc::now();
    let term_running = ctx
        .data()
        .config
        .guild(guild_id)
        .and_then(|guild| guild.term)
        .is_some_and(|term| now.naive_utc() < term.end.and_time(NaiveTime::MIN));

    if !term_running {
        let (ended_title, ended_body) = ended;
        send_block_embed(ctx.http(), ctx.channel_id(), ended_title, ended_body, None).await?;
        return Ok(());
    }

    let next = next_occurrence(&event, now)?;
    send_block_embed(
        ctx.http(),
        ctx.channel_id(),
        title,
        &format!("{lead} {}.", format_countdown(next - now)),
        None,
    )
    .await?;
    Ok(())
}

/// Render a duration as "D days, H hours, M minutes, and S seconds"
fn format_countdown(diff: chrono::Duration) -> String {
    format!(
        "{} days, {} hours, {} minutes, and {} seconds",
        diff.num_days(),
        diff.num_hours() % 24,
        diff.num_minutes() % 60,
        diff.num_seconds() % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("(66,89,155)"), Some((66, 89, 155)));
        assert_eq!(parse_rgb("(0,0,0)"), Some((0, 0, 0)));
    }

    #[test]
    fn test_parse_rgb_rejects_out_of_range() {
        assert_eq!(parse_rgb("(256,0,0)"), None);
        assert_eq!(parse_rgb("(999,999,999)"), None);
    }

    #[test]
    fn test_quietest_member() {
        let mut tallies = HashMap::new();
        tallies.insert("chatty".to_string(), 40);
        tallies.insert("quiet".to_string(), 2);
        tallies.insert("middle".to_string(), 17);
        assert_eq!(quietest_member(&tallies), Some(("quiet", 2)));
    }

    #[test]
    fn test_quietest_member_empty() {
        assert_eq!(quietest_member(&HashMap::new()), None);
    }

    #[test]
    fn test_format_countdown() {
        let diff = chrono::Duration::seconds(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
        assert_eq!(format_countdown(diff), "2 days, 3 hours, 4 minutes, and 5 seconds");
        assert_eq!(
            format_countdown(chrono::Duration::seconds(59)),
            "0 days, 0 hours, 0 minutes, and 59 seconds"
        );
    }
}
