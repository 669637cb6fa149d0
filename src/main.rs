mod commands;
mod config;
mod constants;
mod handlers;
mod menu;
mod models;
mod schedule;
mod utils;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::{
    commands::{
        about, botnick, config_channel, delguild, demote, emoji, ghost, guilds, invite,
        newchannel, newguild, nick, ping, promote, register, rereg, teatime, timecard,
    },
    config::ConfigStore,
    constants::LOG_DIRECTIVE,
    models::Data,
    schedule::start_notification_tasks,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    initialize_logging();

    let config = match load_configuration() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = match ConfigStore::load(&config.config_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to load config file {}: {}", config.config_path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = start_bot(config.discord_token, store).await {
        error!("Bot error: {}", e);
        std::process::exit(1);
    }
}

/// Configuration loaded from environment variables
struct Config {
    discord_token: String,
    config_path: String,
}

/// Initialize the logging system
fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(LOG_DIRECTIVE.parse().expect("valid log directive")),
        )
        .init();
}

/// Load configuration from environment variables
fn load_configuration() -> Result<Config, Box<dyn std::error::Error>> {
    let discord_token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| "DISCORD_TOKEN environment variable not set. Set it with: export DISCORD_TOKEN=your_bot_token")?;

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());

    Ok(Config {
        discord_token,
        config_path,
    })
}

/// Create and start the Discord bot
async fn start_bot(
    token: String,
    store: Arc<ConfigStore>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store_for_setup = Arc::clone(&store);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                // Owner
                guilds(),
                invite(),
                delguild(),
                demote(),
                // Admin
                config_channel(),
                newchannel(),
                promote(),
                rereg(),
                newguild(),
                emoji(),
                botnick(),
                // Member
                register(),
                nick(),
                ghost(),
                teatime(),
                timecard(),
                // Utility
                about(),
                ping(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".to_string()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(async move {
                    match event {
                        serenity::FullEvent::Ready { data_about_bot } => {
                            info!("Logged in as {}", data_about_bot.user.name);
                        }
                        serenity::FullEvent::GuildMemberAddition { new_member } => {
                            handlers::handle_member_join(
                                ctx,
                                new_member,
                                &framework.options().owners,
                                data,
                            )
                            .await;
                        }
                        serenity::FullEvent::GuildCreate { guild, is_new } => {
                            if is_new.unwrap_or(false) {
                                handlers::handle_guild_create(ctx, guild).await;
                            }
                        }
                        _ => {}
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            // Reminder tasks only need the HTTP client and the store
            start_notification_tasks(ctx.http.clone(), Arc::clone(&store_for_setup));
            info!("Notification tasks started");

            Box::pin(async move { Ok(Data::new(store_for_setup)) })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;

    Ok(())
}
