use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors raised while loading or persisting the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Active date range of a co-op term. Scheduled reminders only fire for
/// guilds whose term window contains the occurrence instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermWindow {
    #[serde(with = "mdy_date")]
    pub start: NaiveDate,
    #[serde(with = "mdy_date")]
    pub end: NaiveDate,
}

impl TermWindow {
    /// True strictly between midnight of the start day and midnight of
    /// the end day
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start.and_time(NaiveTime::MIN) < now && now < self.end.and_time(NaiveTime::MIN)
    }

    /// End-of-term festivities stay relevant until 23:00 on the end day
    pub fn end_of_term(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN) + chrono::Duration::hours(23)
    }
}

/// Per-guild role and channel bindings plus the term window. Every field
/// is optional; consumers skip guilds missing what they need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<RoleId>,
    #[serde(rename = "mod", skip_serializing_if = "Option::is_none")]
    pub moderator: Option<RoleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register: Option<RoleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot: Option<ChannelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important: Option<ChannelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teatime: Option<ChannelId>,
    #[serde(rename = "mod-bot", skip_serializing_if = "Option::is_none")]
    pub mod_bot: Option<ChannelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub games: Option<ChannelId>,
    #[serde(rename = "time", skip_serializing_if = "Option::is_none")]
    pub term: Option<TermWindow>,
}

impl GuildConfig {
    /// Bind a named channel slot; false for unknown option names
    pub fn set_channel(&mut self, option: &str, channel: ChannelId) -> bool {
        match option {
            "bot" => self.bot = Some(channel),
            "important" => self.important = Some(channel),
            "teatime" => self.teatime = Some(channel),
            "mod-bot" => self.mod_bot = Some(channel),
            "games" => self.games = Some(channel),
            _ => return false,
        }
        true
    }
}

/// Root of the persisted configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub guilds: HashMap<GuildId, GuildConfig>,
    /// Members invited to a guild who have not yet run `!register`
    pub members: HashMap<UserId, GuildId>,
    /// Users granted mod status on join
    pub mods: Vec<UserId>,
    /// Known schools and their role colours
    pub colleges: BTreeMap<String, (u8, u8, u8)>,
}

/// Read-through cache over the JSON configuration file. Every mutation
/// rewrites the whole file synchronously, so the last writer wins and
/// related fields must be changed in a single `update` call.
pub struct ConfigStore {
    path: PathBuf,
    cache: RwLock<BotConfig>,
}

impl ConfigStore {
    /// Load the config file, starting empty when it does not exist yet
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {}, starting empty", path.display());
                BotConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            cache: RwLock::new(config),
        })
    }

    /// Run a closure against a snapshot of the current configuration
    pub fn read<R>(&self, f: impl FnOnce(&BotConfig) -> R) -> R {
        let guard = self.cache.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Clone of a single guild's record
    pub fn guild(&self, guild_id: GuildId) -> Option<GuildConfig> {
        self.read(|c| c.guilds.get(&guild_id).cloned())
    }

    /// Apply a mutation and rewrite the whole config file
    pub fn update<R>(&self, f: impl FnOnce(&mut BotConfig) -> R) -> Result<R, ConfigError> {
        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        let result = f(&mut guard);
        let raw = serde_json::to_string_pretty(&*guard)?;
        fs::write(&self.path, raw)?;
        Ok(result)
    }
}

/// Term dates are stored in the config file as MM/DD/YYYY
mod mdy_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%m/%d/%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(de)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn window() -> TermWindow {
        TermWindow {
            start: date(2021, 5, 17),
            end: date(2021, 8, 6),
        }
    }

    #[test]
    fn test_term_window_serde_format() {
        let raw = serde_json::to_string(&window()).expect("serialize");
        assert_eq!(raw, r#"{"start":"05/17/2021","end":"08/06/2021"}"#);

        let parsed: TermWindow = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(parsed, window());
    }

    #[test]
    fn test_term_window_rejects_bad_dates() {
        let raw = r#"{"start":"2021-05-17","end":"08/06/2021"}"#;
        assert!(serde_json::from_str::<TermWindow>(raw).is_err());
    }

    #[test]
    fn test_term_window_contains() {
        let w = window();
        let mid = date(2021, 6, 15).and_time(NaiveTime::MIN);
        assert!(w.contains(mid));

        // Both boundaries are exclusive
        assert!(!w.contains(date(2021, 5, 17).and_time(NaiveTime::MIN)));
        assert!(!w.contains(date(2021, 8, 6).and_time(NaiveTime::MIN)));
        assert!(!w.contains(date(2021, 5, 16).and_time(NaiveTime::MIN)));
        assert!(!w.contains(date(2021, 9, 1).and_time(NaiveTime::MIN)));
    }

    #[test]
    fn test_end_of_term_is_eleven_pm() {
        let end = window().end_of_term();
        assert_eq!(end.date(), date(2021, 8, 6));
        assert_eq!(end.time(), NaiveTime::from_hms_opt(23, 0, 0).expect("valid time"));
    }

    #[test]
    fn test_set_channel() {
        let mut guild = GuildConfig::default();
        assert!(guild.set_channel("mod-bot", ChannelId::new(42)));
        assert_eq!(guild.mod_bot, Some(ChannelId::new(42)));

        assert!(!guild.set_channel("nonsense", ChannelId::new(43)));
    }

    #[test]
    fn test_guild_config_tolerates_missing_fields() {
        let parsed: GuildConfig = serde_json::from_str(r#"{"bot": "7"}"#).expect("deserialize");
        assert_eq!(parsed.bot, Some(ChannelId::new(7)));
        assert!(parsed.term.is_none());
        assert!(parsed.important.is_none());
    }

    #[test]
    fn test_store_round_trip() {
        let path = std::env::temp_dir().join(format!("coopbot-config-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let store = ConfigStore::load(&path).expect("load empty");
        store
            .update(|c| {
                let guild = c.guilds.entry(GuildId::new(1)).or_default();
                guild.important = Some(ChannelId::new(10));
                guild.term = Some(TermWindow {
                    start: date(2021, 5, 17),
                    end: date(2021, 8, 6),
                });
                c.mods.push(UserId::new(99));
            })
            .expect("update");

        let reloaded = ConfigStore::load(&path).expect("reload");
        let guild = reloaded.guild(GuildId::new(1)).expect("guild present");
        assert_eq!(guild.important, Some(ChannelId::new(10)));
        assert_eq!(guild.term, Some(window()));
        assert!(reloaded.read(|c| c.mods.contains(&UserId::new(99))));

        let _ = fs::remove_file(&path);
    }
}
