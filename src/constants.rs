use std::time::Duration;

/// Embed colour used for every bot message
pub const EMBED_COLOUR: (u8, u8, u8) = (66, 89, 155);

/// Width embed description lines are padded to inside code blocks
pub const EMBED_LINE_WIDTH: usize = 62;

/// Anchor instant recurring events are measured from: 2021-01-01T00:00:00Z
pub const SCHEDULE_ANCHOR: i64 = 1_609_459_200;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Channel bindings that `!config` can set for a guild
pub const CHANNEL_OPTIONS: [&str; 5] = ["bot", "important", "teatime", "mod-bot", "games"];

/// Reaction palette for choice menus: digit keycaps 1-10, then circles
pub const MENU_ICONS: [&str; 19] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "🔟",
    "🔴",
    "🟠",
    "🟡",
    "🟢",
    "🔵",
    "🟣",
    "🟤",
    "⚫",
    "⚪",
];

/// How long a choice menu waits for a reaction
pub const MENU_TIMEOUT: Duration = Duration::from_secs(120);

/// How long a text prompt waits for a reply
pub const TEXT_TIMEOUT: Duration = Duration::from_secs(300);

/// Total attempts a text prompt gets before giving up
pub const MAX_TEXT_ATTEMPTS: u8 = 3;

/// Maximum number of messages scanned per channel by `!ghost`
pub const MAX_MESSAGE_SCAN: u8 = 100;

/// Discord's nickname length limit
pub const MAX_NICKNAME_LENGTH: usize = 32;

/// Log directive for the application
pub const LOG_DIRECTIVE: &str = "coopbot_rs=info";
