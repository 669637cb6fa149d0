use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId};
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

use crate::config::{BotConfig, ConfigStore};
use crate::constants::{SCHEDULE_ANCHOR, SECONDS_PER_DAY};
use crate::utils::messages::send_block_embed;

/// A recurring calendar event: fires every `interval` seconds starting
/// `offset` seconds past the schedule anchor, optionally restricted to an
/// inclusive weekday range (0 = Monday)
#[derive(Debug, Clone, Copy)]
pub struct EventDescriptor {
    pub offset: i64,
    pub interval: i64,
    pub weekdays: Option<(u32, u32)>,
}

/// Tea time happens at 21:00 UTC on weekdays
pub const TEATIME_EVENT: EventDescriptor = EventDescriptor {
    offset: 75_600,
    interval: SECONDS_PER_DAY,
    weekdays: Some((0, 4)),
};

/// Timecards are due every other Friday at 13:00 UTC
pub const TIMECARD_EVENT: EventDescriptor = EventDescriptor {
    offset: 651_600,
    interval: 14 * SECONDS_PER_DAY,
    weekdays: None,
};

/// Upper bound on the weekday scan so a range the interval never lands on
/// fails instead of spinning
const WEEKDAY_SCAN_LIMIT: u32 = 1_000;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("event interval must be positive, got {0}")]
    NonPositiveInterval(i64),
    #[error("weekday range {0}..={1} is not a valid Monday-Sunday range")]
    InvalidWeekdayRange(u32, u32),
    #[error("no repetition lands on a weekday in {0}..={1}")]
    WeekdayNeverReached(u32, u32),
}

/// Smallest instant `T >= now` of the form `anchor + offset + k * interval`
/// (k non-negative) whose weekday falls inside the descriptor's range.
pub fn next_occurrence(
    event: &EventDescriptor,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    if event.interval <= 0 {
        return Err(ScheduleError::NonPositiveInterval(event.interval));
    }
    let (lo, hi) = event.weekdays.unwrap_or((0, 6));
    if lo > hi || hi > 6 {
        return Err(ScheduleError::InvalidWeekdayRange(lo, hi));
    }

    let mut ts = SCHEDULE_ANCHOR + event.offset;
    // Jump straight over every repetition already in the past
    if now.timestamp() > ts {
        let missed =
            ((now.timestamp() - ts) as u64).div_ceil(event.interval as u64) as i64;
        ts += missed * event.interval;
    }

    for _ in 0..WEEKDAY_SCAN_LIMIT {
        let Some(candidate) = DateTime::from_timestamp(ts, 0) else {
            break;
        };
        if (lo..=hi).contains(&candidate.weekday().num_days_from_monday()) {
            return Ok(candidate);
        }
        ts += event.interval;
    }

    Err(ScheduleError::WeekdayNeverReached(lo, hi))
}

/// Guilds due a tea-time reminder at `now`: term active, tea-time channel
/// bound, and an `important` channel to post into
pub fn teatime_targets(config: &BotConfig, now: DateTime<Utc>) -> Vec<ChannelId> {
    notify_targets(config, now, |guild| guild.teatime.is_some())
}

/// Guilds due a timecard reminder at `now`
pub fn timecard_targets(config: &BotConfig, now: DateTime<Utc>) -> Vec<ChannelId> {
    notify_targets(config, now, |_| true)
}

fn notify_targets(
    config: &BotConfig,
    now: DateTime<Utc>,
    extra: impl Fn(&crate::config::GuildConfig) -> bool,
) -> Vec<ChannelId> {
    config
        .guilds
        .values()
        .filter(|guild| {
            guild
                .term
                .is_some_and(|term| term.contains(now.naive_utc()))
                && extra(guild)
        })
        .filter_map(|guild| guild.important)
        .collect()
}

/// Guilds whose term end is still ahead (ends stay eligible until 23:00
/// on the end day), with the channel their congratulation goes to
pub fn term_end_candidates(
    config: &BotConfig,
    now: DateTime<Utc>,
) -> Vec<(GuildId, ChannelId, NaiveDate)> {
    config
        .guilds
        .iter()
        .filter_map(|(guild_id, guild)| {
            let term = guild.term?;
            let channel = guild.important?;
            (now.naive_utc() < term.end_of_term()).then_some((*guild_id, channel, term.end))
        })
        .collect()
}

/// Spawn the three independent reminder tasks
pub fn start_notification_tasks(http: Arc<serenity::Http>, config: Arc<ConfigStore>) {
    tokio::spawn(run_recurring_reminder(
        http.clone(),
        config.clone(),
        ReminderKind::Teatime,
    ));
    tokio::spawn(run_recurring_reminder(
        http.clone(),
        config.clone(),
        ReminderKind::Timecard,
    ));
    tokio::spawn(run_term_end_watch(http, config));
}

#[derive(Debug, Clone, Copy)]
enum ReminderKind {
    Teatime,
    Timecard,
}

impl ReminderKind {
    fn name(self) -> &'static str {
        match self {
            Self::Teatime => "teatime",
            Self::Timecard => "timecard",
        }
    }

    fn event(self) -> EventDescriptor {
        match self {
            Self::Teatime => TEATIME_EVENT,
            Self::Timecard => TIMECARD_EVENT,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Teatime => "Teatime",
            Self::Timecard => "Timecard Notification",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Self::Teatime => "Its teatime, join up in the teatime voice channel",
            Self::Timecard => "Your timecards are due today",
        }
    }

    fn targets(self, config: &BotConfig, now: DateTime<Utc>) -> Vec<ChannelId> {
        match self {
            Self::Teatime => teatime_targets(config, now),
            Self::Timecard => timecard_targets(config, now),
        }
    }
}

/// Wake once per occurrence and notify every guild whose term window
/// contains it. Send failures are per-guild and never stop the loop.
async fn run_recurring_reminder(
    http: Arc<serenity::Http>,
    config: Arc<ConfigStore>,
    kind: ReminderKind,
) {
    info!("{} reminder task started", kind.name());
    let mut after = Utc::now();

    loop {
        let occurrence = match next_occurrence(&kind.event(), after) {
            Ok(t) => t,
            Err(e) => {
                // A descriptor that cannot produce occurrences is a
                // build-time mistake; disable the task rather than spin
                error!("{} reminder disabled: {}", kind.name(), e);
                return;
            }
        };

        let wait = (occurrence - Utc::now()).to_std().unwrap_or_default();
        info!(
            "Next {} reminder at {} (in {} minutes)",
            kind.name(),
            occurrence,
            wait.as_secs() / 60
        );
        sleep(wait).await;

        let targets = config.read(|c| kind.targets(c, occurrence));
        if targets.is_empty() {
            info!("No guilds in an active term for the {} reminder", kind.name());
        }
        for channel in targets {
            if let Err(e) = send_block_embed(&http, channel, kind.title(), kind.body(), None).await
            {
                warn!(
                    "Failed to send {} reminder to channel {}: {}",
                    kind.name(),
                    channel,
                    e
                );
            }
        }

        // Advance strictly past the fired instant so the same occurrence
        // never fires twice
        after = occurrence + chrono::Duration::seconds(1);
    }
}

/// Watch term windows and congratulate each guild once, three hours
/// before its end date. Sleeps are capped at a day so config edits made
/// while waiting are picked up.
async fn run_term_end_watch(http: Arc<serenity::Http>, config: Arc<ConfigStore>) {
    info!("End-of-term watch task started");
    let mut congratulated: HashSet<(GuildId, NaiveDate)> = HashSet::new();

    loop {
        let now = Utc::now();
        let next = config
            .read(|c| term_end_candidates(c, now))
            .into_iter()
            .filter(|(guild_id, _, end)| !congratulated.contains(&(*guild_id, *end)))
            .min_by_key(|(_, _, end)| *end);

        let Some((guild_id, channel, end)) = next else {
            sleep(Duration::from_secs(SECONDS_PER_DAY as u64)).await;
            continue;
        };

        let fire_at = end.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::hours(3);
        let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
        if wait > Duration::from_secs(SECONDS_PER_DAY as u64) {
            sleep(Duration::from_secs(SECONDS_PER_DAY as u64)).await;
            continue;
        }
        info!(
            "Congratulating guild {} at {} (in {} minutes)",
            guild_id,
            fire_at,
            wait.as_secs() / 60
        );
        sleep(wait).await;

        if let Err(e) = send_block_embed(
            &http,
            channel,
            "Congratulations!!!",
            "Congrats on reaching the end of term!",
            None,
        )
        .await
        {
            warn!(
                "Failed to send end-of-term congratulation to guild {}: {}",
                guild_id, e
            );
        }
        congratulated.insert((guild_id, end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GuildConfig, TermWindow};

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).expect("valid test timestamp")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn test_next_occurrence_is_aligned_and_not_in_past() {
        // Some Tuesday afternoon in 2022
        let now = at(1_650_000_000);
        let next = next_occurrence(&TIMECARD_EVENT, now).expect("occurrence");

        assert!(next >= now);
        let elapsed = next.timestamp() - (SCHEDULE_ANCHOR + TIMECARD_EVENT.offset);
        assert_eq!(elapsed % TIMECARD_EVENT.interval, 0);
        assert!(elapsed >= 0);
        // Smallest such instant: one interval earlier is in the past
        assert!(next.timestamp() - TIMECARD_EVENT.interval < now.timestamp());
    }

    #[test]
    fn test_next_occurrence_before_anchor_returns_first_repetition() {
        let now = at(SCHEDULE_ANCHOR - 500);
        // 2021-01-01 is a Friday, inside the teatime weekday range
        let next = next_occurrence(&TEATIME_EVENT, now).expect("occurrence");
        assert_eq!(next.timestamp(), SCHEDULE_ANCHOR + TEATIME_EVENT.offset);
    }

    #[test]
    fn test_next_occurrence_skips_weekend() {
        // Saturday 2021-01-02 00:00 UTC
        let saturday = at(SCHEDULE_ANCHOR + SECONDS_PER_DAY);
        let next = next_occurrence(&TEATIME_EVENT, saturday).expect("occurrence");

        // Monday 2021-01-04 21:00 UTC
        assert_eq!(
            next.timestamp(),
            SCHEDULE_ANCHOR + 3 * SECONDS_PER_DAY + TEATIME_EVENT.offset
        );
        assert_eq!(next.weekday().num_days_from_monday(), 0);
    }

    #[test]
    fn test_next_occurrence_exact_boundary() {
        let occurrence = at(SCHEDULE_ANCHOR + TEATIME_EVENT.offset);
        let next = next_occurrence(&TEATIME_EVENT, occurrence).expect("occurrence");
        assert_eq!(next, occurrence);
    }

    #[test]
    fn test_next_occurrence_rejects_bad_ranges() {
        let inverted = EventDescriptor {
            offset: 0,
            interval: SECONDS_PER_DAY,
            weekdays: Some((4, 0)),
        };
        assert_eq!(
            next_occurrence(&inverted, at(SCHEDULE_ANCHOR)),
            Err(ScheduleError::InvalidWeekdayRange(4, 0))
        );

        let out_of_range = EventDescriptor {
            offset: 0,
            interval: SECONDS_PER_DAY,
            weekdays: Some((0, 9)),
        };
        assert_eq!(
            next_occurrence(&out_of_range, at(SCHEDULE_ANCHOR)),
            Err(ScheduleError::InvalidWeekdayRange(0, 9))
        );

        let frozen = EventDescriptor {
            offset: 0,
            interval: 0,
            weekdays: None,
        };
        assert_eq!(
            next_occurrence(&frozen, at(SCHEDULE_ANCHOR)),
            Err(ScheduleError::NonPositiveInterval(0))
        );
    }

    #[test]
    fn test_next_occurrence_unreachable_weekday_fails() {
        // Weekly repetitions anchored on a Friday can never land Mon-Thu
        let event = EventDescriptor {
            offset: 0,
            interval: 7 * SECONDS_PER_DAY,
            weekdays: Some((0, 3)),
        };
        assert_eq!(
            next_occurrence(&event, at(SCHEDULE_ANCHOR)),
            Err(ScheduleError::WeekdayNeverReached(0, 3))
        );
    }

    fn guild_in_term(important: u64, teatime: Option<u64>) -> GuildConfig {
        GuildConfig {
            important: (important != 0).then(|| ChannelId::new(important)),
            teatime: teatime.map(ChannelId::new),
            term: Some(TermWindow {
                start: date(2021, 5, 17),
                end: date(2021, 8, 6),
            }),
            ..Default::default()
        }
    }

    fn config_with(guilds: Vec<(u64, GuildConfig)>) -> BotConfig {
        BotConfig {
            guilds: guilds
                .into_iter()
                .map(|(id, guild)| (GuildId::new(id), guild))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_only_active_terms_are_notified() {
        let mut expired = guild_in_term(20, Some(21));
        expired.term = Some(TermWindow {
            start: date(2021, 1, 4),
            end: date(2021, 4, 30),
        });
        let config = config_with(vec![(1, guild_in_term(10, Some(11))), (2, expired)]);

        // Mid-June 2021, inside the first window only
        let now = at(1_623_751_200);
        assert_eq!(teatime_targets(&config, now), vec![ChannelId::new(10)]);
        assert_eq!(timecard_targets(&config, now), vec![ChannelId::new(10)]);
    }

    #[test]
    fn test_guilds_missing_bindings_are_skipped() {
        let no_teatime = guild_in_term(30, None);
        let mut no_important = guild_in_term(0, Some(41));
        no_important.important = None;
        let no_term = GuildConfig {
            important: Some(ChannelId::new(50)),
            teatime: Some(ChannelId::new(51)),
            ..Default::default()
        };
        let config = config_with(vec![(1, no_teatime), (2, no_important), (3, no_term)]);

        let now = at(1_623_751_200);
        // Guild 1 has no teatime channel but still gets timecard reminders
        assert!(teatime_targets(&config, now).is_empty());
        assert_eq!(timecard_targets(&config, now), vec![ChannelId::new(30)]);
    }

    #[test]
    fn test_term_end_candidates_respect_cutoff() {
        let config = config_with(vec![(1, guild_in_term(10, None))]);

        // 22:00 on the end day: still eligible
        let before = date(2021, 8, 6).and_hms_opt(22, 0, 0).expect("valid").and_utc();
        let candidates = term_end_candidates(&config, before);
        assert_eq!(
            candidates,
            vec![(GuildId::new(1), ChannelId::new(10), date(2021, 8, 6))]
        );

        // 23:30 on the end day: gone
        let after = date(2021, 8, 6).and_hms_opt(23, 30, 0).expect("valid").and_utc();
        assert!(term_end_candidates(&config, after).is_empty());
    }
}
