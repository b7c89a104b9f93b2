//! Civil time in the single reference timezone.
//!
//! All schedule arithmetic is `UTC + fixed offset`. Dates and times carry no
//! zone of their own; combining them with the configured offset names the
//! instant a broadcast fires.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use std::time::Duration;

use crate::error::{ReelgateError, Result};
use crate::types::LinkButton;

/// Fixed-offset civil clock used for every scheduling decision.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceClock {
    offset: FixedOffset,
}

impl ReferenceClock {
    /// Offsets outside the valid range fall back to UTC.
    pub fn new(offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    /// Whole hours east of UTC.
    pub fn offset_hours(&self) -> i32 {
        self.offset.local_minus_utc() / 3600
    }

    /// Current civil datetime in the reference zone.
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Delay until the civil target. A target at or before now yields
    /// exactly zero — past-due jobs fire immediately rather than erroring.
    pub fn delay_until(&self, date: NaiveDate, time: NaiveTime) -> Duration {
        Self::delay_between(self.now(), NaiveDateTime::new(date, time))
    }

    fn delay_between(now: NaiveDateTime, target: NaiveDateTime) -> Duration {
        if target <= now {
            return Duration::ZERO;
        }
        (target - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Parse an operator-entered date: `DD.MM.YYYY`, `DD.MM` (rolls into next
/// year when the day has already passed), or ISO `YYYY-MM-DD`.
pub fn parse_civil_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%d.%m.%Y") {
        return Ok(date);
    }

    // DD.MM — assume this year, next year once the day has passed.
    let mut parts = input.splitn(2, '.');
    let day = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let month = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    if let (Some(day), Some(month)) = (day, month) {
        use chrono::Datelike;
        if let Some(date) = NaiveDate::from_ymd_opt(today.year(), month, day) {
            if date < today {
                return NaiveDate::from_ymd_opt(today.year() + 1, month, day).ok_or_else(|| {
                    ReelgateError::validation(format!("no such date next year: {input}"))
                });
            }
            return Ok(date);
        }
    }

    Err(ReelgateError::validation(format!(
        "unrecognized date {input:?}, expected DD.MM.YYYY, DD.MM or YYYY-MM-DD"
    )))
}

/// Parse an operator-entered time of day, `HH:MM`.
pub fn parse_civil_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| ReelgateError::validation(format!("unrecognized time {input:?}, expected HH:MM")))
}

/// Parse link buttons from operator text, one `label | url` per line.
/// Lines without a separator or with an empty half are skipped.
pub fn parse_buttons(text: &str) -> Vec<LinkButton> {
    text.lines()
        .filter_map(|line| {
            let (label, url) = line.split_once('|')?;
            let (label, url) = (label.trim(), url.trim());
            if label.is_empty() || url.is_empty() {
                return None;
            }
            Some(LinkButton::new(label, url))
        })
        .collect()
}

/// One required channel parsed from operator text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub label: String,
    pub link: String,
    pub channel_id: Option<String>,
}

/// Parse required-channel lines of the form `Name (https://link) [-100id]`.
/// A leading list index (`1.`) is tolerated; malformed lines are skipped.
pub fn parse_required_channels(text: &str) -> Vec<ChannelSpec> {
    text.lines().filter_map(parse_channel_line).collect()
}

fn parse_channel_line(line: &str) -> Option<ChannelSpec> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let open = line.find('(')?;
    let close = line[open..].find(')')? + open;
    let link = line[open + 1..close].trim();
    if !link.starts_with("http://") && !link.starts_with("https://") {
        return None;
    }

    let label = line[..open]
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
        .trim();
    if label.is_empty() {
        return None;
    }

    let tail = line[close + 1..].trim();
    let channel_id = if tail.is_empty() {
        None
    } else {
        tail.parse::<i64>().ok().map(|id| id.to_string())
    };

    Some(ChannelSpec {
        label: label.to_string(),
        link: link.to_string(),
        channel_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn delay_is_zero_for_past_targets() {
        let now = NaiveDateTime::new(date(2026, 3, 10), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let past = NaiveDateTime::new(date(2026, 3, 10), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(ReferenceClock::delay_between(now, past), Duration::ZERO);
        assert_eq!(ReferenceClock::delay_between(now, now), Duration::ZERO);
    }

    #[test]
    fn delay_counts_whole_gap() {
        let now = NaiveDateTime::new(date(2026, 3, 10), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let target =
            NaiveDateTime::new(date(2026, 3, 11), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert_eq!(
            ReferenceClock::delay_between(now, target),
            Duration::from_secs(26 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn invalid_offset_falls_back_to_utc() {
        let clock = ReferenceClock::new(99);
        // Should not panic; just behaves as UTC.
        let _ = clock.now();
    }

    #[test]
    fn date_formats() {
        let today = date(2026, 8, 7);
        assert_eq!(parse_civil_date("21.08.2026", today).unwrap(), date(2026, 8, 21));
        assert_eq!(parse_civil_date("2026-08-21", today).unwrap(), date(2026, 8, 21));
        assert_eq!(parse_civil_date("21.08", today).unwrap(), date(2026, 8, 21));
        // A short date already behind us rolls into next year.
        assert_eq!(parse_civil_date("01.02", today).unwrap(), date(2027, 2, 1));
        assert!(parse_civil_date("32.01.2026", today).is_err());
        assert!(parse_civil_date("tomorrow", today).is_err());
    }

    #[test]
    fn time_format() {
        assert_eq!(
            parse_civil_time("18:05").unwrap(),
            NaiveTime::from_hms_opt(18, 5, 0).unwrap()
        );
        assert!(parse_civil_time("25:00").is_err());
        assert!(parse_civil_time("six pm").is_err());
    }

    #[test]
    fn buttons_skip_malformed_lines() {
        let parsed = parse_buttons("Watch | https://t.me/x\nno separator\n | https://t.me/y\n");
        assert_eq!(parsed, vec![LinkButton::new("Watch", "https://t.me/x")]);
    }

    #[test]
    fn channel_lines() {
        let specs = parse_required_channels(
            "1. News (https://t.me/news) -1001234567890\nPartner (https://t.me/partner)\ngarbage line\n",
        );
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].label, "News");
        assert_eq!(specs[0].channel_id.as_deref(), Some("-1001234567890"));
        assert_eq!(specs[1].label, "Partner");
        assert_eq!(specs[1].channel_id, None);
    }
}
