use crate::model::Settings;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_ms: i64,
    pub is_expired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseState {
    pub open: bool,
    pub countdown: Option<Countdown>,
}

pub fn countdown(target: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
    let total_ms = (target - now).num_milliseconds();
    if total_ms <= 0 {
        return Countdown {
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            total_ms: 0,
            is_expired: true,
        };
    }
    const SEC: i64 = 1000;
    const MIN: i64 = 60 * SEC;
    const HOUR: i64 = 60 * MIN;
    const DAY: i64 = 24 * HOUR;
    Countdown {
        days: total_ms / DAY,
        hours: (total_ms % DAY) / HOUR,
        minutes: (total_ms % HOUR) / MIN,
        seconds: (total_ms % MIN) / SEC,
        total_ms,
        is_expired: false,
    }
}

/// Results are public when the admin switch is on, or once the configured
/// countdown has run out.
pub fn release_state(settings: &Settings, now: DateTime<Utc>) -> ReleaseState {
    let countdown = settings.countdown_end.map(|end| countdown(end, now));
    let expired = countdown.map(|c| c.is_expired).unwrap_or(false);
    ReleaseState {
        open: settings.is_results_open || expired,
        countdown,
    }
}
