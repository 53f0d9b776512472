//! Aggregate statistics over logged sessions, used to refresh the history
//! view after a completion.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: u64,
    pub total_seconds: u64,
    pub sessions_this_week: u64,
    pub current_streak_days: u32,
}

impl SessionStats {
    pub fn empty() -> Self {
        Self {
            total_sessions: 0,
            total_seconds: 0,
            sessions_this_week: 0,
            current_streak_days: 0,
        }
    }
}

/// Number of sessions started within the last seven days, `now` inclusive.
pub fn sessions_this_week(started: &[DateTime<Utc>], now: DateTime<Utc>) -> u64 {
    let Some(cutoff) = now.checked_sub_days(Days::new(7)) else {
        return started.len() as u64;
    };
    started.iter().filter(|ts| **ts >= cutoff).count() as u64
}

/// Length of the run of consecutive days with at least one session, ending
/// today or yesterday. A streak broken for a full day resets to zero.
pub fn current_streak_days(started: &[DateTime<Utc>], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = started.iter().map(|ts| ts.date_naive()).collect();
    days.sort_unstable();
    days.dedup();

    let mut cursor = if days.binary_search(&today).is_ok() {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0;
    while days.binary_search(&cursor).is_ok() {
        streak += 1;
        match cursor.checked_sub_days(Days::new(1)) {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 8, 30, 0).unwrap()
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let sessions = [day(2026, 3, 10), day(2026, 3, 11), day(2026, 3, 12)];
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        assert_eq!(current_streak_days(&sessions, today), 3);
    }

    #[test]
    fn streak_survives_no_session_yet_today() {
        let sessions = [day(2026, 3, 10), day(2026, 3, 11)];
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        assert_eq!(current_streak_days(&sessions, today), 2);
    }

    #[test]
    fn streak_resets_after_a_missed_day() {
        let sessions = [day(2026, 3, 8), day(2026, 3, 9)];
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        assert_eq!(current_streak_days(&sessions, today), 0);
    }

    #[test]
    fn multiple_sessions_on_one_day_count_once() {
        let sessions = [day(2026, 3, 12), day(2026, 3, 12), day(2026, 3, 11)];
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        assert_eq!(current_streak_days(&sessions, today), 2);
    }

    #[test]
    fn week_window_is_inclusive_of_the_cutoff() {
        let now = day(2026, 3, 12);
        let sessions = [day(2026, 3, 5), day(2026, 3, 4), day(2026, 3, 12)];
        assert_eq!(sessions_this_week(&sessions, now), 2);
    }

    #[test]
    fn empty_history_yields_empty_stats() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        assert_eq!(current_streak_days(&[], today), 0);
        assert_eq!(sessions_this_week(&[], day(2026, 3, 12)), 0);
    }
}
