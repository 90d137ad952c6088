//! Human-readable relative times ("3 days ago").
//!
//! Under a day the output names a single unit ("5 minutes ago"). Beyond
//! that it lists at most two adjacent units ("2 weeks, 3 days ago").

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

const UNITS: [(i64, &str, &str); 6] = [
    (YEAR, "year", "years"),
    (MONTH, "month", "months"),
    (WEEK, "week", "weeks"),
    (DAY, "day", "days"),
    (HOUR, "hour", "hours"),
    (MINUTE, "minute", "minutes"),
];

/// Describe `then` relative to the current time
pub fn naturaltime(then: DateTime<Utc>) -> String {
    naturaltime_at(then, Utc::now())
}

/// Describe `then` relative to `now`
pub fn naturaltime_at(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let (seconds, suffix) = if seconds >= 0 {
        (seconds, "ago")
    } else {
        (-seconds, "from now")
    };

    match seconds {
        0 => "now".to_string(),
        1 => format!("a second {}", suffix),
        s if s < MINUTE => format!("{} seconds {}", s, suffix),
        s if s < 2 * MINUTE => format!("a minute {}", suffix),
        s if s < HOUR => format!("{} minutes {}", s / MINUTE, suffix),
        s if s < 2 * HOUR => format!("an hour {}", suffix),
        s if s < DAY => format!("{} hours {}", s / HOUR, suffix),
        s => format!("{} {}", timesince(s), suffix),
    }
}

/// The largest non-zero unit of `seconds`, plus the next smaller unit when
/// it is also non-zero
fn timesince(seconds: i64) -> String {
    let Some(first) = UNITS.iter().position(|(size, _, _)| seconds >= *size) else {
        return "0 minutes".to_string();
    };

    let (size, singular, plural) = UNITS[first];
    let count = seconds / size;
    let mut parts = vec![pluralize(count, singular, plural)];

    if let Some(&(next_size, next_singular, next_plural)) = UNITS.get(first + 1) {
        let next_count = (seconds - count * size) / next_size;
        if next_count > 0 {
            parts.push(pluralize(next_count, next_singular, next_plural));
        }
    }

    parts.join(", ")
}

fn pluralize(count: i64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn ago(duration: Duration) -> String {
        let now = Utc::now();
        naturaltime_at(now - duration, now)
    }

    #[test]
    fn test_under_a_day() {
        assert_eq!(ago(Duration::zero()), "now");
        assert_eq!(ago(Duration::seconds(1)), "a second ago");
        assert_eq!(ago(Duration::seconds(42)), "42 seconds ago");
        assert_eq!(ago(Duration::seconds(61)), "a minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(70)), "an hour ago");
        assert_eq!(ago(Duration::hours(23)), "23 hours ago");
    }

    #[test]
    fn test_days_and_beyond() {
        assert_eq!(ago(Duration::days(1)), "1 day ago");
        assert_eq!(ago(Duration::days(3)), "3 days ago");
        assert_eq!(ago(Duration::days(3) + Duration::hours(4)), "3 days, 4 hours ago");
        assert_eq!(ago(Duration::days(17)), "2 weeks, 3 days ago");
        assert_eq!(ago(Duration::days(30)), "1 month ago");
        assert_eq!(ago(Duration::days(400)), "1 year, 1 month ago");
    }

    #[test]
    fn test_only_adjacent_units() {
        // 1 year and 3 days: the month slot is empty so days are not shown
        assert_eq!(ago(Duration::days(368)), "1 year ago");
    }

    #[test]
    fn test_future() {
        let now = Utc::now();
        assert_eq!(naturaltime_at(now + Duration::minutes(3), now), "3 minutes from now");
        assert_eq!(naturaltime_at(now + Duration::days(2), now), "2 days from now");
    }

    proptest! {
        #[test]
        fn past_times_end_with_ago(seconds in 1i64..(20 * YEAR)) {
            let text = ago(Duration::seconds(seconds));
            prop_assert!(text.ends_with(" ago"));
        }

        #[test]
        fn at_most_two_units(seconds in DAY..(20 * YEAR)) {
            let text = ago(Duration::seconds(seconds));
            prop_assert!(text.matches(", ").count() <= 1);
        }
    }
}
