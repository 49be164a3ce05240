//! Rollout policy evaluation
//!
//! [`evaluate`] is a pure function of the group policy, the group's rollout
//! counters and the current time. Side effects of a denial (holding the
//! instance, switching updates off) are applied by the caller.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use roller_errors::{UpdateError, ValidationError};
use roller_types::{GroupPolicy, UpdatesStats};

const OFFICE_OPENS: u32 = 9;
const OFFICE_CLOSES: u32 = 17;

/// Check the policy gates in order.
///
/// # Errors
///
/// Returns the first gate that denies the update.
pub fn evaluate(
    policy: &GroupPolicy,
    stats: &UpdatesStats,
    now: DateTime<Utc>,
) -> Result<(), UpdateError> {
    if !policy.updates_enabled {
        return Err(UpdateError::UpdatesDisabled);
    }
    if policy.office_hours && !within_office_hours(policy.timezone.as_deref(), now) {
        return Err(UpdateError::UpdatesDisabled);
    }

    let max = effective_max_updates(policy, stats);
    if stats.granted_in_period >= max {
        return Err(UpdateError::MaxUpdatesPerPeriodLimitReached);
    }
    if stats.in_progress >= max {
        return Err(UpdateError::MaxConcurrentUpdatesLimitReached);
    }
    if stats.timed_out >= max {
        return Err(UpdateError::MaxTimedOutUpdatesLimitReached);
    }
    Ok(())
}

/// Safe mode lets a single instance through until the first attempt at the
/// current version has finished.
#[must_use]
pub fn effective_max_updates(policy: &GroupPolicy, stats: &UpdatesStats) -> u32 {
    if policy.safe_mode && stats.attempted_current_version == 0 {
        1
    } else {
        policy.max_updates_per_period
    }
}

/// Monday to Friday, 09:00 to 17:00 local time. An unknown timezone never
/// matches.
#[must_use]
pub fn within_office_hours(timezone: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(tz) = timezone.and_then(parse_timezone) else {
        return false;
    };
    let local = now.with_timezone(&tz);
    let weekday = !matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
    weekday && (OFFICE_OPENS..OFFICE_CLOSES).contains(&local.hour())
}

#[must_use]
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

/// Validate a policy before it is stored.
///
/// # Errors
///
/// Returns `ExpectingValidTimezone` when office hours are on without a
/// known timezone, or when a timezone is set but unknown, and
/// `InvalidPolicy` for a zero update budget.
pub fn validate_policy(policy: &GroupPolicy) -> Result<(), ValidationError> {
    let timezone_ok = match policy.timezone.as_deref() {
        Some(name) => parse_timezone(name).is_some(),
        None => !policy.office_hours,
    };
    if !timezone_ok {
        return Err(ValidationError::ExpectingValidTimezone {
            timezone: policy.timezone.clone(),
        });
    }
    if policy.max_updates_per_period == 0 {
        return Err(ValidationError::InvalidPolicy {
            message: "max_updates_per_period must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stats() -> UpdatesStats {
        UpdatesStats {
            total_instances: 10,
            ..UpdatesStats::default()
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    // 2026-03-04 is a Wednesday, 2026-03-07 a Saturday.
    const WEDNESDAY: (i32, u32, u32) = (2026, 3, 4);
    const SATURDAY: (i32, u32, u32) = (2026, 3, 7);

    #[test]
    fn test_disabled_group_denies() {
        let policy = GroupPolicy {
            updates_enabled: false,
            ..GroupPolicy::default()
        };
        assert_eq!(
            evaluate(&policy, &stats(), Utc::now()),
            Err(UpdateError::UpdatesDisabled)
        );
    }

    #[test]
    fn test_safe_mode_limits_first_attempt() {
        let policy = GroupPolicy {
            max_updates_per_period: 5,
            ..GroupPolicy::default()
        };
        let mut s = stats();
        assert_eq!(effective_max_updates(&policy, &s), 1);
        assert!(evaluate(&policy, &s, Utc::now()).is_ok());

        s.in_progress = 1;
        s.granted_in_period = 0;
        assert_eq!(
            evaluate(&policy, &s, Utc::now()),
            Err(UpdateError::MaxConcurrentUpdatesLimitReached)
        );

        s.attempted_current_version = 1;
        assert_eq!(effective_max_updates(&policy, &s), 5);
        assert!(evaluate(&policy, &s, Utc::now()).is_ok());

        let unsafe_policy = GroupPolicy {
            safe_mode: false,
            ..policy
        };
        assert_eq!(effective_max_updates(&unsafe_policy, &stats()), 5);
    }

    #[test]
    fn test_gate_order() {
        let policy = GroupPolicy {
            safe_mode: false,
            max_updates_per_period: 2,
            ..GroupPolicy::default()
        };
        let s = UpdatesStats {
            granted_in_period: 2,
            in_progress: 2,
            timed_out: 2,
            ..stats()
        };
        assert_eq!(
            evaluate(&policy, &s, Utc::now()),
            Err(UpdateError::MaxUpdatesPerPeriodLimitReached)
        );

        let s = UpdatesStats {
            granted_in_period: 0,
            ..s
        };
        assert_eq!(
            evaluate(&policy, &s, Utc::now()),
            Err(UpdateError::MaxConcurrentUpdatesLimitReached)
        );

        let s = UpdatesStats {
            in_progress: 1,
            ..s
        };
        assert_eq!(
            evaluate(&policy, &s, Utc::now()),
            Err(UpdateError::MaxTimedOutUpdatesLimitReached)
        );
    }

    #[test]
    fn test_office_hours_window() {
        let (y, m, d) = WEDNESDAY;
        assert!(within_office_hours(Some("UTC"), at(y, m, d, 9)));
        assert!(within_office_hours(Some("UTC"), at(y, m, d, 16)));
        assert!(!within_office_hours(Some("UTC"), at(y, m, d, 17)));
        assert!(!within_office_hours(Some("UTC"), at(y, m, d, 8)));

        let (y, m, d) = SATURDAY;
        assert!(!within_office_hours(Some("UTC"), at(y, m, d, 11)));
    }

    #[test]
    fn test_office_hours_follow_timezone() {
        let (y, m, d) = WEDNESDAY;
        // 07:30 UTC is 16:30 in Tokyo and 02:30 in New York.
        let now = at(y, m, d, 7);
        assert!(within_office_hours(Some("Asia/Tokyo"), now));
        assert!(!within_office_hours(Some("America/New_York"), now));
        assert!(!within_office_hours(Some("Not/AZone"), now));
        assert!(!within_office_hours(None, now));
    }

    #[test]
    fn test_office_hours_policy_denies_outside_window() {
        let policy = GroupPolicy {
            office_hours: true,
            timezone: Some("Europe/Berlin".to_string()),
            ..GroupPolicy::default()
        };
        let (y, m, d) = SATURDAY;
        assert_eq!(
            evaluate(&policy, &stats(), at(y, m, d, 10)),
            Err(UpdateError::UpdatesDisabled)
        );
        let (y, m, d) = WEDNESDAY;
        assert!(evaluate(&policy, &stats(), at(y, m, d, 10)).is_ok());
    }

    #[test]
    fn test_validate_policy() {
        assert!(validate_policy(&GroupPolicy::default()).is_ok());

        let office = GroupPolicy {
            office_hours: true,
            ..GroupPolicy::default()
        };
        assert_eq!(
            validate_policy(&office),
            Err(ValidationError::ExpectingValidTimezone { timezone: None })
        );

        let bad_zone = GroupPolicy {
            timezone: Some("Mars/Olympus".to_string()),
            ..GroupPolicy::default()
        };
        assert!(matches!(
            validate_policy(&bad_zone),
            Err(ValidationError::ExpectingValidTimezone { .. })
        ));

        let zero = GroupPolicy {
            max_updates_per_period: 0,
            ..GroupPolicy::default()
        };
        assert!(matches!(
            validate_policy(&zero),
            Err(ValidationError::InvalidPolicy { .. })
        ));
    }
}
