use time::{Duration, PrimitiveDateTime};

use crate::db::models::ModuleConfigMap;

/// Grace applied to the submit endpoint so short network jitter at the
/// deadline does not eat an otherwise finished attempt.
pub(crate) const SUBMIT_GRACE_SECONDS: i64 = 300;

/// Wall-clock deadline of an attempt: start plus the durations of every
/// enabled module. Modules are taken sequentially, so the sum is the total
/// time the candidate may hold the attempt open.
pub(crate) fn compute_attempt_expiry(
    config: &ModuleConfigMap,
    started_at: PrimitiveDateTime,
) -> PrimitiveDateTime {
    let total_minutes: i64 = config
        .enabled_modules()
        .into_iter()
        .map(|module| config.get(module).duration_minutes.max(0) as i64)
        .sum();

    started_at + Duration::minutes(total_minutes)
}

/// Expiry is evaluated by the HTTP layer before every engine call; the
/// state machine itself carries no clock policy.
pub(crate) fn is_expired(expires_at: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now > expires_at
}

pub(crate) fn within_submit_grace(
    expires_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> bool {
    now <= expires_at + Duration::seconds(SUBMIT_GRACE_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ModuleConfig;
    use time::macros::datetime;

    fn config(listening: i32, reading: i32, writing_enabled: bool) -> ModuleConfigMap {
        ModuleConfigMap {
            listening: ModuleConfig { enabled: true, duration_minutes: listening },
            reading: ModuleConfig { enabled: true, duration_minutes: reading },
            writing: ModuleConfig { enabled: writing_enabled, duration_minutes: 60 },
            speaking: ModuleConfig { enabled: false, duration_minutes: 15 },
        }
    }

    #[test]
    fn expiry_sums_enabled_module_durations() {
        let started = datetime!(2026-03-01 09:00:00);

        let expiry = compute_attempt_expiry(&config(30, 60, true), started);
        assert_eq!(expiry, datetime!(2026-03-01 11:30:00));

        let expiry = compute_attempt_expiry(&config(30, 60, false), started);
        assert_eq!(expiry, datetime!(2026-03-01 10:30:00));
    }

    #[test]
    fn negative_durations_do_not_shrink_the_window() {
        let started = datetime!(2026-03-01 09:00:00);
        let expiry = compute_attempt_expiry(&config(-10, 60, false), started);
        assert_eq!(expiry, datetime!(2026-03-01 10:00:00));
    }

    #[test]
    fn grace_window_extends_past_expiry() {
        let expires = datetime!(2026-03-01 11:00:00);

        assert!(!is_expired(expires, datetime!(2026-03-01 11:00:00)));
        assert!(is_expired(expires, datetime!(2026-03-01 11:00:01)));

        assert!(within_submit_grace(expires, datetime!(2026-03-01 11:04:59)));
        assert!(within_submit_grace(expires, datetime!(2026-03-01 11:05:00)));
        assert!(!within_submit_grace(expires, datetime!(2026-03-01 11:05:01)));
    }
}
