//! Admission control: daily quota, throttle spacing and quiet hours.
//!
//! [`AdmissionState`] holds the counters explicitly; [`AdmissionPolicy`]
//! evaluates them. Neither touches storage. The orchestrator owns the state
//! and persists it after each mutation.

mod policy;
mod state;

pub use policy::{Admission, AdmissionPath, AdmissionPolicy, CriticalBypass, Denial};
pub use state::{
    clamp_daily_limit, clamp_min_interval, AdmissionState, QuotaState, ThrottleState,
    DEFAULT_DAILY_LIMIT, DEFAULT_MIN_INTERVAL_SECS, MAX_DAILY_LIMIT, MAX_MIN_INTERVAL_SECS,
    MIN_DAILY_LIMIT,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::{Priority, PriorityLevel};
    use crate::quiet_hours::QuietHoursConfig;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 3, h, m, s).unwrap()
    }

    fn state_at(now: DateTime<Utc>, limit: u32) -> AdmissionState {
        let policy = AdmissionPolicy::default();
        AdmissionState::new(policy.today(now), limit, 300)
    }

    fn normal() -> Priority {
        Priority::of_level(PriorityLevel::Normal)
    }

    fn critical() -> Priority {
        Priority::of_level(PriorityLevel::Critical)
    }

    #[test]
    fn throttle_denies_then_allows() {
        let policy = AdmissionPolicy::default();
        let t0 = t(12, 0, 0);
        let mut state = state_at(t0, 20);

        assert!(policy.should_send(&normal(), &mut state, t0, true).can_send());
        policy.record_send(&mut state, t0);

        let at_100 = policy.should_send(&normal(), &mut state, t0 + Duration::seconds(100), true);
        assert!(!at_100.can_send());
        assert!(at_100.has("throttled"));
        assert_eq!(at_100.denials(), &[Denial::Throttled { retry_in_secs: 200 }]);

        assert!(policy
            .should_send(&normal(), &mut state, t0 + Duration::seconds(301), true)
            .can_send());
    }

    #[test]
    fn quota_exhaustion_denies_non_critical() {
        let policy = AdmissionPolicy::default();
        let now = t(10, 0, 0);
        let mut state = state_at(now, 1);
        policy.record_send(&mut state, now);

        let later = now + Duration::hours(1);
        let decision = policy.can_send(&normal(), &mut state, later, AdmissionPath::Immediate);
        assert_eq!(
            decision.denials(),
            &[Denial::QuotaExceeded { sent: 1, limit: 1 }]
        );
    }

    #[test]
    fn quota_resets_on_new_local_day() {
        let policy = AdmissionPolicy::default();
        let now = t(23, 0, 0);
        let mut state = state_at(now, 1);
        policy.record_send(&mut state, now);

        let next_day = now + Duration::hours(2);
        assert!(policy
            .can_send(&normal(), &mut state, next_day, AdmissionPath::Immediate)
            .can_send());
        assert_eq!(state.quota.sent_count, 0);
        assert_eq!(state.quota.date, policy.today(next_day));
    }

    #[test]
    fn critical_bypasses_everything_on_immediate_path() {
        let policy = AdmissionPolicy::default();
        let now = t(23, 0, 0);
        let mut state =
            state_at(now, 1).with_quiet_hours(QuietHoursConfig::from_minutes(22 * 60, 8 * 60));
        policy.record_send(&mut state, now - Duration::seconds(10));

        assert!(policy.should_send(&critical(), &mut state, now, true).can_send());

        let normal_decision = policy.should_send(&normal(), &mut state, now, true);
        assert!(!normal_decision.can_send());
        assert!(normal_decision.has("quota-exceeded"));
        assert!(normal_decision.has("throttled"));
        assert!(normal_decision.has("quiet-hours-active"));
        assert!(normal_decision
            .reason()
            .unwrap()
            .contains("quiet-hours-active: will send in 540 minutes"));
    }

    #[test]
    fn queue_drain_applies_limits_to_critical() {
        let policy = AdmissionPolicy::default();
        let now = t(9, 0, 0);
        let mut state = state_at(now, 1);
        policy.record_send(&mut state, now);

        let decision = policy.can_send(&critical(), &mut state, now, AdmissionPath::QueueDrain);
        assert!(!decision.can_send());
        assert!(decision.has("quota-exceeded"));
    }

    #[test]
    fn quiet_hours_only_denial_is_detected() {
        let policy = AdmissionPolicy::default();
        let now = t(5, 0, 0);
        let mut state =
            state_at(now, 20).with_quiet_hours(QuietHoursConfig::from_minutes(22 * 60, 8 * 60));

        let decision = policy.should_send(&normal(), &mut state, now, true);
        assert!(decision.only_quiet_hours());
        assert_eq!(
            decision.denials(),
            &[Denial::QuietHours {
                remaining_secs: 3 * 3600
            }]
        );

        assert!(policy.should_send(&normal(), &mut state, now, false).can_send());
    }

    #[test]
    fn critical_can_be_held_by_quiet_hours_when_configured() {
        let mut policy = AdmissionPolicy::default();
        policy.immediate_bypass.quiet_hours = false;
        let now = t(23, 30, 0);
        let mut state =
            state_at(now, 20).with_quiet_hours(QuietHoursConfig::from_minutes(22 * 60, 8 * 60));

        let decision = policy.should_send(&critical(), &mut state, now, true);
        assert!(decision.only_quiet_hours());
    }

    #[test]
    fn throttle_retry_rounds_up() {
        let policy = AdmissionPolicy::default();
        let t0 = t(12, 0, 0);
        let mut state = state_at(t0, 20);
        policy.record_send(&mut state, t0);

        let decision = policy.can_send(
            &normal(),
            &mut state,
            t0 + Duration::milliseconds(100_500),
            AdmissionPath::Immediate,
        );
        assert_eq!(decision.denials(), &[Denial::Throttled { retry_in_secs: 200 }]);
    }
}
