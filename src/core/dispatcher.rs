//! Alert Dispatcher: one notification per emergency episode
//!
//! State transitions:
//! - IDLE → SENT: emergency appears, notification delivered
//! - SENT → SENT: repeat suppressed (cooldown policy may re-send)
//! - SENT → IDLE: emergency resolved (silent)
//! - delivery failure: no transition, next cycle retries

use chrono::{DateTime, Utc};
use tracing::{error, info};
use crate::core::Messenger;
use crate::types::{
    AlertPolicy, AlertState, DispatchOutcome, EmergencyType, EmergencyVerdict, TriageBrief,
    VitalsRecord,
};

/// What the notification body is rendered from
#[derive(Debug, Clone, Copy)]
pub struct AlertContext<'a> {
    pub vitals: &'a VitalsRecord,
    pub unauthorized_count: usize,
    pub triage: Option<&'a TriageBrief>,
    pub now: DateTime<Utc>,
}

/// Alert state machine
#[derive(Debug)]
pub struct AlertDispatcher {
    state: AlertState,
    policy: AlertPolicy,
    recipient: String,
}

impl AlertDispatcher {
    pub fn new(policy: AlertPolicy, recipient: impl Into<String>) -> Self {
        Self {
            state: AlertState::default(),
            policy,
            recipient: recipient.into(),
        }
    }

    /// Run one cycle of the state machine
    pub async fn evaluate_and_dispatch(
        &mut self,
        verdict: &EmergencyVerdict,
        ctx: AlertContext<'_>,
        messenger: &dyn Messenger,
    ) -> DispatchOutcome {
        let Some(kind) = verdict.emergency_type.filter(|_| verdict.is_emergency) else {
            if self.state.last_sent {
                info!(last_type = ?self.state.last_type, "emergency resolved, alert re-armed");
                self.state.clear();
                return DispatchOutcome::A005_CLEARED;
            }
            return DispatchOutcome::A001_IDLE;
        };

        let success = if self.state.is_idle() {
            DispatchOutcome::A002_SENT
        } else if self.resend_allowed(kind, ctx.now) {
            DispatchOutcome::A004_RESENT
        } else {
            return DispatchOutcome::A003_SUPPRESSED;
        };

        let body = render_body(kind, &ctx);
        match messenger.send(&body, &self.recipient).await {
            Ok(()) => {
                info!(emergency = %kind, to = %self.recipient, outcome = success.code(), "alert dispatched");
                self.state.mark_sent(kind, ctx.now);
                success
            }
            Err(e) => {
                error!(emergency = %kind, error = %e, "alert delivery failed, will retry next cycle");
                DispatchOutcome::A006_FAILED
            }
        }
    }

    /// Only the cooldown policy lets a latched alert fire again
    fn resend_allowed(&self, kind: EmergencyType, now: DateTime<Utc>) -> bool {
        let AlertPolicy::Cooldown(cooldown) = self.policy else {
            return false;
        };
        if self.state.last_type.as_deref() != Some(kind.label()) {
            return true;
        }
        self.state
            .last_sent_at
            .and_then(|at| (now - at).to_std().ok())
            .map(|elapsed| elapsed > cooldown)
            .unwrap_or(true)
    }

    /// Manual reset back to IDLE; idempotent
    pub fn reset(&mut self) {
        if self.state.last_sent {
            info!("alert state reset manually");
        }
        self.state.clear();
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }
}

/// Render the notification text
pub fn render_body(kind: EmergencyType, ctx: &AlertContext<'_>) -> String {
    let v = ctx.vitals;
    let mut body = format!("🚨 EMERGENCY ALERT: {}\n", kind);
    body.push_str(&format!("Heart rate: {} bpm\n", fmt_reading(v.heart_rate_bpm)));
    body.push_str(&format!("Temperature: {} °C\n", fmt_reading(v.temperature_c)));
    body.push_str(&format!("Humidity: {} %\n", fmt_reading(v.humidity_pct)));
    body.push_str(&format!("Posture: {}\n", v.posture));
    body.push_str(&format!("Fall detected: {}\n", if v.fall_detected { "yes" } else { "no" }));
    body.push_str(&format!("Unauthorized access attempts (window): {}\n", ctx.unauthorized_count));
    if let Some(t) = ctx.triage {
        body.push_str(&format!(
            "Triage: {:?} risk, priority {} - {}\nSuggested: {}\n",
            t.risk_level, t.priority, t.explanation, t.suggested_response
        ));
    }
    body.push_str(&format!("Time: {}", ctx.now.to_rfc3339()));
    body
}

fn fmt_reading(value: Option<f64>) -> String {
    value.map(|x| format!("{:.1}", x)).unwrap_or_else(|| "--".to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use async_trait::async_trait;
    use crate::error::NotifyError;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        attempts: AtomicUsize,
        failing: AtomicBool,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Messenger for Recorder {
        async fn send(&self, body: &str, _to: &str) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::Transport("offline".into()));
            }
            self.sent.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    fn ctx(vitals: &VitalsRecord, now: DateTime<Utc>) -> AlertContext<'_> {
        AlertContext { vitals, unauthorized_count: 0, triage: None, now }
    }

    fn emergency(kind: EmergencyType) -> EmergencyVerdict {
        EmergencyVerdict::from_triggers(vec![kind])
    }

    #[tokio::test]
    async fn test_idle_stays_idle() {
        let m = Recorder::default();
        let v = VitalsRecord::default();
        let mut d = AlertDispatcher::new(AlertPolicy::Latched, "+100");
        let out = d.evaluate_and_dispatch(&EmergencyVerdict::clear(), ctx(&v, t0()), &m).await;
        assert_eq!(out, DispatchOutcome::A001_IDLE);
        assert_eq!(m.count(), 0);
    }

    #[tokio::test]
    async fn test_single_notification_per_episode() {
        let m = Recorder::default();
        let v = VitalsRecord::default();
        let mut d = AlertDispatcher::new(AlertPolicy::Latched, "+100");
        let fall = emergency(EmergencyType::FallDetected);

        assert_eq!(d.evaluate_and_dispatch(&fall, ctx(&v, at(0)), &m).await, DispatchOutcome::A002_SENT);
        assert_eq!(d.evaluate_and_dispatch(&fall, ctx(&v, at(1)), &m).await, DispatchOutcome::A003_SUPPRESSED);
        // Type change does not re-fire under the latched policy
        let sos = emergency(EmergencyType::SosButton);
        assert_eq!(d.evaluate_and_dispatch(&sos, ctx(&v, at(2)), &m).await, DispatchOutcome::A003_SUPPRESSED);
        assert_eq!(m.count(), 1);
    }

    #[tokio::test]
    async fn test_resolution_rearms() {
        let m = Recorder::default();
        let v = VitalsRecord::default();
        let mut d = AlertDispatcher::new(AlertPolicy::Latched, "+100");
        let fall = emergency(EmergencyType::FallDetected);

        d.evaluate_and_dispatch(&fall, ctx(&v, at(0)), &m).await;
        let out = d.evaluate_and_dispatch(&EmergencyVerdict::clear(), ctx(&v, at(1)), &m).await;
        assert_eq!(out, DispatchOutcome::A005_CLEARED);
        assert!(d.state().is_idle());

        assert_eq!(d.evaluate_and_dispatch(&fall, ctx(&v, at(2)), &m).await, DispatchOutcome::A002_SENT);
        assert_eq!(m.count(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_transition() {
        let m = Recorder::default();
        m.failing.store(true, Ordering::SeqCst);
        let v = VitalsRecord::default();
        let mut d = AlertDispatcher::new(AlertPolicy::Latched, "+100");
        let sos = emergency(EmergencyType::SosButton);

        assert_eq!(d.evaluate_and_dispatch(&sos, ctx(&v, at(0)), &m).await, DispatchOutcome::A006_FAILED);
        assert!(d.state().is_idle());

        m.failing.store(false, Ordering::SeqCst);
        assert_eq!(d.evaluate_and_dispatch(&sos, ctx(&v, at(1)), &m).await, DispatchOutcome::A002_SENT);
        assert_eq!(m.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(m.count(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_policy() {
        let m = Recorder::default();
        let v = VitalsRecord::default();
        let mut d = AlertDispatcher::new(AlertPolicy::Cooldown(Duration::from_secs(60)), "+100");
        let fall = emergency(EmergencyType::FallDetected);

        assert_eq!(d.evaluate_and_dispatch(&fall, ctx(&v, at(0)), &m).await, DispatchOutcome::A002_SENT);
        assert_eq!(d.evaluate_and_dispatch(&fall, ctx(&v, at(60)), &m).await, DispatchOutcome::A003_SUPPRESSED);
        assert_eq!(d.evaluate_and_dispatch(&fall, ctx(&v, at(61)), &m).await, DispatchOutcome::A004_RESENT);

        // Type change re-sends immediately
        let sos = emergency(EmergencyType::SosButton);
        assert_eq!(d.evaluate_and_dispatch(&sos, ctx(&v, at(62)), &m).await, DispatchOutcome::A004_RESENT);
        assert_eq!(d.state().last_type.as_deref(), Some("SOS Button Pressed"));
        assert_eq!(m.count(), 3);
    }

    #[tokio::test]
    async fn test_reset_idempotent() {
        let m = Recorder::default();
        let v = VitalsRecord::default();
        let mut d = AlertDispatcher::new(AlertPolicy::Latched, "+100");
        d.evaluate_and_dispatch(&emergency(EmergencyType::FallDetected), ctx(&v, at(0)), &m).await;
        d.reset();
        d.reset();
        assert_eq!(d.state(), &AlertState::default());
    }

    #[test]
    fn test_body_mentions_type_and_vitals() {
        let v = VitalsRecord {
            heart_rate_bpm: Some(210.0),
            temperature_c: Some(36.5),
            ..VitalsRecord::default()
        };
        let body = render_body(EmergencyType::HeartRateHigh, &ctx(&v, t0()));
        assert!(body.contains("Critical High Heart Rate"));
        assert!(body.contains("210.0 bpm"));
        assert!(body.contains("36.5 °C"));
        assert!(body.contains("Humidity: -- %"));
    }
}
