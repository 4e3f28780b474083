//! Cached AI triage enrichment
//!
//! One request per validity interval at most; every request is bounded by a
//! timeout and any failure is replaced by `TriageBrief::fallback()`.

use std::time::Duration as StdDuration;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use crate::core::TriageProvider;
use crate::types::{TriageBrief, VitalsRecord};
use crate::{TRIAGE_TIMEOUT_MS, TRIAGE_VALIDITY_SECS};

#[derive(Debug)]
pub struct TriageCache {
    brief: Option<TriageBrief>,
    fetched_at: Option<DateTime<Utc>>,
    validity: Duration,
    timeout: StdDuration,
}

impl Default for TriageCache {
    fn default() -> Self {
        Self::new(TRIAGE_VALIDITY_SECS, TRIAGE_TIMEOUT_MS)
    }
}

impl TriageCache {
    pub fn new(validity_secs: u64, timeout_ms: u64) -> Self {
        Self {
            brief: None,
            fetched_at: None,
            validity: Duration::seconds(validity_secs as i64),
            timeout: StdDuration::from_millis(timeout_ms),
        }
    }

    /// Cached brief younger than the validity interval?
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.brief, self.fetched_at) {
            (Some(_), Some(at)) => now - at < self.validity,
            _ => false,
        }
    }

    pub fn cached(&self) -> Option<&TriageBrief> {
        self.brief.as_ref()
    }

    /// Return the cached brief, or ask the provider for a fresh one
    pub async fn brief_for(
        &mut self,
        provider: &dyn TriageProvider,
        vitals: &VitalsRecord,
        now: DateTime<Utc>,
    ) -> TriageBrief {
        if self.is_fresh(now) {
            if let Some(brief) = &self.brief {
                debug!("reusing cached triage brief");
                return brief.clone();
            }
        }

        let brief = match tokio::time::timeout(self.timeout, provider.summarize(vitals)).await {
            Ok(Ok(brief)) => brief.sanitized(),
            Ok(Err(e)) => {
                warn!(error = %e, "triage failed, using fallback brief");
                TriageBrief::fallback()
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "triage timed out, using fallback brief");
                TriageBrief::fallback()
            }
        };

        self.brief = Some(brief.clone());
        self.fetched_at = Some(now);
        brief
    }

    pub fn clear(&mut self) {
        self.brief = None;
        self.fetched_at = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
