//! Snapshot Aggregator: one polling cycle end to end
//!
//! fetch (concurrent) → normalize → track → classify → triage → dispatch → document
//!
//! Fetches happen before the cycle lock is taken. Everything that mutates
//! cross-cycle memory runs under one `tokio::sync::Mutex`, and the lock is
//! held through the triage request and notification delivery. A slow
//! webhook therefore also delays `reset_alert` and `history`; in exchange a
//! reset is never lost under an in-flight send and overlapping cycles cannot
//! both notify for the same episode.
//!
//! When built over an `InMemoryTelemetryStore` with `with_ingest`, devices
//! may also push vitals directly (`ingest_vitals`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use crate::config::{Config, StorePaths};
use crate::core::{
    access_from, sos_from, vitals_from, AlertContext, AlertDispatcher, EmergencyClassifier,
    EventTracker, FieldNormalizer, InMemoryTelemetryStore, Messenger, TelemetryStore, TriageCache,
    TriageProvider,
};
use crate::error::{ConfigError, CycleError, FetchError, IngestError};
use crate::types::{AccessKind, ResponseDocument, SecurityEvent};

/// Capacity of the live update channel; slow subscribers skip ahead
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Cross-cycle memory, single writer
#[derive(Debug)]
pub struct CycleState {
    pub tracker: EventTracker,
    pub dispatcher: AlertDispatcher,
    pub triage: TriageCache,
}

pub struct Aggregator {
    store: Arc<dyn TelemetryStore>,
    messenger: Arc<dyn Messenger>,
    triage: Option<Arc<dyn TriageProvider>>,
    normalizer: FieldNormalizer,
    classifier: EmergencyClassifier,
    paths: StorePaths,
    history_limit: usize,
    state: Mutex<CycleState>,
    latest: RwLock<Option<ResponseDocument>>,
    updates: broadcast::Sender<ResponseDocument>,
    cycles: AtomicU64,
    ingest: Option<Arc<InMemoryTelemetryStore>>,
}

impl Aggregator {
    pub fn new(
        config: &Config,
        store: Arc<dyn TelemetryStore>,
        messenger: Arc<dyn Messenger>,
        triage: Option<Arc<dyn TriageProvider>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let normalizer = FieldNormalizer::new(config.codec()?);
        let state = CycleState {
            tracker: EventTracker::with_window(config.window.duration_secs, config.window.capacity),
            dispatcher: AlertDispatcher::new(config.alert_policy(), config.messaging.recipient.clone()),
            triage: TriageCache::new(config.triage.validity_secs, config.triage.timeout_ms),
        };
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Ok(Self {
            store,
            messenger,
            triage,
            normalizer,
            classifier: EmergencyClassifier::new(),
            paths: config.store.paths.clone(),
            history_limit: config.server.history_limit,
            state: Mutex::new(state),
            latest: RwLock::new(None),
            updates,
            cycles: AtomicU64::new(0),
            ingest: None,
        })
    }

    /// Accept pushed vitals into `store`, which should also be the store polled
    pub fn with_ingest(mut self, store: Arc<InMemoryTelemetryStore>) -> Self {
        self.ingest = Some(store);
        self
    }

    pub fn accepts_ingest(&self) -> bool {
        self.ingest.is_some()
    }

    /// Store a device-pushed vitals snapshot under the vitals path.
    /// `posture` defaults to "unknown" and `fallDetected` to false.
    pub async fn ingest_vitals(&self, body: Value) -> Result<Value, IngestError> {
        let store = self.ingest.as_ref().ok_or(IngestError::Disabled)?;
        let Value::Object(mut snapshot) = body else {
            return Err(IngestError::NotAnObject);
        };
        if !snapshot.contains_key("temperature") || !snapshot.contains_key("heartRate") {
            return Err(IngestError::MissingVitals);
        }
        for (field, default) in [("posture", Value::from("unknown")), ("fallDetected", Value::from(false))] {
            match snapshot.get(field) {
                Some(v) if !v.is_null() => {}
                _ => {
                    snapshot.insert(field.to_string(), default);
                }
            }
        }

        let snapshot = Value::Object(snapshot);
        store.set(self.paths.vitals.clone(), snapshot.clone()).await;
        debug!(path = %self.paths.vitals, "vitals ingested");
        Ok(snapshot)
    }

    /// Run one cycle at the current wall-clock time
    pub async fn run_cycle(&self) -> Result<ResponseDocument, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle with an explicit clock reading
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<ResponseDocument, CycleError> {
        let (vitals, sos, motion, access) = tokio::join!(
            self.store.get(&self.paths.vitals),
            self.store.get(&self.paths.sos),
            self.store.get(&self.paths.motion),
            self.store.get(&self.paths.access),
        );

        if let (Err(e), Err(_), Err(_), Err(_)) = (&vitals, &sos, &motion, &access) {
            warn!(error = %e, "every telemetry fetch failed");
            return Err(CycleError::StoreUnreachable(e.to_string()));
        }

        let vitals = self.normalizer.normalize_value(degrade(&self.paths.vitals, &vitals));
        let sos = self.normalizer.normalize_value(degrade(&self.paths.sos, &sos));
        let motion = self.normalizer.normalize_value(degrade(&self.paths.motion, &motion));
        let access = self.normalizer.normalize_value(degrade(&self.paths.access, &access));

        let record = vitals_from(&vitals, &motion);
        let sos_pressed = sos_from(&sos);
        let observation = access_from(&access);

        let mut state = self.state.lock().await;

        let authorized_count =
            state.tracker.record_and_count(AccessKind::Authorized, observation.clone(), now);
        let unauthorized_count =
            state.tracker.record_and_count(AccessKind::Unauthorized, observation, now);

        let verdict = self.classifier.classify(&record, sos_pressed, unauthorized_count);

        let brief = match (&self.triage, verdict.is_emergency) {
            (Some(provider), true) => Some(state.triage.brief_for(provider.as_ref(), &record, now).await),
            _ => None,
        };

        let ctx = AlertContext {
            vitals: &record,
            unauthorized_count,
            triage: brief.as_ref(),
            now,
        };
        let outcome = state
            .dispatcher
            .evaluate_and_dispatch(&verdict, ctx, self.messenger.as_ref())
            .await;

        let mut document = ResponseDocument::new(now, &record, sos_pressed, &verdict, outcome);
        document.authorized_count = authorized_count;
        document.unauthorized_count = unauthorized_count;
        document.triage = brief;
        document.recent_authorized = state.tracker.recent(AccessKind::Authorized, self.history_limit);
        document.recent_unauthorized = state.tracker.recent(AccessKind::Unauthorized, self.history_limit);
        drop(state);

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        if verdict.is_emergency {
            info!(cycle, emergency = ?verdict.emergency_type, outcome = outcome.code(), "cycle complete");
        } else {
            debug!(cycle, outcome = outcome.code(), "cycle complete");
        }

        *self.latest.write().await = Some(document.clone());
        let _ = self.updates.send(document.clone());
        Ok(document)
    }

    /// Last document produced, without polling
    pub async fn latest(&self) -> Option<ResponseDocument> {
        self.latest.read().await.clone()
    }

    /// Manual alert reset back to idle
    pub async fn reset_alert(&self) {
        self.state.lock().await.dispatcher.reset();
    }

    /// Newest-first events of `kind`, capped by the configured history limit
    pub async fn history(&self, kind: AccessKind, limit: Option<usize>) -> Vec<SecurityEvent> {
        let n = limit.unwrap_or(self.history_limit).min(self.history_limit);
        self.state.lock().await.tracker.recent(kind, n)
    }

    /// Live stream of documents, one per completed cycle
    pub fn subscribe(&self) -> broadcast::Receiver<ResponseDocument> {
        self.updates.subscribe()
    }

    /// Completed cycles since start
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }
}

/// A failed sub-fetch reads as "nothing stored"
fn degrade<'a>(path: &str, fetched: &'a Result<Option<Value>, FetchError>) -> Option<&'a Value> {
    match fetched {
        Ok(value) => value.as_ref(),
        Err(e) => {
            warn!(path, error = %e, "telemetry fetch failed, treating as absent");
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
