//! Core modules for VitalWatch

pub mod cipher;
pub mod normalizer;
pub mod classifier;
pub mod tracker;
pub mod ports;
pub mod triage;
pub mod dispatcher;
pub mod aggregator;
pub mod remote;
pub mod api;

pub use cipher::CipherCodec;
pub use normalizer::{FieldNormalizer, coerce, vitals_from, sos_from, access_from};
pub use classifier::EmergencyClassifier;
pub use tracker::EventTracker;
pub use ports::{TelemetryStore, Messenger, TriageProvider, InMemoryTelemetryStore, LogMessenger};
pub use triage::TriageCache;
pub use dispatcher::{AlertDispatcher, AlertContext, render_body};
pub use aggregator::{Aggregator, CycleState};
pub use remote::{RestTelemetryStore, WebhookMessenger, HttpTriageProvider};
pub use api::{create_router, run_server};
