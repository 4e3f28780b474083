//! Core types for VitalWatch

mod snapshot;
mod vitals;
mod security;
mod emergency;
mod alert;
mod triage;
mod output;

pub use snapshot::{RawSnapshot, DecryptedSnapshot, Scalar, FieldClass, first_field};
pub use vitals::VitalsRecord;
pub use security::{AccessKind, AccessObservation, SecurityEvent};
pub use emergency::{EmergencyType, EmergencyVerdict};
pub use alert::{AlertPolicy, AlertState, DispatchOutcome};
pub use triage::{RiskLevel, TriageBrief};
pub use output::{ResponseDocument, ErrorDocument, Readings};
