// [apps/gateway/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE REGISTRY (V4.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: MATRIZ DE MOTORES Y DAEMONS DEL NÚCLEO
 * =================================================================
 */

pub mod audit_recorder;
pub mod expiry_reaper;
pub mod file_vault;
pub mod ingest;
pub mod ledger_bridge;
pub mod outbox_relay;
pub mod signing;
pub mod verification;

pub use audit_recorder::{build_audit_recorder, AuditEvent, AuditRecorderDaemon, AuditRecorderHandle};
pub use expiry_reaper::ExpiryReaper;
pub use file_vault::FileVault;
pub use ingest::{DocumentIngestService, DocumentView, UploadRequest};
pub use ledger_bridge::{BridgeOutcome, LedgerBridge};
pub use outbox_relay::LedgerOutboxRelay;
pub use signing::{SignatureEngineService, SignatureVerificationResult, SignatureView};
pub use verification::{DocumentVerificationResult, VerificationService};
