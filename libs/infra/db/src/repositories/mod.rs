// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY REGISTRY (V4.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: MATRIZ DE ACCESO A LOS AGREGADOS DEL NÚCLEO
 * =================================================================
 */

pub mod audit_repository;
pub mod document_repository;
pub mod ledger_tx_repository;
pub mod notification_repository;
pub mod outbox_repository;
pub mod session_repository;
pub mod share_repository;
pub mod signature_repository;
pub mod user_repository;
pub mod verification_repository;

pub use audit_repository::{AuditChainReport, AuditRepository};
pub use document_repository::{DocumentListFilter, DocumentRepository};
pub use ledger_tx_repository::LedgerTxRepository;
pub use notification_repository::NotificationRepository;
pub use outbox_repository::{OutboxEntry, OutboxRepository};
pub use session_repository::{RefreshRotation, SessionRepository};
pub use share_repository::ShareRepository;
pub use signature_repository::SignatureRepository;
pub use user_repository::UserRepository;
pub use verification_repository::VerificationRepository;

use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::Value;
use uuid::Uuid;

/// Normaliza un parámetro opcional a NULL explícito del motor.
pub(crate) fn opt_value<T: Into<Value>>(optional: Option<T>) -> Value {
    optional.map(Into::into).unwrap_or(Value::Null)
}

/// Parsea un UUID persistido como TEXT.
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::MappingError(format!("UUID: {}", e)))
}

/// Parsea un instante RFC 3339 persistido como TEXT.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::MappingError(format!("TIMESTAMP: {}", e)))
}

/// Detecta la colisión de unicidad del motor SQLite.
pub(crate) fn is_unique_violation(fault: &libsql::Error) -> bool {
    fault.to_string().contains("UNIQUE constraint failed")
}
