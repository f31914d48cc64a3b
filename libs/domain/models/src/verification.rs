// [libs/domain/models/src/verification.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION DOMAIN MODELS (V2.1)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: EVENTOS DE VERIFICACIÓN Y SUS DESENLACES
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Desenlaces posibles de una verificación bajo demanda.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// Digest igual, Ledger CONFIRMED, estado no revocado.
    Match,
    /// Los bytes almacenados ya no reproducen la huella registrada.
    DigestMismatch,
    /// El Ledger conoce una huella distinta a la del Metadata Store.
    LedgerMismatch,
    NotFound,
    /// Indeterminado: el Ledger no respondió dentro del plazo. No muta estado.
    LedgerUnavailable,
}

impl VerificationOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::DigestMismatch => "DIGEST_MISMATCH",
            Self::LedgerMismatch => "LEDGER_MISMATCH",
            Self::NotFound => "NOT_FOUND",
            Self::LedgerUnavailable => "LEDGER_UNAVAILABLE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "MATCH" => Some(Self::Match),
            "DIGEST_MISMATCH" => Some(Self::DigestMismatch),
            "LEDGER_MISMATCH" => Some(Self::LedgerMismatch),
            "NOT_FOUND" => Some(Self::NotFound),
            "LEDGER_UNAVAILABLE" => Some(Self::LedgerUnavailable),
            _ => None,
        }
    }
}

/// Evento de verificación, append-only en el Metadata Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationEvent {
    pub id: Uuid,
    pub document_id: Uuid,
    pub verifier_id: Option<Uuid>,
    pub verified: bool,
    pub method: String,
    pub outcome: VerificationOutcome,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}
