// [libs/domain/models/src/ledger.rs]
/*!
 * =================================================================
 * APARATO: LEDGER DOMAIN MODELS (V3.3 - ENDORSEMENT READY)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DEL REGISTRO INMUTABLE DE INTEGRIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SIMULATED HONESTY: El estatus SIMULATED comparte la forma exacta
 *    del registro real pero queda marcado como no autoritativo; jamás
 *    se promociona en silencio.
 * 2. DEDUP DISCIPLINE: La clave de deduplicación viaja en el propio
 *    contrato para que los reintentos colapsen en un único registro.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clases de transacción que el Gateway somete al Ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerTxKind {
    Register,
    StateUpdate,
    Signature,
    Revoke,
}

impl LedgerTxKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::StateUpdate => "STATE_UPDATE",
            Self::Signature => "SIGNATURE",
            Self::Revoke => "REVOKE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "REGISTER" => Some(Self::Register),
            "STATE_UPDATE" => Some(Self::StateUpdate),
            "SIGNATURE" => Some(Self::Signature),
            "REVOKE" => Some(Self::Revoke),
            _ => None,
        }
    }
}

/// Estatus del registro. CONFIRMED es inmutable; SIMULATED es la forma
/// no autoritativa emitida por el simulador determinista.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerTxStatus {
    Pending,
    Confirmed,
    Rejected,
    Simulated,
}

impl LedgerTxStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Simulated => "SIMULATED",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "REJECTED" => Some(Self::Rejected),
            "SIMULATED" => Some(Self::Simulated),
            _ => None,
        }
    }
}

/// Atestación firmada de una identidad endosante del quórum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endorsement {
    pub endorsing_identity: String,
    pub endorsement_signature_hexadecimal: String,
}

/// Transacción del Ledger tal como se persiste en el Metadata Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub tx_id: String,
    pub document_id: Uuid,
    pub kind: LedgerTxKind,
    pub block_height: Option<u64>,
    pub block_hash_hexadecimal: Option<String>,
    pub payload_hash_hexadecimal: String,
    pub endorsements: Vec<Endorsement>,
    pub submitted_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub status: LedgerTxStatus,
    /// Clave de deduplicación: document_id + kind + secuencia monótona.
    pub dedup_key: String,
}

impl LedgerTransaction {
    /// Un registro SIMULATED nunca es autoritativo para verificación.
    pub fn is_authoritative(&self) -> bool {
        self.status == LedgerTxStatus::Confirmed
    }
}

/// Vista consolidada que el Gateway devuelve en 'query': el estado del
/// documento tal como lo conoce el Ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub document_id: Uuid,
    pub digest_hexadecimal: String,
    pub digest_algorithm_label: String,
    pub owner_id: Uuid,
    pub file_name: String,
    pub current_state_label: String,
    pub tx_id: String,
    pub block_height: Option<u64>,
    pub status: LedgerTxStatus,
    pub simulated: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Construye la clave de deduplicación canónica de una sumisión.
pub fn build_dedup_key(document_id: &Uuid, kind: LedgerTxKind, monotonic_seq: u64) -> String {
    format!("{}:{}:{}", document_id, kind.as_label(), monotonic_seq)
}
