// INICIO DEL ARCHIVO [libs/infra/ledger/src/simulator.rs]
/*!
 * =================================================================
 * APARATO: DETERMINISTIC LEDGER SIMULATOR (V4.1 - SHADOW HONEST)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO NO AUTORITATIVO ANTE APAGÓN DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DETERMINISM: tx_id = hex(SHA-256(document_id ‖ kind ‖ seq));
 *    dos réplicas que simulan la misma operación producen el mismo
 *    identificador, preservando la idempotencia del contrato.
 * 2. HONESTY: Todo registro emitido queda marcado SIMULATED y el
 *    llamador recibe 'simulated: true'; la promoción a CONFIRMED sólo
 *    ocurre re-registrando contra el Ledger real vía Outbox.
 * =================================================================
 */

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;
use versafe_domain_models::ledger::{Endorsement, LedgerRecord, LedgerTxKind, LedgerTxStatus};

use crate::errors::LedgerError;
use crate::gateway::{SubmissionIntent, SubmissionReceipt};

/// Identidad del endosante sintético del simulador.
const SIMULATED_ENDORSER: &str = "versafe-simulated-endorser";

/// Registro interno del simulador por documento.
struct SimulatedDocumentState {
    records: Vec<LedgerRecord>,
}

pub struct DeterministicSimulator {
    /// Estado en RAM por documento; el espejo durable vive en el
    /// Metadata Store a cargo del llamador.
    documents: Mutex<HashMap<Uuid, SimulatedDocumentState>>,
}

impl DeterministicSimulator {
    pub fn new() -> Self {
        Self { documents: Mutex::new(HashMap::new()) }
    }

    /// tx_id determinista de la operación simulada.
    pub fn deterministic_tx_id(document_id: &Uuid, kind: LedgerTxKind, seq: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(document_id.to_string().as_bytes());
        hasher.update(kind.as_label().as_bytes());
        hasher.update(seq.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Acepta la sumisión y emite un recibo SIMULATED.
    #[instrument(skip(self, intent), fields(document_id = %intent.document_id, kind = intent.kind.as_label()))]
    pub fn submit(&self, intent: &SubmissionIntent) -> SubmissionReceipt {
        let tx_id = Self::deterministic_tx_id(&intent.document_id, intent.kind, intent.monotonic_seq);
        let payload_hash = intent.payload_hash_hexadecimal();

        let endorsements = vec![Endorsement {
            endorsing_identity: SIMULATED_ENDORSER.to_string(),
            endorsement_signature_hexadecimal: {
                let mut hasher = Sha256::new();
                hasher.update(tx_id.as_bytes());
                hasher.update(SIMULATED_ENDORSER.as_bytes());
                hex::encode(hasher.finalize())
            },
        }];

        let record = LedgerRecord {
            document_id: intent.document_id,
            digest_hexadecimal: intent
                .payload
                .get("digest")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            digest_algorithm_label: intent
                .payload
                .get("algo")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            owner_id: intent
                .payload
                .get("owner_id")
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or(intent.document_id),
            file_name: intent
                .payload
                .get("file_name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            current_state_label: intent
                .payload
                .get("state")
                .and_then(|v| v.as_str())
                .unwrap_or("UPLOADED")
                .to_string(),
            tx_id: tx_id.clone(),
            block_height: None,
            status: LedgerTxStatus::Simulated,
            simulated: true,
            recorded_at: Utc::now(),
        };

        let mut documents_guard = self.documents.lock().expect("simulator lock poisoned");
        documents_guard
            .entry(intent.document_id)
            .or_insert_with(|| SimulatedDocumentState { records: Vec::new() })
            .records
            .push(record);

        info!("🎭 [SIMULATOR]: {} accepted as SIMULATED tx {}", intent.kind.as_label(), &tx_id[0..8]);

        SubmissionReceipt {
            tx_id,
            block_height: None,
            block_hash_hexadecimal: None,
            endorsements,
            status: LedgerTxStatus::Simulated,
            simulated: true,
            payload_hash_hexadecimal: payload_hash,
        }
    }

    /// Último registro simulado del documento.
    pub fn query(&self, document_id: &Uuid) -> Result<LedgerRecord, LedgerError> {
        let documents_guard = self.documents.lock().expect("simulator lock poisoned");
        documents_guard
            .get(document_id)
            .and_then(|state| state.records.last().cloned())
            .ok_or(LedgerError::RecordNotFound)
    }

    /// Historial simulado completo en orden de sumisión.
    pub fn history(&self, document_id: &Uuid) -> Result<Vec<LedgerRecord>, LedgerError> {
        let documents_guard = self.documents.lock().expect("simulator lock poisoned");
        documents_guard
            .get(document_id)
            .map(|state| state.records.clone())
            .ok_or(LedgerError::RecordNotFound)
    }

    /// Un tx simulado jamás progresa a CONFIRMED por esta vía.
    pub fn tx_status(&self, tx_id: &str) -> Result<LedgerTxStatus, LedgerError> {
        let documents_guard = self.documents.lock().expect("simulator lock poisoned");
        let known = documents_guard
            .values()
            .any(|state| state.records.iter().any(|r| r.tx_id == tx_id));
        if known {
            Ok(LedgerTxStatus::Simulated)
        } else {
            Err(LedgerError::RecordNotFound)
        }
    }
}

impl Default for DeterministicSimulator {
    fn default() -> Self {
        Self::new()
    }
}
// FIN DEL ARCHIVO [libs/infra/ledger/src/simulator.rs]
