// INICIO DEL ARCHIVO [apps/gateway/src/services/ledger_bridge.rs]
/*!
 * =================================================================
 * APARATO: LEDGER BRIDGE (V4.3 - OUTBOX SAFE)
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L2-APP)
 * RESPONSABILIDAD: SUMISIÓN ESPEJADA Y ENCOLADO DURABLE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MIRROR DISCIPLINE: Todo recibo se espeja en ledger_transactions
 *    por clave de deduplicación; el reintento recupera el registro
 *    original (idempotencia de superficie).
 * 2. OUTBOX ON FAULT: 'LedgerUnavailable' encola la operación intacta
 *    y marca 'ledger_pending' en el documento; la fila de aplicación
 *    jamás se revierte.
 * 3. SHADOW RE-REGISTER: Un recibo SIMULATED nunca fija el
 *    'ledger_tx_id' del documento; en su lugar encola la re-sumisión
 *    real con clave sombra y deja la promoción al drenado del Outbox.
 * 4. DETACHED CONFIRMATION: La confirmación se sondea en una tarea
 *    propia con el techo del gateway; un cliente lento jamás deja una
 *    transacción pendiente sin dueño.
 * =================================================================
 */

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use versafe_domain_models::document::{Document, DocumentState};
use versafe_domain_models::ledger::{
    build_dedup_key, LedgerRecord, LedgerTransaction, LedgerTxKind, LedgerTxStatus,
};
use versafe_domain_models::signature::Signature;
use versafe_infra_db::repositories::{DocumentRepository, LedgerTxRepository, OutboxRepository};
use versafe_infra_ledger::{
    ensure_distinct_endorsement, LedgerError, LedgerGateway, SubmissionIntent,
};

use crate::envelope::ApiFault;

/// Desenlace de una operación puente hacia el Ledger.
#[derive(Debug, Clone)]
pub struct BridgeOutcome {
    /// tx real o simulado espejado; None cuando la operación quedó
    /// encolada sin sumisión alguna.
    pub tx_id: Option<String>,
    pub block_height: Option<u64>,
    pub simulated: bool,
    /// La operación (o su sombra) espera en el Outbox durable.
    pub queued: bool,
}

#[derive(Clone)]
pub struct LedgerBridge {
    ledger_gateway: Arc<LedgerGateway>,
    ledger_tx_repository: Arc<LedgerTxRepository>,
    outbox_repository: Arc<OutboxRepository>,
    document_repository: Arc<DocumentRepository>,
}

impl LedgerBridge {
    pub fn new(
        ledger_gateway: Arc<LedgerGateway>,
        ledger_tx_repository: Arc<LedgerTxRepository>,
        outbox_repository: Arc<OutboxRepository>,
        document_repository: Arc<DocumentRepository>,
    ) -> Self {
        Self { ledger_gateway, ledger_tx_repository, outbox_repository, document_repository }
    }

    /// REGISTER del documento recién ingerido.
    #[instrument(skip(self, document), fields(document_id = %document.id))]
    pub async fn submit_register(&self, document: &Document) -> Result<BridgeOutcome, ApiFault> {
        let payload = serde_json::json!({
            "digest": document.digest_hexadecimal,
            "algo": document.digest_algorithm.as_label(),
            "owner_id": document.owner_id.to_string(),
            "file_name": document.file_name,
            "state": DocumentState::Uploaded.as_label(),
        });
        let outcome = self
            .submit_operation(&document.id, LedgerTxKind::Register, payload, None)
            .await?;

        // El tx_id del documento sólo se fija con un recibo real.
        if let (Some(tx_id), false) = (&outcome.tx_id, outcome.simulated) {
            self.document_repository
                .set_ledger_registration(&document.id, tx_id, outcome.block_height)
                .await?;
        }
        Ok(outcome)
    }

    /// STATE_UPDATE tras un avance local del retículo.
    #[instrument(skip(self, metadata))]
    pub async fn submit_state_update(
        &self,
        document_id: &Uuid,
        new_state: DocumentState,
        metadata: serde_json::Value,
    ) -> Result<BridgeOutcome, ApiFault> {
        let payload = serde_json::json!({
            "state": new_state.as_label(),
            "metadata": metadata,
        });
        self.submit_operation(document_id, LedgerTxKind::StateUpdate, payload, None).await
    }

    /// SIGNATURE: exige un endosante distinto del firmante.
    #[instrument(skip(self, signature), fields(signature_id = %signature.id))]
    pub async fn submit_record_signature(
        &self,
        signature: &Signature,
    ) -> Result<BridgeOutcome, ApiFault> {
        let payload = serde_json::json!({
            "signature_id": signature.id.to_string(),
            "document_id": signature.document_id.to_string(),
            "signer_id": signature.signer_id.to_string(),
            "signer_hash": signature.signer_hash_hexadecimal,
        });
        self.submit_operation(
            &signature.document_id,
            LedgerTxKind::Signature,
            payload,
            Some(signature.signer_id.to_string()),
        )
        .await
    }

    /// REVOKE irreversible del propietario.
    #[instrument(skip(self))]
    pub async fn submit_revoke(
        &self,
        document_id: &Uuid,
        reason: &str,
    ) -> Result<BridgeOutcome, ApiFault> {
        let payload = serde_json::json!({
            "state": DocumentState::Revoked.as_label(),
            "reason": reason,
        });
        self.submit_operation(document_id, LedgerTxKind::Revoke, payload, None).await
    }

    pub async fn query(&self, document_id: &Uuid) -> Result<LedgerRecord, LedgerError> {
        self.ledger_gateway.query(document_id).await
    }

    pub async fn history(&self, document_id: &Uuid) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.ledger_gateway.history(document_id).await
    }

    pub async fn tx_status(&self, tx_id: &str) -> Result<LedgerTxStatus, LedgerError> {
        self.ledger_gateway.tx_status(tx_id).await.map(|(status, _, _)| status)
    }

    pub async fn is_simulated(&self) -> bool {
        self.ledger_gateway.is_simulated().await
    }

    /// Núcleo de sumisión con espejado, sombra y encolado.
    async fn submit_operation(
        &self,
        document_id: &Uuid,
        kind: LedgerTxKind,
        payload: serde_json::Value,
        signer_identity: Option<String>,
    ) -> Result<BridgeOutcome, ApiFault> {
        let monotonic_seq = self
            .ledger_tx_repository
            .next_monotonic_seq(document_id, kind)
            .await?;
        let dedup_key = build_dedup_key(document_id, kind, monotonic_seq);

        let intent = SubmissionIntent {
            document_id: *document_id,
            kind,
            monotonic_seq,
            dedup_key: dedup_key.clone(),
            payload: payload.clone(),
        };

        match self.ledger_gateway.submit(&intent).await {
            Ok(receipt) => {
                if let Some(signer) = &signer_identity {
                    ensure_distinct_endorsement(&receipt.endorsements, signer)
                        .map_err(ApiFault::from)?;
                }

                let mirrored = self
                    .ledger_tx_repository
                    .insert_or_fetch_by_dedup(&LedgerTransaction {
                        tx_id: receipt.tx_id.clone(),
                        document_id: *document_id,
                        kind,
                        block_height: receipt.block_height,
                        block_hash_hexadecimal: receipt.block_hash_hexadecimal.clone(),
                        payload_hash_hexadecimal: receipt.payload_hash_hexadecimal.clone(),
                        endorsements: receipt.endorsements.clone(),
                        submitted_at: Utc::now(),
                        confirmed_at: None,
                        status: receipt.status,
                        dedup_key: dedup_key.clone(),
                    })
                    .await?;

                if receipt.simulated {
                    // Sombra de re-registro real con clave propia.
                    let shadow_key = format!("{}:shadow", dedup_key);
                    self.outbox_repository
                        .enqueue(document_id, kind, &shadow_key, &payload)
                        .await?;
                    self.document_repository.set_ledger_pending(document_id, true).await?;

                    return Ok(BridgeOutcome {
                        tx_id: Some(mirrored.tx_id),
                        block_height: None,
                        simulated: true,
                        queued: true,
                    });
                }

                self.spawn_confirmation_poller(mirrored.tx_id.clone());

                Ok(BridgeOutcome {
                    tx_id: Some(mirrored.tx_id),
                    block_height: receipt.block_height,
                    simulated: false,
                    queued: false,
                })
            }
            Err(LedgerError::Unavailable(fault_detail)) => {
                warn!(
                    "📮 [LEDGER_QUEUE]: {} for {} queued after outage: {}",
                    kind.as_label(),
                    document_id,
                    fault_detail
                );
                self.outbox_repository
                    .enqueue(document_id, kind, &dedup_key, &payload)
                    .await?;
                self.document_repository.set_ledger_pending(document_id, true).await?;

                Ok(BridgeOutcome { tx_id: None, block_height: None, simulated: false, queued: true })
            }
            Err(definitive_fault) => Err(ApiFault::from(definitive_fault)),
        }
    }

    /// Sondeo de confirmación desacoplado del deadline del cliente.
    fn spawn_confirmation_poller(&self, tx_id: String) {
        let gateway = self.ledger_gateway.clone();
        let tx_repository = self.ledger_tx_repository.clone();

        tokio::spawn(async move {
            match gateway.await_confirmation(&tx_id).await {
                Ok((LedgerTxStatus::Confirmed, block_height, block_hash)) => {
                    let sealed = tx_repository
                        .confirm(
                            &tx_id,
                            block_height.unwrap_or_default(),
                            block_hash.as_deref().unwrap_or_default(),
                        )
                        .await;
                    match sealed {
                        Ok(_) => info!("📗 [TX_CONFIRMED]: {} sealed in block.", &tx_id[0..8]),
                        Err(mirror_fault) => {
                            warn!("⚠️ [TX_MIRROR_FAULT]: {}: {}", &tx_id[0..8], mirror_fault)
                        }
                    }
                }
                Ok((LedgerTxStatus::Rejected, _, _)) => {
                    warn!("🚫 [TX_REJECTED]: {} rejected by the ledger.", &tx_id[0..8]);
                    let _ = tx_repository.reject(&tx_id).await;
                }
                Ok(_) => {
                    // Pendiente al vencer el techo: la reconciliación la
                    // hará la siguiente lectura o el relevo del Outbox.
                }
                Err(poll_fault) => {
                    warn!("⚠️ [TX_POLL_FAULT]: {}: {}", &tx_id[0..8], poll_fault);
                }
            }
        });
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/services/ledger_bridge.rs]
