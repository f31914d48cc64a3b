// INICIO DEL ARCHIVO [apps/gateway/src/services/outbox_relay.rs]
/*!
 * =================================================================
 * APARATO: LEDGER OUTBOX RELAY (V4.3 - FIFO DRAIN)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: DRENADO FIFO DE OPERACIONES PENDIENTES DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RESTORE FIRST: Antes de cada ciclo se re-sonda el uplink; el
 *    drenado sólo ocurre contra el Ledger real (drenar al simulador
 *    sería re-simular, no reconciliar).
 * 2. FIFO DISCIPLINE: Las entradas se consumen en orden de cola; un
 *    fallo detiene el ciclo para preservar el orden por documento.
 * 3. RECONCILIATION: Al drenar el REGISTER de un documento en
 *    REGISTRATION_PENDING, el documento recupera UPLOADED y adquiere
 *    su 'ledger_tx_id' real.
 *
 * # Mathematical Proof (Idempotent Drain):
 * Cada entrada conserva su clave de deduplicación original; un drenado
 * repetido tras un colapso colapsa en el mismo registro del Ledger.
 * =================================================================
 */

use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use versafe_domain_models::document::DocumentState;
use versafe_domain_models::ledger::{LedgerTransaction, LedgerTxKind, LedgerTxStatus};
use versafe_infra_db::repositories::OutboxEntry;
use versafe_infra_ledger::{LedgerError, SubmissionIntent};

use crate::state::AppState;

/// Ciclo de escrutinio base del relevo.
const RELAY_SCAN_INTERVAL_SECONDS: u64 = 15;
/// Tamaño de ráfaga de drenado por ciclo.
const RELAY_BATCH_MAX_SIZE: u32 = 25;

pub struct LedgerOutboxRelay {
    application_shared_state: AppState,
}

impl LedgerOutboxRelay {
    pub fn new(application_state: AppState) -> Self {
        Self { application_shared_state: application_state }
    }

    /// Bucle perpetuo de drenado en el reactor de Tokio.
    pub async fn spawn_relay_loop(self) {
        info!("📮 [OUTBOX_RELAY]: Drain engine online.");

        loop {
            sleep(Duration::from_secs(RELAY_SCAN_INTERVAL_SECONDS)).await;

            if let Err(relay_fault) = self.execute_drain_cycle().await {
                error!("❌ [OUTBOX_RELAY_FAULT]: Drain cycle failed: {}", relay_fault);
            }
        }
    }

    /// Un ciclo de drenado completo (también invocable desde opsctl).
    #[instrument(skip(self))]
    pub async fn execute_drain_cycle(&self) -> anyhow::Result<u32> {
        let state = &self.application_shared_state;

        let pending = state.outbox_repository.pending_count().await?;
        if pending == 0 {
            return Ok(0);
        }

        // El drenado exige el Ledger real: re-sonda y aborta si sigue caído.
        if !state.ledger_gateway.try_restore_uplink().await {
            debug!("📮 [OUTBOX_RELAY]: Uplink still down, {} entr(ies) waiting.", pending);
            return Ok(0);
        }

        let batch = state
            .outbox_repository
            .fetch_pending_batch(RELAY_BATCH_MAX_SIZE)
            .await?;
        let mut drained_count = 0u32;

        for entry in batch {
            match self.drain_single_entry(&entry).await {
                Ok(()) => {
                    state.outbox_repository.mark_flushed(entry.id).await?;
                    self.reconcile_document(&entry).await?;
                    drained_count += 1;
                }
                Err(drain_fault) => {
                    // El orden FIFO por documento exige detener el ciclo.
                    warn!(
                        "⚠️ [OUTBOX_RETRY]: Entry {} ({}) failed: {}",
                        entry.id,
                        entry.dedup_key,
                        drain_fault
                    );
                    state
                        .outbox_repository
                        .record_attempt_failure(
                            entry.id,
                            &drain_fault.to_string(),
                            state.config.outbox_max_attempts,
                        )
                        .await?;
                    break;
                }
            }
        }

        if drained_count > 0 {
            info!("📗 [OUTBOX_DRAINED]: {} entr(ies) reconciled with the ledger.", drained_count);
        }
        Ok(drained_count)
    }

    /// Somete una entrada conservando su clave de deduplicación.
    async fn drain_single_entry(&self, entry: &OutboxEntry) -> Result<(), LedgerError> {
        let state = &self.application_shared_state;

        let intent = SubmissionIntent {
            document_id: entry.document_id,
            kind: entry.kind,
            monotonic_seq: parse_seq_from_dedup_key(&entry.dedup_key),
            dedup_key: entry.dedup_key.clone(),
            payload: entry.payload_json.clone(),
        };

        let receipt = state.ledger_gateway.submit(&intent).await?;

        // Espejo local del recibo real.
        let mirror_result = state
            .ledger_tx_repository
            .insert_or_fetch_by_dedup(&LedgerTransaction {
                tx_id: receipt.tx_id.clone(),
                document_id: entry.document_id,
                kind: entry.kind,
                block_height: receipt.block_height,
                block_hash_hexadecimal: receipt.block_hash_hexadecimal.clone(),
                payload_hash_hexadecimal: receipt.payload_hash_hexadecimal.clone(),
                endorsements: receipt.endorsements.clone(),
                submitted_at: Utc::now(),
                confirmed_at: None,
                status: receipt.status,
                dedup_key: entry.dedup_key.clone(),
            })
            .await;
        if let Err(mirror_fault) = mirror_result {
            warn!("⚠️ [OUTBOX_MIRROR_FAULT]: {}", mirror_fault);
        }

        // El REGISTER drenado fija el tx real del documento (sólo si
        // su 'ledger_tx_id' sigue NULL: inmutabilidad del primero).
        if entry.kind == LedgerTxKind::Register && receipt.status != LedgerTxStatus::Simulated {
            let _ = state
                .document_repository
                .set_ledger_registration(&entry.document_id, &receipt.tx_id, receipt.block_height)
                .await;
        }

        Ok(())
    }

    /// Limpieza de banderas al agotar la cola de un documento.
    async fn reconcile_document(&self, entry: &OutboxEntry) -> anyhow::Result<()> {
        let state = &self.application_shared_state;

        if state.outbox_repository.has_pending_for_document(&entry.document_id).await? {
            return Ok(());
        }

        state.document_repository.set_ledger_pending(&entry.document_id, false).await?;

        let document = state.document_repository.fetch_by_id(&entry.document_id).await?;
        if document.state == DocumentState::RegistrationPending {
            state
                .document_repository
                .transition_state(&entry.document_id, DocumentState::Uploaded)
                .await?;
            info!("📄 [RECONCILED]: {} recovered UPLOADED after drain.", entry.document_id);
        }
        Ok(())
    }
}

/// La secuencia monótona viaja como tercer segmento de la clave
/// ('doc:KIND:seq' o 'doc:KIND:seq:shadow').
fn parse_seq_from_dedup_key(dedup_key: &str) -> u64 {
    dedup_key
        .split(':')
        .nth(2)
        .and_then(|segment| segment.parse().ok())
        .unwrap_or(1)
}

// FIN DEL ARCHIVO [apps/gateway/src/services/outbox_relay.rs]
