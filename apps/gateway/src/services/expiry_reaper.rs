// [apps/gateway/src/services/expiry_reaper.rs]
/*!
 * =================================================================
 * APARATO: EXPIRY REAPER DAEMON (V2.2 - LOCK SERIALIZED)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: BARRIDO ACTIVO DE VENTANAS DE VALIDEZ VENCIDAS
 *
 * La expiración también se impone perezosamente en lectura; este
 * daemon cubre los documentos que nadie consulta. Cada transición se
 * ejecuta dentro de la sección crítica del documento: el repositorio
 * sólo entrega candidatos, y el estado se re-chequea bajo el candado
 * antes de avanzar por la guardia monotónica.
 * =================================================================
 */

use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};
use versafe_domain_models::document::DocumentState;

use crate::state::AppState;

/// Cadencia del barrido de expiración.
const REAPER_SCAN_INTERVAL_SECONDS: u64 = 60;

pub struct ExpiryReaper {
    application_shared_state: AppState,
}

impl ExpiryReaper {
    pub fn new(application_state: AppState) -> Self {
        Self { application_shared_state: application_state }
    }

    pub async fn spawn_reaper_loop(self) {
        info!("⏳ [EXPIRY_REAPER]: Sweep daemon online.");

        loop {
            sleep(Duration::from_secs(REAPER_SCAN_INTERVAL_SECONDS)).await;

            if let Err(sweep_fault) = self.execute_sweep().await {
                error!("❌ [REAPER_FAULT]: Sweep failed: {}", sweep_fault);
            }
        }
    }

    /// Un barrido completo (también invocable desde opsctl).
    #[instrument(skip(self))]
    pub async fn execute_sweep(&self) -> anyhow::Result<u32> {
        let state = &self.application_shared_state;
        let past_due = state.document_repository.list_past_due(Utc::now()).await?;

        let mut expired_count = 0u32;
        for document_id in past_due {
            // SECCIÓN CRÍTICA POR DOCUMENTO: una firma o revocación en
            // vuelo gana o pierde el candado completa, nunca a medias.
            let row_lock = state.document_lock(&document_id);
            let _guard = row_lock.lock().await;

            // Re-chequeo bajo el candado: el documento pudo alcanzar un
            // sumidero (o renovar su ventana) mientras esperábamos.
            let document = match state.document_repository.fetch_by_id(&document_id).await {
                Ok(document) => document,
                Err(_) => continue,
            };
            if document.state.is_terminal() || !document.is_past_expiry(Utc::now()) {
                debug!("⏳ [REAPER_SKIP]: {} no longer eligible.", document_id);
                continue;
            }

            if state
                .document_repository
                .transition_state(&document_id, DocumentState::Expired)
                .await
                .is_err()
            {
                continue;
            }
            expired_count += 1;

            // El Ledger refleja el cierre de la ventana; un fallo aquí
            // se encola vía puente sin revertir la expiración local.
            let _ = state
                .ledger_bridge()
                .submit_state_update(
                    &document_id,
                    DocumentState::Expired,
                    serde_json::json!({ "swept_at": Utc::now().to_rfc3339() }),
                )
                .await;
        }

        if expired_count > 0 {
            info!("⏳ [EXPIRY_SWEEP]: {} document(s) expired.", expired_count);
        }
        Ok(expired_count)
    }
}
