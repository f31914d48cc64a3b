// [apps/gateway/src/handlers/admin.rs]
/*!
 * =================================================================
 * APARATO: ADMIN STRATUM HANDLER (V4.1 - OPS SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: DIAGNÓSTICO, VERIFICACIÓN DE CADENA Y DRENADO
 * =================================================================
 */

use axum::{
    extract::State,
    response::IntoResponse as AxumResponse,
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use versafe_infra_db::repositories::AuditChainReport;

use crate::envelope::{ApiEnvelope, ApiFault};
use crate::services::outbox_relay::LedgerOutboxRelay;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditVerifyRequest {
    /// Shard concreto; ausentes ambos, se barren todos los shards.
    pub service: Option<String>,
    pub day: Option<String>,
}

pub struct AdminHandler;

impl AdminHandler {
    /**
     * Endpoint: GET /admin/diagnostics
     */
    #[instrument(skip(application_state))]
    pub async fn handle_diagnostics(
        State(application_state): State<AppState>,
    ) -> impl AxumResponse {
        let outbox_depth = application_state
            .outbox_repository
            .pending_count()
            .await
            .unwrap_or(u64::MAX);
        let notifications_pending = application_state
            .notification_repository
            .pending_count()
            .await
            .unwrap_or(u64::MAX);
        let database_reachable = application_state.database_client.get_connection().is_ok();

        ApiEnvelope::ok(serde_json::json!({
            "database_reachable": database_reachable,
            "ledger_simulated": application_state.ledger_gateway.is_simulated().await,
            "outbox_pending": outbox_depth,
            "notifications_pending": notifications_pending,
            "enrolled_signers": application_state.key_vault.read().await.enrolled_count(),
        }))
        .into_response()
    }

    /**
     * Endpoint: POST /admin/audit/verify
     *
     * Re-verifica la cadena de los shards pedidos (o de todos) y
     * devuelve el primer eslabón roto por shard si existe.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_audit_verify(
        State(application_state): State<AppState>,
        Json(request): Json<AuditVerifyRequest>,
    ) -> impl AxumResponse {
        let target_shards = match (&request.service, &request.day) {
            (Some(service), Some(day)) => vec![(service.clone(), day.clone())],
            _ => match application_state.audit_repository.list_shards().await {
                Ok(shards) => shards,
                Err(list_fault) => return ApiFault::from(list_fault).into_response(),
            },
        };

        let mut shard_reports = Vec::new();
        let mut chain_intact = true;

        for (service, day) in target_shards {
            match application_state.audit_repository.verify_chain(&service, &day).await {
                Ok(AuditChainReport::Intact { record_count }) => {
                    shard_reports.push(serde_json::json!({
                        "service": service,
                        "day": day,
                        "intact": true,
                        "records": record_count,
                    }));
                }
                Ok(AuditChainReport::Broken { first_broken_index }) => {
                    chain_intact = false;
                    shard_reports.push(serde_json::json!({
                        "service": service,
                        "day": day,
                        "intact": false,
                        "first_broken_index": first_broken_index,
                    }));
                }
                Err(verify_fault) => return ApiFault::from(verify_fault).into_response(),
            }
        }

        if !chain_intact {
            // Un eslabón roto es un evento de integridad detectable.
            return (
                axum::http::StatusCode::CONFLICT,
                axum::Json(serde_json::json!({
                    "success": false,
                    "error": { "kind": "INTEGRITY", "detail": "audit chain broken" },
                    "data": { "shards": shard_reports },
                })),
            )
                .into_response();
        }

        ApiEnvelope::ok(serde_json::json!({ "shards": shard_reports })).into_response()
    }

    /**
     * Endpoint: POST /admin/outbox/drain
     * Dispara un ciclo de drenado inmediato fuera de cadencia.
     */
    #[instrument(skip(application_state))]
    pub async fn handle_outbox_drain(
        State(application_state): State<AppState>,
    ) -> impl AxumResponse {
        let relay = LedgerOutboxRelay::new(application_state.clone());
        match relay.execute_drain_cycle().await {
            Ok(drained) => {
                let remaining = application_state
                    .outbox_repository
                    .pending_count()
                    .await
                    .unwrap_or_default();
                ApiEnvelope::ok(serde_json::json!({
                    "drained": drained,
                    "remaining": remaining,
                }))
                .into_response()
            }
            Err(_) => ApiFault::internal().into_response(),
        }
    }
}
