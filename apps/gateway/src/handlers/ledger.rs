// INICIO DEL ARCHIVO [apps/gateway/src/handlers/ledger.rs]
/*!
 * =================================================================
 * APARATO: LEDGER SERVICE HANDLER (V4.1 - S2S SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE SERVICIO-A-SERVICIO DEL GATEWAY
 *
 * Todos los endpoints de este estrato viajan bajo 'X-API-Key'. Una
 * lectura con el Ledger caído devuelve el error explícito; jamás se
 * responde con datos no autoritativos sin marcarlos.
 * =================================================================
 */

use axum::{
    extract::{Path, State},
    response::IntoResponse as AxumResponse,
    Json,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use versafe_domain_models::document::DocumentState;

use crate::envelope::{ApiEnvelope, ApiFault};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerRegisterRequest {
    pub document_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerVerifyRequest {
    pub document_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerStateRequest {
    pub document_id: Uuid,
    pub state: DocumentState,
    pub metadata: Option<serde_json::Value>,
}

pub struct LedgerServiceHandler;

impl LedgerServiceHandler {
    /**
     * Endpoint: POST /ledger/register
     * Re-sumisión administrativa del registro de un documento.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_register(
        State(application_state): State<AppState>,
        Json(request): Json<LedgerRegisterRequest>,
    ) -> impl AxumResponse {
        let document = match application_state
            .document_repository
            .fetch_by_id(&request.document_id)
            .await
        {
            Ok(document) => document,
            Err(fetch_fault) => return ApiFault::from(fetch_fault).into_response(),
        };

        match application_state.ledger_bridge().submit_register(&document).await {
            Ok(outcome) => ApiEnvelope::ok(serde_json::json!({
                "tx_id": outcome.tx_id,
                "simulated": outcome.simulated,
                "ledger_pending": outcome.queued,
            }))
            .into_response(),
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: POST /ledger/verify
     * Contraste directo Metadata Store <-> Ledger.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_verify(
        State(application_state): State<AppState>,
        Json(request): Json<LedgerVerifyRequest>,
    ) -> impl AxumResponse {
        let document = match application_state
            .document_repository
            .fetch_by_id(&request.document_id)
            .await
        {
            Ok(document) => document,
            Err(fetch_fault) => return ApiFault::from(fetch_fault).into_response(),
        };

        match application_state.ledger_bridge().query(&request.document_id).await {
            Ok(record) => {
                let digests_agree = record.digest_hexadecimal == document.digest_hexadecimal;
                ApiEnvelope::ok(serde_json::json!({
                    "match": digests_agree,
                    "simulated": record.simulated,
                    "record": record,
                }))
                .into_response()
            }
            Err(query_fault) => ApiFault::from(query_fault).into_response(),
        }
    }

    /**
     * Endpoint: PUT /ledger/state
     * Avance administrativo del retículo con reflejo en el Ledger.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_state_update(
        State(application_state): State<AppState>,
        Json(request): Json<LedgerStateRequest>,
    ) -> impl AxumResponse {
        let row_lock = application_state.document_lock(&request.document_id);
        let _guard = row_lock.lock().await;

        let transitioned = match application_state
            .document_repository
            .transition_state(&request.document_id, request.state)
            .await
        {
            Ok(document) => document,
            Err(transition_fault) => return ApiFault::from(transition_fault).into_response(),
        };

        match application_state
            .ledger_bridge()
            .submit_state_update(
                &request.document_id,
                request.state,
                request.metadata.unwrap_or_else(|| serde_json::json!({})),
            )
            .await
        {
            Ok(outcome) => ApiEnvelope::ok(serde_json::json!({
                "document": transitioned,
                "tx_id": outcome.tx_id,
                "simulated": outcome.simulated,
                "ledger_pending": outcome.queued,
            }))
            .into_response(),
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: GET /ledger/history/{document_id}
     */
    #[instrument(skip(application_state))]
    pub async fn handle_history(
        State(application_state): State<AppState>,
        Path(document_id): Path<Uuid>,
    ) -> impl AxumResponse {
        match application_state.ledger_bridge().history(&document_id).await {
            Ok(records) => ApiEnvelope::ok(records).into_response(),
            Err(history_fault) => ApiFault::from(history_fault).into_response(),
        }
    }

    /**
     * Endpoint: GET /ledger/tx/{tx_id}
     * El espejo local responde primero; el uplink resuelve lo no visto.
     */
    #[instrument(skip(application_state))]
    pub async fn handle_tx_status(
        State(application_state): State<AppState>,
        Path(tx_id): Path<String>,
    ) -> impl AxumResponse {
        if let Ok(mirrored) = application_state.ledger_tx_repository.fetch_by_tx_id(&tx_id).await {
            return ApiEnvelope::ok(mirrored).into_response();
        }

        match application_state.ledger_bridge().tx_status(&tx_id).await {
            Ok(status) => ApiEnvelope::ok(serde_json::json!({
                "tx_id": tx_id,
                "status": status.as_label(),
            }))
            .into_response(),
            Err(status_fault) => ApiFault::from(status_fault).into_response(),
        }
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/handlers/ledger.rs]
