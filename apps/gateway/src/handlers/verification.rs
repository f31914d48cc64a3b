// [apps/gateway/src/handlers/verification.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION STRATUM HANDLER (V4.1)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE HTTP DE VERIFICACIÓN BAJO DEMANDA
 * =================================================================
 */

use axum::{
    extract::{Path, State},
    response::IntoResponse as AxumResponse,
    Extension,
};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

use versafe_domain_identity::Principal;

use crate::envelope::{ApiEnvelope, ApiFault};
use crate::services::audit_recorder::AuditEvent;
use crate::services::verification::VerificationService;
use crate::state::AppState;

pub struct VerificationHandler;

impl VerificationHandler {
    /**
     * Endpoint: POST /verification/{document_id}/verify
     */
    #[instrument(skip(application_state))]
    pub async fn handle_verify_document(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();
        let service = VerificationService::new(application_state.clone());

        match service.verify_document(&principal, &document_id).await {
            Ok(result) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "verification-service".into(),
                    action: "verification.verify".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "document".into(),
                    resource_id: document_id.to_string(),
                    request_meta: serde_json::json!({ "outcome": result.outcome.as_label() }),
                    status_code: 200,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                ApiEnvelope::ok(result).into_response()
            }
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: GET /verification/{document_id}/history
     */
    #[instrument(skip(application_state))]
    pub async fn handle_history(
        State(application_state): State<AppState>,
        Path(document_id): Path<Uuid>,
    ) -> impl AxumResponse {
        let service = VerificationService::new(application_state);
        match service.history(&document_id).await {
            Ok(events) => ApiEnvelope::ok(events).into_response(),
            Err(fault) => fault.into_response(),
        }
    }
}
