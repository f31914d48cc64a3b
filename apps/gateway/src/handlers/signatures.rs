// INICIO DEL ARCHIVO [apps/gateway/src/handlers/signatures.rs]
/*!
 * =================================================================
 * APARATO: SIGNATURE STRATUM HANDLER (V4.2 - TRIAD SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE HTTP DEL MOTOR DE FIRMAS
 * =================================================================
 */

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse as AxumResponse,
    Extension, Json,
};
use base64::Engine;
use serde::Deserialize;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

use versafe_core_signer::KeySuite;
use versafe_domain_identity::Principal;
use versafe_domain_models::signature::SignatureKind;

use crate::envelope::{ApiEnvelope, ApiFault};
use crate::services::audit_recorder::AuditEvent;
use crate::services::signing::SignatureEngineService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignRequest {
    #[serde(rename = "type")]
    pub kind: SignatureKind,
    /// Payload textual; 'payload_encoding: base64' para binarios.
    pub payload: String,
    #[serde(default)]
    pub payload_encoding: PayloadEncoding,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Utf8,
    Base64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrollRequest {
    pub suite: KeySuite,
}

pub struct SignatureHandler;

impl SignatureHandler {
    /**
     * Endpoint: POST /signatures/{document_id}/sign
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_sign(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
        Json(request): Json<SignRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        let payload_bytes = match request.payload_encoding {
            PayloadEncoding::Utf8 => request.payload.into_bytes(),
            PayloadEncoding::Base64 => {
                match base64::engine::general_purpose::STANDARD.decode(&request.payload) {
                    Ok(decoded) => decoded,
                    Err(_) => {
                        return ApiFault::validation("payload is not valid base64").into_response()
                    }
                }
            }
        };

        let engine = SignatureEngineService::new(application_state.clone());
        match engine
            .sign(&principal, &document_id, request.kind, payload_bytes, request.metadata)
            .await
        {
            Ok(view) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "signature-engine".into(),
                    action: "signature.sign".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "signature".into(),
                    resource_id: view.signature.id.to_string(),
                    request_meta: serde_json::json!({
                        "kind": view.signature.kind.as_label(),
                        "document_state": view.document_state.as_label(),
                    }),
                    status_code: 201,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                ApiEnvelope::created(view).into_response()
            }
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: POST /signatures/{document_id}/image (multipart)
     * Firma ELECTRONIC dibujada.
     */
    #[instrument(skip(application_state, multipart))]
    pub async fn handle_upload_signature_image(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
        mut multipart: Multipart,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        let mut image_bytes: Option<Vec<u8>> = None;
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some("image") {
                image_bytes = field.bytes().await.ok().map(|b| b.to_vec());
            }
        }
        let Some(image_bytes) = image_bytes else {
            return ApiFault::validation("'image' part is required").into_response();
        };

        let engine = SignatureEngineService::new(application_state.clone());
        match engine.upload_signature_image(&principal, &document_id, image_bytes).await {
            Ok(view) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "signature-engine".into(),
                    action: "signature.image_upload".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "signature".into(),
                    resource_id: view.signature.id.to_string(),
                    request_meta: serde_json::json!({}),
                    status_code: 201,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                ApiEnvelope::created(view).into_response()
            }
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: GET /signatures/document/{document_id}
     */
    #[instrument(skip(application_state))]
    pub async fn handle_list_for_document(
        State(application_state): State<AppState>,
        Path(document_id): Path<Uuid>,
    ) -> impl AxumResponse {
        let engine = SignatureEngineService::new(application_state);
        match engine.list(&document_id).await {
            Ok(signatures) => ApiEnvelope::ok(signatures).into_response(),
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: POST /signatures/{id}/verify
     */
    #[instrument(skip(application_state))]
    pub async fn handle_verify(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(signature_id): Path<Uuid>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();
        let engine = SignatureEngineService::new(application_state.clone());

        match engine.verify(&signature_id).await {
            Ok(result) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "signature-engine".into(),
                    action: "signature.verify".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "signature".into(),
                    resource_id: signature_id.to_string(),
                    request_meta: serde_json::json!({ "verified": result.verified }),
                    status_code: 200,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                ApiEnvelope::ok(result).into_response()
            }
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: POST /signatures/enroll
     *
     * Enrola un par de claves de la suite elegida para el principal y
     * sella la bóveda write-through al almacén externo.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_enroll(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Json(request): Json<EnrollRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        // Keygen (RSA en particular) en el pool CPU acotado.
        let permit = match application_state.compute_pool.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return ApiFault::internal().into_response(),
        };

        let store_path = application_state.config.signing_key_store.clone();
        let sealing_phrase = application_state.config.internal_api_key.clone();
        let vault = application_state.key_vault.clone();
        let suite = request.suite;
        let signer_id = principal.user_id;

        let enrollment_result = tokio::task::spawn_blocking(move || {
            let _held_permit = permit;
            let mut vault_guard = vault.blocking_write();
            if vault_guard.is_enrolled(&signer_id) {
                return Err(ApiFault::conflict("signer already enrolled"));
            }
            let certificate = vault_guard
                .enroll_signer(signer_id, suite)
                .map(|material| material.certificate.clone())
                .map_err(ApiFault::from)?;
            vault_guard
                .seal_to(&store_path, &sealing_phrase)
                .map_err(ApiFault::from)?;
            Ok(certificate)
        })
        .await;

        let certificate = match enrollment_result {
            Ok(Ok(certificate)) => certificate,
            Ok(Err(fault)) => return fault.into_response(),
            Err(_) => return ApiFault::internal().into_response(),
        };

        application_state.audit_recorder.record(AuditEvent {
            service: "signature-engine".into(),
            action: "signature.enroll".into(),
            user_id: Some(principal.user_id),
            resource_kind: "key_material".into(),
            resource_id: certificate.serial.to_string(),
            request_meta: serde_json::json!({ "suite": suite.verification_method() }),
            status_code: 201,
            latency_milliseconds: started_at.elapsed().as_millis() as u64,
        });

        ApiEnvelope::created(certificate).into_response()
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/handlers/signatures.rs]
