// INICIO DEL ARCHIVO [apps/gateway/src/handlers/documents.rs]
/*!
 * =================================================================
 * APARATO: DOCUMENT STRATUM HANDLER (V4.3 - INGEST SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE HTTP DE INGESTA Y CICLO DE VIDA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MULTIPART DISCIPLINE: La subida viaja como multipart con campos
 *    nominales ('document', 'title', 'security_level', ...).
 * 2. STRICT PATCH: El parche rechaza campos desconocidos; los listados
 *    toleran parámetros extra (contrato de consulta laxa).
 * 3. AUDIT EVERY MUTATION: Cada operación mutante emite su evento al
 *    daemon de auditoría con la latencia observada.
 * =================================================================
 */

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse as AxumResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Deserialize;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

use versafe_domain_identity::Principal;
use versafe_domain_models::document::{DocumentState, SecurityLevel};
use versafe_domain_models::share::{AccessLevel, ShareGrant};
use versafe_infra_db::repositories::DocumentListFilter;

use crate::envelope::{ApiEnvelope, ApiFault};
use crate::services::audit_recorder::AuditEvent;
use crate::services::ingest::{DocumentIngestService, UploadRequest};
use crate::state::AppState;

/// Parámetros tolerantes del listado (contrato de consulta laxa).
#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub state: Option<String>,
    pub security_level: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchDocumentRequest {
    pub title: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevokeDocumentRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareDocumentRequest {
    pub grantee_email: String,
    pub access: AccessLevel,
    pub expires_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

pub struct DocumentHandler;

impl DocumentHandler {
    /**
     * Endpoint: POST /documents/upload (multipart)
     */
    #[instrument(skip(application_state, multipart))]
    pub async fn handle_upload(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        mut multipart: Multipart,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        let mut title = None;
        let mut security_level = SecurityLevel::Low;
        let mut signatures_required = None;
        let mut expires_at = None;
        let mut file_name = None;
        let mut media_type = None;
        let mut content: Option<Vec<u8>> = None;

        // Extracción nominal de los campos multipart.
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(_) => return ApiFault::validation("multipart stream malformed").into_response(),
            };

            match field.name().unwrap_or_default() {
                "document" => {
                    file_name = field.file_name().map(|f| f.to_string());
                    media_type = field.content_type().map(|c| c.to_string());
                    content = match field.bytes().await {
                        Ok(bytes) => Some(bytes.to_vec()),
                        Err(_) => {
                            return ApiFault::validation("document part unreadable").into_response()
                        }
                    };
                }
                "title" => title = field.text().await.ok(),
                "security_level" => {
                    let raw = field.text().await.unwrap_or_default();
                    security_level = match SecurityLevel::from_label(&raw) {
                        Some(level) => level,
                        None => {
                            return ApiFault::validation("unknown security level").into_response()
                        }
                    };
                }
                "signatures_required" => {
                    let raw = field.text().await.unwrap_or_default();
                    signatures_required = match raw.parse::<u32>() {
                        Ok(count) if count >= 1 => Some(count),
                        _ => {
                            return ApiFault::validation("signatures_required must be >= 1")
                                .into_response()
                        }
                    };
                }
                "expires_at" => {
                    let raw = field.text().await.unwrap_or_default();
                    expires_at = match DateTime::parse_from_rfc3339(&raw) {
                        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                        Err(_) => {
                            return ApiFault::validation("expires_at must be RFC 3339")
                                .into_response()
                        }
                    };
                }
                // Campos desconocidos del multipart se ignoran.
                _ => {}
            }
        }

        let (Some(content), Some(file_name)) = (content, file_name) else {
            return ApiFault::validation("'document' part is required").into_response();
        };

        let request = UploadRequest {
            title: title.unwrap_or_else(|| file_name.clone()),
            file_name,
            media_type: media_type.unwrap_or_else(|| "application/octet-stream".into()),
            security_level,
            signatures_required,
            expires_at,
            content,
        };

        let ingest = DocumentIngestService::new(application_state.clone());
        match ingest.upload(&principal, request).await {
            Ok(view) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "document-ingest".into(),
                    action: "document.upload".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "document".into(),
                    resource_id: view.document.id.to_string(),
                    request_meta: serde_json::json!({
                        "security_level": view.document.security_level.as_label(),
                        "size_bytes": view.document.size_bytes,
                        "simulated": view.simulated,
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
     * Endpoint: GET /documents?page&limit&state&security_level
     */
    #[instrument(skip(application_state))]
    pub async fn handle_list(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Query(query): Query<ListDocumentsQuery>,
    ) -> impl AxumResponse {
        let filter = DocumentListFilter {
            state: query.state.as_deref().and_then(DocumentState::from_label),
            security_level: query.security_level.as_deref().and_then(SecurityLevel::from_label),
        };

        let ingest = DocumentIngestService::new(application_state);
        match ingest.list(&principal, filter, query.page, query.limit).await {
            Ok((page_items, total)) => ApiEnvelope::ok(serde_json::json!({
                "documents": page_items,
                "total": total,
                "page": query.page,
                "limit": query.limit,
            }))
            .into_response(),
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: GET /documents/{id}
     */
    #[instrument(skip(application_state))]
    pub async fn handle_get(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
    ) -> impl AxumResponse {
        let ingest = DocumentIngestService::new(application_state);
        match ingest.get(&principal, &document_id).await {
            Ok(document) => ApiEnvelope::ok(document).into_response(),
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: PATCH /documents/{id}
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_patch(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
        Json(request): Json<PatchDocumentRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();
        let ingest = DocumentIngestService::new(application_state.clone());

        match ingest
            .update(&principal, &document_id, request.title, request.expires_at)
            .await
        {
            Ok(document) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "document-ingest".into(),
                    action: "document.update".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "document".into(),
                    resource_id: document_id.to_string(),
                    request_meta: serde_json::json!({}),
                    status_code: 200,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                ApiEnvelope::ok(document).into_response()
            }
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: POST /documents/{id}/revoke
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_revoke(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
        Json(request): Json<RevokeDocumentRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();
        let ingest = DocumentIngestService::new(application_state.clone());

        match ingest.revoke(&principal, &document_id, &request.reason).await {
            Ok(view) => {
                application_state.audit_recorder.record(AuditEvent {
                    service: "document-ingest".into(),
                    action: "document.revoke".into(),
                    user_id: Some(principal.user_id),
                    resource_kind: "document".into(),
                    resource_id: document_id.to_string(),
                    request_meta: serde_json::json!({ "reason": request.reason }),
                    status_code: 200,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                ApiEnvelope::ok(view).into_response()
            }
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: GET /documents/{id}/download
     */
    #[instrument(skip(application_state))]
    pub async fn handle_download(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
    ) -> impl AxumResponse {
        let ingest = DocumentIngestService::new(application_state);
        match ingest.download(&principal, &document_id).await {
            Ok((document, content)) => (
                [
                    (header::CONTENT_TYPE, document.media_type.clone()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", document.file_name),
                    ),
                ],
                content,
            )
                .into_response(),
            Err(fault) => fault.into_response(),
        }
    }

    /**
     * Endpoint: POST /documents/{id}/share
     *
     * Una concesión jamás eleva por encima del otorgante: sólo el
     * propietario concede, y el nivel EDIT exige documento no terminal.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_share(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
        Path(document_id): Path<Uuid>,
        Json(request): Json<ShareDocumentRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        if !request.grantee_email.contains('@') {
            return ApiFault::validation("grantee email is malformed").into_response();
        }

        let ingest = DocumentIngestService::new(application_state.clone());
        let document = match ingest.owned_document(&principal, &document_id).await {
            Ok(document) => document,
            Err(fault) => return fault.into_response(),
        };

        if document.state.is_terminal() && request.access == AccessLevel::Edit {
            return ApiFault::conflict("cannot grant EDIT on a terminal document").into_response();
        }

        let grant = ShareGrant {
            id: Uuid::new_v4(),
            document_id,
            granter_id: principal.user_id,
            grantee_email: request.grantee_email.clone(),
            access: request.access,
            token: {
                let mut token_material = [0u8; 24];
                rand::thread_rng().fill_bytes(&mut token_material);
                hex::encode(token_material)
            },
            uses_remaining: 1,
            expires_at: request.expires_at,
            message: request.message,
            created_at: Utc::now(),
        };

        if let Err(share_fault) = application_state.share_repository.insert_grant(&grant).await {
            return ApiFault::from(share_fault).into_response();
        }

        let _ = application_state
            .notification_repository
            .enqueue(
                None,
                &request.grantee_email,
                "document.shared",
                &serde_json::json!({
                    "document_id": document_id.to_string(),
                    "access": grant.access.as_label(),
                }),
            )
            .await;

        application_state.audit_recorder.record(AuditEvent {
            service: "document-ingest".into(),
            action: "document.share".into(),
            user_id: Some(principal.user_id),
            resource_kind: "share".into(),
            resource_id: grant.id.to_string(),
            request_meta: serde_json::json!({ "access": grant.access.as_label() }),
            status_code: 201,
            latency_milliseconds: started_at.elapsed().as_millis() as u64,
        });

        ApiEnvelope::created(grant).into_response()
    }

    /**
     * Endpoint: GET /documents/shared
     */
    #[instrument(skip(application_state))]
    pub async fn handle_list_shared(
        State(application_state): State<AppState>,
        Extension(principal): Extension<Principal>,
    ) -> impl AxumResponse {
        match application_state.share_repository.list_for_grantee(&principal.email).await {
            Ok(grants) => ApiEnvelope::ok(grants).into_response(),
            Err(share_fault) => ApiFault::from(share_fault).into_response(),
        }
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/handlers/documents.rs]
