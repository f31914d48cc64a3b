// INICIO DEL ARCHIVO [apps/gateway/src/handlers/auth.rs]
/*!
 * =================================================================
 * APARATO: AUTH STRATUM HANDLER (V4.2 - ROTATION GUARDED)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO, LOGIN Y ROTACIÓN DE REFRESH
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. UNIFORM AUTH: Ningún fallo de login revela qué factor falló.
 * 2. REPLAY ESCALATION: El re-uso de un refresh consumido anula la
 *    sesión completa y emite evidencia de auditoría de seguridad.
 * 3. STRICT SCHEMA: Los cuerpos mutantes rechazan campos desconocidos.
 * =================================================================
 */

use axum::{extract::State, response::IntoResponse as AxumResponse, Json};
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use versafe_domain_identity::passwords::{seal_password, verify_password};
use versafe_domain_models::user::UserPublicView;
use versafe_infra_db::DbError;

use crate::envelope::{ApiEnvelope, ApiFault};
use crate::services::audit_recorder::AuditEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh: String,
}

pub struct AuthHandler;

impl AuthHandler {
    /**
     * Endpoint: POST /auth/register
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_register(
        State(application_state): State<AppState>,
        Json(request): Json<RegisterRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        if request.password.len() < 10 {
            return ApiFault::validation("password must be at least 10 characters").into_response();
        }
        if !request.email.contains('@') {
            return ApiFault::validation("email is malformed").into_response();
        }
        if request.display_name.trim().is_empty() {
            return ApiFault::validation("display name is required").into_response();
        }

        let password_hash = match seal_password(&request.password) {
            Ok(sealed) => sealed,
            Err(kdf_fault) => return ApiFault::from(kdf_fault).into_response(),
        };

        let user = match application_state
            .user_repository
            .insert_user(&request.email, &request.display_name, &password_hash)
            .await
        {
            Ok(user) => user,
            Err(DbError::DuplicateEmail) => {
                return ApiFault::conflict("email already registered").into_response()
            }
            Err(other) => return ApiFault::from(other).into_response(),
        };

        application_state.audit_recorder.record(AuditEvent {
            service: "identity-verifier".into(),
            action: "auth.register".into(),
            user_id: Some(user.id),
            resource_kind: "user".into(),
            resource_id: user.id.to_string(),
            request_meta: serde_json::json!({ "email_domain": email_domain(&user.email) }),
            status_code: 201,
            latency_milliseconds: started_at.elapsed().as_millis() as u64,
        });

        ApiEnvelope::created(UserPublicView::from(&user)).into_response()
    }

    /**
     * Endpoint: POST /auth/login
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_login(
        State(application_state): State<AppState>,
        Json(request): Json<LoginRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        // Fallo uniforme: cuenta ausente, revocada o contraseña mala
        // producen exactamente la misma respuesta.
        let user = match application_state.user_repository.fetch_by_email(&request.email).await {
            Ok(user) if !user.is_revoked => user,
            _ => return ApiFault::auth().into_response(),
        };
        if !verify_password(&request.password, &user.password_hash) {
            warn!("❌ [LOGIN_REJECTED]: credential mismatch.");
            return ApiFault::auth().into_response();
        }

        let issued_pair = match application_state.token_mint.issue(
            user.id,
            &user.email,
            &user.display_name,
        ) {
            Ok(pair) => pair,
            Err(mint_fault) => return ApiFault::from(mint_fault).into_response(),
        };

        let session_id = Uuid::new_v4();
        if let Err(session_fault) = application_state
            .session_repository
            .store_refresh(&issued_pair.refresh, &user.id, &session_id, issued_pair.refresh_expires_at)
            .await
        {
            return ApiFault::from(session_fault).into_response();
        }

        application_state.audit_recorder.record(AuditEvent {
            service: "identity-verifier".into(),
            action: "auth.login".into(),
            user_id: Some(user.id),
            resource_kind: "session".into(),
            resource_id: session_id.to_string(),
            request_meta: serde_json::json!({}),
            status_code: 200,
            latency_milliseconds: started_at.elapsed().as_millis() as u64,
        });

        info!("🔓 [LOGIN]: Session {} opened.", session_id);
        ApiEnvelope::ok(serde_json::json!({
            "token": issued_pair.token,
            "refresh": issued_pair.refresh,
            "token_expires_at": issued_pair.token_expires_at,
            "user": UserPublicView::from(&user),
        }))
        .into_response()
    }

    /**
     * Endpoint: POST /auth/refresh
     *
     * Rotación estricta: el refresh presentado se consume; presentar
     * uno ya consumido anula la sesión entera.
     */
    #[instrument(skip(application_state, request))]
    pub async fn handle_refresh(
        State(application_state): State<AppState>,
        Json(request): Json<RefreshRequest>,
    ) -> impl AxumResponse {
        let started_at = Instant::now();

        let rotation = match application_state
            .session_repository
            .consume_refresh(&request.refresh)
            .await
        {
            Ok(rotation) => rotation,
            Err(DbError::RefreshTokenReused) => {
                // Incidente de seguridad: evidencia + purga de caché.
                application_state.audit_recorder.record(AuditEvent {
                    service: "identity-verifier".into(),
                    action: "auth.refresh_reuse_detected".into(),
                    user_id: None,
                    resource_kind: "session".into(),
                    resource_id: "voided".into(),
                    request_meta: serde_json::json!({ "reason": "refresh token replay" }),
                    status_code: 401,
                    latency_milliseconds: started_at.elapsed().as_millis() as u64,
                });
                return ApiFault::security("session voided").into_response();
            }
            Err(other) => return ApiFault::from(other).into_response(),
        };

        let user = match application_state.user_repository.fetch_by_id(&rotation.user_id).await {
            Ok(user) if !user.is_revoked => user,
            _ => return ApiFault::auth().into_response(),
        };

        let issued_pair = match application_state.token_mint.issue(
            user.id,
            &user.email,
            &user.display_name,
        ) {
            Ok(pair) => pair,
            Err(mint_fault) => return ApiFault::from(mint_fault).into_response(),
        };

        if let Err(session_fault) = application_state
            .session_repository
            .store_refresh(
                &issued_pair.refresh,
                &user.id,
                &rotation.session_id,
                issued_pair.refresh_expires_at,
            )
            .await
        {
            return ApiFault::from(session_fault).into_response();
        }

        application_state.audit_recorder.record(AuditEvent {
            service: "identity-verifier".into(),
            action: "auth.refresh".into(),
            user_id: Some(user.id),
            resource_kind: "session".into(),
            resource_id: rotation.session_id.to_string(),
            request_meta: serde_json::json!({}),
            status_code: 200,
            latency_milliseconds: started_at.elapsed().as_millis() as u64,
        });

        ApiEnvelope::ok(serde_json::json!({
            "token": issued_pair.token,
            "refresh": issued_pair.refresh,
            "token_expires_at": issued_pair.token_expires_at,
        }))
        .into_response()
    }
}

/// Sólo el dominio viaja a la auditoría; el correo completo no.
fn email_domain(email: &str) -> String {
    email.split('@').nth(1).unwrap_or("unknown").to_string()
}
// FIN DEL ARCHIVO [apps/gateway/src/handlers/auth.rs]
