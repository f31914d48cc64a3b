// [apps/gateway/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: PERIMETER GUARDS (V4.1 - DUAL CITIZENSHIP)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DE PORTADORES E INYECCIÓN DE PRINCIPAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BEARER CITIZENSHIP: Los endpoints de usuario exigen
 *    'Authorization: Bearer' verificado contra el conjunto de claves
 *    rotativo, con caché de principales acotada.
 * 2. SERVICE CITIZENSHIP: Los endpoints servicio-a-servicio exigen
 *    'X-API-Key'; la comparación es de longitud constante.
 * 3. EXTENSION INJECTION: El Principal viaja como extensión de la
 *    petición para consumo en handlers y auditoría.
 * =================================================================
 */

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::envelope::ApiFault;
use crate::state::AppState;

/**
 * Guardia de portadores: verifica el Bearer y adjunta el Principal.
 */
pub async fn bearer_auth_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header_content = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let bearer_token = match auth_header_content {
        Some(header_value) if header_value.starts_with("Bearer ") => &header_value[7..],
        _ => return ApiFault::auth().into_response(),
    };

    // 1. RUTA CALIENTE: caché de verificaciones recientes.
    if let Some(principal) = state.principal_cache.lookup(bearer_token) {
        req.extensions_mut().insert(principal);
        return next.run(req).await;
    }

    // 2. RUTA FRÍA: verificación criptográfica completa.
    match state.token_mint.verify(bearer_token) {
        Ok(principal) => {
            debug!("👤 [AUTH]: Principal {} verified.", principal.user_id);
            state.principal_cache.store(bearer_token, principal.clone());
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(identity_fault) => {
            warn!("❌ [AUTH_REJECTION]: {}", identity_fault);
            ApiFault::from(identity_fault).into_response()
        }
    }
}

/**
 * Guardia servicio-a-servicio: exige la X-API-Key interna.
 */
pub async fn api_key_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented_key = req
        .headers()
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if !constant_time_key_match(presented_key, &state.config.internal_api_key) {
        warn!("❌ [API_KEY_REJECTION]: Service credential rejected.");
        return ApiFault::auth().into_response();
    }

    next.run(req).await
}

/// Comparación por digest: longitud constante frente a timing probes.
fn constant_time_key_match(presented: &str, expected: &str) -> bool {
    let presented_digest = Sha256::digest(presented.as_bytes());
    let expected_digest = Sha256::digest(expected.as_bytes());
    presented_digest == expected_digest
}
