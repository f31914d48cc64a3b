// INICIO DEL ARCHIVO [apps/gateway/src/routes.rs]
/*!
 * =================================================================
 * APARATO: ROUTING MATRIX (V4.2 - PERIMETER LAYERED)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TOPOLOGÍA HTTP VERSIONADA DEL NÚCLEO
 *
 * VISION HIPER-HOLÍSTICA:
 * Tres ciudadanías sobre la misma topología:
 * 1. PÚBLICA: /auth/ * (registro, login, rotación).
 * 2. PORTADOR: documentos, firmas y verificación tras el Bearer guard.
 * 3. SERVICIO: /ledger/ * y /admin/ * tras la X-API-Key interna.
 * =================================================================
 */

use crate::handlers::{
    admin::AdminHandler, auth::AuthHandler, documents::DocumentHandler,
    ledger::LedgerServiceHandler, signatures::SignatureHandler,
    verification::VerificationHandler,
};
use crate::middleware::{api_key_guard, bearer_auth_guard};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_core_router(application_shared_state: AppState) -> Router {
    // Escudo de red para el front-end y herramientas de Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // El tope duro del cuerpo supera en holgura el cap de subida; la
    // frontera exacta la impone la validación de ingesta.
    let body_ceiling =
        DefaultBodyLimit::max((application_shared_state.config.max_upload_bytes as usize) + 1_048_576);

    // ESTRATO PÚBLICO: identidad.
    let auth_stratum = Router::new()
        .route("/register", post(AuthHandler::handle_register))
        .route("/login", post(AuthHandler::handle_login))
        .route("/refresh", post(AuthHandler::handle_refresh));

    // ESTRATO PORTADOR: documentos.
    let document_stratum = Router::new()
        .route("/upload", post(DocumentHandler::handle_upload))
        .route("/", get(DocumentHandler::handle_list))
        .route("/shared", get(DocumentHandler::handle_list_shared))
        .route("/:id", get(DocumentHandler::handle_get).patch(DocumentHandler::handle_patch))
        .route("/:id/revoke", post(DocumentHandler::handle_revoke))
        .route("/:id/download", get(DocumentHandler::handle_download))
        .route("/:id/share", post(DocumentHandler::handle_share));

    // ESTRATO PORTADOR: firmas.
    let signature_stratum = Router::new()
        .route("/enroll", post(SignatureHandler::handle_enroll))
        .route("/:document_id/sign", post(SignatureHandler::handle_sign))
        .route("/:document_id/image", post(SignatureHandler::handle_upload_signature_image))
        .route("/document/:document_id", get(SignatureHandler::handle_list_for_document))
        .route("/:id/verify", post(SignatureHandler::handle_verify));

    // ESTRATO PORTADOR: verificación.
    let verification_stratum = Router::new()
        .route("/:document_id/verify", post(VerificationHandler::handle_verify_document))
        .route("/:document_id/history", get(VerificationHandler::handle_history));

    // ESTRATO SERVICIO: gateway del Ledger.
    let ledger_stratum = Router::new()
        .route("/register", post(LedgerServiceHandler::handle_register))
        .route("/verify", post(LedgerServiceHandler::handle_verify))
        .route("/state", put(LedgerServiceHandler::handle_state_update))
        .route("/history/:document_id", get(LedgerServiceHandler::handle_history))
        .route("/tx/:tx_id", get(LedgerServiceHandler::handle_tx_status));

    // ESTRATO SERVICIO: administración.
    let admin_stratum = Router::new()
        .route("/diagnostics", get(AdminHandler::handle_diagnostics))
        .route("/audit/verify", post(AdminHandler::handle_audit_verify))
        .route("/outbox/drain", post(AdminHandler::handle_outbox_drain));

    // COMPOSICIÓN GLOBAL (Root Topology).
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest(
            "/api/v1",
            Router::new()
                .nest("/auth", auth_stratum)
                .nest(
                    "/documents",
                    document_stratum.layer(middleware::from_fn_with_state(
                        application_shared_state.clone(),
                        bearer_auth_guard,
                    )),
                )
                .nest(
                    "/signatures",
                    signature_stratum.layer(middleware::from_fn_with_state(
                        application_shared_state.clone(),
                        bearer_auth_guard,
                    )),
                )
                .nest(
                    "/verification",
                    verification_stratum.layer(middleware::from_fn_with_state(
                        application_shared_state.clone(),
                        bearer_auth_guard,
                    )),
                )
                .nest(
                    "/ledger",
                    ledger_stratum.layer(middleware::from_fn_with_state(
                        application_shared_state.clone(),
                        api_key_guard,
                    )),
                )
                .nest(
                    "/admin",
                    admin_stratum.layer(middleware::from_fn_with_state(
                        application_shared_state.clone(),
                        api_key_guard,
                    )),
                ),
        )
        .layer(body_ceiling)
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
// FIN DEL ARCHIVO [apps/gateway/src/routes.rs]
