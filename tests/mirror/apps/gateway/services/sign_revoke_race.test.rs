// [tests/mirror/apps/gateway/services/sign_revoke_race.test.rs]
/**
 * =================================================================
 * APARATO: SIGN/REVOKE RACE TEST (V4.0 - PROPERTY 10)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-APP MIRROR
 * RESPONSABILIDAD: LINEALIZACIÓN POR CANDADO DE FILA DOCUMENTAL
 *
 * Propiedad: en ninguna intercalación queda una firma persistida
 * contra un documento REVOKED. O la firma gana (y la revocación la
 * sigue), o la firma colisiona con Conflict sobre el estado REVOKED.
 * =================================================================
 */

use axum::extract::{Path as AxPath, State as AxState};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use versafe_core_signer::KeyVault;
use versafe_domain_identity::{Principal, SigningKeySet};
use versafe_domain_models::document::{DocumentState, SecurityLevel};
use versafe_domain_models::signature::SignatureKind;
use versafe_gateway::bootstrap::CoreConfig;
use versafe_gateway::envelope::FaultKind;
use versafe_gateway::services::{
    build_audit_recorder, DocumentIngestService, SignatureEngineService, UploadRequest,
};
use versafe_gateway::state::AppState;
use versafe_infra_db::repositories::AuditRepository;
use versafe_infra_db::MetadataStoreClient;
use versafe_infra_ledger::{LedgerGateway, LedgerGatewayConfig};

#[derive(Clone, Default)]
struct FabricRegistry {
    records: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

async fn fabric_submit(
    AxState(registry): AxState<FabricRegistry>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let tx_id = Uuid::new_v4().to_string();
    if body["function"] == "REGISTER" {
        let document_id = body["document_id"].as_str().unwrap_or_default().to_string();
        registry
            .records
            .lock()
            .unwrap()
            .insert(document_id, serde_json::json!({ "tx_id": tx_id }));
    }
    Json(serde_json::json!({
        "tx_id": tx_id,
        "endorsements": [{ "identity": "peer0-versafe", "signature": "aa" }],
        "block_height": 1,
        "block_hash": "beefcafe",
    }))
}

async fn fabric_tx_status(
    AxPath((_, _, _tx)): AxPath<(String, String, String)>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "CONFIRMED", "block_height": 1, "block_hash": "beefcafe" }))
}

async fn spawn_mock_fabric() -> String {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/submit", post(fabric_submit))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/tx/:tx_id", get(fabric_tx_status))
        .with_state(FabricRegistry::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    base_url
}

async fn ignite_core(db_tag: &str, ledger_ca_url: String) -> (AppState, tempfile::TempDir) {
    let workspace = tempfile::tempdir().expect("tempdir");
    let upload_dir = workspace.path().to_path_buf();
    let config = CoreConfig {
        database_url: "harness".into(),
        database_auth_token: None,
        redis_url: None,
        ledger_channel: "versafe-channel".into(),
        ledger_chaincode: "document-integrity".into(),
        ledger_msp_id: "VerSafeMSP".into(),
        ledger_wallet_path: "./wallet".into(),
        ledger_ca_url: ledger_ca_url.clone(),
        signing_key_store: upload_dir.join("vault.sealed"),
        internal_api_key: "internal-service-credential-0123".into(),
        token_signing_key_set: r#"{"kid-2026a": "alpha-secret-material-0123456789"}"#.into(),
        token_ttl: chrono::Duration::seconds(900),
        refresh_ttl: chrono::Duration::days(14),
        upload_dir,
        max_upload_bytes: 1_048_576,
        allowed_media_types: vec!["text/plain".into()],
        scanner_url: "http://127.0.0.1:1".into(),
        scanner_timeout: std::time::Duration::from_millis(200),
        outbox_max_attempts: 3,
        outbox_base_backoff: std::time::Duration::from_millis(10),
        listening_port: 0,
        biometric_confidence_threshold: 0.9,
    };

    let database_client = MetadataStoreClient::connect(
        &format!("file::{}?mode=memory&cache=shared", db_tag),
        None,
    )
    .await
    .unwrap();

    let ledger_gateway = LedgerGateway::ignite(LedgerGatewayConfig {
        channel: config.ledger_channel.clone(),
        chaincode: config.ledger_chaincode.clone(),
        msp_identity: config.ledger_msp_id.clone(),
        wallet_path: config.ledger_wallet_path.clone(),
        ca_url: ledger_ca_url,
        endorsement_quorum: 1,
        max_attempts: 2,
        base_backoff: std::time::Duration::from_millis(10),
        confirm_deadline: std::time::Duration::from_secs(2),
    })
    .await;

    let (audit_handle, audit_daemon) = build_audit_recorder(
        Arc::new(AuditRepository::new(database_client.clone())),
        config.upload_dir.join(".audit_buffer.jsonl"),
    );
    tokio::spawn(async move { audit_daemon.spawn_sealing_loop().await });

    let key_set = SigningKeySet::from_environment_value(&config.token_signing_key_set).unwrap();
    let state = AppState::new(
        config,
        database_client,
        ledger_gateway,
        KeyVault::empty(),
        key_set,
        audit_handle,
    );
    (state, workspace)
}

fn principal(email: &str, name: &str) -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        email: email.into(),
        display_name: name.into(),
        token_expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

#[tokio::test]
async fn certify_no_interleaving_persists_a_signature_on_a_revoked_document() {
    println!("\n🧪 [PROVING_GROUNDS]: Racing sign against revoke (16 rounds)...");

    let fabric_url = spawn_mock_fabric().await;
    let (state, _workspace) = ignite_core("mem_race_sr", fabric_url).await;

    let owner = principal("alice@versafe.io", "Alice");
    let signer = principal("bob@versafe.io", "Bob");

    for round_index in 0..16 {
        let ingest = DocumentIngestService::new(state.clone());
        let view = ingest
            .upload(
                &owner,
                UploadRequest {
                    title: format!("Ronda {}", round_index),
                    file_name: format!("race-{}.txt", round_index),
                    media_type: "text/plain".into(),
                    security_level: SecurityLevel::Low,
                    signatures_required: Some(1),
                    expires_at: None,
                    content: format!("race round {}", round_index).into_bytes(),
                },
            )
            .await
            .unwrap();
        let document_id = view.document.id;

        // Carrera real: ambas operaciones compiten por el candado.
        let sign_state = state.clone();
        let sign_principal = signer.clone();
        let sign_task = tokio::spawn(async move {
            SignatureEngineService::new(sign_state)
                .sign(
                    &sign_principal,
                    &document_id,
                    SignatureKind::Electronic,
                    b"text:Bob".to_vec(),
                    None,
                )
                .await
        });

        let revoke_state = state.clone();
        let revoke_principal = owner.clone();
        let revoke_task = tokio::spawn(async move {
            DocumentIngestService::new(revoke_state)
                .revoke(&revoke_principal, &document_id, "raced revoke")
                .await
        });

        let (sign_result, revoke_result) = tokio::join!(sign_task, revoke_task);
        let sign_result = sign_result.unwrap();
        let revoke_result = revoke_result.unwrap();

        // La revocación del propietario siempre triunfa.
        assert!(revoke_result.is_ok(), "revoke must always succeed");

        let final_document = state.document_repository.fetch_by_id(&document_id).await.unwrap();
        assert_eq!(final_document.state, DocumentState::Revoked);

        let persisted_signatures =
            state.signature_repository.list_for_document(&document_id).await.unwrap();

        match sign_result {
            Ok(signed_view) => {
                // La firma ganó el candado: ocurrió ANTES de la revocación.
                assert_eq!(persisted_signatures.len(), 1);
                assert_eq!(signed_view.signature.signer_id, signer.user_id);
            }
            Err(fault) => {
                // La revocación ganó: Conflict y cero firmas persistidas.
                assert_eq!(fault.kind, FaultKind::Conflict);
                assert!(
                    persisted_signatures.is_empty(),
                    "no signature may survive against a REVOKED document"
                );
            }
        }
    }

    println!("   ✅ [SUCCESS]: Property 10 held across 16 interleavings.");
}
