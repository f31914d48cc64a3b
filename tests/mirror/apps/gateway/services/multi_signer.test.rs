// [tests/mirror/apps/gateway/services/multi_signer.test.rs]
/**
 * =================================================================
 * APARATO: MULTI-SIGNER COMPLETION TEST (V4.0 - SCENARIO S2)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-APP MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE COMPLECIÓN CON DOS FIRMANTES
 *
 * Alice firma -> PARTIALLY_SIGNED; Bob firma -> SIGNED; Alice repite
 * -> AlreadySigned sin mutar el estado.
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
        let args = &body["args"];
        registry.records.lock().unwrap().insert(
            document_id.clone(),
            serde_json::json!({
                "document_id": document_id,
                "digest": args["digest"],
                "algo": args["algo"],
                "owner_id": args["owner_id"],
                "file_name": args["file_name"],
                "state": args["state"],
                "tx_id": tx_id,
                "block_height": 1,
                "recorded_at": Utc::now().to_rfc3339(),
            }),
        );
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
async fn certify_two_signer_completion_and_already_signed_conflict() {
    println!("\n🧪 [PROVING_GROUNDS]: Scenario S2 — multi-signer completion...");

    let fabric_url = spawn_mock_fabric().await;
    let (state, _workspace) = ignite_core("mem_e2e_s2", fabric_url).await;

    let alice = principal("alice@versafe.io", "Alice");
    let bob = principal("bob@versafe.io", "Bob");

    let ingest = DocumentIngestService::new(state.clone());
    let view = ingest
        .upload(
            &alice,
            UploadRequest {
                title: "Contrato bilateral".into(),
                file_name: "contract.txt".into(),
                media_type: "text/plain".into(),
                security_level: SecurityLevel::Medium,
                signatures_required: Some(2),
                expires_at: None,
                content: b"two-party agreement".to_vec(),
            },
        )
        .await
        .unwrap();

    let engine = SignatureEngineService::new(state.clone());

    // Alice firma: primer umbral parcial.
    let first = engine
        .sign(&alice, &view.document.id, SignatureKind::Electronic, b"text:Alice".to_vec(), None)
        .await
        .unwrap();
    assert_eq!(first.document_state, DocumentState::PartiallySigned);

    // Bob firma: umbral completo.
    let second = engine
        .sign(&bob, &view.document.id, SignatureKind::Electronic, b"text:Bob".to_vec(), None)
        .await
        .unwrap();
    assert_eq!(second.document_state, DocumentState::Signed);

    // Alice repite: AlreadySigned, estado intacto.
    let replay = engine
        .sign(&alice, &view.document.id, SignatureKind::Electronic, b"text:Alice".to_vec(), None)
        .await;
    let fault = replay.expect_err("duplicate signer must fail");
    assert_eq!(fault.kind, FaultKind::Conflict);
    assert_eq!(fault.detail, "AlreadySigned");

    let final_document = state.document_repository.fetch_by_id(&view.document.id).await.unwrap();
    assert_eq!(final_document.state, DocumentState::Signed);
    assert_eq!(
        state.signature_repository.count_valid_for_document(&view.document.id).await.unwrap(),
        2
    );

    println!("   ✅ [SUCCESS]: S2 completion and conflict certified.");
}
