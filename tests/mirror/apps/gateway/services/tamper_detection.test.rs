// [tests/mirror/apps/gateway/services/tamper_detection.test.rs]
/**
 * =================================================================
 * APARATO: TAMPER DETECTION TEST (V4.0 - SCENARIO S5)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-APP MIRROR
 * RESPONSABILIDAD: DIGEST_MISMATCH, CUARENTENA Y EVIDENCIA DE SEGURIDAD
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
use versafe_domain_models::verification::VerificationOutcome;
use versafe_gateway::bootstrap::CoreConfig;
use versafe_gateway::services::{
    build_audit_recorder, DocumentIngestService, UploadRequest, VerificationService,
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

async fn fabric_query(
    AxState(registry): AxState<FabricRegistry>,
    AxPath((_, _, document_id)): AxPath<(String, String, String)>,
) -> Result<Json<serde_json::Value>, axum::http::StatusCode> {
    registry
        .records
        .lock()
        .unwrap()
        .get(&document_id)
        .cloned()
        .map(Json)
        .ok_or(axum::http::StatusCode::NOT_FOUND)
}

async fn spawn_mock_fabric() -> String {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/submit", post(fabric_submit))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/tx/:tx_id", get(fabric_tx_status))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/documents/:id", get(fabric_query))
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

#[tokio::test]
async fn certify_tampered_bytes_quarantine_the_document() {
    println!("\n🧪 [PROVING_GROUNDS]: Scenario S5 — tamper detection...");

    let fabric_url = spawn_mock_fabric().await;
    let (state, workspace) = ignite_core("mem_e2e_s5", fabric_url).await;

    let owner = Principal {
        user_id: Uuid::new_v4(),
        email: "alice@versafe.io".into(),
        display_name: "Alice".into(),
        token_expires_at: Utc::now() + chrono::Duration::hours(1),
    };

    let ingest = DocumentIngestService::new(state.clone());
    let view = ingest
        .upload(
            &owner,
            UploadRequest {
                title: "Original íntegro".into(),
                file_name: "pristine.txt".into(),
                media_type: "text/plain".into(),
                security_level: SecurityLevel::Low,
                signatures_required: Some(1),
                expires_at: None,
                content: b"pristine content".to_vec(),
            },
        )
        .await
        .unwrap();

    // Sobrescritura hostil de los bytes almacenados.
    let stored_path = workspace.path().join(&view.document.storage_ref);
    std::fs::write(&stored_path, b"tampered content!!").unwrap();

    let verifier = VerificationService::new(state.clone());
    let verdict = verifier.verify_document(&owner, &view.document.id).await.unwrap();
    assert_eq!(verdict.outcome, VerificationOutcome::DigestMismatch);
    assert_eq!(verdict.document_state, Some(DocumentState::Quarantined));

    // La cuarentena retira el documento de las vistas del propietario.
    let (listed, total) = state
        .document_repository
        .list_for_owner(&owner.user_id, &Default::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(listed.is_empty());

    // Evidencia de seguridad sellada por el daemon de auditoría.
    let mut security_audit_found = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let shard_day = Utc::now().format("%Y-%m-%d").to_string();
        let shard = state
            .audit_repository
            .fetch_shard("verification-service", &shard_day)
            .await
            .unwrap();
        if shard.iter().any(|record| record.action == "verify.digest_mismatch") {
            security_audit_found = true;
            break;
        }
    }
    assert!(security_audit_found, "digest mismatch must leave security evidence");

    // El evento DIGEST_MISMATCH quedó en el historial append-only.
    let events = verifier.history(&view.document.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, VerificationOutcome::DigestMismatch);
    assert!(!events[0].verified);

    println!("   ✅ [SUCCESS]: S5 quarantine and evidence certified.");
}
