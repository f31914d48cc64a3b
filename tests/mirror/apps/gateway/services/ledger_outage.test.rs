// [tests/mirror/apps/gateway/services/ledger_outage.test.rs]
/**
 * =================================================================
 * APARATO: LEDGER OUTAGE TEST (V4.0 - SCENARIO S4)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-APP MIRROR
 * RESPONSABILIDAD: SUBIDA DURANTE APAGÓN Y RECONCILIACIÓN POR OUTBOX
 *
 * Con el Ledger caído la subida responde con 'ledger_pending' y deja
 * el registro en el Outbox; al volver el Ledger, el relevo drena y el
 * documento adquiere su 'ledger_tx_id' real.
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
use versafe_gateway::bootstrap::CoreConfig;
use versafe_gateway::services::{
    build_audit_recorder, DocumentIngestService, LedgerOutboxRelay, UploadRequest,
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
        "block_height": 3,
        "block_hash": "beefcafe",
    }))
}

async fn fabric_tx_status(
    AxPath((_, _, _tx)): AxPath<(String, String, String)>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "CONFIRMED", "block_height": 3, "block_hash": "beefcafe" }))
}

/// Levanta el Fabric sintético sobre un puerto ya conocido (la
/// "reactivación" del Ledger tras el apagón).
async fn spawn_mock_fabric_on(listener: tokio::net::TcpListener) {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/submit", post(fabric_submit))
        .route("/api/v1/channels/:channel/chaincodes/:chaincode/tx/:tx_id", get(fabric_tx_status))
        .with_state(FabricRegistry::default());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
}

async fn ignite_core_simulated(db_tag: &str, ledger_ca_url: String) -> (AppState, tempfile::TempDir) {
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

    // Apagón en la ignición: el gateway arranca en modo simulado pero
    // conserva las coordenadas del uplink para la re-sonda.
    let ledger_gateway = LedgerGateway::ignite_simulated(LedgerGatewayConfig {
        channel: config.ledger_channel.clone(),
        chaincode: config.ledger_chaincode.clone(),
        msp_identity: config.ledger_msp_id.clone(),
        wallet_path: config.ledger_wallet_path.clone(),
        ca_url: ledger_ca_url,
        endorsement_quorum: 1,
        max_attempts: 2,
        base_backoff: std::time::Duration::from_millis(10),
        confirm_deadline: std::time::Duration::from_secs(2),
    });

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
async fn certify_outage_upload_then_outbox_reconciliation() {
    println!("\n🧪 [PROVING_GROUNDS]: Scenario S4 — ledger outage and recovery...");

    // El puerto del Ledger se reserva ANTES para poder "reactivarlo".
    let dormant_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ledger_ca_url = format!("http://{}", dormant_listener.local_addr().unwrap());

    let (state, _workspace) = ignite_core_simulated("mem_e2e_s4", ledger_ca_url).await;
    assert!(state.ledger_gateway.is_simulated().await);

    let owner = Principal {
        user_id: Uuid::new_v4(),
        email: "alice@versafe.io".into(),
        display_name: "Alice".into(),
        token_expires_at: Utc::now() + chrono::Duration::hours(1),
    };

    // 1. SUBIDA DURANTE EL APAGÓN
    let ingest = DocumentIngestService::new(state.clone());
    let view = ingest
        .upload(
            &owner,
            UploadRequest {
                title: "Durante el apagón".into(),
                file_name: "outage.txt".into(),
                media_type: "text/plain".into(),
                security_level: SecurityLevel::Low,
                signatures_required: Some(1),
                expires_at: None,
                content: b"written while the ledger sleeps".to_vec(),
            },
        )
        .await
        .expect("upload must succeed during the outage");

    // Contrato S4: respuesta honesta con el registro pendiente.
    assert!(view.simulated);
    assert_eq!(view.document.state, DocumentState::Uploaded);
    assert!(view.document.ledger_pending);
    assert!(
        view.document.ledger_transaction_identifier.is_none(),
        "a simulated receipt must never fix the document tx"
    );
    assert_eq!(state.outbox_repository.pending_count().await.unwrap(), 1);

    // 2. REACTIVACIÓN DEL LEDGER
    spawn_mock_fabric_on(dormant_listener).await;

    // 3. DRENADO DEL OUTBOX
    let relay = LedgerOutboxRelay::new(state.clone());
    let drained = relay.execute_drain_cycle().await.expect("drain cycle");
    assert_eq!(drained, 1);
    assert!(!state.ledger_gateway.is_simulated().await, "uplink must be restored");

    // 4. RECONCILIACIÓN: tx real adquirido, bandera limpia.
    let reconciled = state.document_repository.fetch_by_id(&view.document.id).await.unwrap();
    assert!(reconciled.ledger_transaction_identifier.is_some());
    assert!(!reconciled.ledger_pending);
    assert_eq!(reconciled.state, DocumentState::Uploaded);
    assert_eq!(state.outbox_repository.pending_count().await.unwrap(), 0);

    println!("   ✅ [SUCCESS]: S4 outage and reconciliation certified.");
}
