// [tests/mirror/apps/gateway/services/upload_validation.test.rs]
/**
 * =================================================================
 * APARATO: UPLOAD VALIDATION TEST (V4.0 - BOUNDARIES + S3)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-APP MIRROR
 * RESPONSABILIDAD: FRONTERAS DE TAMAÑO, ALLOW-LIST, DUAL-HASH Y
 *                  RECHAZO POR MALWARE (SecurityRejected)
 * =================================================================
 */

use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use versafe_core_signer::KeyVault;
use versafe_domain_identity::{Principal, SigningKeySet};
use versafe_domain_models::document::{DigestAlgorithm, SecurityLevel};
use versafe_gateway::bootstrap::CoreConfig;
use versafe_gateway::envelope::FaultKind;
use versafe_gateway::services::{build_audit_recorder, DocumentIngestService, UploadRequest};
use versafe_gateway::state::AppState;
use versafe_infra_db::repositories::AuditRepository;
use versafe_infra_db::MetadataStoreClient;
use versafe_infra_ledger::{LedgerGateway, LedgerGatewayConfig};

/// Tope de subida minúsculo para auditar la frontera exacta.
const TEST_MAX_UPLOAD_BYTES: u64 = 64;

/// Escáner sintético: todo PDF recibido es MALICIOUS.
async fn spawn_hostile_scanner() -> String {
    let router = Router::new().route(
        "/v1/scan",
        post(|| async {
            Json(serde_json::json!({
                "verdict": "MALICIOUS",
                "confidence": 0.99,
                "features": { "family": "eicar-like" },
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    base_url
}

async fn ignite_core(db_tag: &str, scanner_url: String) -> (AppState, tempfile::TempDir) {
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
        ledger_ca_url: "http://127.0.0.1:1".into(),
        signing_key_store: upload_dir.join("vault.sealed"),
        internal_api_key: "internal-service-credential-0123".into(),
        token_signing_key_set: r#"{"kid-2026a": "alpha-secret-material-0123456789"}"#.into(),
        token_ttl: chrono::Duration::seconds(900),
        refresh_ttl: chrono::Duration::days(14),
        upload_dir,
        max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        allowed_media_types: vec!["application/pdf".into(), "text/plain".into()],
        scanner_url,
        scanner_timeout: std::time::Duration::from_secs(2),
        outbox_max_attempts: 2,
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

    // Simulador puro: estas fronteras no necesitan Ledger real.
    let ledger_gateway = LedgerGateway::ignite_simulated(LedgerGatewayConfig {
        channel: config.ledger_channel.clone(),
        chaincode: config.ledger_chaincode.clone(),
        msp_identity: config.ledger_msp_id.clone(),
        wallet_path: config.ledger_wallet_path.clone(),
        ca_url: config.ledger_ca_url.clone(),
        endorsement_quorum: 1,
        max_attempts: 2,
        base_backoff: std::time::Duration::from_millis(10),
        confirm_deadline: std::time::Duration::from_secs(1),
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

fn principal() -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        email: "alice@versafe.io".into(),
        display_name: "Alice".into(),
        token_expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

fn plain_upload(content: Vec<u8>) -> UploadRequest {
    UploadRequest {
        title: "Frontera".into(),
        file_name: "boundary.txt".into(),
        media_type: "text/plain".into(),
        security_level: SecurityLevel::Low,
        signatures_required: Some(1),
        expires_at: None,
        content,
    }
}

#[tokio::test]
async fn certify_exact_size_cap_boundary() {
    println!("\n🧪 [PROVING_GROUNDS]: Auditing MAX_UPLOAD_BYTES boundary...");

    let (state, _workspace) = ignite_core("mem_val_cap", "http://127.0.0.1:1".into()).await;
    let ingest = DocumentIngestService::new(state);
    let owner = principal();

    // Exactamente el tope: válido.
    let at_cap = ingest
        .upload(&owner, plain_upload(vec![0x41; TEST_MAX_UPLOAD_BYTES as usize]))
        .await
        .expect("upload at the exact cap must succeed");
    assert_eq!(at_cap.document.size_bytes, TEST_MAX_UPLOAD_BYTES);

    // Un byte más: Validation.
    let over_cap = ingest
        .upload(&owner, plain_upload(vec![0x41; TEST_MAX_UPLOAD_BYTES as usize + 1]))
        .await
        .expect_err("one byte over the cap must fail");
    assert_eq!(over_cap.kind, FaultKind::Validation);

    println!("   ✅ [SUCCESS]: Boundary behaviour exact.");
}

#[tokio::test]
async fn certify_media_allow_list_and_critical_dual_hash() {
    let (state, _workspace) = ignite_core("mem_val_media", "http://127.0.0.1:1".into()).await;
    let ingest = DocumentIngestService::new(state);
    let owner = principal();

    // Tipo fuera de la allow-list.
    let mut executable = plain_upload(b"MZ...".to_vec());
    executable.media_type = "application/x-msdownload".into();
    assert_eq!(ingest.upload(&owner, executable).await.unwrap_err().kind, FaultKind::Validation);

    // CRITICAL exige al menos dos firmantes.
    let mut single_signer_critical = plain_upload(b"classified".to_vec());
    single_signer_critical.security_level = SecurityLevel::Critical;
    single_signer_critical.signatures_required = Some(1);
    assert_eq!(
        ingest.upload(&owner, single_signer_critical).await.unwrap_err().kind,
        FaultKind::Validation
    );

    // CRITICAL bien formado computa y persiste la doble huella.
    let mut dual_hash_critical = plain_upload(b"classified".to_vec());
    dual_hash_critical.security_level = SecurityLevel::Critical;
    dual_hash_critical.signatures_required = Some(2);
    let view = ingest.upload(&owner, dual_hash_critical).await.unwrap();
    assert_eq!(view.document.secondary_digest_algorithm, Some(DigestAlgorithm::Blake2b256));
    assert!(view.document.secondary_digest_hexadecimal.is_some());
    assert_ne!(
        view.document.secondary_digest_hexadecimal.as_deref().unwrap(),
        view.document.digest_hexadecimal.as_str()
    );
}

#[tokio::test]
async fn certify_malicious_pdf_is_security_rejected_and_deleted() {
    println!("\n🧪 [PROVING_GROUNDS]: Scenario S3 — malware rejection...");

    let hostile_scanner = spawn_hostile_scanner().await;
    let (state, workspace) = ignite_core("mem_val_malware", hostile_scanner).await;
    let ingest = DocumentIngestService::new(state.clone());
    let owner = principal();

    let mut hostile_pdf = plain_upload(b"%PDF-1.4 payload".to_vec());
    hostile_pdf.media_type = "application/pdf".into();
    hostile_pdf.file_name = "hostile.pdf".into();

    let fault = ingest.upload(&owner, hostile_pdf).await.expect_err("malicious must abort");
    assert_eq!(fault.kind, FaultKind::Security);
    assert_eq!(fault.detail, "SecurityRejected");

    // Sin fila documental.
    let (listed, total) = state
        .document_repository
        .list_for_owner(&owner.user_id, &Default::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(listed.is_empty());

    // Sin bytes huérfanos en la bóveda (sólo el buffer de auditoría
    // puede existir en el directorio).
    let mut residual_files = Vec::new();
    for entry in std::fs::read_dir(workspace.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().to_string();
        if !name.starts_with('.') {
            residual_files.push(name);
        }
    }
    assert!(residual_files.is_empty(), "vault must hold no residual bytes: {:?}", residual_files);

    // Evidencia de auditoría SecurityRejected sellada por el daemon.
    let mut security_audit_found = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let shard_day = Utc::now().format("%Y-%m-%d").to_string();
        let shard = state
            .audit_repository
            .fetch_shard("document-ingest", &shard_day)
            .await
            .unwrap();
        if shard.iter().any(|record| record.action == "upload.security_rejected") {
            security_audit_found = true;
            break;
        }
    }
    assert!(security_audit_found, "SecurityRejected audit record must be sealed");

    println!("   ✅ [SUCCESS]: S3 rejection, deletion and evidence certified.");
}
