// [tests/mirror/libs/infra/db/audit_chain_persistence.test.rs]
/**
 * =================================================================
 * APARATO: AUDIT CHAIN PERSISTENCE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL SELLADO Y RUPTURA POR SHARD
 * =================================================================
 */

use chrono::Utc;
use uuid::Uuid;
use versafe_domain_models::audit::AuditRecord;
use versafe_infra_db::repositories::{AuditChainReport, AuditRepository};
use versafe_infra_db::MetadataStoreClient;

fn unsealed_record(service: &str, action: &str, shard_day: &str) -> AuditRecord {
    AuditRecord {
        id: Uuid::new_v4(),
        service: service.into(),
        action: action.into(),
        user_id: Some(Uuid::new_v4()),
        resource_kind: "document".into(),
        resource_id: Uuid::new_v4().to_string(),
        request_meta: serde_json::json!({ "latency_class": "fast" }),
        status_code: 200,
        latency_milliseconds: 4,
        shard_day: shard_day.into(),
        prev_hash_hexadecimal: String::new(),
        entry_hash_hexadecimal: String::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn certify_hundred_link_shard_reverifies() {
    println!("\n🛡️ [PROVING_GROUNDS]: Sealing 100 audit links in one shard...");

    let client = MetadataStoreClient::connect("file::mem_audit_100?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = AuditRepository::new(client);

    for index in 0..100 {
        repo.append_sealed(unsealed_record(
            "signature-engine",
            &format!("signature.sign.{}", index),
            "2026-08-01",
        ))
        .await
        .unwrap();
    }

    let report = repo.verify_chain("signature-engine", "2026-08-01").await.unwrap();
    assert_eq!(report, AuditChainReport::Intact { record_count: 100 });

    println!("   ✅ [SUCCESS]: 100-link chain reverified.");
}

#[tokio::test]
async fn certify_mutation_is_detected_with_first_broken_index() {
    let client = MetadataStoreClient::connect("file::mem_audit_mut?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = AuditRepository::new(client.clone());

    for index in 0..10 {
        repo.append_sealed(unsealed_record(
            "document-ingest",
            &format!("document.upload.{}", index),
            "2026-08-01",
        ))
        .await
        .unwrap();
    }

    // Mutación directa en el motor: el quinto eslabón cambia de recurso.
    let connection = client.get_connection().unwrap();
    connection
        .execute(
            "UPDATE audit_records SET resource_id = 'tampered' \
             WHERE rowid = (SELECT rowid FROM audit_records \
                            WHERE service = 'document-ingest' ORDER BY rowid LIMIT 1 OFFSET 4)",
            (),
        )
        .await
        .unwrap();

    let report = repo.verify_chain("document-ingest", "2026-08-01").await.unwrap();
    assert_eq!(report, AuditChainReport::Broken { first_broken_index: 4 });
}

#[tokio::test]
async fn certify_shards_chain_independently() {
    let client = MetadataStoreClient::connect("file::mem_audit_shard?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = AuditRepository::new(client);

    repo.append_sealed(unsealed_record("document-ingest", "document.upload", "2026-08-01"))
        .await
        .unwrap();
    repo.append_sealed(unsealed_record("signature-engine", "signature.sign", "2026-08-01"))
        .await
        .unwrap();
    repo.append_sealed(unsealed_record("document-ingest", "document.revoke", "2026-08-02"))
        .await
        .unwrap();

    // Tres shards distintos, cada uno con su propio génesis.
    let shards = repo.list_shards().await.unwrap();
    assert_eq!(shards.len(), 3);

    for (service, day) in shards {
        let report = repo.verify_chain(&service, &day).await.unwrap();
        assert_eq!(report, AuditChainReport::Intact { record_count: 1 });
    }
}
