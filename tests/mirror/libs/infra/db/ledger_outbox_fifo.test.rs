// [tests/mirror/libs/infra/db/ledger_outbox_fifo.test.rs]
/**
 * =================================================================
 * APARATO: LEDGER OUTBOX FIFO TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE DISCIPLINA FIFO E IDEMPOTENCIA
 * =================================================================
 */

use uuid::Uuid;
use versafe_domain_models::ledger::LedgerTxKind;
use versafe_infra_db::repositories::OutboxRepository;
use versafe_infra_db::MetadataStoreClient;

#[tokio::test]
async fn certify_fifo_order_and_idempotent_enqueue() {
    println!("\n📮 [PROVING_GROUNDS]: Auditing outbox FIFO discipline...");

    let client = MetadataStoreClient::connect("file::mem_outbox_fifo?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = OutboxRepository::new(client);

    let document_alpha = Uuid::new_v4();
    let document_beta = Uuid::new_v4();
    let payload = serde_json::json!({ "state": "SIGNED" });

    repo.enqueue(&document_alpha, LedgerTxKind::Register, "alpha:REGISTER:1", &payload)
        .await
        .unwrap();
    repo.enqueue(&document_beta, LedgerTxKind::Register, "beta:REGISTER:1", &payload)
        .await
        .unwrap();
    repo.enqueue(&document_alpha, LedgerTxKind::StateUpdate, "alpha:STATE_UPDATE:1", &payload)
        .await
        .unwrap();

    // Reencolar la misma clave es un no-op benigno.
    repo.enqueue(&document_alpha, LedgerTxKind::Register, "alpha:REGISTER:1", &payload)
        .await
        .unwrap();
    assert_eq!(repo.pending_count().await.unwrap(), 3);

    // El frente de la cola respeta el orden de inserción.
    let batch = repo.fetch_pending_batch(10).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].dedup_key, "alpha:REGISTER:1");
    assert_eq!(batch[1].dedup_key, "beta:REGISTER:1");
    assert_eq!(batch[2].dedup_key, "alpha:STATE_UPDATE:1");

    println!("   ✅ [SUCCESS]: FIFO order and dedup held.");
}

#[tokio::test]
async fn certify_document_blocking_predicate_follows_the_queue() {
    let client = MetadataStoreClient::connect("file::mem_outbox_block?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = OutboxRepository::new(client);

    let document_id = Uuid::new_v4();
    assert!(!repo.has_pending_for_document(&document_id).await.unwrap());

    repo.enqueue(
        &document_id,
        LedgerTxKind::Register,
        &format!("{}:REGISTER:1", document_id),
        &serde_json::json!({}),
    )
    .await
    .unwrap();
    assert!(repo.has_pending_for_document(&document_id).await.unwrap());

    let front = &repo.fetch_pending_batch(1).await.unwrap()[0];
    repo.mark_flushed(front.id).await.unwrap();
    assert!(!repo.has_pending_for_document(&document_id).await.unwrap());
}

#[tokio::test]
async fn certify_attempt_ceiling_moves_entry_to_dead() {
    let client = MetadataStoreClient::connect("file::mem_outbox_dead?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = OutboxRepository::new(client);

    let document_id = Uuid::new_v4();
    repo.enqueue(
        &document_id,
        LedgerTxKind::Register,
        &format!("{}:REGISTER:1", document_id),
        &serde_json::json!({}),
    )
    .await
    .unwrap();

    let entry_id = repo.fetch_pending_batch(1).await.unwrap()[0].id;
    for _ in 0..3 {
        repo.record_attempt_failure(entry_id, "endorsement timeout", 3).await.unwrap();
    }

    // Al superar el techo la entrada sale de la cola viva.
    assert_eq!(repo.pending_count().await.unwrap(), 0);
    assert!(repo.fetch_pending_batch(10).await.unwrap().is_empty());
}
