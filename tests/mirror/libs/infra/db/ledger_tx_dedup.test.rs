// [tests/mirror/libs/infra/db/ledger_tx_dedup.test.rs]
/**
 * =================================================================
 * APARATO: LEDGER TX DEDUP TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE IDEMPOTENCIA POR CLAVE DEDUP
 * =================================================================
 */

use chrono::Utc;
use uuid::Uuid;
use versafe_domain_models::ledger::{
    build_dedup_key, Endorsement, LedgerTransaction, LedgerTxKind, LedgerTxStatus,
};
use versafe_infra_db::repositories::LedgerTxRepository;
use versafe_infra_db::MetadataStoreClient;

fn mirrored_tx(tx_id: &str, document_id: Uuid, dedup_key: &str) -> LedgerTransaction {
    LedgerTransaction {
        tx_id: tx_id.into(),
        document_id,
        kind: LedgerTxKind::Register,
        block_height: None,
        block_hash_hexadecimal: None,
        payload_hash_hexadecimal: hex::encode([0x11; 32]),
        endorsements: vec![Endorsement {
            endorsing_identity: "peer0-versafe".into(),
            endorsement_signature_hexadecimal: "aa".into(),
        }],
        submitted_at: Utc::now(),
        confirmed_at: None,
        status: LedgerTxStatus::Pending,
        dedup_key: dedup_key.into(),
    }
}

#[tokio::test]
async fn certify_same_dedup_key_collapses_to_one_record() {
    println!("\n🔁 [PROVING_GROUNDS]: Auditing submission idempotency...");

    let client = MetadataStoreClient::connect("file::mem_tx_dedup?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = LedgerTxRepository::new(client);

    let document_id = Uuid::new_v4();
    let dedup_key = build_dedup_key(&document_id, LedgerTxKind::Register, 1);

    let first = repo
        .insert_or_fetch_by_dedup(&mirrored_tx("tx-original", document_id, &dedup_key))
        .await
        .unwrap();

    // Reintento con la misma clave lógica: el registro original gana.
    let second = repo
        .insert_or_fetch_by_dedup(&mirrored_tx("tx-retry", document_id, &dedup_key))
        .await
        .unwrap();

    assert_eq!(first.tx_id, "tx-original");
    assert_eq!(second.tx_id, "tx-original", "retry must collapse to the original tx");
    assert_eq!(repo.history_for_document(&document_id).await.unwrap().len(), 1);

    println!("   ✅ [SUCCESS]: Dedup key collapsed the retry.");
}

#[tokio::test]
async fn certify_confirmation_seals_and_becomes_immutable() {
    let client = MetadataStoreClient::connect("file::mem_tx_conf?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = LedgerTxRepository::new(client);

    let document_id = Uuid::new_v4();
    let dedup_key = build_dedup_key(&document_id, LedgerTxKind::Register, 1);
    repo.insert_or_fetch_by_dedup(&mirrored_tx("tx-conf", document_id, &dedup_key))
        .await
        .unwrap();

    repo.confirm("tx-conf", 42, "beefcafe").await.unwrap();
    let confirmed = repo.fetch_by_tx_id("tx-conf").await.unwrap();
    assert_eq!(confirmed.status, LedgerTxStatus::Confirmed);
    assert_eq!(confirmed.block_height, Some(42));
    assert!(confirmed.confirmed_at.is_some());

    // CONFIRMED es inmutable: ni re-confirmación ni rechazo lo tocan.
    repo.confirm("tx-conf", 99, "deadbeef").await.unwrap();
    repo.reject("tx-conf").await.unwrap();
    let untouched = repo.fetch_by_tx_id("tx-conf").await.unwrap();
    assert_eq!(untouched.block_height, Some(42));
    assert_eq!(untouched.status, LedgerTxStatus::Confirmed);

    // Y aparece como el REGISTER autoritativo del documento.
    let authoritative = repo.latest_confirmed_register(&document_id).await.unwrap();
    assert_eq!(authoritative.unwrap().tx_id, "tx-conf");
}

#[tokio::test]
async fn certify_monotonic_seq_advances_per_kind() {
    let client = MetadataStoreClient::connect("file::mem_tx_seq?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = LedgerTxRepository::new(client);

    let document_id = Uuid::new_v4();
    assert_eq!(repo.next_monotonic_seq(&document_id, LedgerTxKind::Register).await.unwrap(), 1);

    let dedup_key = build_dedup_key(&document_id, LedgerTxKind::Register, 1);
    repo.insert_or_fetch_by_dedup(&mirrored_tx("tx-seq", document_id, &dedup_key))
        .await
        .unwrap();

    assert_eq!(repo.next_monotonic_seq(&document_id, LedgerTxKind::Register).await.unwrap(), 2);
    // Otra clase de operación arranca su propia secuencia.
    assert_eq!(repo.next_monotonic_seq(&document_id, LedgerTxKind::StateUpdate).await.unwrap(), 1);
}
