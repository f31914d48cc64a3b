// [tests/mirror/libs/infra/db/signature_uniqueness.test.rs]
/**
 * =================================================================
 * APARATO: SIGNATURE UNIQUENESS TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE UNICIDAD (document_id, signer_id)
 * =================================================================
 */

use chrono::Utc;
use uuid::Uuid;
use versafe_domain_models::signature::{Signature, SignatureKind};
use versafe_infra_db::repositories::SignatureRepository;
use versafe_infra_db::{DbError, MetadataStoreClient};

fn synthetic_signature(document_id: Uuid, signer_id: Uuid) -> Signature {
    Signature {
        id: Uuid::new_v4(),
        document_id,
        signer_id,
        kind: SignatureKind::Electronic,
        payload: b"text:Alice".to_vec(),
        signer_hash_hexadecimal: hex::encode([0xAB; 32]),
        verification_method: "electronic-wellformed".into(),
        verified: true,
        ledger_transaction_identifier: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn certify_second_signature_of_same_signer_collapses() {
    println!("\n✍️ [PROVING_GROUNDS]: Auditing signer uniqueness...");

    let client = MetadataStoreClient::connect("file::mem_sig_uniq?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = SignatureRepository::new(client);

    let document_id = Uuid::new_v4();
    let signer_id = Uuid::new_v4();

    repo.insert_signature(&synthetic_signature(document_id, signer_id)).await.unwrap();

    // El mismo firmante sobre el mismo documento colapsa en AlreadySigned.
    assert!(matches!(
        repo.insert_signature(&synthetic_signature(document_id, signer_id)).await,
        Err(DbError::DuplicateSignature)
    ));

    // Otro firmante sobre el mismo documento es válido.
    repo.insert_signature(&synthetic_signature(document_id, Uuid::new_v4())).await.unwrap();

    // El mismo firmante sobre otro documento es válido.
    repo.insert_signature(&synthetic_signature(Uuid::new_v4(), signer_id)).await.unwrap();

    assert_eq!(repo.count_valid_for_document(&document_id).await.unwrap(), 2);

    println!("   ✅ [SUCCESS]: Uniqueness sealed by the engine.");
}

#[tokio::test]
async fn certify_valid_count_excludes_unverified_signatures() {
    let client = MetadataStoreClient::connect("file::mem_sig_count?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = SignatureRepository::new(client);

    let document_id = Uuid::new_v4();
    let mut unverified = synthetic_signature(document_id, Uuid::new_v4());
    unverified.verified = false;
    repo.insert_signature(&unverified).await.unwrap();
    repo.insert_signature(&synthetic_signature(document_id, Uuid::new_v4())).await.unwrap();

    assert_eq!(repo.count_valid_for_document(&document_id).await.unwrap(), 1);

    // La re-verificación puede promover el conteo.
    repo.set_verified(&unverified.id, true).await.unwrap();
    assert_eq!(repo.count_valid_for_document(&document_id).await.unwrap(), 2);
}

#[tokio::test]
async fn certify_listing_preserves_insertion_order() {
    let client = MetadataStoreClient::connect("file::mem_sig_order?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = SignatureRepository::new(client);

    let document_id = Uuid::new_v4();
    let first = synthetic_signature(document_id, Uuid::new_v4());
    let second = synthetic_signature(document_id, Uuid::new_v4());
    repo.insert_signature(&first).await.unwrap();
    repo.insert_signature(&second).await.unwrap();

    let listed = repo.list_for_document(&document_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].id, second.id);
}
