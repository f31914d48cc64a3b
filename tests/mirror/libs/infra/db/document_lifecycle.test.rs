// [tests/mirror/libs/infra/db/document_lifecycle.test.rs]
/**
 * =================================================================
 * APARATO: DOCUMENT LIFECYCLE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL CICLO UPLOADED -> VERIFIED
 * =================================================================
 */

use chrono::{Duration, Utc};
use uuid::Uuid;
use versafe_domain_models::document::{DigestAlgorithm, Document, DocumentState, SecurityLevel};
use versafe_infra_db::repositories::DocumentRepository;
use versafe_infra_db::{DbError, MetadataStoreClient};

fn synthetic_document(owner_id: Uuid) -> Document {
    let now = Utc::now();
    Document {
        id: Uuid::new_v4(),
        owner_id,
        title: "Acta de constitución".into(),
        file_name: "acta.pdf".into(),
        media_type: "application/pdf".into(),
        size_bytes: 2048,
        storage_ref: Uuid::new_v4().to_string(),
        digest_algorithm: DigestAlgorithm::Sha256,
        digest_hexadecimal: "cfc96dbec9596742785be0b61cd7541cf6e4c84cce4db6c512a31899e933b95b"
            .into(),
        secondary_digest_algorithm: None,
        secondary_digest_hexadecimal: None,
        security_level: SecurityLevel::Medium,
        signatures_required: 2,
        state: DocumentState::Uploaded,
        scan_warning: false,
        ledger_transaction_identifier: None,
        ledger_block_height: None,
        ledger_pending: false,
        expires_at: None,
        revoked_reason: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn certify_nominal_lifecycle_and_monotonic_guard() {
    println!("\n📄 [PROVING_GROUNDS]: Auditing document lifecycle V4.0...");

    let client = MetadataStoreClient::connect("file::mem_doc_v40?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = DocumentRepository::new(client);

    let document = synthetic_document(Uuid::new_v4());
    repo.insert_document(&document).await.expect("insert");

    let recovered = repo.fetch_by_id(&document.id).await.unwrap();
    assert_eq!(recovered.state, DocumentState::Uploaded);
    assert_eq!(recovered.digest_hexadecimal, document.digest_hexadecimal);

    // Avance nominal completo.
    repo.transition_state(&document.id, DocumentState::PartiallySigned).await.unwrap();
    repo.transition_state(&document.id, DocumentState::Signed).await.unwrap();
    let verified = repo.transition_state(&document.id, DocumentState::Verified).await.unwrap();
    assert_eq!(verified.state, DocumentState::Verified);

    // Retroceso prohibido por la guardia monotónica.
    assert!(matches!(
        repo.transition_state(&document.id, DocumentState::Uploaded).await,
        Err(DbError::InvalidState)
    ));

    println!("   ✅ [SUCCESS]: Lattice guard held through the full cycle.");
}

#[tokio::test]
async fn certify_ledger_tx_id_is_immutable_once_set() {
    let client = MetadataStoreClient::connect("file::mem_doc_tx?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = DocumentRepository::new(client);

    let document = synthetic_document(Uuid::new_v4());
    repo.insert_document(&document).await.unwrap();

    repo.set_ledger_registration(&document.id, "tx-first", Some(7)).await.unwrap();
    // Segundo intento de escritura: no-op por contrato de inmutabilidad.
    repo.set_ledger_registration(&document.id, "tx-second", Some(9)).await.unwrap();

    let recovered = repo.fetch_by_id(&document.id).await.unwrap();
    assert_eq!(recovered.ledger_transaction_identifier.as_deref(), Some("tx-first"));
    assert_eq!(recovered.ledger_block_height, Some(7));
}

#[tokio::test]
async fn certify_revoke_is_idempotent() {
    let client = MetadataStoreClient::connect("file::mem_doc_rev?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = DocumentRepository::new(client);

    let document = synthetic_document(Uuid::new_v4());
    repo.insert_document(&document).await.unwrap();

    let (first, newly_revoked) = repo.revoke(&document.id, "compromised").await.unwrap();
    assert!(newly_revoked);
    assert_eq!(first.state, DocumentState::Revoked);

    // Segunda revocación: mismo registro, sin mutación nueva.
    let (second, repeated) = repo.revoke(&document.id, "other reason").await.unwrap();
    assert!(!repeated);
    assert_eq!(second.revoked_reason.as_deref(), Some("compromised"));
}

#[tokio::test]
async fn certify_past_due_listing_selects_only_expirable_documents() {
    let client = MetadataStoreClient::connect("file::mem_doc_exp?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = DocumentRepository::new(client);

    let mut past_due = synthetic_document(Uuid::new_v4());
    past_due.expires_at = Some(Utc::now() - Duration::hours(1));
    repo.insert_document(&past_due).await.unwrap();

    let mut still_valid = synthetic_document(Uuid::new_v4());
    still_valid.expires_at = Some(Utc::now() + Duration::hours(1));
    repo.insert_document(&still_valid).await.unwrap();

    // Un documento vencido pero ya terminal jamás es candidato.
    let mut already_revoked = synthetic_document(Uuid::new_v4());
    already_revoked.expires_at = Some(Utc::now() - Duration::hours(2));
    repo.insert_document(&already_revoked).await.unwrap();
    repo.revoke(&already_revoked.id, "closed before expiry").await.unwrap();

    // El repositorio sólo entrega candidatos; la transición es del
    // llamador, bajo candado, por la guardia monotónica.
    let past_due_listing = repo.list_past_due(Utc::now()).await.unwrap();
    assert_eq!(past_due_listing, vec![past_due.id]);
    assert_eq!(repo.fetch_by_id(&past_due.id).await.unwrap().state, DocumentState::Uploaded);

    let expired = repo.transition_state(&past_due.id, DocumentState::Expired).await.unwrap();
    assert_eq!(expired.state, DocumentState::Expired);

    // Tras expirar, el documento deja de ser candidato.
    assert!(repo.list_past_due(Utc::now()).await.unwrap().is_empty());
    assert_eq!(repo.fetch_by_id(&still_valid.id).await.unwrap().state, DocumentState::Uploaded);
}

#[tokio::test]
async fn certify_quarantine_leaves_owner_listing() {
    let client = MetadataStoreClient::connect("file::mem_doc_quar?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = DocumentRepository::new(client);

    let owner_id = Uuid::new_v4();
    let document = synthetic_document(owner_id);
    repo.insert_document(&document).await.unwrap();

    let (visible_before, total_before) =
        repo.list_for_owner(&owner_id, &Default::default(), 1, 20).await.unwrap();
    assert_eq!(total_before, 1);
    assert_eq!(visible_before.len(), 1);

    repo.quarantine(&document.id).await.unwrap();

    let (visible_after, total_after) =
        repo.list_for_owner(&owner_id, &Default::default(), 1, 20).await.unwrap();
    assert_eq!(total_after, 0, "quarantined documents leave user-visible lists");
    assert!(visible_after.is_empty());
}
