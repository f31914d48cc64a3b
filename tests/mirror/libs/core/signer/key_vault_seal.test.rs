// [tests/mirror/libs/core/signer/key_vault_seal.test.rs]
/**
 * =================================================================
 * APARATO: KEY VAULT SEAL TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-SIGNER)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL SELLADO PBKDF2 + AES-GCM
 * =================================================================
 */

use uuid::Uuid;
use versafe_core_signer::{KeySuite, KeyVault};

#[test]
fn certify_seal_unseal_roundtrip_preserves_material() {
    println!("\n🔐 [PROVING_GROUNDS]: Auditing vault seal roundtrip...");

    let sealing_phrase = "internal-service-credential-0123";
    let store_directory = tempfile::tempdir().expect("tempdir");
    let store_path = store_directory.path().join("vault.sealed");

    let mut vault = KeyVault::empty();
    let signer_id = Uuid::new_v4();
    let enrolled_public = vault
        .enroll_signer(signer_id, KeySuite::Ed25519)
        .expect("enrollment")
        .public_key_blob
        .clone();
    vault.seal_to(&store_path, sealing_phrase).expect("seal must succeed");

    // El blob en disco jamás contiene material en claro.
    let sealed_raw = std::fs::read_to_string(&store_path).unwrap();
    assert!(!sealed_raw.contains(&hex::encode(&enrolled_public)));

    let recovered = KeyVault::unseal_from(&store_path, sealing_phrase).expect("unseal");
    assert_eq!(recovered.enrolled_count(), 1);
    assert_eq!(
        recovered.material_for(&signer_id).unwrap().public_key_blob,
        enrolled_public
    );

    println!("   ✅ [SUCCESS]: Sealed material bit-perfect after roundtrip.");
}

#[test]
fn certify_wrong_phrase_fails_on_the_gcm_tag() {
    let store_directory = tempfile::tempdir().expect("tempdir");
    let store_path = store_directory.path().join("vault.sealed");

    let mut vault = KeyVault::empty();
    vault.enroll_signer(Uuid::new_v4(), KeySuite::Ed25519).unwrap();
    vault.seal_to(&store_path, "correct-phrase-material").unwrap();

    assert!(KeyVault::unseal_from(&store_path, "incorrect-phrase-material").is_err());
}

#[test]
fn certify_absent_store_ignites_empty_vault() {
    let store_directory = tempfile::tempdir().expect("tempdir");
    let vault =
        KeyVault::unseal_from(&store_directory.path().join("missing.sealed"), "any").unwrap();
    assert_eq!(vault.enrolled_count(), 0);
}
