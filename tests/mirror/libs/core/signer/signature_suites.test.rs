// [tests/mirror/libs/core/signer/signature_suites.test.rs]
/**
 * =================================================================
 * APARATO: SIGNATURE SUITES TEST (V3.0 - TRIAD)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-SIGNER)
 * RESPONSABILIDAD: CERTIFICACIÓN DE FIRMA/VERIFICACIÓN POR SUITE
 * =================================================================
 */

use chrono::Utc;
use uuid::Uuid;
use versafe_core_signer::{
    build_signing_payload, sign_payload, verify_payload, KeySuite, KeyVault,
};

fn certify_suite_roundtrip(suite: KeySuite) {
    println!("\n🧪 [PROVING_GROUNDS]: Auditing suite {:?}...", suite);

    let mut vault = KeyVault::empty();
    let signer_id = Uuid::new_v4();
    vault.enroll_signer(signer_id, suite).expect("enrollment must succeed");
    let material = vault.material_for(&signer_id).expect("material must exist").clone();

    let signing_data = build_signing_payload(
        "cfc96dbec9596742785be0b61cd7541cf6e4c84cce4db6c512a31899e933b95b",
        &signer_id,
        &Utc::now(),
    );

    let signature_blob =
        sign_payload(suite, &material.private_key_blob, &signing_data).expect("sign must succeed");

    // La firma verifica contra el payload exacto.
    verify_payload(suite, &material.public_key_blob, &signing_data, &signature_blob)
        .expect("signature must verify");

    // Un solo byte de deriva en el payload rechaza la firma.
    let mut drifted = signing_data.clone();
    drifted[0] ^= 0x01;
    assert!(verify_payload(suite, &material.public_key_blob, &drifted, &signature_blob).is_err());

    println!("   ✅ [SUCCESS]: Suite {:?} sign/verify parity confirmed.", suite);
}

#[test]
fn certify_ed25519_roundtrip() {
    certify_suite_roundtrip(KeySuite::Ed25519);
}

#[test]
fn certify_ecdsa_p256_roundtrip() {
    certify_suite_roundtrip(KeySuite::EcdsaP256Sha256);
}

#[test]
fn certify_rsa_pss_roundtrip() {
    certify_suite_roundtrip(KeySuite::RsaPssSha256);
}

#[test]
fn certify_unenrolled_signer_has_no_material() {
    let vault = KeyVault::empty();
    assert!(vault.material_for(&Uuid::new_v4()).is_err());
}
