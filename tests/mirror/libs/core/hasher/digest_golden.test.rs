// [tests/mirror/libs/core/hasher/digest_golden.test.rs]
/**
 * =================================================================
 * APARATO: DIGEST GOLDEN VECTORS TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-HASHER)
 * RESPONSABILIDAD: CERTIFICACIÓN BIT-PERFECTA DE LAS TRES SUITES
 *
 * Vectores dorados computados fuera de banda sobre el contenido
 * canónico "Hello, VerSafe\n" (15 bytes).
 * =================================================================
 */

use versafe_core_hasher::{certify_dual_fingerprint, fingerprint_bytes, StreamingHasher};
use versafe_domain_models::document::DigestAlgorithm;

const GOLDEN_CONTENT: &[u8] = b"Hello, VerSafe\n";
const GOLDEN_SHA256: &str = "cfc96dbec9596742785be0b61cd7541cf6e4c84cce4db6c512a31899e933b95b";
const GOLDEN_SHA3_256: &str = "2eef3b4cd482c78e84359d5c4d7d4d2ee19d4c6d687f818af6aa679880e7e921";
const GOLDEN_BLAKE2B_256: &str = "6358203db8e549357bb9cdc323bd29863542d3cb38048389fa45ece9f665c3b3";
/// El mismo contenido con un byte extra ("!") cambia toda la huella.
const TAMPERED_SHA256: &str = "13ac719096e222851496371a6e7facd866f89ccc400dfe77fd7e2ebb8256b5b4";

#[test]
fn certify_golden_vectors_for_all_three_suites() {
    println!("\n🧪 [PROVING_GROUNDS]: Auditing golden vectors for 15-byte canon...");

    let sha256 = fingerprint_bytes(DigestAlgorithm::Sha256, GOLDEN_CONTENT);
    assert_eq!(sha256.digest_hexadecimal, GOLDEN_SHA256);
    assert_eq!(sha256.size_bytes, 15);

    let sha3 = fingerprint_bytes(DigestAlgorithm::Sha3_256, GOLDEN_CONTENT);
    assert_eq!(sha3.digest_hexadecimal, GOLDEN_SHA3_256);

    let blake2b = fingerprint_bytes(DigestAlgorithm::Blake2b256, GOLDEN_CONTENT);
    assert_eq!(blake2b.digest_hexadecimal, GOLDEN_BLAKE2B_256);

    println!("   ✅ [SUCCESS]: Three suites bit-perfect against golden file.");
}

#[test]
fn certify_single_byte_tamper_changes_the_fingerprint() {
    let tampered = fingerprint_bytes(DigestAlgorithm::Sha256, b"Hello, VerSafe!\n");
    assert_eq!(tampered.digest_hexadecimal, TAMPERED_SHA256);
    assert_ne!(tampered.digest_hexadecimal, GOLDEN_SHA256);
}

#[test]
fn certify_dual_fingerprint_divergence_is_fatal() {
    let mut engine = StreamingHasher::new_dual(DigestAlgorithm::Sha256, DigestAlgorithm::Blake2b256);
    engine.absorb_chunk(GOLDEN_CONTENT);
    let (primary, secondary) = engine.finalize();
    let secondary = secondary.expect("dual mode yields secondary");

    // Coherente sobre los bytes originales.
    assert!(certify_dual_fingerprint(GOLDEN_CONTENT, &primary, &secondary).is_ok());

    // Divergente sobre bytes alterados: fallo fatal de ingesta.
    assert!(certify_dual_fingerprint(b"Hello, VerSafe!\n", &primary, &secondary).is_err());
}
