// [tests/mirror/libs/domain/identity/token_lifecycle.test.rs]
/**
 * =================================================================
 * APARATO: TOKEN LIFECYCLE TEST (V3.0 - ROTATION AWARE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-IDENTITY)
 * RESPONSABILIDAD: CERTIFICACIÓN DE EMISIÓN, VENTANA Y ROTACIÓN
 * =================================================================
 */

use chrono::Duration;
use uuid::Uuid;
use versafe_domain_identity::{IdentityError, SigningKeySet, TokenMint};

const KEY_SET_ALPHA: &str = r#"{"kid-2026a": "alpha-secret-material-0123456789"}"#;
const KEY_SET_ROTATED_OUT: &str = r#"{"kid-2026b": "beta-secret-material-9876543210"}"#;
const KEY_SET_BOTH: &str = r#"{"kid-2026a": "alpha-secret-material-0123456789", "kid-2026b": "beta-secret-material-9876543210"}"#;

fn mint_with(raw_key_set: &str, token_ttl_seconds: i64) -> TokenMint {
    TokenMint::new(
        SigningKeySet::from_environment_value(raw_key_set).expect("key set"),
        Duration::seconds(token_ttl_seconds),
        Duration::days(14),
    )
}

#[test]
fn certify_issue_verify_roundtrip() {
    println!("\n🧪 [PROVING_GROUNDS]: Auditing token roundtrip...");

    let mint = mint_with(KEY_SET_ALPHA, 900);
    let user_id = Uuid::new_v4();
    let pair = mint.issue(user_id, "alice@versafe.io", "Alice").expect("issue");

    let principal = mint.verify(&pair.token).expect("verify");
    assert_eq!(principal.user_id, user_id);
    assert_eq!(principal.email, "alice@versafe.io");
    assert_eq!(principal.display_name, "Alice");

    // El refresh es material opaco de 32 bytes en hexadecimal.
    assert_eq!(pair.refresh.len(), 64);

    println!("   ✅ [SUCCESS]: Token parity confirmed.");
}

#[test]
fn certify_tampered_token_is_rejected() {
    let mint = mint_with(KEY_SET_ALPHA, 900);
    let pair = mint.issue(Uuid::new_v4(), "alice@versafe.io", "Alice").unwrap();

    // Mutar un byte del segmento de claims invalida la firma.
    let mut segments: Vec<String> = pair.token.split('.').map(|s| s.to_string()).collect();
    segments[1] = format!("{}A", &segments[1][..segments[1].len() - 1]);
    let tampered = segments.join(".");

    assert!(matches!(mint.verify(&tampered), Err(IdentityError::InvalidToken)));
    assert!(matches!(mint.verify("not-a-token"), Err(IdentityError::InvalidToken)));
}

#[test]
fn certify_expired_token_fails_with_expired() {
    let mint = mint_with(KEY_SET_ALPHA, -5);
    let pair = mint.issue(Uuid::new_v4(), "alice@versafe.io", "Alice").unwrap();
    assert!(matches!(mint.verify(&pair.token), Err(IdentityError::Expired)));
}

#[test]
fn certify_rotated_out_kid_is_unknown_but_active_set_verifies() {
    // Token emitido bajo el kid alfa.
    let alpha_mint = mint_with(KEY_SET_ALPHA, 900);
    let pair = alpha_mint.issue(Uuid::new_v4(), "alice@versafe.io", "Alice").unwrap();

    // Con el conjunto rotado por completo, el kid alfa es desconocido.
    let rotated_mint = mint_with(KEY_SET_ROTATED_OUT, 900);
    assert!(matches!(rotated_mint.verify(&pair.token), Err(IdentityError::Unknown)));

    // Un conjunto que conserva el kid alfa sigue aceptándolo.
    let dual_mint = mint_with(KEY_SET_BOTH, 900);
    assert!(dual_mint.verify(&pair.token).is_ok());
}
