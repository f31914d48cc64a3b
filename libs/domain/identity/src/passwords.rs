// [libs/domain/identity/src/passwords.rs]
/*!
 * =================================================================
 * APARATO: PASSWORD KDF (V2.0 - MEMORY HARD)
 * CLASIFICACIÓN: DOMAIN SERVICE (ESTRATO L2)
 * RESPONSABILIDAD: SELLADO Y VERIFICACIÓN DE CONTRASEÑAS (ARGON2id)
 * =================================================================
 */

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::IdentityError;

/// Sella una contraseña con Argon2id y sal aleatoria (forma PHC).
pub fn seal_password(plain_password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain_password.as_bytes(), &salt)
        .map(|sealed| sealed.to_string())
        .map_err(|e| IdentityError::PasswordHashFault(e.to_string()))
}

/// Verifica una contraseña contra su forma PHC almacenada.
/// Un hash ilegible o una contraseña incorrecta devuelven 'false';
/// el motivo concreto jamás se propaga al cliente.
pub fn verify_password(plain_password: &str, stored_phc_hash: &str) -> bool {
    match PasswordHash::new(stored_phc_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(plain_password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}
