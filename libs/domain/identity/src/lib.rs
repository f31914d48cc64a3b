// [libs/domain/identity/src/lib.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY VERIFIER CORE (V3.0 - ROTATING KEYS)
 * CLASIFICACIÓN: DOMAIN SERVICE (ESTRATO L2)
 * RESPONSABILIDAD: VERIFICACIÓN DE PORTADORES E IDENTIDAD PRINCIPAL
 * =================================================================
 */

pub mod cache;
pub mod errors;
pub mod keyset;
pub mod passwords;
pub mod tokens;

pub use cache::PrincipalCache;
pub use errors::IdentityError;
pub use keyset::SigningKeySet;
pub use tokens::{IssuedTokenPair, Principal, TokenClaims, TokenMint};
