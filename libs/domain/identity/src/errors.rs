// [libs/domain/identity/src/errors.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY ERROR CATALOG (V3.0)
 * CLASIFICACIÓN: DOMAIN SERVICE (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE IDENTIDAD
 *
 * Nota de propagación: ninguno de estos mensajes revela qué factor
 * concreto falló al cliente final; el Gateway colapsa todos en el
 * kind 'Auth' del contrato de errores.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// Token malformado o con firma inválida.
    #[error("[L2_IDENTITY_FAULT]: TOKEN_REJECTED")]
    InvalidToken,

    /// Token bien formado pero fuera de su ventana de validez.
    #[error("[L2_IDENTITY_FAULT]: TOKEN_EXPIRED")]
    Expired,

    /// El 'kid' del token no pertenece al conjunto de claves activo.
    #[error("[L2_IDENTITY_FAULT]: SIGNER_UNKNOWN")]
    Unknown,

    /// TOKEN_SIGNING_KEY_SET vacío o malformado en el entorno.
    #[error("[L2_IDENTITY_CONFIG_FAULT]: KEY_SET_MALFORMED -> {0}")]
    KeySetMalformed(String),

    /// Fallo del KDF al sellar o verificar una contraseña.
    #[error("[L2_IDENTITY_FAULT]: PASSWORD_KDF_FAULT -> {0}")]
    PasswordHashFault(String),
}
