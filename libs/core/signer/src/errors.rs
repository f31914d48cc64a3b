// [libs/core/signer/src/errors.rs]
/*!
 * =================================================================
 * APARATO: SIGNER ERROR CATALOG (V3.0)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS CRIPTOGRÁFICOS
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    /// El firmante no tiene par de claves enrolado en la bóveda.
    #[error("[L1_SIGNER_FAULT]: NO_KEY_MATERIAL -> signer {0}")]
    NoKeyMaterial(String),

    /// El material de clave persistido no pudo reconstruirse.
    #[error("[L1_SIGNER_FAULT]: KEY_MATERIAL_CORRUPTED -> {0}")]
    KeyParseFault(String),

    /// La firma no verifica contra la clave pública enrolada.
    #[error("[L1_SIGNER_FAULT]: SIGNATURE_REJECTED")]
    SignatureInvalid,

    /// El certificado está fuera de su ventana de validez.
    #[error("[L1_CERT_FAULT]: CERTIFICATE_OUTSIDE_VALIDITY_WINDOW")]
    CertificateExpired,

    /// El certificado fue revocado por el emisor.
    #[error("[L1_CERT_FAULT]: CERTIFICATE_REVOKED")]
    CertificateRevoked,

    /// Fallo al sellar la bóveda hacia el almacén externo.
    #[error("[L1_VAULT_FAULT]: SEAL_FAILURE -> {0}")]
    StoreSealFault(String),

    /// Fallo al des-sellar la bóveda (KEK incorrecta o blob corrupto).
    #[error("[L1_VAULT_FAULT]: UNSEAL_FAILURE -> {0}")]
    StoreUnsealFault(String),
}
