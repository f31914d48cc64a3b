// [libs/domain/models/src/signature.rs]
/*!
 * =================================================================
 * APARATO: SIGNATURE DOMAIN MODELS (V4.0 - TAGGED VARIANTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE FIRMA Y SELLO DEL FIRMANTE
 *
 * # Mathematical Proof (Signer Hash Binding):
 * signer_hash = SHA-256(digest ‖ signer_id ‖ timestamp ‖ nonce) liga la
 * firma al contenido exacto del documento y a un instante irrepetible.
 * Dos firmas del mismo firmante sobre el mismo documento difieren en
 * nonce, pero la unicidad (document_id, signer_id) las prohíbe en L3.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Variantes etiquetadas de firma. El despacho es explícito: cada
/// variante tiene su propia semántica de producción y verificación.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureKind {
    /// Imagen rasterizada o etiqueta de texto; válida si es bien formada.
    Electronic,
    /// Firma asimétrica (RSA-PSS, ECDSA-P256 o Ed25519) con certificado.
    Digital,
    /// Rasgos biométricos procesados más puntuación de confianza.
    Biometric,
}

impl SignatureKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Electronic => "ELECTRONIC",
            Self::Digital => "DIGITAL",
            Self::Biometric => "BIOMETRIC",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ELECTRONIC" => Some(Self::Electronic),
            "DIGITAL" => Some(Self::Digital),
            "BIOMETRIC" => Some(Self::Biometric),
            _ => None,
        }
    }
}

/// Entidad Firma persistida en el Metadata Store.
///
/// Invariantes: (document_id, signer_id) es único; 'signer_hash' es
/// estable tras la creación; sólo se produce sobre documentos en un
/// estado que acepta firmas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signer_id: Uuid,
    pub kind: SignatureKind,
    /// Payload crudo, semántica según la variante (imagen, firma
    /// asimétrica o rasgos biométricos). Transporte en base64 por JSON.
    pub payload: Vec<u8>,
    /// Sello del firmante: SHA-256(digest ‖ signer_id ‖ ts ‖ nonce).
    pub signer_hash_hexadecimal: String,
    /// Método declarado de verificación (p.ej. 'rsa-pss-sha256').
    pub verification_method: String,
    pub verified: bool,
    pub ledger_transaction_identifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Computa el sello del firmante de forma determinista.
///
/// La concatenación es bit-a-bit sobre las representaciones canónicas:
/// digest en hexadecimal, UUID en forma hyphenated, timestamp RFC 3339
/// y nonce en hexadecimal.
pub fn compute_signer_hash(
    document_digest_hexadecimal: &str,
    signer_id: &Uuid,
    signing_timestamp: &DateTime<Utc>,
    nonce_hexadecimal: &str,
) -> String {
    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(document_digest_hexadecimal.as_bytes());
    sha256_hasher.update(signer_id.to_string().as_bytes());
    sha256_hasher.update(signing_timestamp.to_rfc3339().as_bytes());
    sha256_hasher.update(nonce_hexadecimal.as_bytes());
    hex::encode(sha256_hasher.finalize())
}
