// [libs/core/signer/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DIGITAL SIGNATURE CORE (V3.1 - TRIAD SEALED)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: FIRMA Y VERIFICACIÓN ASIMÉTRICA CON CERTIFICADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT DISPATCH: Una variante por suite; ninguna jerarquía
 *    implícita. El llamador elige la suite enrolada del firmante.
 * 2. PROCESS-SCOPED SECRETS: El material privado vive en la bóveda
 *    en RAM; el sellado a disco ocurre fuera del núcleo (unseal en
 *    la ignición, write-through sólo en el enrolamiento).
 * =================================================================
 */

pub mod certificate;
pub mod errors;
pub mod suites;
pub mod vault;

pub use certificate::SignerCertificate;
pub use errors::SignerError;
pub use suites::{sign_payload, verify_payload, KeySuite};
pub use vault::{EnrolledKeyMaterial, KeyVault};

/// Construye el mensaje a firmar para una firma DIGITAL:
/// data = document.digest ‖ signer_id ‖ timestamp (formas canónicas).
pub fn build_signing_payload(
    document_digest_hexadecimal: &str,
    signer_id: &uuid::Uuid,
    signing_timestamp: &chrono::DateTime<chrono::Utc>,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(
        document_digest_hexadecimal.len() + 36 + 32,
    );
    payload.extend_from_slice(document_digest_hexadecimal.as_bytes());
    payload.extend_from_slice(signer_id.to_string().as_bytes());
    payload.extend_from_slice(signing_timestamp.to_rfc3339().as_bytes());
    payload
}
