// [libs/core/signer/src/suites.rs]
/*!
 * =================================================================
 * APARATO: ASYMMETRIC SUITE DISPATCH (V3.1 - TRIAD)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: FIRMA Y VERIFICACIÓN POR SUITE ENROLADA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT DISPATCH: match por variante; el despacho jamás es
 *    implícito ni depende de la forma del blob.
 * 2. ENCODING DISCIPLINE: RSA y P-256 persisten material en DER
 *    (PKCS#8 / SPKI); Ed25519 persiste semilla y clave de 32 bytes.
 * =================================================================
 */

use ed25519_dalek::{
    Signature as Ed25519Signature, Signer as Ed25519Signer, SigningKey as Ed25519SigningKey,
    Verifier as Ed25519Verifier, VerifyingKey as Ed25519VerifyingKey,
};
use p256::ecdsa::signature::{Signer as EcdsaSigner, Verifier as EcdsaVerifier};
use p256::ecdsa::{
    Signature as EcdsaSignature, SigningKey as EcdsaSigningKey, VerifyingKey as EcdsaVerifyingKey,
};
use p256::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::pss::{
    BlindedSigningKey as PssSigningKey, Signature as PssSignature,
    VerifyingKey as PssVerifyingKey,
};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::SignerError;

/// Suites asimétricas soportadas por el enrolamiento.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KeySuite {
    RsaPssSha256,
    EcdsaP256Sha256,
    Ed25519,
}

impl KeySuite {
    /// Etiqueta del método de verificación persistida junto a la firma.
    pub fn verification_method(&self) -> &'static str {
        match self {
            Self::RsaPssSha256 => "rsa-pss-sha256",
            Self::EcdsaP256Sha256 => "ecdsa-p256-sha256",
            Self::Ed25519 => "ed25519",
        }
    }

    pub fn from_method_label(label: &str) -> Option<Self> {
        match label {
            "rsa-pss-sha256" => Some(Self::RsaPssSha256),
            "ecdsa-p256-sha256" => Some(Self::EcdsaP256Sha256),
            "ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }
}

/// Firma 'payload' con la clave privada persistida de la suite.
///
/// # Errors:
/// 'KeyParseFault' si el blob no reconstruye una clave de la suite.
pub fn sign_payload(
    suite: KeySuite,
    private_key_blob: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, SignerError> {
    match suite {
        KeySuite::RsaPssSha256 => {
            let private_key = RsaPrivateKey::from_pkcs8_der(private_key_blob)
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?;
            let signing_key = PssSigningKey::<Sha256>::new(private_key);
            let signature = signing_key.sign_with_rng(&mut rand::thread_rng(), payload);
            Ok(signature.to_vec())
        }
        KeySuite::EcdsaP256Sha256 => {
            let signing_key = EcdsaSigningKey::from_pkcs8_der(private_key_blob)
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?;
            let signature: EcdsaSignature = signing_key.sign(payload);
            Ok(signature.to_vec())
        }
        KeySuite::Ed25519 => {
            let seed: [u8; 32] = private_key_blob
                .try_into()
                .map_err(|_| SignerError::KeyParseFault("ED25519_SEED_LENGTH".into()))?;
            let signing_key = Ed25519SigningKey::from_bytes(&seed);
            let signature = signing_key.sign(payload);
            Ok(signature.to_bytes().to_vec())
        }
    }
}

/// Verifica 'signature_blob' sobre 'payload' con la clave pública.
///
/// # Errors:
/// 'SignatureInvalid' ante cualquier rechazo criptográfico;
/// 'KeyParseFault' si el material público no reconstruye.
pub fn verify_payload(
    suite: KeySuite,
    public_key_blob: &[u8],
    payload: &[u8],
    signature_blob: &[u8],
) -> Result<(), SignerError> {
    match suite {
        KeySuite::RsaPssSha256 => {
            let public_key = RsaPublicKey::from_public_key_der(public_key_blob)
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?;
            let verifying_key = PssVerifyingKey::<Sha256>::new(public_key);
            let signature = PssSignature::try_from(signature_blob)
                .map_err(|_| SignerError::SignatureInvalid)?;
            verifying_key
                .verify(payload, &signature)
                .map_err(|_| SignerError::SignatureInvalid)
        }
        KeySuite::EcdsaP256Sha256 => {
            let verifying_key = EcdsaVerifyingKey::from_public_key_der(public_key_blob)
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?;
            let signature = EcdsaSignature::from_slice(signature_blob)
                .map_err(|_| SignerError::SignatureInvalid)?;
            verifying_key
                .verify(payload, &signature)
                .map_err(|_| SignerError::SignatureInvalid)
        }
        KeySuite::Ed25519 => {
            let public_bytes: [u8; 32] = public_key_blob
                .try_into()
                .map_err(|_| SignerError::KeyParseFault("ED25519_PUBLIC_LENGTH".into()))?;
            let verifying_key = Ed25519VerifyingKey::from_bytes(&public_bytes)
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?;
            let signature_bytes: [u8; 64] = signature_blob
                .try_into()
                .map_err(|_| SignerError::SignatureInvalid)?;
            let signature = Ed25519Signature::from_bytes(&signature_bytes);
            verifying_key
                .verify(payload, &signature)
                .map_err(|_| SignerError::SignatureInvalid)
        }
    }
}
