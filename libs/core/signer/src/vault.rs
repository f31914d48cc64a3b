// [libs/core/signer/src/vault.rs]
/*!
 * =================================================================
 * APARATO: SEALED KEY VAULT (V3.2 - PROCESS SCOPED)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: BÓVEDA DE MATERIAL DE FIRMA CON SELLADO AEAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RAM RESIDENCY: El material privado vive en el proceso; el disco
 *    sólo ve el blob sellado (PBKDF2-KEK + AES-256-GCM).
 * 2. WRITE-THROUGH: El enrolamiento persiste de inmediato el blob
 *    sellado para sobrevivir reinicios del Gateway.
 *
 * # Mathematical Proof (Seal Confidentiality):
 * El KEK se deriva con PBKDF2-HMAC-SHA256 (600k iteraciones) de la
 * frase de sellado más una sal aleatoria de 16 bytes; AES-GCM con
 * nonce de 12 bytes aleatorio autentica el blob completo. Un blob
 * alterado o una frase incorrecta fallan en la etiqueta GCM.
 * =================================================================
 */

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use chrono::Utc;
use p256::pkcs8::{EncodePrivateKey as _, EncodePublicKey as _};
use rand::RngCore;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::certificate::SignerCertificate;
use crate::errors::SignerError;
use crate::suites::KeySuite;

const KEK_DERIVATION_ITERATIONS: u32 = 600_000;
const SEAL_SALT_LENGTH: usize = 16;
const GCM_NONCE_LENGTH: usize = 12;
/// Ventana de validez por defecto de los certificados de enrolamiento.
const ENROLLMENT_VALIDITY_DAYS: i64 = 365;

/// Material de firma enrolado de un firmante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledKeyMaterial {
    pub signer_id: Uuid,
    pub suite: KeySuite,
    /// PKCS#8 DER para RSA/P-256, semilla cruda de 32 bytes en Ed25519.
    pub private_key_blob: Vec<u8>,
    /// SPKI DER para RSA/P-256, clave cruda de 32 bytes en Ed25519.
    pub public_key_blob: Vec<u8>,
    pub certificate: SignerCertificate,
    pub enrolled_at: chrono::DateTime<Utc>,
}

/// Forma persistida del blob sellado en SIGNING_KEY_STORE.
#[derive(Serialize, Deserialize)]
struct SealedVaultBlob {
    kdf_salt_hexadecimal: String,
    gcm_nonce_hexadecimal: String,
    ciphertext_base64: String,
}

/// Bóveda en proceso: mapa firmante -> material enrolado.
pub struct KeyVault {
    enrolled_material: HashMap<Uuid, EnrolledKeyMaterial>,
}

impl KeyVault {
    pub fn empty() -> Self {
        Self { enrolled_material: HashMap::new() }
    }

    /// Des-sella la bóveda desde el almacén externo. Un almacén ausente
    /// arranca una bóveda vacía (primer despliegue).
    #[instrument(skip(sealing_phrase))]
    pub fn unseal_from(store_path: &Path, sealing_phrase: &str) -> Result<Self, SignerError> {
        if !store_path.exists() {
            warn!("🔑 [KEY_VAULT]: Store absent at {:?}. Igniting empty vault.", store_path);
            return Ok(Self::empty());
        }

        let sealed_raw = std::fs::read_to_string(store_path)
            .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?;
        let sealed_blob: SealedVaultBlob = serde_json::from_str(&sealed_raw)
            .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?;

        let kdf_salt = hex::decode(&sealed_blob.kdf_salt_hexadecimal)
            .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?;
        let gcm_nonce = hex::decode(&sealed_blob.gcm_nonce_hexadecimal)
            .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?;
        let ciphertext = {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD
                .decode(&sealed_blob.ciphertext_base64)
                .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?
        };

        let kek = derive_kek(sealing_phrase, &kdf_salt);
        let cipher = Aes256Gcm::new_from_slice(&kek)
            .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&gcm_nonce), ciphertext.as_ref())
            .map_err(|_| SignerError::StoreUnsealFault("GCM_TAG_REJECTED".into()))?;

        let enrolled: Vec<EnrolledKeyMaterial> = serde_json::from_slice(&plaintext)
            .map_err(|e| SignerError::StoreUnsealFault(e.to_string()))?;

        info!("🔓 [KEY_VAULT]: Unsealed {} enrolled signer(s).", enrolled.len());

        Ok(Self {
            enrolled_material: enrolled.into_iter().map(|m| (m.signer_id, m)).collect(),
        })
    }

    /// Sella la bóveda completa hacia el almacén externo.
    #[instrument(skip(self, sealing_phrase))]
    pub fn seal_to(&self, store_path: &Path, sealing_phrase: &str) -> Result<(), SignerError> {
        let mut kdf_salt = [0u8; SEAL_SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut kdf_salt);
        let mut gcm_nonce = [0u8; GCM_NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut gcm_nonce);

        let plaintext = serde_json::to_vec(
            &self.enrolled_material.values().cloned().collect::<Vec<_>>(),
        )
        .map_err(|e| SignerError::StoreSealFault(e.to_string()))?;

        let kek = derive_kek(sealing_phrase, &kdf_salt);
        let cipher = Aes256Gcm::new_from_slice(&kek)
            .map_err(|e| SignerError::StoreSealFault(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&gcm_nonce), plaintext.as_ref())
            .map_err(|e| SignerError::StoreSealFault(e.to_string()))?;

        let sealed_blob = SealedVaultBlob {
            kdf_salt_hexadecimal: hex::encode(kdf_salt),
            gcm_nonce_hexadecimal: hex::encode(gcm_nonce),
            ciphertext_base64: {
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD.encode(&ciphertext)
            },
        };

        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SignerError::StoreSealFault(e.to_string()))?;
        }
        std::fs::write(
            store_path,
            serde_json::to_string_pretty(&sealed_blob)
                .map_err(|e| SignerError::StoreSealFault(e.to_string()))?,
        )
        .map_err(|e| SignerError::StoreSealFault(e.to_string()))?;

        info!("🔐 [KEY_VAULT]: Sealed {} signer(s) to {:?}.", self.enrolled_material.len(), store_path);
        Ok(())
    }

    /// Genera y enrola un par de claves nuevo para el firmante.
    #[instrument(skip(self))]
    pub fn enroll_signer(
        &mut self,
        signer_id: Uuid,
        suite: KeySuite,
    ) -> Result<&EnrolledKeyMaterial, SignerError> {
        let (private_key_blob, public_key_blob) = generate_key_pair(suite)?;

        let material = EnrolledKeyMaterial {
            signer_id,
            suite,
            private_key_blob,
            public_key_blob,
            certificate: SignerCertificate::issue_internal(signer_id, ENROLLMENT_VALIDITY_DAYS),
            enrolled_at: Utc::now(),
        };

        info!("🪪 [KEY_VAULT]: Signer {} enrolled with suite {:?}.", signer_id, suite);
        Ok(self.enrolled_material.entry(signer_id).or_insert(material))
    }

    /// Recupera el material enrolado del firmante.
    ///
    /// # Errors:
    /// 'NoKeyMaterial' si el firmante no está enrolado.
    pub fn material_for(&self, signer_id: &Uuid) -> Result<&EnrolledKeyMaterial, SignerError> {
        self.enrolled_material
            .get(signer_id)
            .ok_or_else(|| SignerError::NoKeyMaterial(signer_id.to_string()))
    }

    pub fn is_enrolled(&self, signer_id: &Uuid) -> bool {
        self.enrolled_material.contains_key(signer_id)
    }

    pub fn enrolled_count(&self) -> usize {
        self.enrolled_material.len()
    }

    /// Marca el certificado del firmante como revocado (write-through a
    /// cargo del llamador).
    pub fn revoke_certificate(&mut self, signer_id: &Uuid) -> Result<(), SignerError> {
        let material = self
            .enrolled_material
            .get_mut(signer_id)
            .ok_or_else(|| SignerError::NoKeyMaterial(signer_id.to_string()))?;
        material.certificate.revoked = true;
        Ok(())
    }
}

/// Deriva la clave de sellado (KEK) con PBKDF2-HMAC-SHA256.
fn derive_kek(sealing_phrase: &str, salt: &[u8]) -> [u8; 32] {
    let mut kek = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
        sealing_phrase.as_bytes(),
        salt,
        KEK_DERIVATION_ITERATIONS,
        &mut kek,
    );
    kek
}

/// Genera el par (privada, pública) en la codificación de la suite.
fn generate_key_pair(suite: KeySuite) -> Result<(Vec<u8>, Vec<u8>), SignerError> {
    match suite {
        KeySuite::RsaPssSha256 => {
            let private_key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?;
            let public_key = private_key.to_public_key();
            let private_der = private_key
                .to_pkcs8_der()
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?
                .as_bytes()
                .to_vec();
            let public_der = public_key
                .to_public_key_der()
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?
                .as_bytes()
                .to_vec();
            Ok((private_der, public_der))
        }
        KeySuite::EcdsaP256Sha256 => {
            let signing_key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
            let verifying_key = signing_key.verifying_key();
            let private_der = signing_key
                .to_pkcs8_der()
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?
                .as_bytes()
                .to_vec();
            let public_der = verifying_key
                .to_public_key_der()
                .map_err(|e| SignerError::KeyParseFault(e.to_string()))?
                .as_bytes()
                .to_vec();
            Ok((private_der, public_der))
        }
        KeySuite::Ed25519 => {
            let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::thread_rng());
            let private_seed = signing_key.to_bytes().to_vec();
            let public_bytes = signing_key.verifying_key().to_bytes().to_vec();
            Ok((private_seed, public_bytes))
        }
    }
}
