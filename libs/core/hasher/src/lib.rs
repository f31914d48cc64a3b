// [libs/core/hasher/src/lib.rs]
/*!
 * =================================================================
 * APARATO: STREAMING DIGEST ENGINE (V3.0 - DUAL HASH READY)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: HUELLA CANÓNICA DE CONTENIDO EN UN SOLO PASO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE PASS: El flujo de bytes alimenta todos los digests activos
 *    en una sola pasada; el mismo input produce el mismo output
 *    bit-a-bit en cualquier host.
 * 2. DUAL HASH: Para nivel CRITICAL se computan dos algoritmos
 *    independientes simultáneamente; la divergencia posterior entre
 *    ambos es un fallo fatal de ingesta (Integrity).
 *
 * # Mathematical Proof (Stream Equivalence):
 * Digest(concat(chunks)) == fold(update, chunks) para las tres suites
 * Merkle-Damgård/esponja empleadas, por lo que trocear el stream en
 * fragmentos arbitrarios no altera la huella resultante.
 * =================================================================
 */

use blake2::Blake2b;
use blake2::digest::consts::U32;
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use thiserror::Error;
use versafe_domain_models::document::DigestAlgorithm;

type Blake2b256 = Blake2b<U32>;

/// Catálogo de fallos del motor de huellas.
#[derive(Error, Debug)]
pub enum HasherError {
    /// Las dos huellas independientes de un documento CRITICAL divergen
    /// al recomputarse: evidencia de corrupción durante la ingesta.
    #[error("[L1_HASH_FAULT]: DUAL_DIGEST_DIVERGENCE -> primary={primary_hexadecimal} secondary={secondary_hexadecimal}")]
    DualDigestDivergence {
        primary_hexadecimal: String,
        secondary_hexadecimal: String,
    },
}

/// Resultado de una huella completada: algoritmo, digest y tamaño.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub algorithm: DigestAlgorithm,
    pub digest_hexadecimal: String,
    pub size_bytes: u64,
}

/// Estado interno de una suite en curso.
enum RunningDigest {
    Sha256(Sha256),
    Sha3(Sha3_256),
    Blake2(Blake2b256),
}

impl RunningDigest {
    fn ignite(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha3_256 => Self::Sha3(Sha3_256::new()),
            DigestAlgorithm::Blake2b256 => Self::Blake2(Blake2b256::new()),
        }
    }

    fn absorb(&mut self, chunk: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(chunk),
            Self::Sha3(hasher) => hasher.update(chunk),
            Self::Blake2(hasher) => hasher.update(chunk),
        }
    }

    fn crystallize(self) -> String {
        match self {
            Self::Sha256(hasher) => hex::encode(hasher.finalize()),
            Self::Sha3(hasher) => hex::encode(hasher.finalize()),
            Self::Blake2(hasher) => hex::encode(hasher.finalize()),
        }
    }
}

/// Motor de huella en streaming. Alimentar con 'absorb_chunk' y sellar
/// con 'finalize'; el mismo flujo de bytes produce la misma huella.
pub struct StreamingHasher {
    primary_algorithm: DigestAlgorithm,
    primary_digest: RunningDigest,
    /// Segunda suite independiente, activa sólo en modo dual (CRITICAL).
    secondary: Option<(DigestAlgorithm, RunningDigest)>,
    absorbed_bytes: u64,
}

impl StreamingHasher {
    /// Motor de huella simple con el algoritmo seleccionado.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            primary_algorithm: algorithm,
            primary_digest: RunningDigest::ignite(algorithm),
            secondary: None,
            absorbed_bytes: 0,
        }
    }

    /// Motor de doble huella para documentos CRITICAL: la suite
    /// secundaria corre en paralelo sobre el mismo flujo.
    pub fn new_dual(
        primary_algorithm: DigestAlgorithm,
        secondary_algorithm: DigestAlgorithm,
    ) -> Self {
        Self {
            primary_algorithm,
            primary_digest: RunningDigest::ignite(primary_algorithm),
            secondary: Some((
                secondary_algorithm,
                RunningDigest::ignite(secondary_algorithm),
            )),
            absorbed_bytes: 0,
        }
    }

    /// Absorbe un fragmento del stream en todas las suites activas.
    pub fn absorb_chunk(&mut self, chunk: &[u8]) {
        self.primary_digest.absorb(chunk);
        if let Some((_, secondary_digest)) = self.secondary.as_mut() {
            secondary_digest.absorb(chunk);
        }
        self.absorbed_bytes += chunk.len() as u64;
    }

    /// Sella el motor y devuelve la huella primaria más la secundaria
    /// si el modo dual estaba activo.
    pub fn finalize(self) -> (ContentFingerprint, Option<ContentFingerprint>) {
        let size_bytes = self.absorbed_bytes;
        let primary = ContentFingerprint {
            algorithm: self.primary_algorithm,
            digest_hexadecimal: self.primary_digest.crystallize(),
            size_bytes,
        };
        let secondary = self.secondary.map(|(algorithm, digest)| ContentFingerprint {
            algorithm,
            digest_hexadecimal: digest.crystallize(),
            size_bytes,
        });
        (primary, secondary)
    }
}

/// Huella de un buffer completo en memoria (rutas de verificación).
pub fn fingerprint_bytes(algorithm: DigestAlgorithm, content: &[u8]) -> ContentFingerprint {
    let mut engine = StreamingHasher::new(algorithm);
    engine.absorb_chunk(content);
    let (fingerprint, _) = engine.finalize();
    fingerprint
}

/// Valida la coherencia de la doble huella de un documento CRITICAL
/// re-computando ambas suites sobre los mismos bytes.
///
/// # Errors:
/// 'DualDigestDivergence' si alguna de las dos huellas recomputadas no
/// reproduce la almacenada.
pub fn certify_dual_fingerprint(
    content: &[u8],
    stored_primary: &ContentFingerprint,
    stored_secondary: &ContentFingerprint,
) -> Result<(), HasherError> {
    let recomputed_primary = fingerprint_bytes(stored_primary.algorithm, content);
    let recomputed_secondary = fingerprint_bytes(stored_secondary.algorithm, content);

    if recomputed_primary.digest_hexadecimal != stored_primary.digest_hexadecimal
        || recomputed_secondary.digest_hexadecimal != stored_secondary.digest_hexadecimal
    {
        return Err(HasherError::DualDigestDivergence {
            primary_hexadecimal: recomputed_primary.digest_hexadecimal,
            secondary_hexadecimal: recomputed_secondary.digest_hexadecimal,
        });
    }
    Ok(())
}
