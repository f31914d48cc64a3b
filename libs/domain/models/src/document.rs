// [libs/domain/models/src/document.rs]
/*!
 * =================================================================
 * APARATO: DOCUMENT DOMAIN MODELS (V4.1 - STATE MACHINE SEALED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDAD DOCUMENTO Y MÁQUINA DE ESTADOS MONOTÓNICA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MONOTONIC LATTICE: Las transiciones sólo avanzan; REVOKED y
 *    EXPIRED son sumideros irreversibles del grafo.
 * 2. DUAL-HASH READY: Campos secundarios de digest para el nivel
 *    CRITICAL, donde la divergencia es un fallo fatal de ingesta.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta en los campos.
 *
 * # Mathematical Proof (State Monotonicity):
 * El grafo de transiciones es un DAG con dos sumideros laterales.
 * 'can_transition_to' codifica la relación de orden; toda mutación de
 * estado en L3 debe pasar por este predicado, por lo que un estado
 * nunca retrocede en el retículo.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Algoritmos de huella digital soportados por el núcleo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DigestAlgorithm {
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-3-256")]
    Sha3_256,
    #[serde(rename = "BLAKE2b-256")]
    Blake2b256,
}

impl DigestAlgorithm {
    /// Etiqueta canónica persistida en el Ledger y el Metadata Store.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha3_256 => "SHA-3-256",
            Self::Blake2b256 => "BLAKE2b-256",
        }
    }

    /// Reconstruye el algoritmo desde su etiqueta persistida.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "SHA-256" => Some(Self::Sha256),
            "SHA-3-256" => Some(Self::Sha3_256),
            "BLAKE2b-256" => Some(Self::Blake2b256),
            _ => None,
        }
    }
}

/// Niveles de seguridad del documento. CRITICAL exige doble huella
/// y un mínimo de dos firmantes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SecurityLevel {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Mínimo de firmas exigidas por el nivel (CRITICAL >= 2).
    pub fn minimum_signatures_required(&self) -> u32 {
        match self {
            Self::Critical => 2,
            _ => 1,
        }
    }

    /// CRITICAL computa dos algoritmos independientes en la ingesta.
    pub fn requires_dual_digest(&self) -> bool {
        matches!(self, Self::Critical)
    }
}

/// Estados del ciclo de vida del documento.
///
/// REGISTRATION_PENDING es un estado de primera clase: el documento
/// existe en el Metadata Store pero su registro en el Ledger sigue en
/// el Outbox; ningún firmante puede operar sobre él.
/// QUARANTINED es el sub-estado de integridad fallida: invisible en
/// listados de usuario y no eliminable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentState {
    Uploaded,
    RegistrationPending,
    Quarantined,
    PartiallySigned,
    Signed,
    Verified,
    Revoked,
    Expired,
}

impl DocumentState {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::RegistrationPending => "REGISTRATION_PENDING",
            Self::Quarantined => "QUARANTINED",
            Self::PartiallySigned => "PARTIALLY_SIGNED",
            Self::Signed => "SIGNED",
            Self::Verified => "VERIFIED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "UPLOADED" => Some(Self::Uploaded),
            "REGISTRATION_PENDING" => Some(Self::RegistrationPending),
            "QUARANTINED" => Some(Self::Quarantined),
            "PARTIALLY_SIGNED" => Some(Self::PartiallySigned),
            "SIGNED" => Some(Self::Signed),
            "VERIFIED" => Some(Self::Verified),
            "REVOKED" => Some(Self::Revoked),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Sumideros del grafo: ninguna transición sale de ellos.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked | Self::Expired)
    }

    /// Estados en los que el Motor de Firmas acepta nuevas firmas.
    /// REGISTRATION_PENDING queda explícitamente excluido.
    pub fn accepts_signatures(&self) -> bool {
        matches!(self, Self::Uploaded | Self::PartiallySigned)
    }

    /// Predicado de monotonía del retículo de estados.
    ///
    /// - REVOKED es alcanzable desde cualquier estado no terminal.
    /// - EXPIRED es alcanzable desde cualquier estado no terminal.
    /// - El avance nominal sigue UPLOADED -> PARTIALLY_SIGNED -> SIGNED
    ///   -> VERIFIED; QUARANTINED sólo desde UPLOADED/SIGNED/VERIFIED
    ///   tras un fallo de integridad.
    pub fn can_transition_to(&self, next: DocumentState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return false;
        }
        match next {
            DocumentState::Revoked | DocumentState::Expired => true,
            DocumentState::Uploaded => matches!(self, Self::RegistrationPending),
            // Democión sancionada: el paso de registro agotó su techo y
            // la fila no se revierte; el Outbox la reconciliará.
            DocumentState::RegistrationPending => matches!(self, Self::Uploaded),
            DocumentState::Quarantined => {
                matches!(self, Self::Uploaded | Self::Signed | Self::Verified)
            }
            DocumentState::PartiallySigned => matches!(self, Self::Uploaded),
            DocumentState::Signed => matches!(self, Self::Uploaded | Self::PartiallySigned),
            DocumentState::Verified => matches!(self, Self::Signed),
        }
    }

    /// Estado resultante tras alcanzar 'valid_signature_count' firmas
    /// válidas sobre un documento que exige 'signatures_required'.
    pub fn state_for_signature_count(
        valid_signature_count: u32,
        signatures_required: u32,
    ) -> DocumentState {
        if valid_signature_count == 0 {
            DocumentState::Uploaded
        } else if valid_signature_count < signatures_required {
            DocumentState::PartiallySigned
        } else {
            DocumentState::Signed
        }
    }
}

/// Entidad Documento: unidad soberana de integridad del sistema.
///
/// Invariantes: 'digest_hexadecimal' es estable de por vida; una vez
/// fijado 'ledger_transaction_identifier' jamás se muta; el estado sólo
/// avanza según 'DocumentState::can_transition_to'.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
    /// Referencia opaca al almacén de bytes (sólo Ingest escribe).
    pub storage_ref: String,
    pub digest_algorithm: DigestAlgorithm,
    pub digest_hexadecimal: String,
    /// Segunda huella independiente, presente sólo en nivel CRITICAL.
    pub secondary_digest_algorithm: Option<DigestAlgorithm>,
    pub secondary_digest_hexadecimal: Option<String>,
    pub security_level: SecurityLevel,
    pub signatures_required: u32,
    pub state: DocumentState,
    /// Marca de advertencia estampada por un veredicto SUSPICIOUS.
    pub scan_warning: bool,
    pub ledger_transaction_identifier: Option<String>,
    pub ledger_block_height: Option<u64>,
    /// Hay operaciones del Ledger para este documento esperando en el
    /// Outbox; las transiciones de estado quedan bloqueadas hasta drenar.
    pub ledger_pending: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Un documento ha sobrepasado su ventana de validez temporal.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|deadline| now >= deadline).unwrap_or(false)
    }
}

/// Metadatos best-effort extraídos tras la ingesta (conteo de páginas,
/// dimensiones). Los errores de extracción se capturan aquí, nunca
/// abortan la ingesta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentExtractedMetadata {
    pub page_count: Option<u32>,
    pub extraction_error: Option<String>,
}
