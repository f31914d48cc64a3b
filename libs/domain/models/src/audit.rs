// [libs/domain/models/src/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT DOMAIN MODELS (V3.1 - CHAIN SEALED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: REGISTRO ENCADENADO DE OPERACIONES MUTANTES
 *
 * # Mathematical Proof (Chain Integrity):
 * entry_hash = SHA-256(prev_hash ‖ canonical(record)). La forma
 * canónica serializa los campos en orden de declaración fijo, por lo
 * que recomputar la cadena de un shard (service, day) reproduce cada
 * entry_hash almacenado; cualquier mutación u omisión rompe el enlace
 * en el primer registro alterado.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Valor de génesis de cada shard (service, day) de la cadena.
pub const AUDIT_CHAIN_GENESIS: &str = "VERSAFE_AUDIT_GENESIS_V3";

/// Registro de auditoría de una operación mutante.
///
/// El orden de declaración de los campos ES el orden canónico de
/// serialización; no reordenar sin re-sellar las cadenas existentes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Servicio emisor (p.ej. 'document-ingest', 'signature-engine').
    pub service: String,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub resource_kind: String,
    pub resource_id: String,
    /// Metadatos de la petición ya sanitizados (sin credenciales).
    pub request_meta: serde_json::Value,
    pub status_code: u16,
    pub latency_milliseconds: u64,
    /// Día del shard en formato YYYY-MM-DD (UTC).
    pub shard_day: String,
    pub prev_hash_hexadecimal: String,
    pub entry_hash_hexadecimal: String,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Forma canónica del registro: los campos de contenido en orden
    /// fijo, excluyendo los dos hashes (que son función de esta forma).
    pub fn canonical_form(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.id,
            self.service,
            self.action,
            self.user_id.map(|u| u.to_string()).unwrap_or_default(),
            self.resource_kind,
            self.resource_id,
            self.request_meta,
            self.status_code,
            self.latency_milliseconds,
            self.shard_day,
        )
    }

    /// Sella el registro contra el hash previo de su shard.
    pub fn seal(&mut self, previous_entry_hash: &str) {
        self.prev_hash_hexadecimal = previous_entry_hash.to_string();
        self.entry_hash_hexadecimal =
            compute_entry_hash(previous_entry_hash, &self.canonical_form());
    }

    /// Re-verifica el sello contra un hash previo dado.
    pub fn verify_seal(&self, previous_entry_hash: &str) -> bool {
        self.prev_hash_hexadecimal == previous_entry_hash
            && self.entry_hash_hexadecimal
                == compute_entry_hash(previous_entry_hash, &self.canonical_form())
    }
}

/// entry_hash = SHA-256(prev_hash ‖ canonical(record)).
pub fn compute_entry_hash(previous_entry_hash: &str, canonical_record: &str) -> String {
    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(previous_entry_hash.as_bytes());
    sha256_hasher.update(canonical_record.as_bytes());
    hex::encode(sha256_hasher.finalize())
}
