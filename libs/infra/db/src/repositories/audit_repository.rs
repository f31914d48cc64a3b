// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/audit_repository.rs]
/*!
 * =================================================================
 * APARATO: AUDIT CHAIN REPOSITORY (V4.3 - SHARDED CONTINUITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO ACÍDICO Y CADENA DE CONTINUIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SHARD DISCIPLINE: Cada shard (service, day) es una cadena
 *    independiente con su propio génesis; el orden total dentro del
 *    shard lo da el rowid de inserción.
 * 2. SINGLE WRITER: El sellado lo ejecuta únicamente el daemon de
 *    auditoría del Gateway, que serializa las escrituras por diseño.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{opt_value, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use libsql::{params, Row};
use tracing::{info, instrument, warn};
use versafe_domain_models::audit::{AuditRecord, AUDIT_CHAIN_GENESIS};

const AUDIT_COLUMNS: &str = "id, service, action, user_id, resource_kind, resource_id, \
     request_meta_json, status_code, latency_ms, shard_day, prev_hash_hex, entry_hash_hex, \
     created_at";

/// Desenlace de la verificación de cadena de un shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditChainReport {
    /// La cadena re-verifica completa; incluye el conteo de eslabones.
    Intact { record_count: usize },
    /// Primer eslabón roto detectado (índice 0-based dentro del shard).
    Broken { first_broken_index: usize },
}

pub struct AuditRepository {
    database_client: MetadataStoreClient,
}

impl AuditRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Sella y persiste un registro contra la cola de su shard.
    ///
    /// Lee el entry_hash del último eslabón del shard (service, day),
    /// encadena el registro y lo inserta. Devuelve el entry_hash.
    #[instrument(skip(self, record), fields(service = %record.service, action = %record.action))]
    pub async fn append_sealed(&self, mut record: AuditRecord) -> Result<String, DbError> {
        let connection = self.database_client.get_connection()?;

        let mut rows = connection
            .query(
                "SELECT entry_hash_hex FROM audit_records \
                 WHERE service = ?1 AND shard_day = ?2 \
                 ORDER BY rowid DESC LIMIT 1",
                params![record.service.clone(), record.shard_day.clone()],
            )
            .await?;

        let previous_entry_hash: String = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => AUDIT_CHAIN_GENESIS.to_string(),
        };

        record.seal(&previous_entry_hash);

        connection
            .execute(
                "INSERT INTO audit_records (id, service, action, user_id, resource_kind, \
                 resource_id, request_meta_json, status_code, latency_ms, shard_day, \
                 prev_hash_hex, entry_hash_hex, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id.to_string(),
                    record.service.clone(),
                    record.action.clone(),
                    opt_value(record.user_id.map(|u| u.to_string())),
                    record.resource_kind.clone(),
                    record.resource_id.clone(),
                    record.request_meta.to_string(),
                    record.status_code as i64,
                    record.latency_milliseconds as i64,
                    record.shard_day.clone(),
                    record.prev_hash_hexadecimal.clone(),
                    record.entry_hash_hexadecimal.clone(),
                    record.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!(
            "🛡️ [AUDIT_SEALED]: {}::{} linked with hash {}",
            record.service,
            record.action,
            &record.entry_hash_hexadecimal[0..8]
        );
        Ok(record.entry_hash_hexadecimal)
    }

    /// Re-verifica la cadena completa de un shard recomputando cada
    /// sello en orden de inserción.
    #[instrument(skip(self))]
    pub async fn verify_chain(
        &self,
        service: &str,
        shard_day: &str,
    ) -> Result<AuditChainReport, DbError> {
        let shard_records = self.fetch_shard(service, shard_day).await?;

        let mut expected_previous = AUDIT_CHAIN_GENESIS.to_string();
        for (index, record) in shard_records.iter().enumerate() {
            if !record.verify_seal(&expected_previous) {
                warn!(
                    "💥 [CHAIN_BREAK]: Shard ({}, {}) broken at index {}",
                    service, shard_day, index
                );
                return Ok(AuditChainReport::Broken { first_broken_index: index });
            }
            expected_previous = record.entry_hash_hexadecimal.clone();
        }

        Ok(AuditChainReport::Intact { record_count: shard_records.len() })
    }

    /// Eslabones de un shard en orden total de inserción.
    pub async fn fetch_shard(
        &self,
        service: &str,
        shard_day: &str,
    ) -> Result<Vec<AuditRecord>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM audit_records \
                     WHERE service = ?1 AND shard_day = ?2 ORDER BY rowid",
                    AUDIT_COLUMNS
                ),
                params![service.to_string(), shard_day.to_string()],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(hydrate_audit_record(&row)?);
        }
        Ok(records)
    }

    /// Shards distintos presentes en el registro (para el barrido del
    /// verificador administrativo).
    pub async fn list_shards(&self) -> Result<Vec<(String, String)>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT DISTINCT service, shard_day FROM audit_records ORDER BY service, shard_day",
                (),
            )
            .await?;

        let mut shards = Vec::new();
        while let Some(row) = rows.next().await? {
            shards.push((row.get::<String>(0)?, row.get::<String>(1)?));
        }
        Ok(shards)
    }
}

fn hydrate_audit_record(row: &Row) -> Result<AuditRecord, DbError> {
    let request_meta_raw = row.get::<String>(6)?;
    Ok(AuditRecord {
        id: parse_uuid(&row.get::<String>(0)?)?,
        service: row.get::<String>(1)?,
        action: row.get::<String>(2)?,
        user_id: row
            .get::<Option<String>>(3)?
            .as_deref()
            .map(parse_uuid)
            .transpose()?,
        resource_kind: row.get::<String>(4)?,
        resource_id: row.get::<String>(5)?,
        request_meta: serde_json::from_str(&request_meta_raw)
            .map_err(|e| DbError::MappingError(format!("REQUEST_META: {}", e)))?,
        status_code: row.get::<i64>(7)? as u16,
        latency_milliseconds: row.get::<i64>(8)? as u64,
        shard_day: row.get::<String>(9)?,
        prev_hash_hexadecimal: row.get::<String>(10)?,
        entry_hash_hexadecimal: row.get::<String>(11)?,
        created_at: parse_instant(&row.get::<String>(12)?)?,
    })
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/audit_repository.rs]
