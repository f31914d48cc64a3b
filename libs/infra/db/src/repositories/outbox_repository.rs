// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/outbox_repository.rs]
/*!
 * =================================================================
 * APARATO: LEDGER OUTBOX REPOSITORY (V4.2 - FIFO DURABLE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLA DURABLE DE OPERACIONES DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FIFO ESTRICTO: El AUTOINCREMENT del motor fija el orden de
 *    drenado; el relevo consume siempre el frente de la cola.
 * 2. IDEMPOTENT ENQUEUE: La clave de deduplicación única hace que
 *    reencolar la misma operación sea un no-op benigno.
 * 3. TRANSITION BLOCKING: 'has_pending_for_document' permite al motor
 *    de estados bloquear transiciones con operaciones en vuelo.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{is_unique_violation, parse_uuid};
use crate::MetadataStoreClient;
use chrono::Utc;
use libsql::{params, Row};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use versafe_domain_models::ledger::LedgerTxKind;

/// Entrada durable de la cola del Ledger.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub id: i64,
    pub document_id: Uuid,
    pub kind: LedgerTxKind,
    pub dedup_key: String,
    pub payload_json: serde_json::Value,
    pub attempts: u32,
    pub last_error: Option<String>,
}

pub struct OutboxRepository {
    database_client: MetadataStoreClient,
}

impl OutboxRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Encola una operación pendiente del Ledger. Idempotente sobre la
    /// clave de deduplicación.
    #[instrument(skip(self, payload_json))]
    pub async fn enqueue(
        &self,
        document_id: &Uuid,
        kind: LedgerTxKind,
        dedup_key: &str,
        payload_json: &serde_json::Value,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let enqueue_result = connection
            .execute(
                "INSERT INTO ledger_outbox (document_id, kind, dedup_key, payload_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    document_id.to_string(),
                    kind.as_label(),
                    dedup_key.to_string(),
                    payload_json.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await;

        match enqueue_result {
            Ok(_) => {
                info!("📮 [OUTBOX_ENQUEUED]: {} for document {}", kind.as_label(), document_id);
                Ok(())
            }
            Err(enqueue_fault) if is_unique_violation(&enqueue_fault) => {
                // Reintento del mismo intento lógico: la cola ya lo tiene.
                debug!("📮 [OUTBOX_DEDUP]: {} already queued.", dedup_key);
                Ok(())
            }
            Err(enqueue_fault) => Err(DbError::QueryError(enqueue_fault)),
        }
    }

    /// Frente de la cola en orden FIFO estricto.
    pub async fn fetch_pending_batch(&self, limit: u32) -> Result<Vec<OutboxEntry>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, document_id, kind, dedup_key, payload_json, attempts, last_error \
                 FROM ledger_outbox WHERE status = 'pending' ORDER BY id LIMIT ?1",
                params![limit as i64],
            )
            .await?;

        let mut batch = Vec::new();
        while let Some(row) = rows.next().await? {
            batch.push(hydrate_outbox_entry(&row)?);
        }
        Ok(batch)
    }

    /// Sella la entrada como drenada con éxito.
    pub async fn mark_flushed(&self, entry_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE ledger_outbox SET status = 'flushed', flushed_at = ?2 WHERE id = ?1",
                params![entry_id, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Registra un intento fallido; al superar el techo la entrada pasa
    /// a 'dead' y exige intervención del operador.
    #[instrument(skip(self))]
    pub async fn record_attempt_failure(
        &self,
        entry_id: i64,
        error_detail: &str,
        max_attempts: u32,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE ledger_outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                params![entry_id, error_detail.to_string()],
            )
            .await?;

        let affected = connection
            .execute(
                "UPDATE ledger_outbox SET status = 'dead' \
                 WHERE id = ?1 AND attempts >= ?2 AND status = 'pending'",
                params![entry_id, max_attempts as i64],
            )
            .await?;

        if affected > 0 {
            warn!("💀 [OUTBOX_DEAD]: Entry {} exceeded {} attempts.", entry_id, max_attempts);
        }
        Ok(())
    }

    pub async fn pending_count(&self) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM ledger_outbox WHERE status = 'pending'", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    /// Operaciones en vuelo para un documento: bloquean sus
    /// transiciones de estado hasta drenar.
    pub async fn has_pending_for_document(&self, document_id: &Uuid) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM ledger_outbox WHERE document_id = ?1 AND status = 'pending'",
                params![document_id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? > 0),
            None => Ok(false),
        }
    }
}

fn hydrate_outbox_entry(row: &Row) -> Result<OutboxEntry, DbError> {
    let kind_label = row.get::<String>(2)?;
    let payload_raw = row.get::<String>(4)?;
    Ok(OutboxEntry {
        id: row.get::<i64>(0)?,
        document_id: parse_uuid(&row.get::<String>(1)?)?,
        kind: LedgerTxKind::from_label(&kind_label)
            .ok_or_else(|| DbError::MappingError(format!("OUTBOX_KIND: {}", kind_label)))?,
        dedup_key: row.get::<String>(3)?,
        payload_json: serde_json::from_str(&payload_raw)
            .map_err(|e| DbError::MappingError(format!("OUTBOX_PAYLOAD: {}", e)))?,
        attempts: row.get::<i64>(5)? as u32,
        last_error: row.get::<Option<String>>(6)?,
    })
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/outbox_repository.rs]
