// [libs/infra/db/src/repositories/ledger_tx_repository.rs]
/*!
 * =================================================================
 * APARATO: LEDGER TRANSACTION REPOSITORY (V4.1 - DEDUP SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ESPEJO LOCAL DE TRANSACCIONES DEL LEDGER
 *
 * # Mathematical Proof (Submission Idempotency):
 * 'dedup_key' es UNIQUE: someter dos veces la misma operación lógica
 * colapsa en un único registro y el segundo intento recupera el tx_id
 * original, cumpliendo la propiedad de idempotencia del Gateway.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{is_unique_violation, opt_value, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use chrono::Utc;
use libsql::{params, Row};
use tracing::{debug, instrument};
use uuid::Uuid;
use versafe_domain_models::ledger::{
    Endorsement, LedgerTransaction, LedgerTxKind, LedgerTxStatus,
};

const TX_COLUMNS: &str = "tx_id, document_id, kind, block_height, block_hash_hex, \
     payload_hash_hex, endorsements_json, submitted_at, confirmed_at, status, dedup_key";

pub struct LedgerTxRepository {
    database_client: MetadataStoreClient,
}

impl LedgerTxRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta el espejo local de una transacción sometida. Si la clave
    /// de deduplicación ya existe devuelve el registro original.
    #[instrument(skip(self, transaction), fields(tx_id = %transaction.tx_id))]
    pub async fn insert_or_fetch_by_dedup(
        &self,
        transaction: &LedgerTransaction,
    ) -> Result<LedgerTransaction, DbError> {
        let connection = self.database_client.get_connection()?;
        let endorsements_json = serde_json::to_string(&transaction.endorsements)
            .map_err(|e| DbError::MappingError(e.to_string()))?;

        let insert_result = connection
            .execute(
                "INSERT INTO ledger_transactions (tx_id, document_id, kind, block_height, \
                 block_hash_hex, payload_hash_hex, endorsements_json, submitted_at, \
                 confirmed_at, status, dedup_key) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    transaction.tx_id.clone(),
                    transaction.document_id.to_string(),
                    transaction.kind.as_label(),
                    opt_value(transaction.block_height.map(|b| b as i64)),
                    opt_value(transaction.block_hash_hexadecimal.clone()),
                    transaction.payload_hash_hexadecimal.clone(),
                    endorsements_json,
                    transaction.submitted_at.to_rfc3339(),
                    opt_value(transaction.confirmed_at.map(|t| t.to_rfc3339())),
                    transaction.status.as_label(),
                    transaction.dedup_key.clone()
                ],
            )
            .await;

        match insert_result {
            Ok(_) => Ok(transaction.clone()),
            Err(insert_fault) if is_unique_violation(&insert_fault) => {
                debug!("🔁 [TX_DEDUP]: {} collapsed to existing record.", transaction.dedup_key);
                self.fetch_by_dedup_key(&transaction.dedup_key).await
            }
            Err(insert_fault) => Err(DbError::QueryError(insert_fault)),
        }
    }

    pub async fn fetch_by_tx_id(&self, tx_id: &str) -> Result<LedgerTransaction, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM ledger_transactions WHERE tx_id = ?1", TX_COLUMNS),
                params![tx_id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => hydrate_transaction(&row),
            None => Err(DbError::DocumentNotFound),
        }
    }

    pub async fn fetch_by_dedup_key(&self, dedup_key: &str) -> Result<LedgerTransaction, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM ledger_transactions WHERE dedup_key = ?1", TX_COLUMNS),
                params![dedup_key.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => hydrate_transaction(&row),
            None => Err(DbError::DocumentNotFound),
        }
    }

    /// Historial ordenado de transacciones de un documento. El orden es
    /// por instante de sumisión y, a igualdad, por rowid de inserción
    /// (el desempate canónico del núcleo).
    pub async fn history_for_document(
        &self,
        document_id: &Uuid,
    ) -> Result<Vec<LedgerTransaction>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM ledger_transactions WHERE document_id = ?1 \
                     ORDER BY submitted_at, rowid",
                    TX_COLUMNS
                ),
                params![document_id.to_string()],
            )
            .await?;

        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            history.push(hydrate_transaction(&row)?);
        }
        Ok(history)
    }

    /// Sella la confirmación de una transacción PENDING. Un registro ya
    /// CONFIRMED es inmutable y la llamada es un no-op.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        tx_id: &str,
        block_height: u64,
        block_hash_hexadecimal: &str,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE ledger_transactions \
                 SET status = 'CONFIRMED', block_height = ?2, block_hash_hex = ?3, confirmed_at = ?4 \
                 WHERE tx_id = ?1 AND status = 'PENDING'",
                params![
                    tx_id.to_string(),
                    block_height as i64,
                    block_hash_hexadecimal.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Marca una transacción PENDING como rechazada por el Ledger.
    pub async fn reject(&self, tx_id: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE ledger_transactions SET status = 'REJECTED' \
                 WHERE tx_id = ?1 AND status = 'PENDING'",
                params![tx_id.to_string()],
            )
            .await?;
        Ok(())
    }

    /// Última transacción CONFIRMED de la clase REGISTER del documento
    /// (el insumo de la verificación de integridad).
    pub async fn latest_confirmed_register(
        &self,
        document_id: &Uuid,
    ) -> Result<Option<LedgerTransaction>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM ledger_transactions \
                     WHERE document_id = ?1 AND kind = 'REGISTER' AND status = 'CONFIRMED' \
                     ORDER BY submitted_at DESC, rowid DESC LIMIT 1",
                    TX_COLUMNS
                ),
                params![document_id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(hydrate_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// Secuencia monótona siguiente para la clave de deduplicación de
    /// un documento y clase de operación.
    pub async fn next_monotonic_seq(
        &self,
        document_id: &Uuid,
        kind: LedgerTxKind,
    ) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM ledger_transactions WHERE document_id = ?1 AND kind = ?2",
                params![document_id.to_string(), kind.as_label()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64 + 1),
            None => Ok(1),
        }
    }
}

fn hydrate_transaction(row: &Row) -> Result<LedgerTransaction, DbError> {
    let kind_label = row.get::<String>(2)?;
    let status_label = row.get::<String>(9)?;
    let endorsements_raw = row.get::<String>(6)?;
    let endorsements: Vec<Endorsement> = serde_json::from_str(&endorsements_raw)
        .map_err(|e| DbError::MappingError(format!("ENDORSEMENTS: {}", e)))?;

    Ok(LedgerTransaction {
        tx_id: row.get::<String>(0)?,
        document_id: parse_uuid(&row.get::<String>(1)?)?,
        kind: LedgerTxKind::from_label(&kind_label)
            .ok_or_else(|| DbError::MappingError(format!("TX_KIND: {}", kind_label)))?,
        block_height: row.get::<Option<i64>>(3)?.map(|b| b as u64),
        block_hash_hexadecimal: row.get::<Option<String>>(4)?,
        payload_hash_hexadecimal: row.get::<String>(5)?,
        endorsements,
        submitted_at: parse_instant(&row.get::<String>(7)?)?,
        confirmed_at: row
            .get::<Option<String>>(8)?
            .as_deref()
            .map(parse_instant)
            .transpose()?,
        status: LedgerTxStatus::from_label(&status_label)
            .ok_or_else(|| DbError::MappingError(format!("TX_STATUS: {}", status_label)))?,
        dedup_key: row.get::<String>(10)?,
    })
}
