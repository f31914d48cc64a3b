// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/document_repository.rs]
/*!
 * =================================================================
 * APARATO: DOCUMENT REPOSITORY (V4.2 - MONOTONIC GUARDED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL AGREGADO DOCUMENTO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MONOTONIC GUARD: Toda transición pasa por el predicado del
 *    retículo; el repositorio rechaza retrocesos con InvalidState.
 * 2. LEDGER IMMUTABILITY: 'ledger_tx_id' sólo se escribe si es NULL;
 *    una vez fijado jamás se muta.
 * 3. QUARANTINE SHADOW: Los documentos en cuarentena desaparecen de
 *    los listados visibles del propietario.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{opt_value, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use versafe_domain_models::document::{
    DigestAlgorithm, Document, DocumentExtractedMetadata, DocumentState, SecurityLevel,
};

const DOCUMENT_COLUMNS: &str = "id, owner_id, title, file_name, media_type, size_bytes, \
     storage_ref, digest_algorithm, digest_hex, secondary_digest_algorithm, \
     secondary_digest_hex, security_level, signatures_required, state, scan_warning, \
     ledger_tx_id, ledger_block_height, ledger_pending, expires_at, revoked_reason, \
     created_at, updated_at";

/// Filtro de listado del propietario.
#[derive(Debug, Default, Clone)]
pub struct DocumentListFilter {
    pub state: Option<DocumentState>,
    pub security_level: Option<SecurityLevel>,
}

pub struct DocumentRepository {
    database_client: MetadataStoreClient,
}

impl DocumentRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta el documento recién ingerido (estado UPLOADED o
    /// REGISTRATION_PENDING según el desenlace del paso de registro).
    #[instrument(skip(self, document), fields(document_id = %document.id))]
    pub async fn insert_document(&self, document: &Document) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO documents (id, owner_id, title, file_name, media_type, size_bytes, \
                 storage_ref, digest_algorithm, digest_hex, secondary_digest_algorithm, \
                 secondary_digest_hex, security_level, signatures_required, state, scan_warning, \
                 ledger_tx_id, ledger_block_height, ledger_pending, expires_at, revoked_reason, \
                 created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
                params![
                    document.id.to_string(),
                    document.owner_id.to_string(),
                    document.title.clone(),
                    document.file_name.clone(),
                    document.media_type.clone(),
                    document.size_bytes as i64,
                    document.storage_ref.clone(),
                    document.digest_algorithm.as_label(),
                    document.digest_hexadecimal.clone(),
                    opt_value(document.secondary_digest_algorithm.map(|a| a.as_label().to_string())),
                    opt_value(document.secondary_digest_hexadecimal.clone()),
                    document.security_level.as_label(),
                    document.signatures_required as i64,
                    document.state.as_label(),
                    document.scan_warning as i64,
                    opt_value(document.ledger_transaction_identifier.clone()),
                    opt_value(document.ledger_block_height.map(|b| b as i64)),
                    document.ledger_pending as i64,
                    opt_value(document.expires_at.map(|t| t.to_rfc3339())),
                    opt_value(document.revoked_reason.clone()),
                    document.created_at.to_rfc3339(),
                    document.updated_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_by_id(&self, document_id: &Uuid) -> Result<Document, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                params![document_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => hydrate_document(&row),
            None => Err(DbError::DocumentNotFound),
        }
    }

    /// Listado paginado del propietario. La cuarentena queda fuera de
    /// la vista del usuario por contrato de integridad.
    #[instrument(skip(self))]
    pub async fn list_for_owner(
        &self,
        owner_id: &Uuid,
        filter: &DocumentListFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Document>, u64), DbError> {
        let connection = self.database_client.get_connection()?;

        let mut where_clause =
            String::from("owner_id = ?1 AND state != 'QUARANTINED'");
        if let Some(state) = filter.state {
            where_clause.push_str(&format!(" AND state = '{}'", state.as_label()));
        }
        if let Some(level) = filter.security_level {
            where_clause.push_str(&format!(" AND security_level = '{}'", level.as_label()));
        }

        let mut count_rows = connection
            .query(
                &format!("SELECT COUNT(*) FROM documents WHERE {}", where_clause),
                params![owner_id.to_string()],
            )
            .await?;
        let total: i64 = match count_rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        let offset = (page.max(1) - 1) as i64 * limit as i64;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM documents WHERE {} ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                    DOCUMENT_COLUMNS, where_clause
                ),
                params![owner_id.to_string(), limit as i64, offset],
            )
            .await?;

        let mut page_items = Vec::new();
        while let Some(row) = rows.next().await? {
            page_items.push(hydrate_document(&row)?);
        }
        Ok((page_items, total as u64))
    }

    /// Parche de metadatos mutables (título, expiración). El digest y
    /// el material del Ledger jamás se tocan por esta vía.
    #[instrument(skip(self))]
    pub async fn update_patch(
        &self,
        document_id: &Uuid,
        new_title: Option<String>,
        new_expires_at: Option<DateTime<Utc>>,
    ) -> Result<Document, DbError> {
        let connection = self.database_client.get_connection()?;

        if let Some(title) = new_title {
            connection
                .execute(
                    "UPDATE documents SET title = ?2, updated_at = ?3 WHERE id = ?1",
                    params![document_id.to_string(), title, Utc::now().to_rfc3339()],
                )
                .await?;
        }
        if let Some(expiry) = new_expires_at {
            connection
                .execute(
                    "UPDATE documents SET expires_at = ?2, updated_at = ?3 WHERE id = ?1",
                    params![document_id.to_string(), expiry.to_rfc3339(), Utc::now().to_rfc3339()],
                )
                .await?;
        }

        self.fetch_by_id(document_id).await
    }

    /// Transición de estado con guardia monotónica.
    ///
    /// # Errors:
    /// 'InvalidState' si el retículo rechaza current -> next.
    #[instrument(skip(self))]
    pub async fn transition_state(
        &self,
        document_id: &Uuid,
        next_state: DocumentState,
    ) -> Result<Document, DbError> {
        let current = self.fetch_by_id(document_id).await?;
        if !current.state.can_transition_to(next_state) {
            warn!(
                "⛔ [STATE_GUARD]: {} -> {} rejected for {}",
                current.state.as_label(),
                next_state.as_label(),
                document_id
            );
            return Err(DbError::InvalidState);
        }

        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE documents SET state = ?2, updated_at = ?3 WHERE id = ?1",
                params![
                    document_id.to_string(),
                    next_state.as_label(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        info!(
            "🔄 [STATE_SHIFT]: Document {} transitioned {} -> {}",
            document_id,
            current.state.as_label(),
            next_state.as_label()
        );
        self.fetch_by_id(document_id).await
    }

    /// Fija el registro del Ledger. Sólo escribe si 'ledger_tx_id' es
    /// NULL: el identificador es inmutable una vez fijado.
    #[instrument(skip(self))]
    pub async fn set_ledger_registration(
        &self,
        document_id: &Uuid,
        ledger_tx_id: &str,
        block_height: Option<u64>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE documents SET ledger_tx_id = ?2, ledger_block_height = ?3, \
                 ledger_pending = 0, updated_at = ?4 \
                 WHERE id = ?1 AND ledger_tx_id IS NULL",
                params![
                    document_id.to_string(),
                    ledger_tx_id.to_string(),
                    opt_value(block_height.map(|b| b as i64)),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Marca o limpia la bandera de operaciones pendientes en el Outbox.
    pub async fn set_ledger_pending(
        &self,
        document_id: &Uuid,
        pending: bool,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE documents SET ledger_pending = ?2, updated_at = ?3 WHERE id = ?1",
                params![document_id.to_string(), pending as i64, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Estampa la marca 'warn' tras un veredicto SUSPICIOUS del escáner.
    pub async fn mark_scan_warning(&self, document_id: &Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE documents SET scan_warning = 1, updated_at = ?2 WHERE id = ?1",
                params![document_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Revocación por el propietario. Idempotente: revocar un documento
    /// ya REVOKED devuelve el registro existente sin mutarlo.
    ///
    /// Devuelve (documento, newly_revoked).
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        document_id: &Uuid,
        reason: &str,
    ) -> Result<(Document, bool), DbError> {
        let current = self.fetch_by_id(document_id).await?;
        if current.state == DocumentState::Revoked {
            return Ok((current, false));
        }
        if !current.state.can_transition_to(DocumentState::Revoked) {
            return Err(DbError::InvalidState);
        }

        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE documents SET state = 'REVOKED', revoked_reason = ?2, updated_at = ?3 \
                 WHERE id = ?1",
                params![document_id.to_string(), reason.to_string(), Utc::now().to_rfc3339()],
            )
            .await?;

        info!("🚫 [DOCUMENT_REVOKED]: {} sealed with reason.", document_id);
        Ok((self.fetch_by_id(document_id).await?, true))
    }

    /// Mueve el documento a QUARANTINED tras un fallo de integridad.
    #[instrument(skip(self))]
    pub async fn quarantine(&self, document_id: &Uuid) -> Result<Document, DbError> {
        self.transition_state(document_id, DocumentState::Quarantined).await
    }

    /// Candidatos de expiración: documentos no terminales cuya ventana
    /// venció. Sólo SELECT: la transición a EXPIRED pertenece al
    /// llamador, que la serializa bajo el candado por documento y la
    /// guardia monotónica de 'transition_state'.
    #[instrument(skip(self))]
    pub async fn list_past_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id FROM documents \
                 WHERE expires_at IS NOT NULL AND expires_at <= ?1 \
                 AND state NOT IN ('REVOKED', 'EXPIRED')",
                params![now.to_rfc3339()],
            )
            .await?;

        let mut past_due_identifiers = Vec::new();
        while let Some(row) = rows.next().await? {
            past_due_identifiers.push(parse_uuid(&row.get::<String>(0)?)?);
        }
        Ok(past_due_identifiers)
    }

    /// Metadatos extraídos best-effort (conteo de páginas, errores).
    pub async fn upsert_extracted_metadata(
        &self,
        document_id: &Uuid,
        metadata: &DocumentExtractedMetadata,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO document_metadata (document_id, page_count, extraction_error, updated_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(document_id) DO UPDATE SET \
                 page_count = excluded.page_count, \
                 extraction_error = excluded.extraction_error, \
                 updated_at = excluded.updated_at",
                params![
                    document_id.to_string(),
                    opt_value(metadata.page_count.map(|c| c as i64)),
                    opt_value(metadata.extraction_error.clone()),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }
}

fn hydrate_document(row: &Row) -> Result<Document, DbError> {
    let digest_algorithm_label = row.get::<String>(7)?;
    let state_label = row.get::<String>(13)?;
    let security_label = row.get::<String>(11)?;

    Ok(Document {
        id: parse_uuid(&row.get::<String>(0)?)?,
        owner_id: parse_uuid(&row.get::<String>(1)?)?,
        title: row.get::<String>(2)?,
        file_name: row.get::<String>(3)?,
        media_type: row.get::<String>(4)?,
        size_bytes: row.get::<i64>(5)? as u64,
        storage_ref: row.get::<String>(6)?,
        digest_algorithm: DigestAlgorithm::from_label(&digest_algorithm_label)
            .ok_or_else(|| DbError::MappingError(format!("DIGEST_ALGO: {}", digest_algorithm_label)))?,
        digest_hexadecimal: row.get::<String>(8)?,
        secondary_digest_algorithm: row
            .get::<Option<String>>(9)?
            .as_deref()
            .and_then(DigestAlgorithm::from_label),
        secondary_digest_hexadecimal: row.get::<Option<String>>(10)?,
        security_level: SecurityLevel::from_label(&security_label)
            .ok_or_else(|| DbError::MappingError(format!("SECURITY_LEVEL: {}", security_label)))?,
        signatures_required: row.get::<i64>(12)? as u32,
        state: DocumentState::from_label(&state_label)
            .ok_or_else(|| DbError::MappingError(format!("STATE: {}", state_label)))?,
        scan_warning: row.get::<i64>(14)? != 0,
        ledger_transaction_identifier: row.get::<Option<String>>(15)?,
        ledger_block_height: row.get::<Option<i64>>(16)?.map(|b| b as u64),
        ledger_pending: row.get::<i64>(17)? != 0,
        expires_at: row
            .get::<Option<String>>(18)?
            .as_deref()
            .map(parse_instant)
            .transpose()?,
        revoked_reason: row.get::<Option<String>>(19)?,
        created_at: parse_instant(&row.get::<String>(20)?)?,
        updated_at: parse_instant(&row.get::<String>(21)?)?,
    })
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/document_repository.rs]
