// [libs/infra/db/src/repositories/signature_repository.rs]
/*!
 * =================================================================
 * APARATO: SIGNATURE REPOSITORY (V4.1 - UNIQUENESS SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE FIRMAS CON UNICIDAD POR FIRMANTE
 *
 * # Mathematical Proof (Signer Uniqueness):
 * UNIQUE(document_id, signer_id) en el motor garantiza que incluso dos
 * inserciones concurrentes del mismo firmante colapsen en una: la
 * segunda recibe la violación de unicidad y se traduce a AlreadySigned.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{is_unique_violation, opt_value, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;
use versafe_domain_models::signature::{Signature, SignatureKind};

const SIGNATURE_COLUMNS: &str = "id, document_id, signer_id, kind, payload, signer_hash_hex, \
     verification_method, verified, ledger_tx_id, created_at";

pub struct SignatureRepository {
    database_client: MetadataStoreClient,
}

impl SignatureRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta la firma del firmante sobre el documento.
    ///
    /// # Errors:
    /// 'DuplicateSignature' si (document_id, signer_id) ya existe.
    #[instrument(skip(self, signature), fields(document_id = %signature.document_id, signer_id = %signature.signer_id))]
    pub async fn insert_signature(&self, signature: &Signature) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let insert_result = connection
            .execute(
                "INSERT INTO signatures (id, document_id, signer_id, kind, payload, \
                 signer_hash_hex, verification_method, verified, ledger_tx_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    signature.id.to_string(),
                    signature.document_id.to_string(),
                    signature.signer_id.to_string(),
                    signature.kind.as_label(),
                    signature.payload.clone(),
                    signature.signer_hash_hexadecimal.clone(),
                    signature.verification_method.clone(),
                    signature.verified as i64,
                    opt_value(signature.ledger_transaction_identifier.clone()),
                    signature.created_at.to_rfc3339()
                ],
            )
            .await;

        if let Err(insert_fault) = insert_result {
            if is_unique_violation(&insert_fault) {
                return Err(DbError::DuplicateSignature);
            }
            return Err(DbError::QueryError(insert_fault));
        }

        info!(
            "✍️ [SIGNATURE_SEALED]: {} by {} on {}",
            signature.kind.as_label(),
            signature.signer_id,
            signature.document_id
        );
        Ok(())
    }

    pub async fn fetch_by_id(&self, signature_id: &Uuid) -> Result<Signature, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM signatures WHERE id = ?1", SIGNATURE_COLUMNS),
                params![signature_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => hydrate_signature(&row),
            None => Err(DbError::SignatureNotFound),
        }
    }

    /// Historial de firmas del documento en orden de inserción.
    pub async fn list_for_document(&self, document_id: &Uuid) -> Result<Vec<Signature>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM signatures WHERE document_id = ?1 ORDER BY created_at, rowid",
                    SIGNATURE_COLUMNS
                ),
                params![document_id.to_string()],
            )
            .await?;

        let mut signatures = Vec::new();
        while let Some(row) = rows.next().await? {
            signatures.push(hydrate_signature(&row)?);
        }
        Ok(signatures)
    }

    /// Conteo de firmas válidas: el insumo del cálculo de estado.
    pub async fn count_valid_for_document(&self, document_id: &Uuid) -> Result<u32, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM signatures WHERE document_id = ?1 AND verified = 1",
                params![document_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u32),
            None => Ok(0),
        }
    }

    /// Liga la firma a su transacción del Ledger una vez sometida.
    pub async fn set_ledger_tx(
        &self,
        signature_id: &Uuid,
        ledger_tx_id: &str,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE signatures SET ledger_tx_id = ?2 WHERE id = ?1 AND ledger_tx_id IS NULL",
                params![signature_id.to_string(), ledger_tx_id.to_string()],
            )
            .await?;
        Ok(())
    }

    /// Actualiza el veredicto de verificación de una firma existente.
    pub async fn set_verified(&self, signature_id: &Uuid, verified: bool) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE signatures SET verified = ?2 WHERE id = ?1",
                params![signature_id.to_string(), verified as i64],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::SignatureNotFound);
        }
        Ok(())
    }
}

fn hydrate_signature(row: &Row) -> Result<Signature, DbError> {
    let kind_label = row.get::<String>(3)?;
    Ok(Signature {
        id: parse_uuid(&row.get::<String>(0)?)?,
        document_id: parse_uuid(&row.get::<String>(1)?)?,
        signer_id: parse_uuid(&row.get::<String>(2)?)?,
        kind: SignatureKind::from_label(&kind_label)
            .ok_or_else(|| DbError::MappingError(format!("SIGNATURE_KIND: {}", kind_label)))?,
        payload: row.get::<Vec<u8>>(4)?,
        signer_hash_hexadecimal: row.get::<String>(5)?,
        verification_method: row.get::<String>(6)?,
        verified: row.get::<i64>(7)? != 0,
        ledger_transaction_identifier: row.get::<Option<String>>(8)?,
        created_at: parse_instant(&row.get::<String>(9)?)?,
    })
}
