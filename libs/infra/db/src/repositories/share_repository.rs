// [libs/infra/db/src/repositories/share_repository.rs]
/*!
 * =================================================================
 * APARATO: SHARE GRANT REPOSITORY (V2.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE CONCESIONES DE ACCESO ACOTADAS
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{opt_value, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;
use versafe_domain_models::share::{AccessLevel, ShareGrant};
use versafe_domain_models::user::canonicalize_email;

const SHARE_COLUMNS: &str =
    "id, document_id, granter_id, grantee_email, access, token, uses_remaining, \
     expires_at, message, created_at";

pub struct ShareRepository {
    database_client: MetadataStoreClient,
}

impl ShareRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    #[instrument(skip(self, grant), fields(document_id = %grant.document_id))]
    pub async fn insert_grant(&self, grant: &ShareGrant) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO document_shares (id, document_id, granter_id, grantee_email, \
                 access, token, uses_remaining, expires_at, message, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    grant.id.to_string(),
                    grant.document_id.to_string(),
                    grant.granter_id.to_string(),
                    canonicalize_email(&grant.grantee_email),
                    grant.access.as_label(),
                    grant.token.clone(),
                    grant.uses_remaining as i64,
                    opt_value(grant.expires_at.map(|t| t.to_rfc3339())),
                    opt_value(grant.message.clone()),
                    grant.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!("🔗 [SHARE_GRANTED]: {} -> {}", grant.document_id, grant.grantee_email);
        Ok(())
    }

    /// Concesiones dirigidas a un correo destinatario.
    pub async fn list_for_grantee(&self, grantee_email: &str) -> Result<Vec<ShareGrant>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM document_shares WHERE grantee_email = ?1 \
                     ORDER BY created_at DESC",
                    SHARE_COLUMNS
                ),
                params![canonicalize_email(grantee_email)],
            )
            .await?;

        let mut grants = Vec::new();
        while let Some(row) = rows.next().await? {
            grants.push(hydrate_grant(&row)?);
        }
        Ok(grants)
    }

    /// Concesión viva de un destinatario sobre un documento concreto.
    pub async fn fetch_active_grant(
        &self,
        document_id: &Uuid,
        grantee_email: &str,
    ) -> Result<Option<ShareGrant>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM document_shares \
                     WHERE document_id = ?1 AND grantee_email = ?2 AND uses_remaining > 0 \
                     ORDER BY created_at DESC LIMIT 1",
                    SHARE_COLUMNS
                ),
                params![document_id.to_string(), canonicalize_email(grantee_email)],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(hydrate_grant(&row)?)),
            None => Ok(None),
        }
    }

    /// Consume un uso del token de la concesión.
    pub async fn redeem_use(&self, grant_id: &Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE document_shares SET uses_remaining = uses_remaining - 1 \
                 WHERE id = ?1 AND uses_remaining > 0",
                params![grant_id.to_string()],
            )
            .await?;
        Ok(())
    }
}

fn hydrate_grant(row: &Row) -> Result<ShareGrant, DbError> {
    let access_label = row.get::<String>(4)?;
    Ok(ShareGrant {
        id: parse_uuid(&row.get::<String>(0)?)?,
        document_id: parse_uuid(&row.get::<String>(1)?)?,
        granter_id: parse_uuid(&row.get::<String>(2)?)?,
        grantee_email: row.get::<String>(3)?,
        access: AccessLevel::from_label(&access_label)
            .ok_or_else(|| DbError::MappingError(format!("ACCESS_LEVEL: {}", access_label)))?,
        token: row.get::<String>(5)?,
        uses_remaining: row.get::<i64>(6)? as u32,
        expires_at: row
            .get::<Option<String>>(7)?
            .as_deref()
            .map(parse_instant)
            .transpose()?,
        message: row.get::<Option<String>>(8)?,
        created_at: parse_instant(&row.get::<String>(9)?)?,
    })
}
