// [libs/infra/db/src/repositories/session_repository.rs]
/*!
 * =================================================================
 * APARATO: SESSION REPOSITORY (V4.1 - ROTATION GUARDED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ROTACIÓN DE REFRESH TOKENS Y DETECCIÓN DE RE-USO
 *
 * # Mathematical Proof (Reuse Detection):
 * Cada refresh se persiste por su SHA-256 y se marca 'consumed_at' al
 * rotarse. Presentar un token con 'consumed_at' no nulo es evidencia
 * de robo o repetición: la sesión completa se anula y el evento escala
 * al estrato de auditoría como incidente de seguridad.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use chrono::{DateTime, Utc};
use libsql::params;
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};
use uuid::Uuid;

pub struct SessionRepository {
    database_client: MetadataStoreClient,
}

/// Desenlace de una rotación de refresh token.
#[derive(Debug)]
pub struct RefreshRotation {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

impl SessionRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Persiste un refresh recién emitido dentro de su sesión.
    #[instrument(skip(self, refresh_token))]
    pub async fn store_refresh(
        &self,
        refresh_token: &str,
        user_id: &Uuid,
        session_id: &Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO refresh_tokens (token_hash, user_id, session_id, issued_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    hash_refresh(refresh_token),
                    user_id.to_string(),
                    session_id.to_string(),
                    Utc::now().to_rfc3339(),
                    expires_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Consume un refresh para rotarlo.
    ///
    /// # Errors:
    /// 'RefreshTokenReused' si ya estaba consumido (la sesión completa
    /// queda anulada antes de retornar); 'RefreshTokenInvalid' si no
    /// existe o expiró.
    #[instrument(skip(self, refresh_token))]
    pub async fn consume_refresh(&self, refresh_token: &str) -> Result<RefreshRotation, DbError> {
        let connection = self.database_client.get_connection()?;
        let token_hash = hash_refresh(refresh_token);

        let mut rows = connection
            .query(
                "SELECT user_id, session_id, expires_at, consumed_at \
                 FROM refresh_tokens WHERE token_hash = ?1",
                params![token_hash.clone()],
            )
            .await?;

        let row = match rows.next().await? {
            Some(row) => row,
            None => return Err(DbError::RefreshTokenInvalid),
        };

        let user_id = parse_uuid(&row.get::<String>(0)?)?;
        let session_id = parse_uuid(&row.get::<String>(1)?)?;
        let expires_at = parse_instant(&row.get::<String>(2)?)?;
        let consumed_at = row.get::<Option<String>>(3)?;

        if consumed_at.is_some() {
            // Re-uso detectado: anulación total de la sesión.
            warn!("🚨 [REFRESH_REUSE]: Session {} voided after replay.", session_id);
            self.void_session(&session_id).await?;
            return Err(DbError::RefreshTokenReused);
        }

        if Utc::now() >= expires_at {
            return Err(DbError::RefreshTokenInvalid);
        }

        connection
            .execute(
                "UPDATE refresh_tokens SET consumed_at = ?2 WHERE token_hash = ?1",
                params![token_hash, Utc::now().to_rfc3339()],
            )
            .await?;

        Ok(RefreshRotation { user_id, session_id })
    }

    /// Anula todos los refresh de una sesión (consumidos o no).
    pub async fn void_session(&self, session_id: &Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE refresh_tokens SET consumed_at = ?2 \
                 WHERE session_id = ?1 AND consumed_at IS NULL",
                params![session_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Anula todas las sesiones vivas de un usuario.
    pub async fn void_user_sessions(&self, user_id: &Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE refresh_tokens SET consumed_at = ?2 \
                 WHERE user_id = ?1 AND consumed_at IS NULL",
                params![user_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }
}

/// Los refresh jamás se persisten en claro: sólo su SHA-256.
fn hash_refresh(refresh_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(refresh_token.as_bytes());
    hex::encode(hasher.finalize())
}
