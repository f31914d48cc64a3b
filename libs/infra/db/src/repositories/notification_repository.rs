// [libs/infra/db/src/repositories/notification_repository.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION QUEUE REPOSITORY (V2.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLA DE NOTIFICACIONES PARA EL COLABORADOR DE CORREO
 *
 * El núcleo sólo encola; el despacho real pertenece al colaborador
 * externo de correo y jamás es síncrono con la operación que lo origina.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::opt_value;
use crate::MetadataStoreClient;
use chrono::Utc;
use libsql::params;
use tracing::instrument;
use uuid::Uuid;

pub struct NotificationRepository {
    database_client: MetadataStoreClient,
}

impl NotificationRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Encola una notificación saliente (veredicto SUSPICIOUS,
    /// revocación, concesión de acceso).
    #[instrument(skip(self, payload))]
    pub async fn enqueue(
        &self,
        user_id: Option<&Uuid>,
        email: &str,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO notifications (id, user_id, email, kind, payload_json, queued_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    opt_value(user_id.map(|u| u.to_string())),
                    email.to_string(),
                    kind.to_string(),
                    payload.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn pending_count(&self) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM notifications WHERE dispatched_at IS NULL", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }
}
