// [libs/infra/db/src/repositories/verification_repository.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION EVENT REPOSITORY (V2.0 - APPEND ONLY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: HISTORIAL INMUTABLE DE VERIFICACIONES
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{opt_value, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use libsql::{params, Row};
use tracing::instrument;
use uuid::Uuid;
use versafe_domain_models::verification::{VerificationEvent, VerificationOutcome};

const EVENT_COLUMNS: &str =
    "id, document_id, verifier_id, verified, method, outcome, details, created_at";

pub struct VerificationRepository {
    database_client: MetadataStoreClient,
}

impl VerificationRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Anexa un evento. La tabla es append-only: no existe UPDATE.
    #[instrument(skip(self, event), fields(document_id = %event.document_id, outcome = event.outcome.as_label()))]
    pub async fn append_event(&self, event: &VerificationEvent) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO verification_events (id, document_id, verifier_id, verified, \
                 method, outcome, details, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.id.to_string(),
                    event.document_id.to_string(),
                    opt_value(event.verifier_id.map(|v| v.to_string())),
                    event.verified as i64,
                    event.method.clone(),
                    event.outcome.as_label(),
                    opt_value(event.details.clone()),
                    event.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn list_for_document(
        &self,
        document_id: &Uuid,
    ) -> Result<Vec<VerificationEvent>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM verification_events WHERE document_id = ?1 \
                     ORDER BY created_at, rowid",
                    EVENT_COLUMNS
                ),
                params![document_id.to_string()],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(hydrate_event(&row)?);
        }
        Ok(events)
    }
}

fn hydrate_event(row: &Row) -> Result<VerificationEvent, DbError> {
    let outcome_label = row.get::<String>(5)?;
    Ok(VerificationEvent {
        id: parse_uuid(&row.get::<String>(0)?)?,
        document_id: parse_uuid(&row.get::<String>(1)?)?,
        verifier_id: row
            .get::<Option<String>>(2)?
            .as_deref()
            .map(parse_uuid)
            .transpose()?,
        verified: row.get::<i64>(3)? != 0,
        method: row.get::<String>(4)?,
        outcome: VerificationOutcome::from_label(&outcome_label)
            .ok_or_else(|| DbError::MappingError(format!("OUTCOME: {}", outcome_label)))?,
        details: row.get::<Option<String>>(6)?,
        created_at: parse_instant(&row.get::<String>(7)?)?,
    })
}
