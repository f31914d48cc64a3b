// INICIO DEL ARCHIVO [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: METADATA STORE CLIENT (V4.2 - MEMORY ANCHORED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DE ENLACES TÁCTICOS Y PERSISTENCIA ACID
 *
 * # Mathematical Proof (In-Memory Consistency):
 * Para que el esquema sea visible entre hilos en modo RAM, el cliente
 * detecta URLs de memoria y aplica el ancla de persistencia ANTES del
 * bootstrap del esquema, garantizando que las tablas residan en un
 * segmento de memoria compartido durante toda la vida del proceso.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_full_metadata_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct MetadataStoreClient {
    internal_database_driver: Arc<Database>,
    /// Mantiene la base en RAM viva evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl MetadataStoreClient {
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> Result<Self, DbError> {
        if database_connection_url.is_empty() {
            return Err(DbError::ConfigurationError("DB_URL_UNDEFINED".into()));
        }

        info!("🔌 [METADATA_STORE]: Initiating tactical link to [{}]", database_connection_url);

        let is_remote = database_connection_url.starts_with("libsql://")
            || database_connection_url.starts_with("https://");

        let is_memory = database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory");

        let database_driver = if is_remote {
            let token = database_access_token.ok_or_else(|| {
                DbError::ConfigurationError("REMOTE_ACCESS_TOKEN_MISSING".into())
            })?;
            Builder::new_remote(database_connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_connection_url).build().await
        }
        .map_err(|e| DbError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {}", e)))?;

        let shared_driver = Arc::new(database_driver);
        let mut anchor = None;

        if is_memory {
            // En modo memoria el ancla se abre ANTES que cualquier otra
            // operación y el esquema se aplica sobre ella.
            let anchor_connection = shared_driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("ANCHOR_FAULT: {}", e)))?;

            apply_full_metadata_schema(&anchor_connection)
                .await
                .map_err(|e| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {}", e)))?;

            anchor = Some(Arc::new(anchor_connection));
            info!("⚓ [METADATA_STORE]: Memory strata solidified and anchored.");
        } else {
            let bootstrap_connection = shared_driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("BOOTSTRAP_LINK_FAULT: {}", e)))?;
            apply_full_metadata_schema(&bootstrap_connection)
                .await
                .map_err(|e| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {}", e)))?;
        }

        Ok(Self {
            internal_database_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.internal_database_driver.connect().map_err(|e| {
            error!("⚠️ [POOL_FAULT]: Connection allocation failed: {}", e);
            DbError::ConnectionError(e.to_string())
        })
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/client.rs]
