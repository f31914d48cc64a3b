// [libs/infra/db/src/repositories/user_repository.rs]
/*!
 * =================================================================
 * APARATO: USER REPOSITORY (V4.0 - SOFT REVOKE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE CUENTAS Y PERFILES
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{is_unique_violation, parse_instant, parse_uuid};
use crate::MetadataStoreClient;
use chrono::Utc;
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;
use versafe_domain_models::user::{canonicalize_email, User};

const USER_COLUMNS: &str =
    "id, email, display_name, password_hash, is_verified, is_revoked, created_at, updated_at";

pub struct UserRepository {
    database_client: MetadataStoreClient,
}

impl UserRepository {
    pub fn new(client: MetadataStoreClient) -> Self {
        Self { database_client: client }
    }

    /// Registra una cuenta nueva junto con su perfil espejo.
    ///
    /// # Errors:
    /// 'DuplicateEmail' si el correo canónico ya existe.
    #[instrument(skip(self, password_hash))]
    pub async fn insert_user(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<User, DbError> {
        let connection = self.database_client.get_connection()?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: canonicalize_email(email),
            display_name: display_name.to_string(),
            password_hash: password_hash.to_string(),
            is_verified: false,
            is_revoked: false,
            created_at: now,
            updated_at: now,
        };

        let insert_result = connection
            .execute(
                "INSERT INTO users (id, email, display_name, password_hash, is_verified, is_revoked, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)",
                params![
                    user.id.to_string(),
                    user.email.clone(),
                    user.display_name.clone(),
                    user.password_hash.clone(),
                    now.to_rfc3339()
                ],
            )
            .await;

        if let Err(insert_fault) = insert_result {
            if is_unique_violation(&insert_fault) {
                return Err(DbError::DuplicateEmail);
            }
            return Err(DbError::QueryError(insert_fault));
        }

        // Perfil espejo best-effort: no bloquea el registro de la cuenta.
        connection
            .execute(
                "INSERT OR IGNORE INTO user_profiles (user_id, display_name, created_at)
                 VALUES (?1, ?2, ?3)",
                params![user.id.to_string(), user.display_name.clone(), now.to_rfc3339()],
            )
            .await?;

        info!("👤 [USER_REGISTERED]: {} enrolled into identity strata.", user.email);
        Ok(user)
    }

    pub async fn fetch_by_email(&self, email: &str) -> Result<User, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![canonicalize_email(email)],
            )
            .await?;

        match rows.next().await? {
            Some(row) => hydrate_user(&row),
            None => Err(DbError::UserNotFound),
        }
    }

    pub async fn fetch_by_id(&self, user_id: &Uuid) -> Result<User, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![user_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => hydrate_user(&row),
            None => Err(DbError::UserNotFound),
        }
    }

    /// Baja lógica de la cuenta: jamás se elimina físicamente.
    #[instrument(skip(self))]
    pub async fn soft_revoke(&self, user_id: &Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE users SET is_revoked = 1, updated_at = ?2 WHERE id = ?1",
                params![user_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::UserNotFound);
        }
        Ok(())
    }
}

fn hydrate_user(row: &Row) -> Result<User, DbError> {
    Ok(User {
        id: parse_uuid(&row.get::<String>(0)?)?,
        email: row.get::<String>(1)?,
        display_name: row.get::<String>(2)?,
        password_hash: row.get::<String>(3)?,
        is_verified: row.get::<i64>(4)? != 0,
        is_revoked: row.get::<i64>(5)? != 0,
        created_at: parse_instant(&row.get::<String>(6)?)?,
        updated_at: parse_instant(&row.get::<String>(7)?)?,
    })
}
