// [libs/domain/models/src/user.rs]
/*!
 * =================================================================
 * APARATO: USER DOMAIN MODELS (V2.2 - SOFT REVOKE)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDAD DE USUARIO Y VISTA PÚBLICA SANITIZADA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entidad de usuario. Nunca se elimina físicamente: la baja es un
/// soft-revoke mediante 'is_revoked'.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Correo único, comparación case-insensitive (se persiste en
    /// minúsculas canónicas).
    pub email: String,
    pub display_name: String,
    /// Hash del KDF memory-hard; jamás sale del estrato de identidad.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vista pública del usuario para respuestas de API (sin material
/// sensible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublicView {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_verified: bool,
}

impl From<&User> for UserPublicView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_verified: user.is_verified,
        }
    }
}

/// Normaliza un correo a su forma canónica de unicidad.
pub fn canonicalize_email(raw_email: &str) -> String {
    raw_email.trim().to_ascii_lowercase()
}
