// [libs/domain/models/src/share.rs]
/*!
 * =================================================================
 * APARATO: SHARE GRANT MODELS (V2.0 - BOUNDED DELEGATION)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DELEGACIÓN ACOTADA DE ACCESO A DOCUMENTOS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Niveles de acceso delegables. El orden refleja la jerarquía de
/// privilegios: una concesión jamás eleva por encima del otorgante.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    View,
    Comment,
    Edit,
}

impl AccessLevel {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Comment => "COMMENT",
            Self::Edit => "EDIT",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "VIEW" => Some(Self::View),
            "COMMENT" => Some(Self::Comment),
            "EDIT" => Some(Self::Edit),
            _ => None,
        }
    }
}

/// Concesión de acceso sobre un documento hacia un correo destinatario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareGrant {
    pub id: Uuid,
    pub document_id: Uuid,
    pub granter_id: Uuid,
    /// Destinatario por correo (minúsculas canónicas).
    pub grantee_email: String,
    pub access: AccessLevel,
    /// Token de uso único o acotado para redimir la concesión.
    pub token: String,
    pub uses_remaining: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ShareGrant {
    /// La concesión sigue siendo redimible en el instante dado.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.uses_remaining > 0
            && self.expires_at.map(|deadline| now < deadline).unwrap_or(true)
    }
}
