// INICIO DEL ARCHIVO [apps/gateway/src/envelope.rs]
/*!
 * =================================================================
 * APARATO: API ENVELOPE & FAULT TAXONOMY (V4.1 - CONTRACT SEALED)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SOBRE JSON UNIFORME Y TAXONOMÍA DE ERRORES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE ENVELOPE: Toda respuesta viaja como
 *    {success, message?, data?, error?: {kind, detail}}.
 * 2. DISCLOSURE DISCIPLINE: Auth jamás revela el factor fallido;
 *    NotFound es uniforme para ausente y no visible; Internal jamás
 *    filtra trazas ni strings del motor SQL.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use versafe_core_hasher::HasherError;
use versafe_core_signer::SignerError;
use versafe_domain_identity::IdentityError;
use versafe_infra_db::DbError;
use versafe_infra_ledger::LedgerError;

/// Clases de error del contrato externo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    Validation,
    Auth,
    NotFound,
    Conflict,
    Security,
    LedgerUnavailable,
    Integrity,
    Internal,
}

impl FaultKind {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Security => StatusCode::BAD_REQUEST,
            Self::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Integrity => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Fallo de API listo para serializar en el sobre.
#[derive(Debug, Clone)]
pub struct ApiFault {
    pub kind: FaultKind,
    pub detail: String,
    /// Correlación para el rastro estructurado de fallos internos.
    pub correlation_id: Uuid,
}

impl ApiFault {
    pub fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into(), correlation_id: Uuid::new_v4() }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Validation, detail)
    }

    /// Auth uniforme: el detalle jamás nombra el factor fallido.
    pub fn auth() -> Self {
        Self::new(FaultKind::Auth, "authentication failed")
    }

    /// NotFound uniforme para ausente y para no visible al principal.
    pub fn not_found() -> Self {
        Self::new(FaultKind::NotFound, "resource not found")
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Conflict, detail)
    }

    pub fn security(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Security, detail)
    }

    pub fn ledger_unavailable() -> Self {
        Self::new(FaultKind::LedgerUnavailable, "ledger unreachable, operation queued where safe")
    }

    pub fn integrity(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Integrity, detail)
    }

    pub fn internal() -> Self {
        Self::new(FaultKind::Internal, "internal error")
    }
}

/// Sobre uniforme de respuesta.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeFault>,
}

#[derive(Debug, Serialize)]
pub struct EnvelopeFault {
    pub kind: FaultKind,
    pub detail: String,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self { success: true, message: None, data: Some(data), error: None }),
        )
    }

    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self { success: true, message: None, data: Some(data), error: None }),
        )
    }
}

impl IntoResponse for ApiFault {
    fn into_response(self) -> Response {
        if self.kind == FaultKind::Internal {
            // El rastro interno conserva la correlación; el cliente no.
            error!(
                correlation_id = %self.correlation_id,
                "💥 [INTERNAL_FAULT]: {}", self.detail
            );
        }

        let client_detail = match self.kind {
            FaultKind::Internal => "internal error".to_string(),
            _ => self.detail.clone(),
        };

        let envelope: ApiEnvelope<serde_json::Value> = ApiEnvelope {
            success: false,
            message: None,
            data: None,
            error: Some(EnvelopeFault { kind: self.kind, detail: client_detail }),
        };

        (self.kind.http_status(), Json(envelope)).into_response()
    }
}

// --- TRADUCCIÓN DESDE LOS CATÁLOGOS DE ESTRATO ---

impl From<DbError> for ApiFault {
    fn from(fault: DbError) -> Self {
        match fault {
            DbError::DocumentNotFound | DbError::SignatureNotFound | DbError::UserNotFound => {
                ApiFault::not_found()
            }
            DbError::DuplicateSignature => ApiFault::conflict("AlreadySigned"),
            DbError::DuplicateEmail => ApiFault::conflict("email already registered"),
            DbError::InvalidState => ApiFault::conflict("state machine violation"),
            DbError::RefreshTokenReused => ApiFault::security("session voided"),
            DbError::RefreshTokenInvalid => ApiFault::auth(),
            other => {
                let internal = ApiFault::internal();
                error!(correlation_id = %internal.correlation_id, "DB fault: {}", other);
                internal
            }
        }
    }
}

impl From<LedgerError> for ApiFault {
    fn from(fault: LedgerError) -> Self {
        match fault {
            LedgerError::Unavailable(_) => ApiFault::ledger_unavailable(),
            LedgerError::RecordNotFound => ApiFault::not_found(),
            LedgerError::EndorsementQuorumUnmet { .. }
            | LedgerError::EndorserNotDistinct
            | LedgerError::SubmissionRejected(_) => {
                ApiFault::conflict("ledger rejected the submission")
            }
            LedgerError::SchemaDrift(_) => ApiFault::internal(),
        }
    }
}

impl From<IdentityError> for ApiFault {
    fn from(fault: IdentityError) -> Self {
        match fault {
            // Ningún factor concreto se revela al cliente.
            IdentityError::InvalidToken | IdentityError::Expired | IdentityError::Unknown => {
                ApiFault::auth()
            }
            IdentityError::KeySetMalformed(_) | IdentityError::PasswordHashFault(_) => {
                ApiFault::internal()
            }
        }
    }
}

impl From<SignerError> for ApiFault {
    fn from(fault: SignerError) -> Self {
        match fault {
            SignerError::NoKeyMaterial(_) => ApiFault::conflict("NoKeyMaterial"),
            SignerError::SignatureInvalid => ApiFault::validation("signature does not verify"),
            SignerError::CertificateExpired | SignerError::CertificateRevoked => {
                ApiFault::validation("certificate outside validity")
            }
            SignerError::KeyParseFault(_)
            | SignerError::StoreSealFault(_)
            | SignerError::StoreUnsealFault(_) => ApiFault::internal(),
        }
    }
}

impl From<HasherError> for ApiFault {
    fn from(fault: HasherError) -> Self {
        match fault {
            HasherError::DualDigestDivergence { .. } => {
                ApiFault::integrity("dual digest divergence")
            }
        }
    }
}

// FIN DEL ARCHIVO [apps/gateway/src/envelope.rs]
