// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V4.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONFLICT AWARENESS: Distingue las colisiones de unicidad con
 *    significado de dominio (firma duplicada, correo duplicado) del
 *    resto de fallos SQL.
 * 2. STATE DISCIPLINE: 'InvalidState' sella toda transición que el
 *    retículo monotónico del documento rechaza.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el Metadata Store.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el dominio.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    // --- ESTRATO DOCUMENTAL ---

    /// El documento solicitado no existe en las tablas activas.
    #[error("[L3_DOCUMENT_FAULT]: IDENTIFIER_NOT_FOUND")]
    DocumentNotFound,

    /// La transición solicitada viola el retículo monotónico de estados.
    #[error("[L3_DOCUMENT_FAULT]: INVALID_STATE_TRANSITION")]
    InvalidState,

    // --- ESTRATO DE FIRMAS ---

    /// Colisión de unicidad (document_id, signer_id): el firmante ya firmó.
    #[error("[L3_SIGNATURE_FAULT]: ALREADY_SIGNED")]
    DuplicateSignature,

    /// La firma solicitada no existe.
    #[error("[L3_SIGNATURE_FAULT]: IDENTIFIER_NOT_FOUND")]
    SignatureNotFound,

    // --- ESTRATO DE IDENTIDAD ---

    /// La cuenta solicitada no existe.
    #[error("[L3_IDENTITY_FAULT]: USER_NOT_FOUND")]
    UserNotFound,

    /// Colisión de unicidad sobre el correo canónico.
    #[error("[L3_IDENTITY_FAULT]: EMAIL_ALREADY_REGISTERED")]
    DuplicateEmail,

    /// Re-uso de un refresh token ya consumido: sesión anulada.
    #[error("[L3_IDENTITY_FAULT]: REFRESH_TOKEN_REUSED")]
    RefreshTokenReused,

    /// El refresh token no existe o ya expiró.
    #[error("[L3_IDENTITY_FAULT]: REFRESH_TOKEN_REJECTED")]
    RefreshTokenInvalid,

    // --- ESTRATO DE COMPROMISO MULTI-TABLA ---

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,
}
