// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: METADATA STORE SCHEMA (V4.0 - INTEGRITY STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. FOREIGN-KEY INTEGRITY: documentos, firmas y eventos cuelgan de
 *    sus agregados con claves foráneas declaradas.
 * 2. OUTBOX NATIVO: 'ledger_outbox' con AUTOINCREMENT para disciplina
 *    FIFO estricta de drenado.
 * 3. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 4. PERFORMANCE: Índices (owner_id, created_at) para listados y
 *    (document_id, created_at) para historiales por documento.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del núcleo de integridad.
 */
const CORE_TABLES: &[(&str, &str)] = &[
    ("TABLE_USERS", r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            is_verified INTEGER NOT NULL DEFAULT 0,
            is_revoked INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_USER_PROFILES", r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            user_id TEXT PRIMARY KEY REFERENCES users(id),
            display_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_DOCUMENTS", r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            file_name TEXT NOT NULL,
            media_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            storage_ref TEXT NOT NULL,
            digest_algorithm TEXT NOT NULL,
            digest_hex TEXT NOT NULL,
            secondary_digest_algorithm TEXT,
            secondary_digest_hex TEXT,
            security_level TEXT NOT NULL,
            signatures_required INTEGER NOT NULL DEFAULT 1,
            state TEXT NOT NULL DEFAULT 'UPLOADED',
            scan_warning INTEGER NOT NULL DEFAULT 0,
            ledger_tx_id TEXT,
            ledger_block_height INTEGER,
            expires_at TEXT,
            revoked_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_DOCUMENT_METADATA", r#"
        CREATE TABLE IF NOT EXISTS document_metadata (
            document_id TEXT PRIMARY KEY REFERENCES documents(id),
            page_count INTEGER,
            extraction_error TEXT,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_SIGNATURES", r#"
        CREATE TABLE IF NOT EXISTS signatures (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id),
            signer_id TEXT NOT NULL REFERENCES users(id),
            kind TEXT NOT NULL,
            payload BLOB NOT NULL,
            signer_hash_hex TEXT NOT NULL,
            verification_method TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            ledger_tx_id TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(document_id, signer_id)
        );
    "#),
    ("TABLE_DOCUMENT_SHARES", r#"
        CREATE TABLE IF NOT EXISTS document_shares (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id),
            granter_id TEXT NOT NULL REFERENCES users(id),
            grantee_email TEXT NOT NULL,
            access TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            uses_remaining INTEGER NOT NULL DEFAULT 1,
            expires_at TEXT,
            message TEXT,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_VERIFICATION_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS verification_events (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id),
            verifier_id TEXT,
            verified INTEGER NOT NULL,
            method TEXT NOT NULL,
            outcome TEXT NOT NULL,
            details TEXT,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_LEDGER_TRANSACTIONS", r#"
        CREATE TABLE IF NOT EXISTS ledger_transactions (
            tx_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            block_height INTEGER,
            block_hash_hex TEXT,
            payload_hash_hex TEXT NOT NULL,
            endorsements_json TEXT NOT NULL DEFAULT '[]',
            submitted_at TEXT NOT NULL,
            confirmed_at TEXT,
            status TEXT NOT NULL DEFAULT 'PENDING',
            dedup_key TEXT NOT NULL UNIQUE
        );
    "#),
    ("TABLE_AUDIT_RECORDS", r#"
        CREATE TABLE IF NOT EXISTS audit_records (
            id TEXT PRIMARY KEY,
            service TEXT NOT NULL,
            action TEXT NOT NULL,
            user_id TEXT,
            resource_kind TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            request_meta_json TEXT NOT NULL,
            status_code INTEGER NOT NULL,
            latency_ms INTEGER NOT NULL,
            shard_day TEXT NOT NULL,
            prev_hash_hex TEXT NOT NULL,
            entry_hash_hex TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_LEDGER_OUTBOX", r#"
        CREATE TABLE IF NOT EXISTS ledger_outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            dedup_key TEXT NOT NULL UNIQUE,
            payload_json TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            flushed_at TEXT
        );
    "#),
    ("TABLE_REFRESH_TOKENS", r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            session_id TEXT NOT NULL,
            issued_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            consumed_at TEXT
        );
    "#),
    ("TABLE_NOTIFICATIONS", r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            email TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            queued_at TEXT NOT NULL,
            dispatched_at TEXT
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas existentes se adapten a capacidades nuevas.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- TRAZABILIDAD DE OUTBOX SOBRE DOCUMENTOS ---
    ("DOC_LEDGER_PENDING", "ALTER TABLE documents ADD COLUMN ledger_pending INTEGER NOT NULL DEFAULT 0"),
    // --- MARCA DE SIMULACIÓN EN TRANSACCIONES ---
    ("TX_SIMULATED_SHADOW", "ALTER TABLE ledger_transactions ADD COLUMN shadow_of TEXT"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_DOCUMENTS_OWNER", "CREATE INDEX IF NOT EXISTS idx_documents_owner_created ON documents(owner_id, created_at);"),
    ("IDX_DOCUMENTS_STATE", "CREATE INDEX IF NOT EXISTS idx_documents_state ON documents(state);"),
    ("IDX_DOCUMENTS_EXPIRY", "CREATE INDEX IF NOT EXISTS idx_documents_expiry ON documents(expires_at) WHERE expires_at IS NOT NULL;"),
    ("IDX_SIGNATURES_DOCUMENT", "CREATE INDEX IF NOT EXISTS idx_signatures_document_created ON signatures(document_id, created_at);"),
    ("IDX_VERIFICATION_DOCUMENT", "CREATE INDEX IF NOT EXISTS idx_verification_document_created ON verification_events(document_id, created_at);"),
    ("IDX_LEDGER_TX_DOCUMENT", "CREATE INDEX IF NOT EXISTS idx_ledger_tx_document ON ledger_transactions(document_id, submitted_at);"),
    ("IDX_AUDIT_SHARD", "CREATE INDEX IF NOT EXISTS idx_audit_shard ON audit_records(service, shard_day);"),
    ("IDX_AUDIT_RESOURCE", "CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_records(resource_id, created_at);"),
    ("IDX_OUTBOX_STATUS", "CREATE INDEX IF NOT EXISTS idx_outbox_status ON ledger_outbox(status, id);"),
    ("IDX_OUTBOX_DOCUMENT", "CREATE INDEX IF NOT EXISTS idx_outbox_document ON ledger_outbox(document_id, status);"),
    ("IDX_SHARES_EMAIL", "CREATE INDEX IF NOT EXISTS idx_shares_grantee ON document_shares(grantee_email);"),
    ("IDX_SESSIONS_USER", "CREATE INDEX IF NOT EXISTS idx_refresh_user ON refresh_tokens(user_id, session_id);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con el Metadata Store.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_metadata_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V4.0...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Metadata Store V4.0 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in CORE_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        // Las mutaciones son idempotentes por tolerancia: una columna ya
        // existente produce un error benigno que se registra y se omite.
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  ↳ Evolved: {}", identifier),
            Err(evolution_fault) => {
                let fault_text = evolution_fault.to_string();
                if fault_text.contains("duplicate column") {
                    debug!("  ↳ Already evolved: {}", identifier);
                } else {
                    warn!("  ↳ Evolution skipped [{}]: {}", identifier, fault_text);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("INDEX_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
