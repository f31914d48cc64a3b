// INICIO DEL ARCHIVO [apps/gateway/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: CORE CONFIGURATION BOOTSTRAP (V4.0 - ENV SEALED)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: HIDRATACIÓN EXPLÍCITA DEL ENTORNO DE PROCESO
 *
 * Ningún estado global de módulo: el kernel posee la configuración y
 * la inyecta en cada estrato. Las variables aceptadas son exactamente
 * las del manifiesto de despliegue.
 * =================================================================
 */

use chrono::Duration as ChronoDuration;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Configuración completa del núcleo, hidratada desde el entorno.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub database_auth_token: Option<String>,
    /// Aceptada por paridad con el manifiesto; el caché de principales
    /// es en proceso y no usa Redis.
    pub redis_url: Option<String>,

    // --- LEDGER ---
    pub ledger_channel: String,
    pub ledger_chaincode: String,
    pub ledger_msp_id: String,
    pub ledger_wallet_path: String,
    pub ledger_ca_url: String,

    // --- IDENTIDAD Y SECRETOS ---
    pub signing_key_store: PathBuf,
    pub internal_api_key: String,
    pub token_signing_key_set: String,
    pub token_ttl: ChronoDuration,
    pub refresh_ttl: ChronoDuration,

    // --- INGESTA ---
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub allowed_media_types: Vec<String>,

    // --- ESCÁNER ---
    pub scanner_url: String,
    pub scanner_timeout: Duration,

    // --- OUTBOX ---
    pub outbox_max_attempts: u32,
    pub outbox_base_backoff: Duration,

    // --- RED ---
    pub listening_port: u16,

    // --- FIRMA BIOMÉTRICA ---
    pub biometric_confidence_threshold: f64,
}

impl CoreConfig {
    /// Hidrata la configuración del entorno de proceso.
    ///
    /// Las variables críticas sin valor abortan la ignición; las
    /// operativas degradan a valores de desarrollo con advertencia.
    pub fn from_environment() -> Self {
        let database_url = required_env("DB_URL");

        let allowed_media_types = optional_env("ALLOWED_MEDIA_TYPES")
            .unwrap_or_else(|| "application/pdf,text/plain,image/png,image/jpeg".to_string())
            .split(',')
            .map(|media| media.trim().to_ascii_lowercase())
            .filter(|media| !media.is_empty())
            .collect();

        let config = Self {
            database_url,
            database_auth_token: optional_env("DB_AUTH_TOKEN"),
            redis_url: optional_env("REDIS_URL"),

            ledger_channel: env_or("LEDGER_CHANNEL", "versafe-channel"),
            ledger_chaincode: env_or("LEDGER_CHAINCODE", "document-integrity"),
            ledger_msp_id: env_or("LEDGER_MSP_ID", "VerSafeMSP"),
            ledger_wallet_path: env_or("LEDGER_WALLET_PATH", "./wallet"),
            ledger_ca_url: env_or("LEDGER_CA_URL", "http://localhost:7054"),

            signing_key_store: PathBuf::from(env_or("SIGNING_KEY_STORE", "./keystore/vault.sealed")),
            internal_api_key: required_env("INTERNAL_API_KEY"),
            token_signing_key_set: required_env("TOKEN_SIGNING_KEY_SET"),
            token_ttl: ChronoDuration::seconds(parse_env_or("TOKEN_TTL", 900)),
            refresh_ttl: ChronoDuration::seconds(parse_env_or("REFRESH_TTL", 1_209_600)),

            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "./uploads")),
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 26_214_400) as u64,
            allowed_media_types,

            scanner_url: env_or("SCANNER_URL", "http://localhost:8090"),
            scanner_timeout: Duration::from_secs(parse_env_or("SCANNER_TIMEOUT", 10) as u64),

            outbox_max_attempts: parse_env_or("OUTBOX_MAX_ATTEMPTS", 6) as u32,
            outbox_base_backoff: Duration::from_millis(parse_env_or("OUTBOX_BASE_BACKOFF", 500) as u64),

            listening_port: parse_env_or("PORT", 3000) as u16,

            biometric_confidence_threshold: optional_env("BIOMETRIC_CONFIDENCE_THRESHOLD")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0.9),
        };

        if config.redis_url.is_some() {
            info!("ℹ️ [BOOTSTRAP]: REDIS_URL accepted for manifest parity (cache is in-process).");
        }

        config
    }
}

fn required_env(variable_name: &str) -> String {
    std::env::var(variable_name).unwrap_or_else(|_| {
        panic!("CRITICAL_FAULT: {} not defined in runtime environment.", variable_name)
    })
}

fn optional_env(variable_name: &str) -> Option<String> {
    std::env::var(variable_name).ok().filter(|value| !value.is_empty())
}

fn env_or(variable_name: &str, development_default: &str) -> String {
    optional_env(variable_name).unwrap_or_else(|| {
        warn!("⚙️ [BOOTSTRAP]: {} absent, using development default.", variable_name);
        development_default.to_string()
    })
}

fn parse_env_or(variable_name: &str, development_default: u64) -> i64 {
    optional_env(variable_name)
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(development_default as i64)
}
// FIN DEL ARCHIVO [apps/gateway/src/bootstrap.rs]
