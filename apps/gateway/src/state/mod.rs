// [apps/gateway/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: CORE STATE ORCHESTRATOR (V4.2 - COMPOSITION ROOT)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, GATEWAY Y DAEMONS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NO SINGLETONS: Todo vive aquí con init/teardown explícitos; los
 *    handlers reciben el estado por inyección, nunca por módulo.
 * 2. PER-DOCUMENT LINEARIZATION: El registro de candados por documento
 *    serializa firma, revocación y avance de estado de cada fila.
 * 3. BOUNDED CPU POOL: El semáforo de cómputo acota hashing y firma
 *    asimétrica al número de núcleos del host.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, RwLock, Semaphore};
use tracing::debug;
use uuid::Uuid;

use versafe_core_signer::KeyVault;
use versafe_domain_identity::{PrincipalCache, SigningKeySet, TokenMint};
use versafe_infra_db::repositories::{
    AuditRepository, DocumentRepository, LedgerTxRepository, NotificationRepository,
    OutboxRepository, SessionRepository, ShareRepository, SignatureRepository, UserRepository,
    VerificationRepository,
};
use versafe_infra_db::MetadataStoreClient;
use versafe_infra_ledger::LedgerGateway;
use versafe_infra_scanner::MalwareScannerClient;

use crate::bootstrap::CoreConfig;
use crate::services::audit_recorder::AuditRecorderHandle;
use crate::services::file_vault::FileVault;

/**
 * Contenedor de estado compartido (Thread-Safe) del núcleo.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Configuración sellada del proceso.
    pub config: Arc<CoreConfig>,
    /// Cliente del Metadata Store (fuente única de verdad relacional).
    pub database_client: MetadataStoreClient,
    /// Gateway único hacia el Ledger (real o simulado, jamás mixto).
    pub ledger_gateway: Arc<LedgerGateway>,
    /// Cliente del escáner de malware con timeout acotado.
    pub scanner_client: Arc<MalwareScannerClient>,
    /// Almacén de bytes detrás de 'storage_ref' (sólo Ingest escribe).
    pub file_vault: Arc<FileVault>,
    /// Bóveda de material de firma en proceso (sellado fuera del núcleo).
    pub key_vault: Arc<RwLock<KeyVault>>,
    /// Emisor/verificador de tokens sobre el conjunto de claves activo.
    pub token_mint: Arc<TokenMint>,
    /// Caché acotada token -> principal (≤ 5 min, ≤ expiración).
    pub principal_cache: Arc<PrincipalCache>,
    /// Canal no bloqueante hacia el daemon de auditoría.
    pub audit_recorder: AuditRecorderHandle,

    // --- REGISTRO DE CANDADOS POR DOCUMENTO ---
    document_locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,

    /// Pool acotado para pasos CPU-bound (hashing, firma asimétrica).
    pub compute_pool: Arc<Semaphore>,

    // --- REPOSITORIOS DEL METADATA STORE ---
    pub user_repository: Arc<UserRepository>,
    pub document_repository: Arc<DocumentRepository>,
    pub signature_repository: Arc<SignatureRepository>,
    pub share_repository: Arc<ShareRepository>,
    pub verification_repository: Arc<VerificationRepository>,
    pub ledger_tx_repository: Arc<LedgerTxRepository>,
    pub audit_repository: Arc<AuditRepository>,
    pub outbox_repository: Arc<OutboxRepository>,
    pub notification_repository: Arc<NotificationRepository>,
    pub session_repository: Arc<SessionRepository>,
}

impl AppState {
    /**
     * Forja el Estado Maestro inyectando todas las dependencias ya
     * ignidas por el kernel.
     */
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoreConfig,
        database_client: MetadataStoreClient,
        ledger_gateway: LedgerGateway,
        key_vault: KeyVault,
        key_set: SigningKeySet,
        audit_recorder: AuditRecorderHandle,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing composition sequence V4.2...");

        let scanner_client = Arc::new(MalwareScannerClient::new(
            config.scanner_url.clone(),
            config.scanner_timeout,
        ));
        let file_vault = Arc::new(FileVault::new(config.upload_dir.clone()));
        let token_mint = Arc::new(TokenMint::new(key_set, config.token_ttl, config.refresh_ttl));

        Self {
            config: Arc::new(config),
            database_client: database_client.clone(),
            ledger_gateway: Arc::new(ledger_gateway),
            scanner_client,
            file_vault,
            key_vault: Arc::new(RwLock::new(key_vault)),
            token_mint,
            principal_cache: Arc::new(PrincipalCache::new()),
            audit_recorder,

            document_locks: Arc::new(Mutex::new(HashMap::new())),
            compute_pool: Arc::new(Semaphore::new(num_cpus::get().max(1))),

            user_repository: Arc::new(UserRepository::new(database_client.clone())),
            document_repository: Arc::new(DocumentRepository::new(database_client.clone())),
            signature_repository: Arc::new(SignatureRepository::new(database_client.clone())),
            share_repository: Arc::new(ShareRepository::new(database_client.clone())),
            verification_repository: Arc::new(VerificationRepository::new(database_client.clone())),
            ledger_tx_repository: Arc::new(LedgerTxRepository::new(database_client.clone())),
            audit_repository: Arc::new(AuditRepository::new(database_client.clone())),
            outbox_repository: Arc::new(OutboxRepository::new(database_client.clone())),
            notification_repository: Arc::new(NotificationRepository::new(database_client.clone())),
            session_repository: Arc::new(SessionRepository::new(database_client)),
        }
    }

    /**
     * Puente outbox-safe hacia el Ledger, construido bajo demanda
     * sobre los repositorios ya hidratados.
     */
    pub fn ledger_bridge(&self) -> crate::services::ledger_bridge::LedgerBridge {
        crate::services::ledger_bridge::LedgerBridge::new(
            self.ledger_gateway.clone(),
            self.ledger_tx_repository.clone(),
            self.outbox_repository.clone(),
            self.document_repository.clone(),
        )
    }

    /**
     * Candado asíncrono por documento: serializa firma, revocación y
     * avance de estado sobre la misma fila.
     */
    pub fn document_lock(&self, document_id: &Uuid) -> Arc<AsyncMutex<()>> {
        let mut registry_guard = self
            .document_locks
            .lock()
            .expect("FATAL: Document lock registry poisoned.");
        registry_guard
            .entry(*document_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
