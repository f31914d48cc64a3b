// INICIO DEL ARCHIVO [apps/gateway/src/kernel.rs]
/**
 * =================================================================
 * APARATO: CORE KERNEL (V4.3 - COMPOSITION ROOT)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los estratos:
 * Metadata Store, Ledger Gateway (con sonda de modo), bóveda de
 * claves, conjunto de firma de tokens y los daemons de fondo
 * (auditoría, relevo de Outbox, segador de expiración).
 * =================================================================
 */

use crate::bootstrap::CoreConfig;
use crate::routes::create_core_router;
use crate::services::{
    build_audit_recorder, ExpiryReaper, LedgerOutboxRelay,
};
use crate::state::AppState;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, instrument};
use versafe_core_signer::KeyVault;
use versafe_domain_identity::SigningKeySet;
use versafe_infra_db::MetadataStoreClient;
use versafe_infra_ledger::{LedgerGateway, LedgerGatewayConfig};

pub struct CoreKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
    audit_daemon: Option<crate::services::AuditRecorderDaemon>,
}

impl CoreKernel {
    /**
     * Ignición completa: enlaces, sondas y composición del estado.
     */
    #[instrument(skip(config))]
    pub async fn ignite(config: CoreConfig) -> Self {
        // 1. ENLACE CON EL METADATA STORE
        let database_client = MetadataStoreClient::connect(
            &config.database_url,
            config.database_auth_token.clone(),
        )
        .await
        .expect("FATAL: Metadata Store link collapse. Ignition aborted.");

        // 2. GATEWAY DEL LEDGER (sonda de modo en el arranque)
        let ledger_gateway = LedgerGateway::ignite(LedgerGatewayConfig {
            channel: config.ledger_channel.clone(),
            chaincode: config.ledger_chaincode.clone(),
            msp_identity: config.ledger_msp_id.clone(),
            wallet_path: config.ledger_wallet_path.clone(),
            ca_url: config.ledger_ca_url.clone(),
            endorsement_quorum: 1,
            max_attempts: config.outbox_max_attempts,
            base_backoff: config.outbox_base_backoff,
            confirm_deadline: std::time::Duration::from_secs(30),
        })
        .await;

        // 3. BÓVEDA DE FIRMA (unseal desde el almacén externo)
        let key_vault = KeyVault::unseal_from(&config.signing_key_store, &config.internal_api_key)
            .expect("FATAL: Signing key store unseal failure.");

        // 4. CONJUNTO DE CLAVES DE TOKENS
        let key_set = SigningKeySet::from_environment_value(&config.token_signing_key_set)
            .expect("FATAL: TOKEN_SIGNING_KEY_SET malformed.");

        // 5. CANAL DE AUDITORÍA (handle + daemon)
        let audit_repository = Arc::new(versafe_infra_db::repositories::AuditRepository::new(
            database_client.clone(),
        ));
        let audit_buffer_path = config.upload_dir.join(".audit_buffer.jsonl");
        let (audit_handle, audit_daemon) =
            build_audit_recorder(audit_repository, audit_buffer_path);

        let listening_port = config.listening_port;
        let application_shared_state = AppState::new(
            config,
            database_client,
            ledger_gateway,
            key_vault,
            key_set,
            audit_handle,
        );

        Self {
            server_network_port: listening_port,
            application_shared_state,
            audit_daemon: Some(audit_daemon),
        }
    }

    /**
     * Lanza los daemons de fondo y el servidor HTTP principal.
     */
    pub async fn launch_core_operations(mut self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. DAEMON DE SELLADO DE AUDITORÍA ---
        if let Some(audit_daemon) = self.audit_daemon.take() {
            tokio::spawn(async move { audit_daemon.spawn_sealing_loop().await });
        }

        // --- 2. RELEVO DEL OUTBOX DEL LEDGER ---
        let relay = LedgerOutboxRelay::new(shared_application_state.clone());
        tokio::spawn(async move { relay.spawn_relay_loop().await });

        // --- 3. SEGADOR DE VENTANAS DE VALIDEZ ---
        let reaper = ExpiryReaper::new(shared_application_state.clone());
        tokio::spawn(async move { reaper.spawn_reaper_loop().await });

        // --- 4. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let core_router = create_core_router(shared_application_state);

        let bind_address = SocketAddr::new(
            "0.0.0.0".parse::<IpAddr>().expect("static address"),
            self.server_network_port,
        );

        info!("🚀 [KERNEL_ONLINE]: Integrity core listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        if let Err(server_error) = axum::serve(tcp_listener, core_router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/kernel.rs]
