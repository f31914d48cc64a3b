// INICIO DEL ARCHIVO [apps/gateway/src/bin/opsctl.rs]
/*!
 * =================================================================
 * APARATO: OPSCTL ADMINISTRATIVE CLI (V4.1)
 * CLASIFICACIÓN: OPERATIONS SHELL (ESTRATO L6)
 * RESPONSABILIDAD: DRENADO DE OUTBOX, VERIFICACIÓN DE CADENA Y BARRIDO
 *
 * Códigos de salida del contrato operacional:
 *   0 éxito · 2 error de uso · 3 fallo de integridad detectado ·
 *   4 ledger inalcanzable · 5 error interno.
 * =================================================================
 */

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::{error, info};

use versafe_gateway::bootstrap::CoreConfig;
use versafe_gateway::kernel::CoreKernel;
use versafe_gateway::services::{ExpiryReaper, LedgerOutboxRelay};
use versafe_infra_db::repositories::AuditChainReport;
use versafe_shared_sentinel::init_tracing;

const EXIT_SUCCESS: i32 = 0;
const EXIT_INTEGRITY_FAILURE: i32 = 3;
const EXIT_LEDGER_UNAVAILABLE: i32 = 4;
const EXIT_INTERNAL: i32 = 5;

#[derive(Parser)]
#[command(
    name = "opsctl",
    about = "Consola administrativa del núcleo de integridad VerSafe",
    version
)]
struct OpsCli {
    #[command(subcommand)]
    command: OpsCommand,
}

#[derive(Subcommand)]
enum OpsCommand {
    /// Drena el Outbox del Ledger en orden FIFO hasta vaciarlo.
    OutboxDrain {
        /// Máximo de ciclos de drenado antes de rendirse.
        #[arg(long, default_value_t = 10)]
        max_cycles: u32,
    },
    /// Re-verifica la cadena de auditoría de un shard o de todos.
    AuditVerify {
        /// Servicio del shard (p.ej. 'document-ingest').
        #[arg(long)]
        service: Option<String>,
        /// Día del shard en formato YYYY-MM-DD.
        #[arg(long)]
        day: Option<String>,
    },
    /// Barrido inmediato de ventanas de validez vencidas.
    ExpirySweep,
}

fn main() {
    dotenv().ok();
    init_tracing("versafe_opsctl");

    // clap sale con código 2 por sí mismo ante un error de uso.
    let cli = OpsCli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(runtime_fault) => {
            error!("💀 [OPSCTL]: Runtime ignition failed: {}", runtime_fault);
            std::process::exit(EXIT_INTERNAL);
        }
    };

    let exit_code = runtime.block_on(async {
        let config = CoreConfig::from_environment();
        let kernel = CoreKernel::ignite(config).await;
        let state = kernel.application_shared_state;

        match cli.command {
            OpsCommand::OutboxDrain { max_cycles } => execute_outbox_drain(state, max_cycles).await,
            OpsCommand::AuditVerify { service, day } => {
                execute_audit_verify(state, service, day).await
            }
            OpsCommand::ExpirySweep => execute_expiry_sweep(state).await,
        }
    });

    std::process::exit(exit_code);
}

/// Drena hasta vaciar o agotar los ciclos. Una cola que no avanza con
/// el uplink caído es 'ledger unavailable' (código 4).
async fn execute_outbox_drain(
    state: versafe_gateway::state::AppState,
    max_cycles: u32,
) -> i32 {
    let relay = LedgerOutboxRelay::new(state.clone());

    for cycle_index in 0..max_cycles {
        let pending_before = match state.outbox_repository.pending_count().await {
            Ok(count) => count,
            Err(db_fault) => {
                error!("💀 [OPSCTL]: Outbox inspection failed: {}", db_fault);
                return EXIT_INTERNAL;
            }
        };
        if pending_before == 0 {
            info!("✅ [OPSCTL]: Outbox empty after {} cycle(s).", cycle_index);
            return EXIT_SUCCESS;
        }

        match relay.execute_drain_cycle().await {
            Ok(0) => {
                // Sin progreso: el uplink sigue caído.
                error!(
                    "🔴 [OPSCTL]: No progress, {} entr(ies) still pending (ledger down).",
                    pending_before
                );
                return EXIT_LEDGER_UNAVAILABLE;
            }
            Ok(drained) => info!("📗 [OPSCTL]: Cycle {} drained {} entr(ies).", cycle_index, drained),
            Err(drain_fault) => {
                error!("💀 [OPSCTL]: Drain cycle collapsed: {}", drain_fault);
                return EXIT_INTERNAL;
            }
        }
    }

    match state.outbox_repository.pending_count().await {
        Ok(0) => EXIT_SUCCESS,
        Ok(remaining) => {
            error!("🔴 [OPSCTL]: {} entr(ies) remain after {} cycles.", remaining, max_cycles);
            EXIT_LEDGER_UNAVAILABLE
        }
        Err(_) => EXIT_INTERNAL,
    }
}

/// Verifica shards y reporta el índice del primer eslabón roto.
async fn execute_audit_verify(
    state: versafe_gateway::state::AppState,
    service: Option<String>,
    day: Option<String>,
) -> i32 {
    let target_shards = match (service, day) {
        (Some(service), Some(day)) => vec![(service, day)],
        _ => match state.audit_repository.list_shards().await {
            Ok(shards) => shards,
            Err(list_fault) => {
                error!("💀 [OPSCTL]: Shard listing failed: {}", list_fault);
                return EXIT_INTERNAL;
            }
        },
    };

    let mut integrity_failure = false;
    for (shard_service, shard_day) in target_shards {
        match state.audit_repository.verify_chain(&shard_service, &shard_day).await {
            Ok(AuditChainReport::Intact { record_count }) => {
                info!(
                    "✅ [OPSCTL]: Shard ({}, {}) intact with {} record(s).",
                    shard_service, shard_day, record_count
                );
            }
            Ok(AuditChainReport::Broken { first_broken_index }) => {
                integrity_failure = true;
                // El índice del primer eslabón roto es la evidencia
                // operacional del contrato.
                println!(
                    "BROKEN shard=({}, {}) first_broken_index={}",
                    shard_service, shard_day, first_broken_index
                );
                error!(
                    "💥 [OPSCTL]: Chain broken in ({}, {}) at index {}.",
                    shard_service, shard_day, first_broken_index
                );
            }
            Err(verify_fault) => {
                error!("💀 [OPSCTL]: Verification collapsed: {}", verify_fault);
                return EXIT_INTERNAL;
            }
        }
    }

    if integrity_failure {
        EXIT_INTEGRITY_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

async fn execute_expiry_sweep(state: versafe_gateway::state::AppState) -> i32 {
    let reaper = ExpiryReaper::new(state);
    match reaper.execute_sweep().await {
        Ok(expired) => {
            info!("✅ [OPSCTL]: Sweep expired {} document(s).", expired);
            EXIT_SUCCESS
        }
        Err(sweep_fault) => {
            error!("💀 [OPSCTL]: Sweep collapsed: {}", sweep_fault);
            EXIT_INTERNAL
        }
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/bin/opsctl.rs]
