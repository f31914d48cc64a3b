// INICIO DEL ARCHIVO [libs/infra/ledger/src/gateway.rs]
/*!
 * =================================================================
 * APARATO: LEDGER GATEWAY (V4.3 - MODE GOVERNED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: CONTRATO ÚNICO DE SUMISIÓN, CONSULTA Y ESTADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MODE AT IGNITION: La sonda de conectividad decide el modo en el
 *    arranque; un apagón sostenido (racha de fallos físicos) bascula
 *    el gateway completo al simulador. Jamás se mezclan modos por
 *    llamada individual.
 * 2. RETRY DISCIPLINE: Los fallos físicos se reintentan con backoff
 *    exponencial y jitter hasta el techo; los rechazos definitivos
 *    (endoso, validación) no se reintentan.
 * 3. IDEMPOTENT SURFACE: El recibo de una clave de deduplicación
 *    repetida es el recibo original.
 *
 * # Mathematical Proof (Deadline Independence):
 * El techo de confirmación del Ledger es propio del gateway y no
 * hereda el deadline del cliente HTTP: un cliente lento jamás deja una
 * transacción pendiente sin dueño (§ reconciliación por Outbox).
 * =================================================================
 */

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use versafe_domain_models::ledger::{Endorsement, LedgerRecord, LedgerTxKind, LedgerTxStatus};

use crate::backoff::BackoffPlan;
use crate::errors::LedgerError;
use crate::simulator::DeterministicSimulator;
use crate::uplink::FabricUplinkClient;

/// Racha de fallos físicos consecutivos que dispara la bascula al
/// simulador (apagón sostenido).
const SUSTAINED_OUTAGE_THRESHOLD: u32 = 3;

/// Configuración completa del gateway (hidratada desde el entorno).
#[derive(Debug, Clone)]
pub struct LedgerGatewayConfig {
    pub channel: String,
    pub chaincode: String,
    pub msp_identity: String,
    pub wallet_path: String,
    pub ca_url: String,
    pub endorsement_quorum: usize,
    pub max_attempts: u32,
    pub base_backoff: Duration,
    /// Techo propio de confirmación, independiente del cliente.
    pub confirm_deadline: Duration,
}

/// Operación lógica a someter al Ledger.
#[derive(Debug, Clone)]
pub struct SubmissionIntent {
    pub document_id: Uuid,
    pub kind: LedgerTxKind,
    pub monotonic_seq: u64,
    pub dedup_key: String,
    pub payload: serde_json::Value,
}

impl SubmissionIntent {
    pub fn payload_hash_hexadecimal(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.payload.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Recibo de una sumisión aceptada (real o simulada).
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub tx_id: String,
    pub block_height: Option<u64>,
    pub block_hash_hexadecimal: Option<String>,
    pub endorsements: Vec<Endorsement>,
    pub status: LedgerTxStatus,
    pub simulated: bool,
    pub payload_hash_hexadecimal: String,
}

/// Variante operativa seleccionada en la ignición.
enum GatewayMode {
    Fabric(FabricUplinkClient),
    Simulated(DeterministicSimulator),
}

pub struct LedgerGateway {
    mode: RwLock<GatewayMode>,
    backoff_plan: BackoffPlan,
    confirm_deadline: Duration,
    consecutive_physical_failures: AtomicU32,
    config: LedgerGatewayConfig,
}

impl LedgerGateway {
    /// Ignición con sonda de conectividad: si el Ledger no responde,
    /// el gateway arranca directamente en modo simulador.
    #[instrument(skip(config))]
    pub async fn ignite(config: LedgerGatewayConfig) -> Self {
        let uplink = FabricUplinkClient::new(
            config.ca_url.clone(),
            config.channel.clone(),
            config.chaincode.clone(),
            config.msp_identity.clone(),
            config.endorsement_quorum,
            config.confirm_deadline,
        );

        let mode = if uplink.probe_connectivity().await {
            GatewayMode::Fabric(uplink)
        } else {
            warn!("🎭 [LEDGER_GATEWAY]: Igniting in SIMULATED mode (probe failed).");
            GatewayMode::Simulated(DeterministicSimulator::new())
        };

        Self {
            mode: RwLock::new(mode),
            backoff_plan: BackoffPlan::new(config.base_backoff, config.max_attempts),
            confirm_deadline: config.confirm_deadline,
            consecutive_physical_failures: AtomicU32::new(0),
            config,
        }
    }

    /// Modo de sólo simulación (proving grounds y despliegues sin Ledger).
    pub fn ignite_simulated(config: LedgerGatewayConfig) -> Self {
        Self {
            mode: RwLock::new(GatewayMode::Simulated(DeterministicSimulator::new())),
            backoff_plan: BackoffPlan::new(config.base_backoff, config.max_attempts),
            confirm_deadline: config.confirm_deadline,
            consecutive_physical_failures: AtomicU32::new(0),
            config,
        }
    }

    pub async fn is_simulated(&self) -> bool {
        matches!(*self.mode.read().await, GatewayMode::Simulated(_))
    }

    /// Sumisión con disciplina de reintentos.
    ///
    /// # Errors:
    /// 'Unavailable' tras agotar el techo (el llamador debe encolar la
    /// operación en el Outbox durable); los rechazos definitivos se
    /// propagan sin reintento.
    #[instrument(skip(self, intent), fields(dedup_key = %intent.dedup_key))]
    pub async fn submit(&self, intent: &SubmissionIntent) -> Result<SubmissionReceipt, LedgerError> {
        {
            let mode_guard = self.mode.read().await;
            if let GatewayMode::Simulated(simulator) = &*mode_guard {
                return Ok(simulator.submit(intent));
            }
        }

        let mut last_physical_fault = String::new();
        for attempt_index in 0..self.backoff_plan.max_attempts() {
            let delay = self.backoff_plan.delay_before_attempt(attempt_index);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let submit_result = {
                let mode_guard = self.mode.read().await;
                match &*mode_guard {
                    GatewayMode::Fabric(uplink) => uplink.submit(intent).await,
                    GatewayMode::Simulated(simulator) => return Ok(simulator.submit(intent)),
                }
            };

            match submit_result {
                Ok(receipt) => {
                    self.consecutive_physical_failures.store(0, Ordering::Relaxed);
                    return Ok(receipt);
                }
                Err(LedgerError::Unavailable(fault_detail)) => {
                    last_physical_fault = fault_detail;
                    self.register_physical_failure().await;
                }
                // Rechazos definitivos: sin reintento.
                Err(definitive_fault) => return Err(definitive_fault),
            }
        }

        Err(LedgerError::Unavailable(last_physical_fault))
    }

    /// Sondea la confirmación de un tx hasta el techo propio del
    /// gateway. Devuelve el último estatus observado.
    #[instrument(skip(self))]
    pub async fn await_confirmation(
        &self,
        tx_id: &str,
    ) -> Result<(LedgerTxStatus, Option<u64>, Option<String>), LedgerError> {
        let poll_interval = Duration::from_millis(500);
        let deadline = tokio::time::Instant::now() + self.confirm_deadline;

        loop {
            let status_result = self.tx_status(tx_id).await?;
            match status_result.0 {
                LedgerTxStatus::Confirmed | LedgerTxStatus::Rejected | LedgerTxStatus::Simulated => {
                    return Ok(status_result);
                }
                LedgerTxStatus::Pending => {
                    if tokio::time::Instant::now() >= deadline {
                        return Ok(status_result);
                    }
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    pub async fn tx_status(
        &self,
        tx_id: &str,
    ) -> Result<(LedgerTxStatus, Option<u64>, Option<String>), LedgerError> {
        let mode_guard = self.mode.read().await;
        match &*mode_guard {
            GatewayMode::Fabric(uplink) => uplink.tx_status(tx_id).await,
            GatewayMode::Simulated(simulator) => {
                simulator.tx_status(tx_id).map(|status| (status, None, None))
            }
        }
    }

    pub async fn query(&self, document_id: &Uuid) -> Result<LedgerRecord, LedgerError> {
        let mode_guard = self.mode.read().await;
        match &*mode_guard {
            GatewayMode::Fabric(uplink) => uplink.query_record(document_id).await,
            GatewayMode::Simulated(simulator) => simulator.query(document_id),
        }
    }

    pub async fn history(&self, document_id: &Uuid) -> Result<Vec<LedgerRecord>, LedgerError> {
        let mode_guard = self.mode.read().await;
        match &*mode_guard {
            GatewayMode::Fabric(uplink) => uplink.history(document_id).await,
            GatewayMode::Simulated(simulator) => simulator.history(document_id),
        }
    }

    /// Re-sonda el uplink y vuelve al modo real si responde. El relevo
    /// del Outbox la invoca antes de cada drenado.
    #[instrument(skip(self))]
    pub async fn try_restore_uplink(&self) -> bool {
        let currently_simulated = self.is_simulated().await;
        if !currently_simulated {
            return true;
        }

        let uplink = FabricUplinkClient::new(
            self.config.ca_url.clone(),
            self.config.channel.clone(),
            self.config.chaincode.clone(),
            self.config.msp_identity.clone(),
            self.config.endorsement_quorum,
            self.confirm_deadline,
        );

        if uplink.probe_connectivity().await {
            let mut mode_guard = self.mode.write().await;
            *mode_guard = GatewayMode::Fabric(uplink);
            self.consecutive_physical_failures.store(0, Ordering::Relaxed);
            info!("🟢 [LEDGER_GATEWAY]: Uplink restored, leaving simulated mode.");
            return true;
        }
        false
    }

    /// Contabiliza un fallo físico; una racha sostenida bascula el
    /// gateway completo al simulador.
    async fn register_physical_failure(&self) {
        let streak = self.consecutive_physical_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if streak >= SUSTAINED_OUTAGE_THRESHOLD {
            let mut mode_guard = self.mode.write().await;
            if matches!(*mode_guard, GatewayMode::Fabric(_)) {
                warn!(
                    "🎭 [LEDGER_GATEWAY]: Sustained outage ({} faults), switching to SIMULATED mode.",
                    streak
                );
                *mode_guard = GatewayMode::Simulated(DeterministicSimulator::new());
            }
        }
    }
}

/// Una firma exige al menos un endosante distinto del firmante.
///
/// # Errors:
/// 'EndorserNotDistinct' si todos los endosos provienen de la
/// identidad del propio firmante.
pub fn ensure_distinct_endorsement(
    endorsements: &[Endorsement],
    signer_identity: &str,
) -> Result<(), LedgerError> {
    let has_distinct = endorsements
        .iter()
        .any(|endorsement| endorsement.endorsing_identity != signer_identity);
    if has_distinct {
        Ok(())
    } else {
        Err(LedgerError::EndorserNotDistinct)
    }
}

// FIN DEL ARCHIVO [libs/infra/ledger/src/gateway.rs]
