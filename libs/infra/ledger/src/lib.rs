// [libs/infra/ledger/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEDGER GATEWAY FACADE (V4.0 - DUAL MODE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: ABSTRACCIÓN ÚNICA SOBRE EL LEDGER PERMISIONADO
 *
 * El modo (uplink real o simulador determinista) se selecciona en la
 * ignición mediante sonda de conectividad y sólo cambia en bloque ante
 * un apagón sostenido; jamás se mezclan modos por llamada.
 * =================================================================
 */

pub mod backoff;
pub mod errors;
pub mod gateway;
pub mod simulator;
pub mod uplink;

pub use errors::LedgerError;
pub use gateway::{
    ensure_distinct_endorsement, LedgerGateway, LedgerGatewayConfig, SubmissionIntent,
    SubmissionReceipt,
};
pub use simulator::DeterministicSimulator;
pub use uplink::FabricUplinkClient;
