// [libs/infra/ledger/src/errors.rs]
/*!
 * =================================================================
 * APARATO: LEDGER ERROR CATALOG (V4.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL LEDGER
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// El Ledger no respondió dentro del techo de reintentos: la
    /// operación pendiente debe quedar en el Outbox durable.
    #[error("[L4_LEDGER_FAULT]: LEDGER_UNAVAILABLE -> {0}")]
    Unavailable(String),

    /// El quórum de endosos no se alcanzó para la propuesta.
    #[error("[L4_LEDGER_FAULT]: ENDORSEMENT_QUORUM_UNMET -> {got}/{required}")]
    EndorsementQuorumUnmet { got: usize, required: usize },

    /// Una firma exige al menos un endosante distinto del firmante.
    #[error("[L4_LEDGER_FAULT]: ENDORSER_NOT_DISTINCT_FROM_SIGNER")]
    EndorserNotDistinct,

    /// El Ledger rechazó la transacción de forma definitiva.
    #[error("[L4_LEDGER_FAULT]: SUBMISSION_REJECTED -> {0}")]
    SubmissionRejected(String),

    /// El registro consultado no existe en el Ledger.
    #[error("[L4_LEDGER_FAULT]: RECORD_NOT_FOUND")]
    RecordNotFound,

    /// Deriva de esquema en el payload del proveedor.
    #[error("[L4_LEDGER_FAULT]: PAYLOAD_SCHEMA_DRIFT -> {0}")]
    SchemaDrift(String),
}
