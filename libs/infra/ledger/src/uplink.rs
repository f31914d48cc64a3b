// INICIO DEL ARCHIVO [libs/infra/ledger/src/uplink.rs]
/*!
 * =================================================================
 * APARATO: FABRIC UPLINK CLIENT (V4.2 - QUORUM GUARDED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: SUMISIÓN ENDOSADA CONTRA EL LEDGER PERMISIONADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ENDORSE-THEN-SUBMIT: La sumisión retorna sólo cuando el Ledger
 *    reporta éxito de endoso; la confirmación se sondea aparte con su
 *    propio techo, independiente del deadline del cliente.
 * 2. QUORUM DISCIPLINE: Un endoso por debajo del quórum configurado es
 *    un rechazo, no un éxito parcial.
 * =================================================================
 */

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use versafe_domain_models::ledger::{Endorsement, LedgerRecord, LedgerTxStatus};

use crate::errors::LedgerError;
use crate::gateway::{SubmissionIntent, SubmissionReceipt};

/// Forma del recibo de sumisión del gateway Fabric.
#[derive(Deserialize)]
struct FabricSubmitSchema {
    tx_id: String,
    endorsements: Vec<FabricEndorsementSchema>,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    block_hash: Option<String>,
}

#[derive(Deserialize)]
struct FabricEndorsementSchema {
    identity: String,
    signature: String,
}

#[derive(Deserialize)]
struct FabricTxStatusSchema {
    status: String,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    block_hash: Option<String>,
}

#[derive(Deserialize)]
struct FabricRecordSchema {
    document_id: Uuid,
    digest: String,
    algo: String,
    owner_id: Uuid,
    file_name: String,
    state: String,
    tx_id: String,
    #[serde(default)]
    block_height: Option<u64>,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

pub struct FabricUplinkClient {
    internal_http_session: reqwest::Client,
    gateway_base_url: String,
    channel: String,
    chaincode: String,
    msp_identity: String,
    endorsement_quorum: usize,
}

impl FabricUplinkClient {
    pub fn new(
        gateway_base_url: String,
        channel: String,
        chaincode: String,
        msp_identity: String,
        endorsement_quorum: usize,
        submission_timeout: Duration,
    ) -> Self {
        Self {
            internal_http_session: reqwest::Client::builder()
                .timeout(submission_timeout)
                .tcp_keepalive(Some(Duration::from_secs(60)))
                .user_agent("VerSafe-Ledger-Uplink/V4.2")
                .build()
                .expect("CRITICAL: Failed to initialize ledger HTTP session"),
            gateway_base_url,
            channel,
            chaincode,
            msp_identity,
            endorsement_quorum: endorsement_quorum.max(1),
        }
    }

    fn chaincode_url(&self, suffix: &str) -> String {
        format!(
            "{}/api/v1/channels/{}/chaincodes/{}/{}",
            self.gateway_base_url, self.channel, self.chaincode, suffix
        )
    }

    /// Sonda de conectividad para la selección de modo en la ignición.
    #[instrument(skip(self))]
    pub async fn probe_connectivity(&self) -> bool {
        let probe_result = self
            .internal_http_session
            .get(format!("{}/healthz", self.gateway_base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match probe_result {
            Ok(response) if response.status().is_success() => {
                info!("🟢 [LEDGER_PROBE]: Uplink reachable, real mode selected.");
                true
            }
            Ok(response) => {
                warn!("🔴 [LEDGER_PROBE]: Gateway degraded (status {}).", response.status());
                false
            }
            Err(probe_fault) => {
                warn!("🔴 [LEDGER_PROBE]: Uplink unreachable: {}", probe_fault);
                false
            }
        }
    }

    /// Somete una operación y espera el éxito de endoso.
    ///
    /// # Errors:
    /// 'Unavailable' ante fallo físico (candidato a reintento);
    /// 'EndorsementQuorumUnmet' o 'SubmissionRejected' son definitivos.
    #[instrument(skip(self, intent), fields(document_id = %intent.document_id, kind = intent.kind.as_label()))]
    pub async fn submit(&self, intent: &SubmissionIntent) -> Result<SubmissionReceipt, LedgerError> {
        let submission_body = serde_json::json!({
            "function": intent.kind.as_label(),
            "document_id": intent.document_id.to_string(),
            "args": intent.payload,
            "msp_id": self.msp_identity,
            "dedup_key": intent.dedup_key,
            "seq": intent.monotonic_seq,
        });

        let network_response = self
            .internal_http_session
            .post(self.chaincode_url("submit"))
            .json(&submission_body)
            .send()
            .await
            .map_err(|uplink_fault| LedgerError::Unavailable(uplink_fault.to_string()))?;

        let http_status = network_response.status();

        // 409 Conflict: la clave de deduplicación ya fue aceptada. Se
        // interpreta como prueba de paridad, no como fallo.
        if http_status == StatusCode::CONFLICT || http_status.is_success() {
            let decoded: FabricSubmitSchema = network_response
                .json()
                .await
                .map_err(|e| LedgerError::SchemaDrift(e.to_string()))?;

            let endorsements: Vec<Endorsement> = decoded
                .endorsements
                .into_iter()
                .map(|e| Endorsement {
                    endorsing_identity: e.identity,
                    endorsement_signature_hexadecimal: e.signature,
                })
                .collect();

            if endorsements.len() < self.endorsement_quorum {
                return Err(LedgerError::EndorsementQuorumUnmet {
                    got: endorsements.len(),
                    required: self.endorsement_quorum,
                });
            }

            debug!("📗 [LEDGER_ENDORSED]: tx {} with {} endorsement(s).", decoded.tx_id, endorsements.len());

            return Ok(SubmissionReceipt {
                tx_id: decoded.tx_id,
                block_height: decoded.block_height,
                block_hash_hexadecimal: decoded.block_hash,
                endorsements,
                status: LedgerTxStatus::Pending,
                simulated: false,
                payload_hash_hexadecimal: intent.payload_hash_hexadecimal(),
            });
        }

        if http_status.is_server_error() {
            return Err(LedgerError::Unavailable(format!("status {}", http_status)));
        }

        let rejection_body = network_response.text().await.unwrap_or_default();
        Err(LedgerError::SubmissionRejected(format!("{}: {}", http_status, rejection_body)))
    }

    /// Sondea el estatus de una transacción sometida.
    #[instrument(skip(self))]
    pub async fn tx_status(
        &self,
        tx_id: &str,
    ) -> Result<(LedgerTxStatus, Option<u64>, Option<String>), LedgerError> {
        let network_response = self
            .internal_http_session
            .get(self.chaincode_url(&format!("tx/{}", tx_id)))
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if network_response.status() == StatusCode::NOT_FOUND {
            return Err(LedgerError::RecordNotFound);
        }
        if !network_response.status().is_success() {
            return Err(LedgerError::Unavailable(format!("status {}", network_response.status())));
        }

        let decoded: FabricTxStatusSchema = network_response
            .json()
            .await
            .map_err(|e| LedgerError::SchemaDrift(e.to_string()))?;

        let status = match decoded.status.as_str() {
            "CONFIRMED" => LedgerTxStatus::Confirmed,
            "REJECTED" => LedgerTxStatus::Rejected,
            _ => LedgerTxStatus::Pending,
        };
        Ok((status, decoded.block_height, decoded.block_hash))
    }

    /// Registro vigente del documento según el Ledger.
    #[instrument(skip(self))]
    pub async fn query_record(&self, document_id: &Uuid) -> Result<LedgerRecord, LedgerError> {
        let network_response = self
            .internal_http_session
            .get(self.chaincode_url(&format!("documents/{}", document_id)))
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if network_response.status() == StatusCode::NOT_FOUND {
            return Err(LedgerError::RecordNotFound);
        }
        if !network_response.status().is_success() {
            return Err(LedgerError::Unavailable(format!("status {}", network_response.status())));
        }

        let decoded: FabricRecordSchema = network_response
            .json()
            .await
            .map_err(|e| LedgerError::SchemaDrift(e.to_string()))?;
        Ok(hydrate_record(decoded, LedgerTxStatus::Confirmed))
    }

    /// Historial ordenado de registros del documento.
    #[instrument(skip(self))]
    pub async fn history(&self, document_id: &Uuid) -> Result<Vec<LedgerRecord>, LedgerError> {
        let network_response = self
            .internal_http_session
            .get(self.chaincode_url(&format!("documents/{}/history", document_id)))
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if network_response.status() == StatusCode::NOT_FOUND {
            return Err(LedgerError::RecordNotFound);
        }
        if !network_response.status().is_success() {
            return Err(LedgerError::Unavailable(format!("status {}", network_response.status())));
        }

        let decoded: Vec<FabricRecordSchema> = network_response
            .json()
            .await
            .map_err(|e| LedgerError::SchemaDrift(e.to_string()))?;
        Ok(decoded
            .into_iter()
            .map(|r| hydrate_record(r, LedgerTxStatus::Confirmed))
            .collect())
    }
}

fn hydrate_record(schema: FabricRecordSchema, status: LedgerTxStatus) -> LedgerRecord {
    LedgerRecord {
        document_id: schema.document_id,
        digest_hexadecimal: schema.digest,
        digest_algorithm_label: schema.algo,
        owner_id: schema.owner_id,
        file_name: schema.file_name,
        current_state_label: schema.state,
        tx_id: schema.tx_id,
        block_height: schema.block_height,
        status,
        simulated: false,
        recorded_at: schema.recorded_at,
    }
}
// FIN DEL ARCHIVO [libs/infra/ledger/src/uplink.rs]
