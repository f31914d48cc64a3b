// INICIO DEL ARCHIVO [libs/infra/scanner/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MALWARE SCANNER UPLINK CLIENT (V2.1 - GATED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: VEREDICTO EXTERNO CON POLÍTICA DE COMPUERTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NON-BLOCKING GATE: El cliente jamás retiene la ingesta más allá
 *    de su timeout; un apagón del escáner degrada a UNKNOWN y la
 *    registración continúa.
 * 2. POLICY IN ONE PLACE: MALICIOUS aborta, SUSPICIOUS marca y
 *    notifica, UNKNOWN/BENIGN prosiguen. La decisión vive aquí, no
 *    dispersa por los handlers.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Catálogo de fallos del enlace con el escáner.
#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("[L4_SCANNER_FAULT]: UPLINK_UNREACHABLE -> {0}")]
    ConnectionFault(#[from] reqwest::Error),
    #[error("[L4_SCANNER_FAULT]: PROVIDER_REJECTION -> status {0}")]
    ProviderRejection(u16),
}

/// Veredicto del motor externo sobre el contenido.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanVerdict {
    Benign,
    Suspicious,
    Malicious,
    /// Escáner inalcanzable o contenido fuera de su dominio.
    Unknown,
}

/// Reporte del escaneo: veredicto, confianza [0,1] y rasgos crudos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub verdict: ScanVerdict,
    pub confidence: f64,
    pub features: serde_json::Value,
}

impl ScanReport {
    /// Reporte degradado cuando el escáner no respondió a tiempo.
    pub fn unknown(reason: &str) -> Self {
        Self {
            verdict: ScanVerdict::Unknown,
            confidence: 0.0,
            features: serde_json::json!({ "degraded_reason": reason }),
        }
    }
}

/// Decisión de compuerta derivada del reporte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// La ingesta continúa sin marcas.
    Proceed,
    /// La ingesta continúa con marca 'warn' y notificación encolada.
    ProceedWithWarning,
    /// La ingesta aborta: SecurityRejected, fichero eliminado, auditoría.
    Reject,
}

impl ScanReport {
    /// Aplica la política de compuerta del núcleo al veredicto.
    pub fn gate_decision(&self) -> GateDecision {
        match self.verdict {
            ScanVerdict::Malicious => GateDecision::Reject,
            ScanVerdict::Suspicious => GateDecision::ProceedWithWarning,
            ScanVerdict::Benign | ScanVerdict::Unknown => GateDecision::Proceed,
        }
    }
}

/// Forma del payload que el proveedor devuelve en su API JSON.
#[derive(Deserialize)]
struct ProviderScanSchema {
    verdict: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    features: serde_json::Value,
}

pub struct MalwareScannerClient {
    internal_http_session: reqwest::Client,
    scanner_endpoint_url: String,
}

impl MalwareScannerClient {
    /// Construye el cliente con el timeout acotado de la política.
    pub fn new(scanner_endpoint_url: String, scan_timeout: Duration) -> Self {
        Self {
            internal_http_session: reqwest::Client::builder()
                .timeout(scan_timeout)
                .user_agent("VerSafe-Scanner-Uplink/V2.1")
                .build()
                .expect("CRITICAL: Failed to initialize scanner HTTP session"),
            scanner_endpoint_url,
        }
    }

    /// Somete el contenido al escáner y devuelve el reporte.
    ///
    /// Cualquier fallo de red o rechazo del proveedor degrada a un
    /// reporte UNKNOWN: la política dicta que un apagón del escáner no
    /// detiene la registración.
    #[instrument(skip(self, content), fields(content_length = content.len()))]
    pub async fn scan_content(&self, file_name: &str, content: Vec<u8>) -> ScanReport {
        let submission_result = self
            .internal_http_session
            .post(format!("{}/v1/scan", self.scanner_endpoint_url))
            .header("X-File-Name", file_name)
            .body(content)
            .send()
            .await;

        let network_response = match submission_result {
            Ok(response) => response,
            Err(uplink_fault) => {
                warn!("⚠️ [SCANNER_DEGRADED]: Uplink failure, verdict UNKNOWN: {}", uplink_fault);
                return ScanReport::unknown("uplink_failure");
            }
        };

        if !network_response.status().is_success() {
            warn!(
                "⚠️ [SCANNER_DEGRADED]: Provider rejected scan (status {}), verdict UNKNOWN.",
                network_response.status()
            );
            return ScanReport::unknown("provider_rejection");
        }

        let decoded: ProviderScanSchema = match network_response.json().await {
            Ok(payload) => payload,
            Err(decode_fault) => {
                warn!("⚠️ [SCANNER_DEGRADED]: Schema drift in provider payload: {}", decode_fault);
                return ScanReport::unknown("schema_drift");
            }
        };

        let verdict = match decoded.verdict.as_str() {
            "BENIGN" => ScanVerdict::Benign,
            "SUSPICIOUS" => ScanVerdict::Suspicious,
            "MALICIOUS" => ScanVerdict::Malicious,
            _ => ScanVerdict::Unknown,
        };

        info!(
            "🧫 [SCANNER_VERDICT]: {} -> {:?} (confidence {:.2})",
            file_name, verdict, decoded.confidence
        );

        ScanReport {
            verdict,
            confidence: decoded.confidence.clamp(0.0, 1.0),
            features: decoded.features,
        }
    }
}

// FIN DEL ARCHIVO [libs/infra/scanner/src/lib.rs]
