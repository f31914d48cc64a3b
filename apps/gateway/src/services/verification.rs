// INICIO DEL ARCHIVO [apps/gateway/src/services/verification.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION SERVICE (V4.3 - LEDGER CROSS-CHECKED)
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L2-APP)
 * RESPONSABILIDAD: RE-HUELLA BAJO DEMANDA Y CONTRASTE CON EL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DETERMINATE FIRST: Sólo los desenlaces determinados (MATCH y los
 *    mismatches) anexan eventos y mutan estado; LEDGER_UNAVAILABLE es
 *    indeterminado y no toca nada.
 * 2. QUARANTINE ON TAMPER: DIGEST_MISMATCH mueve el documento a
 *    cuarentena, lo retira de las vistas de usuario y emite evidencia
 *    de auditoría de seguridad.
 * 3. AUTHORITATIVE ONLY: Un registro SIMULATED no es autoritativo;
 *    el contraste exige CONFIRMED.
 * =================================================================
 */

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use versafe_core_hasher::fingerprint_bytes;
use versafe_domain_identity::Principal;
use versafe_domain_models::document::{Document, DocumentState};
use versafe_domain_models::ledger::LedgerTxStatus;
use versafe_domain_models::verification::{VerificationEvent, VerificationOutcome};
use versafe_infra_ledger::LedgerError;

use crate::envelope::ApiFault;
use crate::services::audit_recorder::AuditEvent;
use crate::state::AppState;

/// Resultado de la verificación de un documento.
#[derive(Debug, serde::Serialize)]
pub struct DocumentVerificationResult {
    pub document_id: Uuid,
    pub outcome: VerificationOutcome,
    pub document_state: Option<DocumentState>,
    pub detail: String,
}

pub struct VerificationService {
    state: AppState,
}

impl VerificationService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Re-huella los bytes almacenados, contrasta con el Ledger y
    /// registra el desenlace.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn verify_document(
        &self,
        verifier: &Principal,
        document_id: &Uuid,
    ) -> Result<DocumentVerificationResult, ApiFault> {
        let document = match self.state.document_repository.fetch_by_id(document_id).await {
            Ok(document) => document,
            Err(_) => {
                return Ok(DocumentVerificationResult {
                    document_id: *document_id,
                    outcome: VerificationOutcome::NotFound,
                    document_state: None,
                    detail: "document unknown to the metadata store".into(),
                })
            }
        };

        // 1. RE-HUELLA DE LOS BYTES ALMACENADOS
        let stored_content = match self.state.file_vault.read(&document.storage_ref).await {
            Ok(content) => content,
            Err(_) => {
                // Bytes desaparecidos: indistinguible de manipulación.
                return self
                    .conclude_digest_mismatch(verifier, document, "stored bytes missing")
                    .await;
            }
        };

        let recomputed = self
            .recompute_on_pool(document.digest_algorithm, stored_content.clone())
            .await?;
        if recomputed != document.digest_hexadecimal {
            return self
                .conclude_digest_mismatch(verifier, document, "primary digest diverged")
                .await;
        }

        // Nivel CRITICAL: la segunda huella también debe reproducirse.
        if let (Some(secondary_algorithm), Some(secondary_digest)) = (
            document.secondary_digest_algorithm,
            document.secondary_digest_hexadecimal.clone(),
        ) {
            let recomputed_secondary = self
                .recompute_on_pool(secondary_algorithm, stored_content)
                .await?;
            if recomputed_secondary != secondary_digest {
                return self
                    .conclude_digest_mismatch(verifier, document, "secondary digest diverged")
                    .await;
            }
        }

        // 2. CONTRASTE CON EL REGISTRO AUTORITATIVO DEL LEDGER
        let bridge = self.state.ledger_bridge();
        let ledger_record = match bridge.query(document_id).await {
            Ok(record) => record,
            Err(LedgerError::RecordNotFound) => {
                self.append_event(verifier, &document, VerificationOutcome::NotFound, false, "ledger has no record")
                    .await?;
                return Ok(DocumentVerificationResult {
                    document_id: *document_id,
                    outcome: VerificationOutcome::NotFound,
                    document_state: Some(document.state),
                    detail: "ledger has no record for this document".into(),
                });
            }
            Err(LedgerError::Unavailable(_)) => {
                // Indeterminado: sin evento, sin mutación de estado.
                return Ok(DocumentVerificationResult {
                    document_id: *document_id,
                    outcome: VerificationOutcome::LedgerUnavailable,
                    document_state: Some(document.state),
                    detail: "ledger unreachable, verification indeterminate".into(),
                });
            }
            Err(other) => return Err(other.into()),
        };

        if ledger_record.simulated || ledger_record.status != LedgerTxStatus::Confirmed {
            // Registro no autoritativo: indeterminado por contrato.
            return Ok(DocumentVerificationResult {
                document_id: *document_id,
                outcome: VerificationOutcome::LedgerUnavailable,
                document_state: Some(document.state),
                detail: "ledger record not yet authoritative".into(),
            });
        }

        if ledger_record.digest_hexadecimal != document.digest_hexadecimal {
            self.append_event(
                verifier,
                &document,
                VerificationOutcome::LedgerMismatch,
                false,
                "ledger digest differs from metadata store",
            )
            .await?;
            self.emit_security_audit(verifier, &document, "verify.ledger_mismatch");
            return Ok(DocumentVerificationResult {
                document_id: *document_id,
                outcome: VerificationOutcome::LedgerMismatch,
                document_state: Some(document.state),
                detail: "ledger holds a different digest".into(),
            });
        }

        if document.state == DocumentState::Revoked {
            return Ok(DocumentVerificationResult {
                document_id: *document_id,
                outcome: VerificationOutcome::LedgerMismatch,
                document_state: Some(document.state),
                detail: "document is revoked".into(),
            });
        }

        // 3. MATCH: evento y promoción SIGNED -> VERIFIED outbox-safe.
        self.append_event(verifier, &document, VerificationOutcome::Match, true, "digest and ledger agree")
            .await?;

        let mut final_state = document.state;
        if document.state == DocumentState::Signed {
            let row_lock = self.state.document_lock(document_id);
            let _guard = row_lock.lock().await;

            let refreshed = self.state.document_repository.fetch_by_id(document_id).await?;
            if refreshed.state == DocumentState::Signed {
                self.state
                    .document_repository
                    .transition_state(document_id, DocumentState::Verified)
                    .await?;
                let _ = bridge
                    .submit_state_update(
                        document_id,
                        DocumentState::Verified,
                        serde_json::json!({ "verified_by": verifier.user_id.to_string() }),
                    )
                    .await?;
                final_state = DocumentState::Verified;
            } else {
                final_state = refreshed.state;
            }
        }

        info!("✅ [VERIFY_MATCH]: {} state={}", document_id, final_state.as_label());
        Ok(DocumentVerificationResult {
            document_id: *document_id,
            outcome: VerificationOutcome::Match,
            document_state: Some(final_state),
            detail: "digest matches and ledger record is confirmed".into(),
        })
    }

    /// Historial de eventos de verificación del documento.
    pub async fn history(
        &self,
        document_id: &Uuid,
    ) -> Result<Vec<VerificationEvent>, ApiFault> {
        Ok(self.state.verification_repository.list_for_document(document_id).await?)
    }

    // --- DESENLACES ---

    /// DIGEST_MISMATCH: cuarentena, evento y evidencia de seguridad.
    /// La cuarentena avanza bajo el candado del documento, como todo
    /// cambio de estado.
    async fn conclude_digest_mismatch(
        &self,
        verifier: &Principal,
        document: Document,
        detail: &str,
    ) -> Result<DocumentVerificationResult, ApiFault> {
        warn!("🚨 [TAMPER_DETECTED]: {} — {}", document.id, detail);

        let quarantined_state = {
            let row_lock = self.state.document_lock(&document.id);
            let _guard = row_lock.lock().await;

            match self.state.document_repository.quarantine(&document.id).await {
                Ok(quarantined) => quarantined.state,
                // Terminal o ya en cuarentena: el estado vigente se respeta.
                Err(_) => self
                    .state
                    .document_repository
                    .fetch_by_id(&document.id)
                    .await
                    .map(|refreshed| refreshed.state)
                    .unwrap_or(document.state),
            }
        };

        self.append_event(verifier, &document, VerificationOutcome::DigestMismatch, false, detail)
            .await?;
        self.emit_security_audit(verifier, &document, "verify.digest_mismatch");

        Ok(DocumentVerificationResult {
            document_id: document.id,
            outcome: VerificationOutcome::DigestMismatch,
            document_state: Some(quarantined_state),
            detail: detail.to_string(),
        })
    }

    async fn append_event(
        &self,
        verifier: &Principal,
        document: &Document,
        outcome: VerificationOutcome,
        verified: bool,
        detail: &str,
    ) -> Result<(), ApiFault> {
        self.state
            .verification_repository
            .append_event(&VerificationEvent {
                id: Uuid::new_v4(),
                document_id: document.id,
                verifier_id: Some(verifier.user_id),
                verified,
                method: document.digest_algorithm.as_label().to_string(),
                outcome,
                details: Some(detail.to_string()),
                created_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    fn emit_security_audit(&self, verifier: &Principal, document: &Document, action: &str) {
        self.state.audit_recorder.record(AuditEvent {
            service: "verification-service".into(),
            action: action.into(),
            user_id: Some(verifier.user_id),
            resource_kind: "document".into(),
            resource_id: document.id.to_string(),
            request_meta: serde_json::json!({
                "digest_algorithm": document.digest_algorithm.as_label(),
                "security_level": document.security_level.as_label(),
            }),
            status_code: 409,
            latency_milliseconds: 0,
        });
    }

    async fn recompute_on_pool(
        &self,
        algorithm: versafe_domain_models::document::DigestAlgorithm,
        content: Vec<u8>,
    ) -> Result<String, ApiFault> {
        let permit = self
            .state
            .compute_pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiFault::internal())?;

        let fingerprint = tokio::task::spawn_blocking(move || {
            let _held_permit = permit;
            fingerprint_bytes(algorithm, &content)
        })
        .await
        .map_err(|_| ApiFault::internal())?;

        Ok(fingerprint.digest_hexadecimal)
    }
}
// FIN DEL ARCHIVO [apps/gateway/src/services/verification.rs]
