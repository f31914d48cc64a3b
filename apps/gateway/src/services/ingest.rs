// INICIO DEL ARCHIVO [apps/gateway/src/services/ingest.rs]
/*!
 * =================================================================
 * APARATO: DOCUMENT INGEST SERVICE (V4.4 - ALL OR NOTHING)
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L2-APP)
 * RESPONSABILIDAD: PIPELINE DE INGESTA (HUELLA, ESCÁN, REGISTRO)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SEVEN STEPS: Validación -> bytes -> huella -> escáner -> fila
 *    UPLOADED -> registro en Ledger -> vista. Un colapso entre los
 *    pasos 4 y 6 deja REGISTRATION_PENDING, jamás una fila huérfana.
 * 2. PER-UPLOAD IDENTITY: Dos subidas idénticas del mismo dueño son
 *    dos documentos con la misma huella; el Ledger registra cada una.
 * 3. GATE POLICY: MALICIOUS aborta y borra; SUSPICIOUS marca y
 *    notifica; UNKNOWN prosigue sin marca.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use versafe_core_hasher::StreamingHasher;
use versafe_domain_identity::Principal;
use versafe_domain_models::document::{
    DigestAlgorithm, Document, DocumentExtractedMetadata, DocumentState, SecurityLevel,
};
use versafe_infra_db::repositories::DocumentListFilter;
use versafe_infra_scanner::GateDecision;

use crate::envelope::ApiFault;
use crate::state::AppState;

/// Algoritmo secundario fijo del modo dual (nivel CRITICAL).
const CRITICAL_SECONDARY_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Blake2b256;

/// Petición de subida ya extraída del multipart.
#[derive(Debug)]
pub struct UploadRequest {
    pub title: String,
    pub file_name: String,
    pub media_type: String,
    pub security_level: SecurityLevel,
    pub signatures_required: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub content: Vec<u8>,
}

/// Vista de documento con las banderas de contrato del Ledger.
#[derive(Debug, serde::Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub simulated: bool,
}

pub struct DocumentIngestService {
    state: AppState,
}

impl DocumentIngestService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Pipeline de subida completo.
    #[instrument(skip(self, request), fields(owner_id = %owner.user_id, file_name = %request.file_name))]
    pub async fn upload(
        &self,
        owner: &Principal,
        request: UploadRequest,
    ) -> Result<DocumentView, ApiFault> {
        // 1. VALIDACIÓN DE CONTRATO
        self.validate_upload(&request)?;

        let signatures_required = request
            .signatures_required
            .unwrap_or_else(|| request.security_level.minimum_signatures_required());
        if signatures_required < request.security_level.minimum_signatures_required() {
            return Err(ApiFault::validation(format!(
                "security level {} requires at least {} signer(s)",
                request.security_level.as_label(),
                request.security_level.minimum_signatures_required()
            )));
        }

        // 2. PERSISTENCIA DE BYTES + HUELLA EN UN SOLO PASO
        let storage_ref = self
            .state
            .file_vault
            .store(&request.content)
            .await
            .map_err(|io_fault| {
                warn!("💥 [VAULT_FAULT]: {}", io_fault);
                ApiFault::internal()
            })?;

        let (primary, secondary) = self
            .fingerprint_on_pool(&request.content, request.security_level)
            .await?;

        // 3. COMPUERTA DEL ESCÁNER (sólo PDF)
        let mut scan_warning = false;
        if request.media_type == "application/pdf" {
            let report = self
                .state
                .scanner_client
                .scan_content(&request.file_name, request.content.clone())
                .await;

            match report.gate_decision() {
                GateDecision::Reject => {
                    // SecurityRejected: borrado y evidencia de auditoría.
                    let _ = self.state.file_vault.delete(&storage_ref).await;
                    self.state.audit_recorder.record(
                        crate::services::audit_recorder::AuditEvent {
                            service: "document-ingest".into(),
                            action: "upload.security_rejected".into(),
                            user_id: Some(owner.user_id),
                            resource_kind: "document".into(),
                            resource_id: request.file_name.clone(),
                            request_meta: serde_json::json!({
                                "verdict": "MALICIOUS",
                                "confidence": report.confidence,
                            }),
                            status_code: 400,
                            latency_milliseconds: 0,
                        },
                    );
                    return Err(ApiFault::security("SecurityRejected"));
                }
                GateDecision::ProceedWithWarning => {
                    scan_warning = true;
                    let _ = self
                        .state
                        .notification_repository
                        .enqueue(
                            Some(&owner.user_id),
                            &owner.email,
                            "scan.suspicious",
                            &serde_json::json!({
                                "file_name": request.file_name,
                                "confidence": report.confidence,
                            }),
                        )
                        .await;
                }
                GateDecision::Proceed => {}
            }
        }

        // 4. FILA DOCUMENTAL EN ESTADO UPLOADED
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: owner.user_id,
            title: request.title.clone(),
            file_name: request.file_name.clone(),
            media_type: request.media_type.clone(),
            size_bytes: primary.size_bytes,
            storage_ref,
            digest_algorithm: primary.algorithm,
            digest_hexadecimal: primary.digest_hexadecimal.clone(),
            secondary_digest_algorithm: secondary.as_ref().map(|s| s.algorithm),
            secondary_digest_hexadecimal: secondary.map(|s| s.digest_hexadecimal),
            security_level: request.security_level,
            signatures_required,
            state: DocumentState::Uploaded,
            scan_warning,
            ledger_transaction_identifier: None,
            ledger_block_height: None,
            ledger_pending: false,
            expires_at: request.expires_at,
            revoked_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.state.document_repository.insert_document(&document).await?;

        // 5. EXTRACCIÓN DE METADATOS BEST-EFFORT (jamás fatal)
        let extracted = extract_media_metadata(&request.media_type, &request.content);
        let _ = self
            .state
            .document_repository
            .upsert_extracted_metadata(&document.id, &extracted)
            .await;

        // 6. REGISTRO EN EL LEDGER
        let bridge = self.state.ledger_bridge();
        let outcome = bridge.submit_register(&document).await?;

        if outcome.queued && !outcome.simulated {
            // Techo agotado sin sumisión: el documento queda en
            // REGISTRATION_PENDING hasta que el Outbox drene.
            self.state
                .document_repository
                .transition_state(&document.id, DocumentState::RegistrationPending)
                .await?;
        }

        // 7. VISTA FINAL
        let final_document = self.state.document_repository.fetch_by_id(&document.id).await?;
        info!(
            "📄 [INGEST_COMPLETE]: {} ({} bytes, {}) state={}",
            final_document.id,
            final_document.size_bytes,
            final_document.digest_algorithm.as_label(),
            final_document.state.as_label()
        );
        Ok(DocumentView { document: final_document, simulated: outcome.simulated })
    }

    /// Vista del documento para su propietario (o destinatario de una
    /// concesión). NotFound uniforme para ausente y no visible.
    #[instrument(skip(self))]
    pub async fn get(&self, caller: &Principal, document_id: &Uuid) -> Result<Document, ApiFault> {
        let document = self.visible_document(caller, document_id).await?;
        Ok(self.enforce_lazy_expiry(document).await?)
    }

    /// Listado paginado del propietario.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        owner: &Principal,
        filter: DocumentListFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Document>, u64), ApiFault> {
        let bounded_limit = limit.clamp(1, 100);
        Ok(self
            .state
            .document_repository
            .list_for_owner(&owner.user_id, &filter, page, bounded_limit)
            .await?)
    }

    /// Parche de metadatos mutables del propietario.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        owner: &Principal,
        document_id: &Uuid,
        new_title: Option<String>,
        new_expires_at: Option<DateTime<Utc>>,
    ) -> Result<Document, ApiFault> {
        let document = self.owned_document(owner, document_id).await?;
        if document.state.is_terminal() {
            return Err(ApiFault::conflict("TerminalState"));
        }
        if let Some(title) = &new_title {
            if title.trim().is_empty() {
                return Err(ApiFault::validation("title must not be empty"));
            }
        }
        Ok(self
            .state
            .document_repository
            .update_patch(document_id, new_title, new_expires_at)
            .await?)
    }

    /// Revocación del propietario: irreversible e idempotente.
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        owner: &Principal,
        document_id: &Uuid,
        reason: &str,
    ) -> Result<DocumentView, ApiFault> {
        if reason.trim().is_empty() {
            return Err(ApiFault::validation("revocation reason is required"));
        }

        let _document = self.owned_document(owner, document_id).await?;

        // Sección crítica por documento: serializa contra firmas en vuelo.
        let row_lock = self.state.document_lock(document_id);
        let _guard = row_lock.lock().await;

        let (revoked_document, newly_revoked) = self
            .state
            .document_repository
            .revoke(document_id, reason)
            .await?;

        let mut simulated = false;
        if newly_revoked {
            // Sólo la primera revocación toca el Ledger (idempotencia).
            let outcome = self.state.ledger_bridge().submit_revoke(document_id, reason).await?;
            simulated = outcome.simulated;

            let _ = self
                .state
                .notification_repository
                .enqueue(
                    Some(&owner.user_id),
                    &owner.email,
                    "document.revoked",
                    &serde_json::json!({ "document_id": document_id.to_string(), "reason": reason }),
                )
                .await;
        }

        let final_document = self.state.document_repository.fetch_by_id(document_id).await?;
        Ok(DocumentView { document: final_document, simulated })
    }

    /// Descarga por referencia para el propietario o un destinatario
    /// con concesión viva.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        caller: &Principal,
        document_id: &Uuid,
    ) -> Result<(Document, Vec<u8>), ApiFault> {
        let document = self.visible_document(caller, document_id).await?;
        let content = self
            .state
            .file_vault
            .read(&document.storage_ref)
            .await
            .map_err(|_| ApiFault::not_found())?;
        Ok((document, content))
    }

    // --- GUARDIAS DE VISIBILIDAD ---

    /// Documento del propietario; ausente y ajeno son indistinguibles.
    pub async fn owned_document(
        &self,
        owner: &Principal,
        document_id: &Uuid,
    ) -> Result<Document, ApiFault> {
        let document = self
            .state
            .document_repository
            .fetch_by_id(document_id)
            .await
            .map_err(|_| ApiFault::not_found())?;
        if document.owner_id != owner.user_id {
            return Err(ApiFault::not_found());
        }
        Ok(document)
    }

    /// Propietario o concesión viva sobre el documento.
    async fn visible_document(
        &self,
        caller: &Principal,
        document_id: &Uuid,
    ) -> Result<Document, ApiFault> {
        let document = self
            .state
            .document_repository
            .fetch_by_id(document_id)
            .await
            .map_err(|_| ApiFault::not_found())?;

        if document.state == DocumentState::Quarantined {
            // La cuarentena desaparece de toda vista de usuario.
            return Err(ApiFault::not_found());
        }
        if document.owner_id == caller.user_id {
            return Ok(document);
        }

        let active_grant = self
            .state
            .share_repository
            .fetch_active_grant(document_id, &caller.email)
            .await?;
        match active_grant {
            Some(grant) if grant.is_redeemable(Utc::now()) => Ok(document),
            _ => Err(ApiFault::not_found()),
        }
    }

    /// Expiración perezosa en lectura: la ventana vencida transiciona
    /// antes de devolver la vista. La transición corre bajo el candado
    /// del documento, con re-chequeo, como todo avance de estado.
    async fn enforce_lazy_expiry(&self, document: Document) -> Result<Document, ApiFault> {
        if document.state.is_terminal() || !document.is_past_expiry(Utc::now()) {
            return Ok(document);
        }

        let row_lock = self.state.document_lock(&document.id);
        let _guard = row_lock.lock().await;

        let refreshed = self.state.document_repository.fetch_by_id(&document.id).await?;
        if refreshed.state.is_terminal() || !refreshed.is_past_expiry(Utc::now()) {
            return Ok(refreshed);
        }
        Ok(self
            .state
            .document_repository
            .transition_state(&document.id, DocumentState::Expired)
            .await?)
    }

    // --- VALIDACIÓN Y CÓMPUTO ---

    fn validate_upload(&self, request: &UploadRequest) -> Result<(), ApiFault> {
        if request.title.trim().is_empty() {
            return Err(ApiFault::validation("title is required"));
        }
        if request.file_name.trim().is_empty() {
            return Err(ApiFault::validation("file name is required"));
        }
        if request.content.is_empty() {
            return Err(ApiFault::validation("empty upload"));
        }
        // Frontera exacta: el tamaño igual al tope es válido.
        if request.content.len() as u64 > self.state.config.max_upload_bytes {
            return Err(ApiFault::validation(format!(
                "upload exceeds MAX_UPLOAD_BYTES ({})",
                self.state.config.max_upload_bytes
            )));
        }
        let media_type = request.media_type.to_ascii_lowercase();
        if !self.state.config.allowed_media_types.iter().any(|allowed| *allowed == media_type) {
            return Err(ApiFault::validation(format!("media type {} not allowed", media_type)));
        }
        Ok(())
    }

    /// Huella en el pool CPU acotado (dual para CRITICAL).
    async fn fingerprint_on_pool(
        &self,
        content: &[u8],
        security_level: SecurityLevel,
    ) -> Result<
        (
            versafe_core_hasher::ContentFingerprint,
            Option<versafe_core_hasher::ContentFingerprint>,
        ),
        ApiFault,
    > {
        let permit = self
            .state
            .compute_pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiFault::internal())?;

        let owned_content: Arc<[u8]> = Arc::from(content);
        let dual = security_level.requires_dual_digest();

        let fingerprints = tokio::task::spawn_blocking(move || {
            let _held_permit = permit;
            let mut engine = if dual {
                StreamingHasher::new_dual(DigestAlgorithm::Sha256, CRITICAL_SECONDARY_ALGORITHM)
            } else {
                StreamingHasher::new(DigestAlgorithm::Sha256)
            };
            for chunk in owned_content.chunks(64 * 1024) {
                engine.absorb_chunk(chunk);
            }
            engine.finalize()
        })
        .await
        .map_err(|_| ApiFault::internal())?;

        Ok(fingerprints)
    }
}

/// Extracción best-effort de metadatos por tipo de medio. Los errores
/// se capturan en el propio artefacto, jamás abortan la ingesta.
fn extract_media_metadata(media_type: &str, content: &[u8]) -> DocumentExtractedMetadata {
    if media_type == "application/pdf" {
        let haystack = String::from_utf8_lossy(content);
        let page_count = haystack.matches("/Type /Page").count()
            - haystack.matches("/Type /Pages").count();
        if page_count == 0 {
            return DocumentExtractedMetadata {
                page_count: None,
                extraction_error: Some("no page objects located".into()),
            };
        }
        return DocumentExtractedMetadata { page_count: Some(page_count as u32), extraction_error: None };
    }
    DocumentExtractedMetadata::default()
}

// FIN DEL ARCHIVO [apps/gateway/src/services/ingest.rs]
