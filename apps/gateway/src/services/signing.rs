// INICIO DEL ARCHIVO [apps/gateway/src/services/signing.rs]
/*!
 * =================================================================
 * APARATO: SIGNATURE ENGINE SERVICE (V4.4 - LOCK SERIALIZED)
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L2-APP)
 * RESPONSABILIDAD: PRODUCCIÓN, VERIFICACIÓN Y COMPLECIÓN MULTI-FIRMA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ROW LINEARIZATION: El candado por documento hace consistente el
 *    conteo de firmas válidas en el cálculo del siguiente estado; la
 *    carrera firma/revocación se resuelve dentro de la sección crítica.
 * 2. DURABLE SIGNATURE: Un fallo del Ledger en el avance de estado se
 *    encola; la fila de la firma jamás se revierte.
 * 3. EXPLICIT DISPATCH: Una rama por variante de firma; ninguna
 *    jerarquía implícita.
 * =================================================================
 */

use chrono::Utc;
use rand::RngCore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use versafe_core_signer::{
    build_signing_payload, sign_payload, verify_payload, SignerError,
};
use versafe_domain_identity::Principal;
use versafe_domain_models::document::{Document, DocumentState};
use versafe_domain_models::signature::{compute_signer_hash, Signature, SignatureKind};
use versafe_infra_db::DbError;

use crate::envelope::ApiFault;
use crate::state::AppState;

/// Resultado de la verificación de una firma individual.
#[derive(Debug, serde::Serialize)]
pub struct SignatureVerificationResult {
    pub signature_id: Uuid,
    pub verified: bool,
    pub method: String,
    pub detail: String,
}

/// Vista de firma con las banderas de contrato del Ledger.
#[derive(Debug, serde::Serialize)]
pub struct SignatureView {
    #[serde(flatten)]
    pub signature: Signature,
    pub document_state: DocumentState,
    pub simulated: bool,
    pub ledger_pending: bool,
}

/// Payload biométrico procesado (rasgos + confianza).
#[derive(Debug, serde::Deserialize)]
struct BiometricPayload {
    #[allow(dead_code)]
    features: serde_json::Value,
    confidence: f64,
}

pub struct SignatureEngineService {
    state: AppState,
}

impl SignatureEngineService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Produce una firma sobre el documento.
    ///
    /// Precondiciones: estado en {UPLOADED, PARTIALLY_SIGNED}; el
    /// firmante no ha firmado antes; el documento no es terminal; para
    /// DIGITAL, material de clave enrolado.
    #[instrument(skip(self, payload), fields(document_id = %document_id, signer_id = %signer.user_id, kind = kind.as_label()))]
    pub async fn sign(
        &self,
        signer: &Principal,
        document_id: &Uuid,
        kind: SignatureKind,
        payload: Vec<u8>,
        _metadata: Option<serde_json::Value>,
    ) -> Result<SignatureView, ApiFault> {
        // SECCIÓN CRÍTICA POR DOCUMENTO: el conteo y la transición son
        // consistentes porque nadie más muta esta fila en paralelo.
        let row_lock = self.state.document_lock(document_id);
        let _guard = row_lock.lock().await;

        let document = self
            .state
            .document_repository
            .fetch_by_id(document_id)
            .await
            .map_err(|_| ApiFault::not_found())?;

        self.enforce_sign_preconditions(&document).await?;

        // --- PRODUCCIÓN POR VARIANTE ---
        let signing_timestamp = Utc::now();
        let nonce_hexadecimal = {
            let mut nonce_material = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut nonce_material);
            hex::encode(nonce_material)
        };

        let (stored_payload, verification_method, verified) = match kind {
            SignatureKind::Electronic => self.produce_electronic(&payload)?,
            SignatureKind::Digital => {
                self.produce_digital(signer, &document, &signing_timestamp).await?
            }
            SignatureKind::Biometric => self.produce_biometric(&payload)?,
        };

        let signature = Signature {
            id: Uuid::new_v4(),
            document_id: *document_id,
            signer_id: signer.user_id,
            kind,
            payload: stored_payload,
            signer_hash_hexadecimal: compute_signer_hash(
                &document.digest_hexadecimal,
                &signer.user_id,
                &signing_timestamp,
                &nonce_hexadecimal,
            ),
            verification_method,
            verified,
            ledger_transaction_identifier: None,
            created_at: signing_timestamp,
        };

        // Unicidad (document_id, signer_id) sellada por el motor.
        match self.state.signature_repository.insert_signature(&signature).await {
            Ok(()) => {}
            Err(DbError::DuplicateSignature) => return Err(ApiFault::conflict("AlreadySigned")),
            Err(other) => return Err(other.into()),
        }

        // --- LEDGER: SELLO DE LA FIRMA ---
        let bridge = self.state.ledger_bridge();
        let signature_outcome = bridge.submit_record_signature(&signature).await?;
        if let Some(tx_id) = &signature_outcome.tx_id {
            let _ = self.state.signature_repository.set_ledger_tx(&signature.id, tx_id).await;
        }

        // --- AVANCE DEL RETÍCULO DE ESTADOS ---
        let valid_count = self
            .state
            .signature_repository
            .count_valid_for_document(document_id)
            .await?;
        let next_state =
            DocumentState::state_for_signature_count(valid_count, document.signatures_required);

        let mut ledger_pending = signature_outcome.queued;
        if next_state != document.state && document.state.can_transition_to(next_state) {
            self.state
                .document_repository
                .transition_state(document_id, next_state)
                .await?;

            if next_state == DocumentState::Signed {
                // Umbral alcanzado: el Ledger refleja la compleción. Un
                // fallo aquí se encola; la firma ya es durable.
                let update_outcome = bridge
                    .submit_state_update(
                        document_id,
                        DocumentState::Signed,
                        serde_json::json!({ "signatures": valid_count }),
                    )
                    .await?;
                ledger_pending = ledger_pending || update_outcome.queued;
            }
        }

        let final_document = self.state.document_repository.fetch_by_id(document_id).await?;
        info!(
            "✍️ [SIGN_COMPLETE]: {} on {} -> state {}",
            kind.as_label(),
            document_id,
            final_document.state.as_label()
        );

        Ok(SignatureView {
            signature,
            document_state: final_document.state,
            simulated: signature_outcome.simulated,
            ledger_pending: ledger_pending || final_document.ledger_pending,
        })
    }

    /// Firma ELECTRONIC dibujada: la imagen cruda llega por multipart.
    #[instrument(skip(self, image_bytes))]
    pub async fn upload_signature_image(
        &self,
        signer: &Principal,
        document_id: &Uuid,
        image_bytes: Vec<u8>,
    ) -> Result<SignatureView, ApiFault> {
        if !is_raster_image(&image_bytes) {
            return Err(ApiFault::validation("signature image must be PNG or JPEG"));
        }
        self.sign(signer, document_id, SignatureKind::Electronic, image_bytes, None).await
    }

    /// Re-verifica una firma existente según su variante.
    #[instrument(skip(self))]
    pub async fn verify(&self, signature_id: &Uuid) -> Result<SignatureVerificationResult, ApiFault> {
        let signature = self
            .state
            .signature_repository
            .fetch_by_id(signature_id)
            .await
            .map_err(|_| ApiFault::not_found())?;

        let (verified, detail) = match signature.kind {
            SignatureKind::Electronic => {
                let well_formed = !signature.payload.is_empty()
                    && (signature.payload.starts_with(b"text:") || is_raster_image(&signature.payload));
                (well_formed, if well_formed { "payload well-formed" } else { "payload malformed" }.to_string())
            }
            SignatureKind::Digital => self.verify_digital(&signature).await?,
            SignatureKind::Biometric => match serde_json::from_slice::<BiometricPayload>(&signature.payload) {
                Ok(biometric) => {
                    let threshold = self.state.config.biometric_confidence_threshold;
                    let passes = biometric.confidence >= threshold;
                    (passes, format!("confidence {:.2} vs threshold {:.2}", biometric.confidence, threshold))
                }
                Err(_) => (false, "biometric payload malformed".to_string()),
            },
        };

        if verified != signature.verified {
            self.state.signature_repository.set_verified(signature_id, verified).await?;
        }

        Ok(SignatureVerificationResult {
            signature_id: *signature_id,
            verified,
            method: signature.verification_method,
            detail,
        })
    }

    /// Historial de firmas del documento.
    pub async fn list(&self, document_id: &Uuid) -> Result<Vec<Signature>, ApiFault> {
        Ok(self.state.signature_repository.list_for_document(document_id).await?)
    }

    // --- PRECONDICIONES ---

    async fn enforce_sign_preconditions(&self, document: &Document) -> Result<(), ApiFault> {
        // Expiración perezosa dentro de la sección crítica.
        if !document.state.is_terminal() && document.is_past_expiry(Utc::now()) {
            self.state
                .document_repository
                .transition_state(&document.id, DocumentState::Expired)
                .await?;
            return Err(ApiFault::conflict("TerminalState"));
        }

        if document.state.is_terminal() {
            return Err(ApiFault::conflict("TerminalState"));
        }
        if !document.state.accepts_signatures() {
            // REGISTRATION_PENDING y QUARANTINED rechazan firmas.
            return Err(ApiFault::conflict("InvalidState"));
        }

        // Operaciones del Ledger en vuelo bloquean nuevas transiciones.
        if self.state.outbox_repository.has_pending_for_document(&document.id).await? {
            warn!("⛔ [SIGN_BLOCKED]: Outbox pending for {}", document.id);
            return Err(ApiFault::conflict("ledger operations pending for this document"));
        }
        Ok(())
    }

    // --- PRODUCCIÓN POR VARIANTE ---

    fn produce_electronic(&self, payload: &[u8]) -> Result<(Vec<u8>, String, bool), ApiFault> {
        let well_formed =
            !payload.is_empty() && (payload.starts_with(b"text:") || is_raster_image(payload));
        if !well_formed {
            return Err(ApiFault::validation(
                "electronic payload must be a 'text:' label or a raster image",
            ));
        }
        Ok((payload.to_vec(), "electronic-wellformed".to_string(), true))
    }

    /// DIGITAL: data = digest ‖ signer_id ‖ timestamp firmada con la
    /// suite enrolada; el certificado se valida antes de firmar.
    async fn produce_digital(
        &self,
        signer: &Principal,
        document: &Document,
        signing_timestamp: &chrono::DateTime<Utc>,
    ) -> Result<(Vec<u8>, String, bool), ApiFault> {
        let vault_guard = self.state.key_vault.read().await;
        let material = match vault_guard.material_for(&signer.user_id) {
            Ok(material) => material.clone(),
            Err(SignerError::NoKeyMaterial(_)) => {
                return Err(ApiFault::conflict("NoKeyMaterial"))
            }
            Err(other) => return Err(other.into()),
        };
        drop(vault_guard);

        material.certificate.certify_validity(Utc::now()).map_err(ApiFault::from)?;

        let signing_data =
            build_signing_payload(&document.digest_hexadecimal, &signer.user_id, signing_timestamp);

        // Firma asimétrica en el pool CPU acotado.
        let permit = self
            .state
            .compute_pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiFault::internal())?;

        let suite = material.suite;
        let private_blob = material.private_key_blob.clone();
        let public_blob = material.public_key_blob.clone();
        let data_for_pool = signing_data.clone();

        let signature_blob = tokio::task::spawn_blocking(move || {
            let _held_permit = permit;
            let produced = sign_payload(suite, &private_blob, &data_for_pool)?;
            // Autoverificación inmediata: la firma sale verificada.
            verify_payload(suite, &public_blob, &data_for_pool, &produced)?;
            Ok::<Vec<u8>, SignerError>(produced)
        })
        .await
        .map_err(|_| ApiFault::internal())?
        .map_err(ApiFault::from)?;

        Ok((signature_blob, material.suite.verification_method().to_string(), true))
    }

    fn produce_biometric(&self, payload: &[u8]) -> Result<(Vec<u8>, String, bool), ApiFault> {
        let biometric: BiometricPayload = serde_json::from_slice(payload)
            .map_err(|_| ApiFault::validation("biometric payload malformed"))?;

        let threshold = self.state.config.biometric_confidence_threshold;
        if biometric.confidence < threshold {
            // Bajo umbral no se persiste nada: el firmante puede reintentar.
            return Err(ApiFault::validation(format!(
                "biometric confidence {:.2} below threshold {:.2}",
                biometric.confidence, threshold
            )));
        }
        Ok((payload.to_vec(), "biometric-threshold".to_string(), true))
    }

    /// Re-verificación criptográfica de una firma DIGITAL, incluida la
    /// ventana del certificado (un certificado vencido falla aunque la
    /// matemática verifique).
    async fn verify_digital(&self, signature: &Signature) -> Result<(bool, String), ApiFault> {
        let vault_guard = self.state.key_vault.read().await;
        let material = match vault_guard.material_for(&signature.signer_id) {
            Ok(material) => material.clone(),
            Err(_) => return Ok((false, "signer key material unavailable".to_string())),
        };
        drop(vault_guard);

        if material.certificate.certify_validity(Utc::now()).is_err() {
            return Ok((false, "certificate outside validity window".to_string()));
        }

        let document = self
            .state
            .document_repository
            .fetch_by_id(&signature.document_id)
            .await?;
        let signing_data = build_signing_payload(
            &document.digest_hexadecimal,
            &signature.signer_id,
            &signature.created_at,
        );

        let cryptographically_valid = verify_payload(
            material.suite,
            &material.public_key_blob,
            &signing_data,
            &signature.payload,
        )
        .is_ok();

        Ok((
            cryptographically_valid,
            if cryptographically_valid { "signature verifies" } else { "signature rejected" }
                .to_string(),
        ))
    }
}

/// PNG o JPEG por números mágicos.
fn is_raster_image(content: &[u8]) -> bool {
    content.starts_with(&[0x89, 0x50, 0x4E, 0x47]) || content.starts_with(&[0xFF, 0xD8, 0xFF])
}

// FIN DEL ARCHIVO [apps/gateway/src/services/signing.rs]
