// [libs/core/signer/src/certificate.rs]
/*!
 * =================================================================
 * APARATO: ENROLLMENT CERTIFICATE (V2.1 - WINDOW GUARDED)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: VÍNCULO CLAVE PÚBLICA <-> FIRMANTE CON VENTANA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::SignerError;

/// Certificado de enrolamiento: liga la clave pública al firmante.
/// La verificación de una firma DIGITAL comprueba ventana de validez
/// y estado de revocación antes de aceptar el resultado criptográfico.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerCertificate {
    pub serial: Uuid,
    pub subject_id: Uuid,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub revoked: bool,
}

impl SignerCertificate {
    /// Certificado autoemitido por la autoridad interna de enrolamiento
    /// con la ventana de validez indicada en días.
    pub fn issue_internal(subject_id: Uuid, validity_days: i64) -> Self {
        let issued_at = Utc::now();
        Self {
            serial: Uuid::new_v4(),
            subject_id,
            issuer: "versafe-enrollment-authority".to_string(),
            not_before: issued_at,
            not_after: issued_at + chrono::Duration::days(validity_days),
            revoked: false,
        }
    }

    /// Valida ventana temporal y revocación en el instante dado.
    ///
    /// # Errors:
    /// 'CertificateExpired' fuera de [not_before, not_after];
    /// 'CertificateRevoked' si el emisor lo marcó revocado.
    pub fn certify_validity(&self, now: DateTime<Utc>) -> Result<(), SignerError> {
        if self.revoked {
            return Err(SignerError::CertificateRevoked);
        }
        if now < self.not_before || now > self.not_after {
            return Err(SignerError::CertificateExpired);
        }
        Ok(())
    }
}
