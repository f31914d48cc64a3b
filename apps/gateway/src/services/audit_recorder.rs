// INICIO DEL ARCHIVO [apps/gateway/src/services/audit_recorder.rs]
/*!
 * =================================================================
 * APARATO: AUDIT RECORDER DAEMON (V4.2 - NON BLOCKING)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: EMISIÓN ASÍNCRONA DE REGISTROS DE AUDITORÍA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FOREGROUND FIRST: La respuesta al cliente jamás espera al sello
 *    de auditoría; el handler emite por canal acotado y sigue.
 * 2. SINGLE WRITER: Un único daemon drena el canal y sella contra el
 *    repositorio, serializando la cadena de cada shard por diseño.
 * 3. DURABLE FALLBACK: Un fallo del insert cae a un buffer JSONL local
 *    para inserción posterior; la evidencia jamás se descarta.
 * =================================================================
 */

use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use versafe_domain_models::audit::AuditRecord;
use versafe_infra_db::repositories::AuditRepository;

/// Capacidad del canal: ante saturación se degrada al buffer local,
/// jamás se bloquea la respuesta.
const AUDIT_CHANNEL_CAPACITY: usize = 2048;

/// Evento de auditoría tal como lo emite un handler.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub service: String,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub resource_kind: String,
    pub resource_id: String,
    /// Metadatos ya sanitizados (sin credenciales ni cuerpos crudos).
    pub request_meta: serde_json::Value,
    pub status_code: u16,
    pub latency_milliseconds: u64,
}

/// Mango clonable del canal de auditoría.
#[derive(Clone)]
pub struct AuditRecorderHandle {
    event_sender: mpsc::Sender<AuditEvent>,
    fallback_buffer_path: Arc<PathBuf>,
}

impl AuditRecorderHandle {
    /// Emite un evento sin bloquear. Si el canal está saturado, el
    /// evento cae directo al buffer durable local.
    pub fn record(&self, event: AuditEvent) {
        if let Err(send_fault) = self.event_sender.try_send(event) {
            let stranded_event = match send_fault {
                mpsc::error::TrySendError::Full(event) => event,
                mpsc::error::TrySendError::Closed(event) => event,
            };
            warn!("⚠️ [AUDIT_CHANNEL_SATURATED]: Falling back to durable buffer.");
            let buffer_path = self.fallback_buffer_path.clone();
            tokio::spawn(async move {
                if let Err(buffer_fault) =
                    append_to_fallback_buffer(&buffer_path, &stranded_event).await
                {
                    error!("💥 [AUDIT_EVIDENCE_AT_RISK]: Buffer write failed: {}", buffer_fault);
                }
            });
        }
    }
}

/// Daemon de sellado: drena el canal y encadena contra el repositorio.
pub struct AuditRecorderDaemon {
    event_receiver: mpsc::Receiver<AuditEvent>,
    audit_repository: Arc<AuditRepository>,
    fallback_buffer_path: Arc<PathBuf>,
}

/// Construye el par (handle para handlers, daemon para el kernel).
pub fn build_audit_recorder(
    audit_repository: Arc<AuditRepository>,
    fallback_buffer_path: PathBuf,
) -> (AuditRecorderHandle, AuditRecorderDaemon) {
    let (event_sender, event_receiver) = mpsc::channel(AUDIT_CHANNEL_CAPACITY);
    let shared_buffer_path = Arc::new(fallback_buffer_path);

    (
        AuditRecorderHandle {
            event_sender,
            fallback_buffer_path: shared_buffer_path.clone(),
        },
        AuditRecorderDaemon {
            event_receiver,
            audit_repository,
            fallback_buffer_path: shared_buffer_path,
        },
    )
}

impl AuditRecorderDaemon {
    /// Bucle perpetuo de sellado en el reactor de Tokio.
    pub async fn spawn_sealing_loop(mut self) {
        info!("🛡️ [AUDIT_DAEMON]: Sealing loop online.");

        while let Some(event) = self.event_receiver.recv().await {
            let record = materialize_record(&event);

            if let Err(seal_fault) = self.audit_repository.append_sealed(record).await {
                warn!("⚠️ [AUDIT_SEAL_FAULT]: {} — buffering locally.", seal_fault);
                if let Err(buffer_fault) =
                    append_to_fallback_buffer(&self.fallback_buffer_path, &event).await
                {
                    error!("💥 [AUDIT_EVIDENCE_AT_RISK]: Buffer write failed: {}", buffer_fault);
                }
            }
        }

        info!("🛡️ [AUDIT_DAEMON]: Channel closed, sealing loop terminated.");
    }
}

/// Materializa el evento en un registro sin sellar (el sello lo aplica
/// el repositorio contra la cola de su shard).
fn materialize_record(event: &AuditEvent) -> AuditRecord {
    let created_at = Utc::now();
    AuditRecord {
        id: Uuid::new_v4(),
        service: event.service.clone(),
        action: event.action.clone(),
        user_id: event.user_id,
        resource_kind: event.resource_kind.clone(),
        resource_id: event.resource_id.clone(),
        request_meta: event.request_meta.clone(),
        status_code: event.status_code,
        latency_milliseconds: event.latency_milliseconds,
        shard_day: created_at.format("%Y-%m-%d").to_string(),
        prev_hash_hexadecimal: String::new(),
        entry_hash_hexadecimal: String::new(),
        created_at,
    }
}

/// Anexa el evento al buffer durable JSONL local.
#[instrument(skip(event))]
async fn append_to_fallback_buffer(
    buffer_path: &PathBuf,
    event: &AuditEvent,
) -> std::io::Result<()> {
    if let Some(parent) = buffer_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let buffered_line = json!({
        "service": event.service,
        "action": event.action,
        "user_id": event.user_id.map(|u| u.to_string()),
        "resource_kind": event.resource_kind,
        "resource_id": event.resource_id,
        "request_meta": event.request_meta,
        "status_code": event.status_code,
        "latency_ms": event.latency_milliseconds,
        "stranded_at": Utc::now().to_rfc3339(),
    });

    let mut buffer_file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(buffer_path)
        .await?;
    buffer_file
        .write_all(format!("{}\n", buffered_line).as_bytes())
        .await?;
    buffer_file.sync_data().await
}
// FIN DEL ARCHIVO [apps/gateway/src/services/audit_recorder.rs]
