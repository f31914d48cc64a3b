// [apps/gateway/src/services/file_vault.rs]
/*!
 * =================================================================
 * APARATO: FILE VAULT (V2.1 - STORAGE REF ABSTRACTION)
 * CLASIFICACIÓN: INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: ALMACÉN DE BYTES DETRÁS DE 'storage_ref'
 *
 * Sólo Document Ingest escribe; el resto de servicios lee por
 * referencia opaca. La escritura pasa por un fichero temporal y un
 * rename atómico para que jamás exista una referencia a bytes parciales.
 * =================================================================
 */

use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct FileVault {
    vault_root: PathBuf,
}

impl FileVault {
    pub fn new(vault_root: PathBuf) -> Self {
        Self { vault_root }
    }

    fn path_for(&self, storage_ref: &str) -> PathBuf {
        self.vault_root.join(storage_ref)
    }

    /// Persiste los bytes y devuelve la referencia opaca.
    #[instrument(skip(self, content), fields(content_length = content.len()))]
    pub async fn store(&self, content: &[u8]) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.vault_root).await?;

        let storage_ref = Uuid::new_v4().to_string();
        let temporary_path = self.vault_root.join(format!(".{}.tmp", storage_ref));
        let final_path = self.path_for(&storage_ref);

        let mut temporary_file = tokio::fs::File::create(&temporary_path).await?;
        temporary_file.write_all(content).await?;
        temporary_file.sync_all().await?;
        drop(temporary_file);

        tokio::fs::rename(&temporary_path, &final_path).await?;
        info!("🗄️ [FILE_VAULT]: {} byte(s) crystallized at {}.", content.len(), storage_ref);
        Ok(storage_ref)
    }

    /// Re-lee los bytes por referencia (rutas de verificación y descarga).
    pub async fn read(&self, storage_ref: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(storage_ref)).await
    }

    /// Elimina los bytes (rechazo por malware durante la ingesta).
    #[instrument(skip(self))]
    pub async fn delete(&self, storage_ref: &str) -> std::io::Result<()> {
        tokio::fs::remove_file(self.path_for(storage_ref)).await
    }
}
