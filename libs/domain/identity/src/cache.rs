// [libs/domain/identity/src/cache.rs]
/*!
 * =================================================================
 * APARATO: PRINCIPAL CACHE (V2.2 - BOUNDED TTL)
 * CLASIFICACIÓN: DOMAIN SERVICE (ESTRATO L2)
 * RESPONSABILIDAD: CACHÉ ACOTADA DE VERIFICACIONES DE TOKEN
 *
 * Invariante: una entrada expira a los 5 minutos como máximo y nunca
 * después de la expiración del propio token.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::tokens::Principal;

/// TTL máximo de una entrada del caché.
const CACHE_MAX_TTL_SECONDS: i64 = 300;
/// Presupuesto de entradas antes de una purga de expirados.
const CACHE_PRUNE_THRESHOLD: usize = 4096;

struct CachedVerification {
    principal: Principal,
    cache_entry_expires_at: DateTime<Utc>,
}

/// Caché en proceso token -> principal. La clave es el SHA-256 del
/// token para no retener portadores en claro en RAM.
pub struct PrincipalCache {
    entries: RwLock<HashMap<String, CachedVerification>>,
}

impl PrincipalCache {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Recupera un principal cacheado todavía vigente.
    pub fn lookup(&self, bearer_token: &str) -> Option<Principal> {
        let cache_key = Self::cache_key(bearer_token);
        let entries_guard = self.entries.read().ok()?;
        let cached = entries_guard.get(&cache_key)?;
        if Utc::now() >= cached.cache_entry_expires_at {
            return None;
        }
        Some(cached.principal.clone())
    }

    /// Inserta una verificación exitosa acotando su TTL al mínimo entre
    /// 5 minutos y la expiración del token.
    pub fn store(&self, bearer_token: &str, principal: Principal) {
        let cache_deadline = Utc::now() + Duration::seconds(CACHE_MAX_TTL_SECONDS);
        let bounded_deadline = cache_deadline.min(principal.token_expires_at);

        if let Ok(mut entries_guard) = self.entries.write() {
            if entries_guard.len() >= CACHE_PRUNE_THRESHOLD {
                let now = Utc::now();
                entries_guard.retain(|_, cached| cached.cache_entry_expires_at > now);
            }
            entries_guard.insert(
                Self::cache_key(bearer_token),
                CachedVerification { principal, cache_entry_expires_at: bounded_deadline },
            );
        }
    }

    /// Invalida toda verificación cacheada de un usuario (re-uso de
    /// refresh detectado: la sesión completa queda anulada).
    pub fn purge_user(&self, user_id: &uuid::Uuid) {
        if let Ok(mut entries_guard) = self.entries.write() {
            entries_guard.retain(|_, cached| cached.principal.user_id != *user_id);
        }
    }

    fn cache_key(bearer_token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bearer_token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Default for PrincipalCache {
    fn default() -> Self {
        Self::new()
    }
}
