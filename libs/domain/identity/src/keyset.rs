// [libs/domain/identity/src/keyset.rs]
/*!
 * =================================================================
 * APARATO: ROTATING SIGNING KEY SET (V3.0)
 * CLASIFICACIÓN: DOMAIN SERVICE (ESTRATO L2)
 * RESPONSABILIDAD: CONJUNTO ACTIVO DE CLAVES DE FIRMA DE TOKENS
 *
 * La rotación ocurre fuera de banda: el entorno entrega un mapa JSON
 * 'kid -> secreto'. El verificador acepta cualquier kid del conjunto;
 * el emisor firma siempre con el kid primario (el primero en orden
 * lexicográfico estable).
 * =================================================================
 */

use std::collections::BTreeMap;

use crate::errors::IdentityError;

/// Conjunto activo de claves simétricas de firma, indexadas por 'kid'.
#[derive(Debug, Clone)]
pub struct SigningKeySet {
    /// BTreeMap para un kid primario determinista entre réplicas.
    keys_by_identifier: BTreeMap<String, Vec<u8>>,
}

impl SigningKeySet {
    /// Parsea el valor de TOKEN_SIGNING_KEY_SET: un objeto JSON
    /// '{"kid-2026a": "secreto", ...}' con al menos una entrada.
    pub fn from_environment_value(raw_key_set: &str) -> Result<Self, IdentityError> {
        let parsed: BTreeMap<String, String> = serde_json::from_str(raw_key_set)
            .map_err(|e| IdentityError::KeySetMalformed(e.to_string()))?;

        if parsed.is_empty() {
            return Err(IdentityError::KeySetMalformed("EMPTY_KEY_SET".into()));
        }
        if parsed.values().any(|secret| secret.len() < 16) {
            return Err(IdentityError::KeySetMalformed("SECRET_TOO_SHORT".into()));
        }

        Ok(Self {
            keys_by_identifier: parsed
                .into_iter()
                .map(|(kid, secret)| (kid, secret.into_bytes()))
                .collect(),
        })
    }

    /// Kid primario: el emisor firma con él los tokens nuevos.
    pub fn primary_key_identifier(&self) -> &str {
        self.keys_by_identifier
            .keys()
            .next()
            .map(|k| k.as_str())
            .expect("key set invariant: never empty after construction")
    }

    /// Secreto asociado a un kid del conjunto activo.
    ///
    /// # Errors:
    /// 'Unknown' si el kid no pertenece al conjunto (clave ya rotada).
    pub fn secret_for(&self, key_identifier: &str) -> Result<&[u8], IdentityError> {
        self.keys_by_identifier
            .get(key_identifier)
            .map(|s| s.as_slice())
            .ok_or(IdentityError::Unknown)
    }

    pub fn active_key_count(&self) -> usize {
        self.keys_by_identifier.len()
    }
}
