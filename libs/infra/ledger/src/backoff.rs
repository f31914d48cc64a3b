// [libs/infra/ledger/src/backoff.rs]
/*!
 * =================================================================
 * APARATO: EXPONENTIAL BACKOFF PLAN (V2.0 - JITTERED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: PLAN DE REINTENTOS CON TECHO Y JITTER
 *
 * # Mathematical Proof (Bounded Growth):
 * delay(n) = base * 2^n + U(0, base), con n acotado por el techo de
 * intentos. La componente uniforme desincroniza reintentos de réplicas
 * concurrentes evitando ráfagas sincronizadas contra el Ledger caído.
 * =================================================================
 */

use rand::Rng;
use std::time::Duration;

/// Plan de reintentos: expone la secuencia de esperas hasta el techo.
#[derive(Debug, Clone)]
pub struct BackoffPlan {
    base_delay: Duration,
    max_attempts: u32,
}

impl BackoffPlan {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self { base_delay, max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Espera previa al intento 'attempt_index' (0-based). El primer
    /// intento no espera.
    pub fn delay_before_attempt(&self, attempt_index: u32) -> Duration {
        if attempt_index == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt_index.saturating_sub(1).min(16);
        let exponential_component = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter_millis = rand::thread_rng().gen_range(0..=self.base_delay.as_millis() as u64);
        exponential_component + Duration::from_millis(jitter_millis)
    }
}
