// [apps/gateway/src/main.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY MAIN ENTRY POINT (V4.1 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La sonda del Ledger y el unseal de la bóveda ocurren ANTES de abrir
 * el socket TCP, por lo que ninguna petición observa un núcleo a
 * medio componer.
 * =================================================================
 */

use dotenvy::dotenv;
use tracing::info;
use versafe_gateway::prelude::*;
use versafe_shared_sentinel::init_tracing;

/**
 * Punto de ignición del binario del núcleo.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO
    dotenv().ok();

    // 2. OBSERVABILIDAD (SENTINEL)
    init_tracing("versafe_gateway");

    // 3. RUNTIME CON PILA AMPLIADA (firma RSA y huellas en ráfaga)
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        info!("🛰️  [CORE]: Global ignition sequence starting...");

        // 4. CONFIGURACIÓN SELLADA DEL PROCESO
        let config = CoreConfig::from_environment();

        // 5. KERNEL: ENLACES, SONDAS Y COMPOSICIÓN
        let kernel = CoreKernel::ignite(config).await;

        // 6. DAEMONS + SERVIDOR HTTP
        info!("🚀 [CORE_ONLINE]: Launching daemons and HTTP transport.");
        kernel.launch_core_operations().await;

        Ok(())
    })
}
