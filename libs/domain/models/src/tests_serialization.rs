// [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V4.0 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DE CONTRATOS
 *
 * # Mathematical Proof (Wire Parity):
 * Las etiquetas SCREAMING_SNAKE de estados y niveles son parte del
 * contrato de API. Este aparato valida que serializar y deserializar
 * cada discriminador reproduzca el valor bit-perfecto.
 * =================================================================
 */
