// [tests/mirror/libs/domain/models/audit_chain.test.rs]
/**
 * =================================================================
 * APARATO: AUDIT CHAIN MODEL TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL SELLO ENCADENADO
 * =================================================================
 */

use chrono::Utc;
use uuid::Uuid;
use versafe_domain_models::audit::{AuditRecord, AUDIT_CHAIN_GENESIS};

fn synthetic_record(action: &str) -> AuditRecord {
    let created_at = Utc::now();
    AuditRecord {
        id: Uuid::new_v4(),
        service: "document-ingest".into(),
        action: action.into(),
        user_id: Some(Uuid::new_v4()),
        resource_kind: "document".into(),
        resource_id: Uuid::new_v4().to_string(),
        request_meta: serde_json::json!({ "size_bytes": 15 }),
        status_code: 201,
        latency_milliseconds: 12,
        shard_day: created_at.format("%Y-%m-%d").to_string(),
        prev_hash_hexadecimal: String::new(),
        entry_hash_hexadecimal: String::new(),
        created_at,
    }
}

#[test]
fn certify_chain_seals_and_reverifies() {
    println!("\n🧪 [PROVING_GROUNDS]: Sealing a 100-link chain...");

    let mut previous = AUDIT_CHAIN_GENESIS.to_string();
    let mut chain = Vec::new();
    for index in 0..100 {
        let mut record = synthetic_record(&format!("document.upload.{}", index));
        record.seal(&previous);
        previous = record.entry_hash_hexadecimal.clone();
        chain.push(record);
    }

    // Re-verificación completa desde el génesis.
    let mut expected_previous = AUDIT_CHAIN_GENESIS.to_string();
    for record in &chain {
        assert!(record.verify_seal(&expected_previous), "chain must reverify");
        expected_previous = record.entry_hash_hexadecimal.clone();
    }

    println!("   ✅ [SUCCESS]: 100 links reverified from genesis.");
}

#[test]
fn certify_mutation_breaks_the_chain_at_the_mutated_link() {
    let mut previous = AUDIT_CHAIN_GENESIS.to_string();
    let mut chain = Vec::new();
    for index in 0..10 {
        let mut record = synthetic_record(&format!("signature.sign.{}", index));
        record.seal(&previous);
        previous = record.entry_hash_hexadecimal.clone();
        chain.push(record);
    }

    // Mutación del contenido de un eslabón intermedio.
    chain[4].resource_id = "tampered-resource".into();

    let mut expected_previous = AUDIT_CHAIN_GENESIS.to_string();
    let mut first_broken = None;
    for (index, record) in chain.iter().enumerate() {
        if !record.verify_seal(&expected_previous) {
            first_broken = Some(index);
            break;
        }
        expected_previous = record.entry_hash_hexadecimal.clone();
    }

    assert_eq!(first_broken, Some(4), "break must surface at the mutated link");
}
