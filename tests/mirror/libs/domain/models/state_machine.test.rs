// [tests/mirror/libs/domain/models/state_machine.test.rs]
/**
 * =================================================================
 * APARATO: DOCUMENT STATE MACHINE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL RETÍCULO MONOTÓNICO
 * =================================================================
 */

use proptest::prelude::*;
use versafe_domain_models::document::DocumentState;

#[test]
fn certify_nominal_advance_path() {
    println!("\n🧪 [PROVING_GROUNDS]: Auditing monotonic lattice...");

    // Cadena nominal de avance completa.
    assert!(DocumentState::Uploaded.can_transition_to(DocumentState::PartiallySigned));
    assert!(DocumentState::Uploaded.can_transition_to(DocumentState::Signed));
    assert!(DocumentState::PartiallySigned.can_transition_to(DocumentState::Signed));
    assert!(DocumentState::Signed.can_transition_to(DocumentState::Verified));

    // REGISTRATION_PENDING: democión sólo desde UPLOADED (techo del
    // registro agotado), recuperación sólo hacia UPLOADED, y jamás
    // acepta firmas.
    assert!(DocumentState::Uploaded.can_transition_to(DocumentState::RegistrationPending));
    assert!(DocumentState::RegistrationPending.can_transition_to(DocumentState::Uploaded));
    assert!(!DocumentState::RegistrationPending.accepts_signatures());
    assert!(!DocumentState::Signed.can_transition_to(DocumentState::RegistrationPending));

    // Retrocesos prohibidos.
    assert!(!DocumentState::Signed.can_transition_to(DocumentState::Uploaded));
    assert!(!DocumentState::Verified.can_transition_to(DocumentState::Signed));
    assert!(!DocumentState::PartiallySigned.can_transition_to(DocumentState::Uploaded));

    println!("   ✅ [SUCCESS]: Lattice is monotonic.");
}

#[test]
fn certify_terminal_states_are_absorbing() {
    let every_state = [
        DocumentState::Uploaded,
        DocumentState::RegistrationPending,
        DocumentState::Quarantined,
        DocumentState::PartiallySigned,
        DocumentState::Signed,
        DocumentState::Verified,
        DocumentState::Revoked,
        DocumentState::Expired,
    ];

    for target in every_state {
        assert!(
            !DocumentState::Revoked.can_transition_to(target),
            "REVOKED must absorb, leaked to {:?}",
            target
        );
        assert!(
            !DocumentState::Expired.can_transition_to(target),
            "EXPIRED must absorb, leaked to {:?}",
            target
        );
    }

    // Todo estado no terminal alcanza los sumideros laterales.
    for origin in every_state.iter().filter(|s| !s.is_terminal()) {
        assert!(origin.can_transition_to(DocumentState::Revoked));
        assert!(origin.can_transition_to(DocumentState::Expired));
    }
}

proptest! {
    /**
     * INVARIANTE: para N firmas válidas y K requeridas, el estado
     * derivado es UPLOADED sii N=0, PARTIALLY_SIGNED sii 0<N<K y
     * SIGNED sii N>=K.
     */
    #[test]
    fn certify_signature_count_state_invariant(
        valid_count in 0u32..50,
        required in 1u32..10,
    ) {
        let derived = DocumentState::state_for_signature_count(valid_count, required);
        if valid_count == 0 {
            prop_assert_eq!(derived, DocumentState::Uploaded);
        } else if valid_count < required {
            prop_assert_eq!(derived, DocumentState::PartiallySigned);
        } else {
            prop_assert_eq!(derived, DocumentState::Signed);
        }
    }
}
