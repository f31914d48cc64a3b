// [tests/mirror/libs/infra/db/session_rotation.test.rs]
/**
 * =================================================================
 * APARATO: SESSION ROTATION TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE ROTACIÓN Y DETECCIÓN DE RE-USO
 * =================================================================
 */

use chrono::{Duration, Utc};
use uuid::Uuid;
use versafe_infra_db::repositories::SessionRepository;
use versafe_infra_db::{DbError, MetadataStoreClient};

#[tokio::test]
async fn certify_rotation_consumes_and_replay_voids_the_session() {
    println!("\n🔐 [PROVING_GROUNDS]: Auditing refresh rotation...");

    let client = MetadataStoreClient::connect("file::mem_session_rot?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = SessionRepository::new(client);

    let user_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();
    let deadline = Utc::now() + Duration::days(14);

    repo.store_refresh("refresh-alpha", &user_id, &session_id, deadline).await.unwrap();

    // Primera rotación: consume y entrega la sesión.
    let rotation = repo.consume_refresh("refresh-alpha").await.unwrap();
    assert_eq!(rotation.user_id, user_id);
    assert_eq!(rotation.session_id, session_id);

    // El sucesor queda vivo dentro de la misma sesión.
    repo.store_refresh("refresh-beta", &user_id, &session_id, deadline).await.unwrap();

    // Re-uso del consumido: evidencia de replay, sesión anulada entera.
    assert!(matches!(
        repo.consume_refresh("refresh-alpha").await,
        Err(DbError::RefreshTokenReused)
    ));

    // El sucesor también quedó anulado por la detección.
    assert!(matches!(
        repo.consume_refresh("refresh-beta").await,
        Err(DbError::RefreshTokenReused)
    ));

    println!("   ✅ [SUCCESS]: Replay voided the whole session.");
}

#[tokio::test]
async fn certify_unknown_and_expired_refresh_are_rejected() {
    let client = MetadataStoreClient::connect("file::mem_session_exp?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repo = SessionRepository::new(client);

    assert!(matches!(
        repo.consume_refresh("never-issued").await,
        Err(DbError::RefreshTokenInvalid)
    ));

    // Refresh con ventana ya vencida.
    let user_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();
    repo.store_refresh("refresh-stale", &user_id, &session_id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert!(matches!(
        repo.consume_refresh("refresh-stale").await,
        Err(DbError::RefreshTokenInvalid)
    ));
}
