use sea_orm::{Database, DatabaseConnection};

use engine::{Engine, EngineError};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn register_and_authenticate() {
    let (engine, _db) = engine_with_db().await;

    let alice = engine.register_user(" alice ", "secret1").await.unwrap();
    assert_eq!(alice.username, "alice");

    assert_eq!(
        engine.register_user("alice", "secret2").await.err(),
        Some(EngineError::ExistingKey(
            "Username already exists".to_string()
        ))
    );
    assert_eq!(
        engine.register_user("al", "secret1").await.err(),
        Some(EngineError::InvalidInput(
            "Username must be at least 3 characters long".to_string()
        ))
    );
    assert_eq!(
        engine.register_user("bob", "12345").await.err(),
        Some(EngineError::InvalidInput(
            "Password must be at least 6 characters long".to_string()
        ))
    );

    let logged = engine.authenticate("alice", "secret1").await.unwrap();
    assert_eq!(logged.id, alice.id);

    let bad = Some(EngineError::Unauthorized(
        "Invalid username or password".to_string(),
    ));
    assert_eq!(engine.authenticate("alice", "wrong!").await.err(), bad);
    assert_eq!(engine.authenticate("nobody", "secret1").await.err(), bad);
}

#[tokio::test]
async fn change_password_checks_the_current_one() {
    let (engine, _db) = engine_with_db().await;
    let alice = engine.register_user("alice", "secret1").await.unwrap();

    assert_eq!(
        engine
            .change_password(alice.id, "not-it", "secret2")
            .await
            .err(),
        Some(EngineError::InvalidInput(
            "Current password is incorrect".to_string()
        ))
    );
    engine
        .change_password(alice.id, "secret1", "secret2")
        .await
        .unwrap();
    assert!(engine.authenticate("alice", "secret1").await.is_err());
    engine.authenticate("alice", "secret2").await.unwrap();
}

#[tokio::test]
async fn users_cannot_delete_themselves() {
    let (engine, _db) = engine_with_db().await;
    let alice = engine.register_user("alice", "secret1").await.unwrap();
    let bob = engine.register_user("bob", "secret1").await.unwrap();

    let users = engine.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id, bob.id);

    assert_eq!(
        engine.delete_user(alice.id, alice.id).await.err(),
        Some(EngineError::InvalidInput(
            "You cannot delete your own account".to_string()
        ))
    );
    engine.delete_user(bob.id, alice.id).await.unwrap();
    assert_eq!(
        engine.delete_user(bob.id, alice.id).await.err(),
        Some(EngineError::KeyNotFound("User not found".to_string()))
    );
    assert_eq!(
        engine.user(bob.id).await.err(),
        Some(EngineError::KeyNotFound("User not found".to_string()))
    );
}

#[tokio::test]
async fn bcrypt_cost_is_bounded() {
    let built = Engine::builder().bcrypt_cost(2).build().await;
    assert!(matches!(built, Err(EngineError::InvalidInput(_))));
}
