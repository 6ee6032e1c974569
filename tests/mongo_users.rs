//! Runs against a live MongoDB: `MONGODB_URI=... cargo test -- --ignored`.

use std::time::Duration;

use calesync::{
    config::DatabaseConfig,
    db::Database,
    users::{NewUser, UniqueField, User, UserError},
};

async fn connect() -> Database {
    let uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017/calesync_test".into());
    Database::connect(&DatabaseConfig {
        uri,
        server_selection_timeout: Duration::from_secs(5),
        shutdown_timeout: Duration::from_secs(5),
    })
    .await
    .expect("MongoDB must be reachable for ignored tests")
}

fn unique_user(tag: &str) -> NewUser {
    let suffix = bson::oid::ObjectId::new().to_hex();
    NewUser {
        username: format!("{tag}-{suffix}"),
        email: format!("{tag}.{suffix}@example.com"),
        password: "integration-secret".into(),
        first_name: Some("Test".into()),
        last_name: None,
    }
}

#[tokio::test]
#[ignore]
async fn unique_indexes_reject_collisions() {
    let db = connect().await;
    let store = db.users();

    let input = unique_user("dup");
    let mut first = User::new(input.clone());
    first.save(&store).await.expect("first save");

    let mut same_username = User::new(NewUser {
        email: format!("other.{}", input.email),
        ..input.clone()
    });
    let err = same_username.save(&store).await.unwrap_err();
    assert!(matches!(err, UserError::Duplicate(UniqueField::Username)), "{err}");

    let mut same_email = User::new(NewUser {
        username: format!("{}-b", input.username),
        email: input.email.to_uppercase(),
        ..input
    });
    let err = same_email.save(&store).await.unwrap_err();
    assert!(matches!(err, UserError::Duplicate(UniqueField::Email)), "{err}");

    first.delete(&store).await.expect("cleanup");
    db.close(Duration::from_secs(5)).await.expect("close");
}

#[tokio::test]
#[ignore]
async fn profile_update_keeps_stored_hash() {
    let db = connect().await;
    let store = db.users();

    let mut user = User::new(unique_user("keep"));
    user.save(&store).await.expect("save");
    let id = user.id().expect("id");

    let mut loaded = User::find_by_id(&store, id).await.unwrap().expect("found");
    let before = loaded.credential().clone();
    loaded.last_name = Some("Renamed".into());
    loaded.save(&store).await.expect("update");

    let reloaded = User::find_by_id(&store, id).await.unwrap().expect("found");
    assert_eq!(reloaded.credential(), &before);
    assert_eq!(reloaded.last_name.as_deref(), Some("Renamed"));
    assert!(reloaded.compare_password("integration-secret").await.unwrap());

    reloaded.delete(&store).await.expect("cleanup");
    db.close(Duration::from_secs(5)).await.expect("close");
}
