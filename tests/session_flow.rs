//! End-to-end session lifecycle against the composed server with the
//! in-memory store backend.

use gatehouse::application_port::{LoginInput, RegisterInput, SessionError, UpdateMeInput};
use gatehouse::server::Server;
use gatehouse::settings::{Auth, Blacklist, Cache, Log, Settings, Store};

fn memory_settings() -> Settings {
    Settings {
        auth: Auth {
            access_secret: "it-access-secret".to_string(),
            refresh_secret: "it-refresh-secret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604800,
        },
        blacklist: Blacklist {
            sweep_interval_secs: 1,
        },
        cache: Cache { ttl_secs: 86400 },
        log: Log {
            filter: "warn".to_string(),
        },
        store: Store {
            backend: "memory".to_string(),
            mysql_url: None,
        },
    }
}

fn register(username: &str, password: &str) -> RegisterInput {
    RegisterInput {
        username: username.to_string(),
        password: password.to_string(),
    }
}

fn login(username: &str, password: &str) -> LoginInput {
    LoginInput {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let server = Server::try_new(&memory_settings()).await.unwrap();
    let sessions = server.session_service.clone();
    let profiles = server.profile_service.clone();

    // Register, then conflict on the duplicate.
    let registered = sessions.register(register("alice", "secret1")).await.unwrap();
    assert_eq!(registered.username, "alice");
    assert!(matches!(
        sessions.register(register("alice", "other")).await,
        Err(SessionError::UsernameTaken)
    ));

    // Login with the right and the wrong password.
    let session = sessions.login(login("alice", "secret1")).await.unwrap();
    assert!(!session.access_token.0.is_empty());
    assert!(!session.refresh_token.0.is_empty());
    assert!(matches!(
        sessions.login(login("alice", "wrong")).await,
        Err(SessionError::InvalidCredentials)
    ));

    // Rotate, then replay the consumed token.
    let r1 = session.refresh_token.0.clone();
    let pair = sessions.refresh(&r1).await.unwrap();
    assert_ne!(pair.refresh_token.0, r1);
    assert!(matches!(
        sessions.refresh(&r1).await,
        Err(SessionError::TokenInvalid)
    ));

    // The profile is reachable with the fresh access token.
    let user_id = sessions.authenticate(&pair.access_token.0).await.unwrap();
    let me = profiles.get_me(user_id).await.unwrap();
    assert_eq!(me.username, "alice");

    // Logout kills both the presented access token and the refresh token
    // that was valid just before.
    sessions.logout(user_id, &pair.access_token.0).await.unwrap();
    assert!(matches!(
        sessions.authenticate(&pair.access_token.0).await,
        Err(SessionError::TokenInvalid)
    ));
    assert!(matches!(
        sessions.refresh(&pair.refresh_token.0).await,
        Err(SessionError::TokenInvalid)
    ));

    // A fresh login still works afterwards.
    sessions.login(login("alice", "secret1")).await.unwrap();

    server.shutdown().await;
}

#[tokio::test]
async fn profile_update_is_visible_to_the_next_login() {
    let server = Server::try_new(&memory_settings()).await.unwrap();
    let sessions = server.session_service.clone();
    let profiles = server.profile_service.clone();

    sessions.register(register("bob", "secret1")).await.unwrap();
    let session = sessions.login(login("bob", "secret1")).await.unwrap();
    let user_id = sessions.authenticate(&session.access_token.0).await.unwrap();

    profiles
        .update_me(
            user_id,
            UpdateMeInput {
                old_password: Some("secret1".to_string()),
                new_password: Some("secret2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The old password is gone even though bob was cache-resident.
    assert!(matches!(
        sessions.login(login("bob", "secret1")).await,
        Err(SessionError::InvalidCredentials)
    ));
    sessions.login(login("bob", "secret2")).await.unwrap();

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_store_backend_is_rejected() {
    let mut settings = memory_settings();
    settings.store.backend = "sqlite".to_string();
    assert!(Server::try_new(&settings).await.is_err());
}
