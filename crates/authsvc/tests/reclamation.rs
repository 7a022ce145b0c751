// crates/authsvc/tests/reclamation.rs
use authsvc::config::{HasherSettings, TokenSettings};
use authsvc::{AuthService, DefaultAuth, Settings};
use std::time::Duration;

fn short_lived_settings() -> Settings {
    Settings {
        hasher: HasherSettings::fast(),
        token: TokenSettings {
            expiry_ms: 30,
            sweep_interval_ms: 50,
            ..TokenSettings::default()
        },
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_background_sweep_reclaims_idle_tokens() {
    let auth = DefaultAuth::new(&short_lived_settings()).unwrap();
    auth.create_user("Jack", "123456").unwrap();
    auth.start().unwrap();
    assert!(auth.is_reclaiming());

    for _ in 0..10 {
        auth.authenticate_user("Jack", "123456").unwrap();
    }
    assert_eq!(auth.tokens().len(), 10);

    // nobody looks the tokens up again; only the sweep can remove them
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(auth.tokens().is_empty());

    auth.stop();
    assert!(!auth.is_reclaiming());
}

#[tokio::test]
async fn test_stopped_service_keeps_serving() {
    let auth = DefaultAuth::new(&short_lived_settings()).unwrap();
    auth.create_user("Jack", "123456").unwrap();
    auth.start().unwrap();
    auth.stop();

    let token = auth.authenticate_user("Jack", "123456").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // still stored because no sweep ran, but already unusable
    assert_eq!(auth.tokens().len(), 1);
    assert!(!auth.validate_token(&token));
    assert!(auth.tokens().is_empty());
}

#[tokio::test]
async fn test_restart_after_stop() {
    let auth = DefaultAuth::new(&short_lived_settings()).unwrap();
    auth.create_user("Jack", "123456").unwrap();

    auth.start().unwrap();
    auth.stop();
    auth.start().unwrap();
    assert!(auth.is_reclaiming());

    auth.authenticate_user("Jack", "123456").unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(auth.tokens().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_active_tokens_survive_background_sweeps() {
    let mut settings = short_lived_settings();
    settings.token.expiry_ms = 150;
    let auth = DefaultAuth::new(&settings).unwrap();
    auth.create_user("Jack", "123456").unwrap();
    auth.start().unwrap();

    let token = auth.authenticate_user("Jack", "123456").unwrap();
    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(auth.all_roles(&token).is_ok());
    }

    assert!(auth.validate_token(&token));
    auth.stop();
}

#[test]
fn test_start_requires_a_runtime() {
    let auth = DefaultAuth::new(&short_lived_settings()).unwrap();
    assert!(auth.start().is_err());
    assert!(!auth.is_reclaiming());
}
