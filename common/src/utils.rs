// common/src/utils.rs
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for consistent logging across the workspace
///
/// Unknown level names fall back to `INFO`.
pub fn setup_tracing(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Generate a cryptographically secure random token of specified length
pub fn generate_secure_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a nonce with timestamp and random component
pub fn generate_nonce() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let random_part = generate_secure_token(32);
    format!("{}-{}", timestamp, random_part)
}

/// Random placeholder secret for identity-store credential entries
pub fn placeholder_password() -> String {
    generate_secure_token(32)
}
