//! Mirror store provisioning and verification.
//!
//! The secondary store is a managed key-value endpoint, so "provisioning"
//! amounts to proving reachability and writing per-entity namespace
//! markers; the entity keyspaces themselves are created lazily by the
//! first mirror write.
//!
//! # Environment Variables
//!
//! - `BOOKBAZAAR_MIRROR_URL` - Redis endpoint (required)
//! - `BOOKBAZAAR_NOTIFY_TOPIC` - pub/sub channel for order notifications
//!   (optional; `verify` skips the topic check when unset)

use redis::AsyncCommands;

use bookbazaar_server::services::mirror::{MirrorError, MirrorStore};

/// Entity namespaces the mirror uses.
const NAMESPACES: &[&str] = &["users", "books", "orders"];

/// Errors from mirror commands.
#[derive(Debug, thiserror::Error)]
pub enum MirrorCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

fn mirror_url() -> Result<String, MirrorCommandError> {
    dotenvy::dotenv().ok();
    std::env::var("BOOKBAZAAR_MIRROR_URL")
        .map_err(|_| MirrorCommandError::MissingEnvVar("BOOKBAZAAR_MIRROR_URL"))
}

/// Provision the mirror: verify reachability and mark the namespaces.
///
/// # Errors
///
/// Returns an error if the endpoint is unreachable or a marker write fails.
pub async fn setup() -> Result<(), MirrorCommandError> {
    let url = mirror_url()?;

    tracing::info!("Setting up mirror store...");
    let store = MirrorStore::connect(&url).await?;
    store.ping().await?;
    tracing::info!("Mirror endpoint reachable");

    let mut conn = store.connection();
    for namespace in NAMESPACES {
        let _: () = conn
            .set(format!("bookbazaar:tables:{namespace}"), "ready")
            .await?;
        tracing::info!(namespace, "namespace marked");
    }

    tracing::info!("Mirror setup complete");
    Ok(())
}

/// Verify mirror and topic connectivity end to end.
///
/// # Errors
///
/// Returns an error if the ping, the probe-key roundtrip, or the topic
/// publish fails.
pub async fn verify() -> Result<(), MirrorCommandError> {
    let url = mirror_url()?;

    tracing::info!("Verifying mirror integration");

    let store = MirrorStore::connect(&url).await?;
    store.ping().await?;
    tracing::info!("ping: OK");

    // Probe-key roundtrip
    let mut conn = store.connection();
    let probe_key = "bookbazaar:probe";
    let _: () = conn.set(probe_key, "connectivity verification").await?;
    let readback: Option<String> = conn.get(probe_key).await?;
    let _: () = conn.del(probe_key).await?;
    match readback.as_deref() {
        Some("connectivity verification") => tracing::info!("keyspace roundtrip: OK"),
        other => tracing::warn!(?other, "keyspace roundtrip: unexpected value"),
    }

    // Topic publish (skipped when no topic is configured)
    match std::env::var("BOOKBAZAAR_NOTIFY_TOPIC") {
        Ok(topic) => {
            let _: () = conn.publish(&topic, "Connectivity verification").await?;
            tracing::info!(topic, "topic publish: OK");
        }
        Err(_) => tracing::info!("topic publish: SKIPPED (no BOOKBAZAAR_NOTIFY_TOPIC)"),
    }

    tracing::info!("Mirror verification complete");
    Ok(())
}
