use std::net::SocketAddr;

use anyhow::Context;
use futures::stream::{self, BoxStream, StreamExt};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use notification_inbox::config::AppConfig;
use notification_inbox::delivery::{nats, push};
use notification_inbox::telemetry;
use notification_inbox::usecase::notifications::create_notification_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let tracer_provider = if config.telemetry_enabled {
        Some(telemetry::init_with_otlp(&config.telemetry_config(), env_filter)?)
    } else {
        telemetry::init_subscriber(env_filter);
        None
    };

    tracing::info!(
        user_id = %config.user_id,
        telemetry_enabled = config.telemetry_enabled,
        "starting the notification inbox"
    );

    if let Some(addr) = &config.metrics_addr {
        let addr: SocketAddr = addr.parse().context("invalid METRICS_ADDR")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        tracing::info!(%addr, "prometheus metrics initialized");
    }

    let store = create_notification_store(config.user_id.clone(), config.store_config())?;
    if !store.is_configured() {
        tracing::warn!("API_BASE_URL or USER_ID missing, notification store is inactive");
    }

    if let Err(e) = store.fetch_first().await {
        tracing::warn!(error = %e, "initial notification fetch failed");
    }

    let subject = nats::push_subject(&config.push_subject_prefix, &config.user_id);
    // The client stays bound so the connection outlives the subscription setup.
    let nats_client = match async_nats::connect(&config.nats_url).await {
        Ok(client) => {
            tracing::info!(nats_url = %config.nats_url, "connected to NATS");
            Some(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, nats_url = %config.nats_url, "failed to connect to NATS, push signals will be unavailable");
            None
        }
    };

    let messages: BoxStream<'static, Vec<u8>> = match &nats_client {
        Some(client) => match nats::push_messages(client, subject).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(error = %e, "push signals unavailable");
                stream::pending().boxed()
            }
        },
        None => stream::pending().boxed(),
    };

    let mut changes = store.subscribe();
    let listener = push::listen(&store, messages);
    tokio::pin!(listener);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            accepted = &mut listener => {
                tracing::info!(accepted, "push stream closed");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                tracing::info!(
                    unread_count = state.unread_count,
                    items = state.items.len(),
                    has_more = state.has_more,
                    loading = state.loading,
                    "inbox updated"
                );
            }
        }
    }

    store.dispose();

    if let Some(provider) = tracer_provider {
        telemetry::shutdown(provider);
    }

    Ok(())
}
