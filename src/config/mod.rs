use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment};
use serde::Deserialize;

use crate::telemetry::TelemetryConfig;
use crate::usecase::notifications::{normalize_base_url, StoreConfig};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub resync_on_mark_all_failure: bool,
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
    #[serde(default = "default_push_subject_prefix")]
    pub push_subject_prefix: String,
    #[serde(default)]
    pub metrics_addr: Option<String>,
    #[serde(default)]
    pub telemetry_enabled: bool,
    #[serde(default = "default_telemetry_service_name")]
    pub telemetry_service_name: String,
    #[serde(default = "default_telemetry_service_version")]
    pub telemetry_service_version: String,
    #[serde(default = "default_telemetry_environment")]
    pub telemetry_environment: String,
    #[serde(default = "default_telemetry_otlp_endpoint")]
    pub telemetry_otlp_endpoint: String,
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_push_subject_prefix() -> String {
    "notifications.push".to_string()
}

fn default_telemetry_service_name() -> String {
    "onekamer-notification-inbox".to_string()
}

fn default_telemetry_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_telemetry_environment() -> String {
    "production".to_string()
}

fn default_telemetry_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(Environment::default())
    }

    fn load(environment: Environment) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(environment)
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            api_base_url: self.api_base_url.as_deref().and_then(normalize_base_url),
            api_token: self.api_token.clone(),
            page_size: self.page_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            resync_on_mark_all_failure: self.resync_on_mark_all_failure,
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.telemetry_service_name.clone(),
            service_version: self.telemetry_service_version.clone(),
            environment: self.telemetry_environment.clone(),
            otlp_endpoint: self.telemetry_otlp_endpoint.clone(),
        }
    }
}
