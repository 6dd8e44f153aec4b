//! Gateway configuration.
//!
//! Every field can be given on the command line or through a `PAYRECON_*`
//! environment variable.

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://rest-api.pay.nl";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Test,
    Live,
}

/// Merchant credentials and gateway settings.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct GatewayConfig {
    /// Token code (AT-xxxx-xxxx)
    #[arg(long, env = "PAYRECON_TOKEN_CODE", default_value = "")]
    pub token_code: String,

    /// API token
    #[arg(long, env = "PAYRECON_API_TOKEN", default_value = "", hide_env_values = true)]
    pub api_token: String,

    /// Service id (SL-xxxx-xxxx)
    #[arg(long, env = "PAYRECON_SERVICE_ID", default_value = "")]
    pub service_id: String,

    /// Payment method the customer is sent to directly; empty offers all methods
    #[arg(long, env = "PAYRECON_PAYMENT_METHOD", default_value = "")]
    pub default_payment_method: String,

    #[arg(long, env = "PAYRECON_MODE", value_enum, default_value_t = Mode::Test)]
    pub mode: Mode,

    #[arg(long, env = "PAYRECON_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout for a single provider call, in seconds
    #[arg(long, env = "PAYRECON_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Public URL of the notification callback handed to the provider
    #[arg(long, env = "PAYRECON_NOTIFY_URL", default_value = "")]
    pub notify_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token_code: String::new(),
            api_token: String::new(),
            service_id: String::new(),
            default_payment_method: String::new(),
            mode: Mode::Test,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            notify_url: String::new(),
        }
    }
}

/// Immutable credential triplet handed to each provider client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token_code: String,
    pub api_token: String,
    pub service_id: String,
}

impl GatewayConfig {
    /// Returns the credentials, or `None` when any of them is blank.
    pub fn credentials(&self) -> Option<Credentials> {
        let fields = [&self.token_code, &self.api_token, &self.service_id];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return None;
        }
        Some(Credentials {
            token_code: self.token_code.trim().to_string(),
            api_token: self.api_token.trim().to_string(),
            service_id: self.service_id.trim().to_string(),
        })
    }

    pub fn default_payment_method(&self) -> Option<&str> {
        Some(self.default_payment_method.trim()).filter(|m| !m.is_empty())
    }

    pub fn test_mode(&self) -> bool {
        self.mode == Mode::Test
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
