use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static request limits for one odds provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Maximum requests in any trailing 60s window
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: u32,
    /// Maximum requests between two local midnights
    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,
    /// Minimum spacing between consecutive requests
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Growth factor applied to the backoff on repeated 429s
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound for the backoff
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_per_minute() -> u32 {
    10
}

fn default_max_per_day() -> u32 {
    500
}

fn default_min_interval_ms() -> u64 {
    6500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_per_minute: default_max_per_minute(),
            max_per_day: default_max_per_day(),
            min_interval_ms: default_min_interval_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ProviderConfig {
    /// Backoff applied after the first 429
    pub fn initial_backoff_ms(&self) -> u64 {
        self.min_interval_ms.saturating_mul(2).min(self.max_backoff_ms)
    }

    /// Next backoff step given the current one (0 = no backoff yet)
    pub fn next_backoff_ms(&self, current_ms: u64) -> u64 {
        if current_ms == 0 {
            return self.initial_backoff_ms();
        }
        let grown = (current_ms as f64 * self.backoff_multiplier).ceil();
        if !grown.is_finite() || grown >= self.max_backoff_ms as f64 {
            self.max_backoff_ms
        } else {
            grown as u64
        }
    }

    pub fn validate(&self, name: &str) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_per_minute == 0 {
            errors.push(format!("quota.{name}.max_per_minute must be positive"));
        }
        if self.max_per_day == 0 {
            errors.push(format!("quota.{name}.max_per_day must be positive"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            errors.push(format!("quota.{name}.backoff_multiplier must be >= 1.0"));
        }
        if self.max_backoff_ms < self.min_interval_ms {
            errors.push(format!(
                "quota.{name}.max_backoff_ms should not be below min_interval_ms"
            ));
        }

        errors
    }
}

/// Provider key → limits, with a fallback for unknown keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderTable {
    #[serde(default)]
    pub default: ProviderConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl ProviderTable {
    pub fn new(default: ProviderConfig) -> Self {
        Self {
            default,
            providers: HashMap::new(),
        }
    }

    pub fn with_provider(mut self, key: &str, config: ProviderConfig) -> Self {
        self.providers.insert(key.to_string(), config);
        self
    }

    /// Limits for `provider`, falling back to the default entry
    pub fn get(&self, provider: &str) -> &ProviderConfig {
        self.providers.get(provider).unwrap_or(&self.default)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.default.validate("default");
        let mut keys: Vec<&String> = self.providers.keys().collect();
        keys.sort();
        for key in keys {
            errors.extend(self.providers[key].validate(&format!("providers.{key}")));
        }
        errors
    }
}
