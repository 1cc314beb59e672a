//! Engine configuration. Load from TOML or env.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Global engine configuration: defaults for everything the CLI can also
/// override per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory receiving trigger evidence (frame + sidecar record).
    pub evidence_dir: String,
    /// Default sampling interval between classification cycles, in seconds.
    pub interval_secs: f64,
    /// Default backend adapter name.
    pub adapter: String,
    /// Consecutive failed ticks tolerated before the session aborts.
    pub max_consecutive_failures: u32,
    /// Mean-latency budget for the benchmark gate, in milliseconds.
    pub latency_budget_ms: f64,
}

impl EngineConfig {
    /// Load config from file and environment. Precedence: env `VIGIL_CONFIG`
    /// path > `config/vigil.toml` > defaults, with `VIGIL__*` environment
    /// variables layered on top.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("VIGIL_CONFIG").unwrap_or_else(|_| "config/vigil".to_string());
        let builder = config::Config::builder()
            .set_default("evidence_dir", "./data/detection")?
            .set_default("interval_secs", 1.0_f64)?
            .set_default("adapter", "mock")?
            .set_default("max_consecutive_failures", 5_i64)?
            .set_default("latency_budget_ms", 1000.0_f64)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VIGIL").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_config_file() {
        let cfg = EngineConfig::load().unwrap();
        assert_eq!(cfg.evidence_dir, "./data/detection");
        assert_eq!(cfg.interval_secs, 1.0);
        assert_eq!(cfg.adapter, "mock");
        assert_eq!(cfg.max_consecutive_failures, 5);
        assert_eq!(cfg.latency_budget_ms, 1000.0);
    }
}
