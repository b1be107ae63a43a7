use crate::domain::alert::TriggerRule;
use crate::infrastructure::memory_repository::DEFAULT_RETENTION_HOURS;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub graph: GraphSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Influx,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub influx: Option<InfluxSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemorySettings {
    pub retention_hours: i64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            retention_hours: DEFAULT_RETENTION_HOURS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphSettings {
    pub window_hours: i64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self { window_hours: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertSettings {
    pub capacity: usize,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:5000")?
        .set_default("storage.backend", "memory")?)
}

/// Load `config/monitor.*`, then apply `MONITOR__SECTION__KEY` overrides.
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(config::Environment::with_prefix("MONITOR").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a query string
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = query.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> MonitorConfig {
        builder()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_prepare_query() {
        let mut vars = HashMap::new();
        vars.insert("aggregate".to_string(), "mean".to_string());
        vars.insert("since".to_string(), "2024-05-01T07:00:00Z".to_string());

        let query = "SELECT ${aggregate}(value) FROM datapoints WHERE time > '${since}'";
        let result = prepare_query(query, &vars);

        assert_eq!(result, "SELECT mean(value) FROM datapoints WHERE time > '2024-05-01T07:00:00Z'");
    }

    #[test]
    fn test_defaults() {
        let config = parse("");
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.storage.influx.is_none());
        assert_eq!(config.storage.memory.retention_hours, 6);
        assert_eq!(config.graph.window_hours, 3);
        assert_eq!(config.alerts.capacity, 100);
        assert!(config.triggers.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [server]
            bind = "127.0.0.1:8080"

            [storage]
            backend = "influx"

            [storage.memory]
            retention_hours = 12

            [storage.influx]
            host = "http://localhost:8086"
            token = "secret"
            database = "monitor"
            retention_policy = "autogen"

            [graph]
            window_hours = 6

            [[triggers]]
            metric_key = "cpu.usage"
            above = 15.0
            "#,
        );
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.storage.backend, StorageBackend::Influx);
        assert_eq!(config.storage.memory.retention_hours, 12);
        assert_eq!(config.storage.influx.unwrap().database, "monitor");
        assert_eq!(config.graph.window_hours, 6);
        assert_eq!(config.triggers, vec![TriggerRule::new("cpu.usage", 15.0)]);
    }
}
