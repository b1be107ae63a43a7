// Metrics agent - Samples host CPU, memory and network counters and posts them to the monitor
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use sysinfo::{Networks, System};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Clone)]
struct AgentConfig {
    server_url: String,
    resource_id: Option<String>,
    interval_secs: u64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

impl AgentConfig {
    fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("server_url", "http://localhost:5000")?
            .set_default("interval_secs", 1)?
            .add_source(config::File::with_name("config/agent").required(false))
            .add_source(config::Environment::with_prefix("AGENT").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[derive(Debug, Serialize)]
struct ResourceAnnouncement<'a> {
    resource_id: &'a str,
    tags: &'a BTreeMap<String, String>,
    hostname: &'a str,
}

#[derive(Debug, Serialize)]
struct Sample<'a> {
    resource_id: &'a str,
    timestamp: DateTime<Utc>,
    metrics: BTreeMap<String, f64>,
}

/// Cumulative counters of one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct InterfaceCounters {
    bytes_sent: u64,
    bytes_recv: u64,
    packets_sent: u64,
    packets_recv: u64,
    errin: u64,
    errout: u64,
}

impl InterfaceCounters {
    fn write_metrics(&self, interface: &str, metrics: &mut BTreeMap<String, f64>) {
        for (name, value) in [
            ("bytes_sent", self.bytes_sent),
            ("bytes_recv", self.bytes_recv),
            ("packets_sent", self.packets_sent),
            ("packets_recv", self.packets_recv),
            ("errin", self.errin),
            ("errout", self.errout),
        ] {
            metrics.insert(format!("net.if.{}.{}", interface, name), value as f64);
        }
    }
}

struct Collector {
    system: System,
    networks: Networks,
}

impl Collector {
    fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_cpu();
        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
        }
    }

    fn collect(&mut self) -> BTreeMap<String, f64> {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.networks.refresh();

        let mut metrics = BTreeMap::new();
        metrics.insert("cpu.usage".to_string(), self.system.global_cpu_info().cpu_usage() as f64);
        for (i, cpu) in self.system.cpus().iter().enumerate() {
            metrics.insert(format!("cpu.{}.usage", i), cpu.cpu_usage() as f64);
        }
        metrics.insert("mem.used_bytes".to_string(), self.system.used_memory() as f64);
        metrics.insert("mem.total_bytes".to_string(), self.system.total_memory() as f64);

        for (interface, data) in self.networks.iter() {
            InterfaceCounters {
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_recv: data.total_packets_received(),
                errin: data.total_errors_on_received(),
                errout: data.total_errors_on_transmitted(),
            }
            .write_metrics(interface, &mut metrics);
        }
        metrics
    }
}

async fn post_json<T: Serialize>(client: &reqwest::Client, url: &str, body: &T) -> anyhow::Result<()> {
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned {}: {}", url, status, text);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::load().context("loading agent configuration")?;
    let hostname = System::host_name().unwrap_or_default();
    let resource_id = config
        .resource_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| Some(hostname.clone()).filter(|h| !h.is_empty()))
        .unwrap_or_else(|| "test".to_string());
    let base = config.server_url.trim_end_matches('/');
    let client = reqwest::Client::new();

    let announcement = ResourceAnnouncement {
        resource_id: &resource_id,
        tags: &config.tags,
        hostname: &hostname,
    };
    if let Err(e) = post_json(&client, &format!("{}/resources", base), &announcement).await {
        tracing::warn!("Could not register resource {}: {:#}", resource_id, e);
    }

    tracing::info!(
        "Reporting {} to {} every {}s",
        resource_id,
        base,
        config.interval_secs
    );
    let metrics_url = format!("{}/metrics", base);
    let mut collector = Collector::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    loop {
        ticker.tick().await;
        let sample = Sample {
            resource_id: &resource_id,
            timestamp: Utc::now(),
            metrics: collector.collect(),
        };
        match post_json(&client, &metrics_url, &sample).await {
            Ok(()) => tracing::debug!("Posted {} metrics", sample.metrics.len()),
            Err(e) => tracing::error!("Posting metrics failed: {:#}", e),
        }
    }
}
