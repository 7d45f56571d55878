use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::RegistryConfig;

/// Eureka-style service-registry lifecycle collaborator.
///
/// Process-wide side effects (registration, heartbeat renewal,
/// deregistration) live here, outside the blob engine. All registry calls
/// are best effort: a down registry degrades discovery, never the service.
pub struct ServiceRegistry {
    client: Client,
    base_url: String,
    app_name: String,
    instance_id: String,
    instance: Value,
    heartbeat: Duration,
    task: Option<JoinHandle<()>>,
}

impl ServiceRegistry {
    /// Returns `None` when no registry URL is configured.
    pub fn from_config(config: &RegistryConfig, port: u16) -> Option<Self> {
        let base_url = config.url.as_ref()?.trim_end_matches('/').to_string();
        let instance_id = format!("{}:{}:{}", config.ip_addr, config.app_name, port);

        let instance = json!({
            "instance": {
                "instanceId": instance_id,
                "hostName": config.hostname,
                "app": config.app_name,
                "vipAddress": config.app_name,
                "ipAddr": config.ip_addr,
                "status": "UP",
                "port": { "$": port, "@enabled": "true" },
                "healthCheckUrl": format!("http://{}:{}/health", config.hostname, port),
                "statusPageUrl": format!("http://{}:{}/status", config.hostname, port),
                "homePageUrl": format!("http://{}:{}/", config.hostname, port),
                "dataCenterInfo": {
                    "@class": "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo",
                    "name": "MyOwn"
                },
                "leaseInfo": { "renewalIntervalInSecs": 90, "durationInSecs": 120 }
            }
        });

        Some(Self {
            client: Client::new(),
            base_url,
            app_name: config.app_name.clone(),
            instance_id,
            instance,
            heartbeat: Duration::from_secs(config.heartbeat_secs),
            task: None,
        })
    }

    /// Register the instance and keep renewing its lease until `stop`.
    pub fn start(&mut self) {
        let client = self.client.clone();
        let register_url = format!("{}/apps/{}", self.base_url, self.app_name);
        let heartbeat_url = format!("{register_url}/{}", self.instance_id);
        let instance = self.instance.clone();
        let heartbeat = self.heartbeat;

        self.task = Some(tokio::spawn(async move {
            match client.post(&register_url).json(&instance).send().await {
                Ok(res) if res.status().is_success() => {
                    info!("Registered with service registry at {}", register_url);
                }
                Ok(res) => warn!("Service registry rejected registration: {}", res.status()),
                Err(err) => warn!("Failed to reach service registry: {}", err),
            }

            let mut interval = tokio::time::interval(heartbeat);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                if let Err(err) = client.put(&heartbeat_url).send().await {
                    warn!("Heartbeat to service registry failed: {}", err);
                }
            }
        }));
    }

    /// Stop heartbeating and deregister the instance.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let url = format!("{}/apps/{}/{}", self.base_url, self.app_name, self.instance_id);
        match self.client.delete(&url).send().await {
            Ok(res) if res.status().is_success() => info!("Deregistered from service registry"),
            Ok(res) => warn!("Deregistration returned {}", res.status()),
            Err(err) => warn!("Failed to deregister: {}", err),
        }
    }
}
