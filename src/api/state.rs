use std::sync::Arc;
use std::time::Instant;

use crate::alerts::AlertPipeline;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::notify::NotificationChannel;
use crate::observability::Metrics;
use crate::registry::WebhookRegistry;
use crate::threads::ThreadService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<WebhookRegistry>,
    pub ledger: Arc<dyn Ledger>,
    pub channel: Arc<dyn NotificationChannel>,
    pub alerts: Arc<AlertPipeline>,
    pub threads: Arc<ThreadService>,
    /// Shared client for connection tests against unsaved targets
    pub http: reqwest::Client,
    pub metrics: Arc<Metrics>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        ledger: Arc<dyn Ledger>,
        channel: Arc<dyn NotificationChannel>,
        http: reqwest::Client,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let registry = WebhookRegistry::new(config.server.public_url.clone());
        let alerts = AlertPipeline::new(
            Arc::clone(&ledger),
            Arc::clone(&channel),
            Arc::clone(&metrics),
            config.alerts.alert_on_unknown_webhook,
        );
        let threads = ThreadService::new(Arc::clone(&ledger), Arc::clone(&channel));

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            ledger,
            channel,
            alerts: Arc::new(alerts),
            threads: Arc::new(threads),
            http,
            metrics,
            started_at: Instant::now(),
        }
    }

    /// URL the server answers on locally
    pub fn local_url(&self) -> String {
        let addr = self.config.server.bind_addr;
        if addr.ip().is_unspecified() {
            format!("http://localhost:{}", addr.port())
        } else {
            format!("http://{addr}")
        }
    }
}
