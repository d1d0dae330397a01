//! HTTP adapters for the external collaborator services — the crawler, the
//! analyzer, and the urgent-alert webhook. Each call is a JSON POST with a
//! per-request timeout.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use clipwatch_core::config::CollaboratorConfig;
use clipwatch_core::error::{ClipwatchError, Result};
use clipwatch_core::traits::{AlertHandler, CrawlExecutor, EventSink, MentionAnalyzer};
use clipwatch_core::types::{CrawlOutcome, Mention, Profile, RunEvent, Source, Verdict};

/// Crawler service client. One POST per crawl attempt; the service enqueues
/// detected mentions itself and reports the outcome.
pub struct HttpCrawlExecutor {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCrawlExecutor {
    pub fn new(config: &CollaboratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.crawler_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl CrawlExecutor for HttpCrawlExecutor {
    async fn run(&self, source: &Source, profile: &Profile) -> Result<CrawlOutcome> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "source_id": source.id,
                "source_name": source.name,
                "profile_id": profile.id,
                "tier_minutes": source.tier.minutes(),
            }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClipwatchError::Crawl(format!("Crawler unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(ClipwatchError::Crawl(format!(
                "Crawler returned {}",
                resp.status()
            )));
        }
        resp.json::<CrawlOutcome>()
            .await
            .map_err(|e| ClipwatchError::Crawl(format!("Bad crawler response: {e}")))
    }
}

/// Analyzer service client. Sends the claimed mention's snippet and gets a
/// verdict back.
pub struct HttpMentionAnalyzer {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpMentionAnalyzer {
    pub fn new(config: &CollaboratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.analyzer_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl MentionAnalyzer for HttpMentionAnalyzer {
    async fn evaluate(&self, mention: &Mention, profile: &Profile) -> Result<Verdict> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "mention_id": mention.id,
                "post_key": mention.post_key,
                "profile_id": profile.id,
                "profile_name": profile.name,
                "snippet": mention.snippet,
            }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClipwatchError::Analysis(format!("Analyzer unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(ClipwatchError::Analysis(format!(
                "Analyzer returned {}",
                resp.status()
            )));
        }
        resp.json::<Verdict>()
            .await
            .map_err(|e| ClipwatchError::Analysis(format!("Bad analyzer response: {e}")))
    }
}

/// Urgent-alert webhook. An empty URL means log-only delivery, so a fresh
/// install works without any alert endpoint configured.
pub struct WebhookAlertHandler {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookAlertHandler {
    pub fn new(config: &CollaboratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.alert_webhook_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl AlertHandler for WebhookAlertHandler {
    async fn handle(&self, mention: &Mention, profile: &Profile) -> Result<()> {
        if self.url.is_empty() {
            info!(
                "🚨 Urgent mention {} for profile '{}' (no alert webhook configured)",
                mention.id, profile.name
            );
            return Ok(());
        }

        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "mention_id": mention.id,
                "post_key": mention.post_key,
                "profile_id": profile.id,
                "profile_name": profile.name,
                "snippet": mention.snippet,
                "detected_at": mention.detected_at.to_rfc3339(),
            }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClipwatchError::Alert(format!("Alert webhook failed: {e}")))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ClipwatchError::Alert(format!(
                "Alert webhook returned {}",
                resp.status()
            )))
        }
    }
}

/// Event sink that logs every run event as one JSON line.
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn emit(&self, event: RunEvent) -> Result<()> {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "clipwatch::events", "{json}"),
            Err(e) => debug!("Unserializable run event: {e}"),
        }
        Ok(())
    }
}
