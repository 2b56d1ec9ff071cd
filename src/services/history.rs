//! Activity History
//!
//! Backfills the event log from the producer's recorded activities when a
//! case is selected, so a monitor attached mid-run starts from the same
//! picture as one attached from the beginning.

use std::time::Duration;

use async_trait::async_trait;
use case_review_core::ActivityEvent;
use serde::Deserialize;
use serde_json::Value;

use crate::models::settings::MonitorConfig;
use crate::utils::error::{AppError, AppResult};

/// Response body of `GET /api/cases/{case_id}/activities`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityHistory {
    pub case_id: String,
    #[serde(default)]
    pub activities: Vec<Value>,
    #[serde(default)]
    pub total: usize,
}

/// Source of previously emitted events for a case.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch(&self, case_id: &str) -> AppResult<Vec<ActivityEvent>>;
}

/// Keep well-formed entries for `case_id`, in the order the producer listed
/// them. Malformed entries are dropped.
pub fn parse_activities(history: ActivityHistory) -> Vec<ActivityEvent> {
    let case_id = history.case_id;
    let mut dropped = 0usize;
    let events: Vec<ActivityEvent> = history
        .activities
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<ActivityEvent>(entry) {
            Ok(event) if event.case_id == case_id && !event.action.trim().is_empty() => Some(event),
            _ => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        tracing::warn!(
            "[History] Dropped {} malformed activities for case {}",
            dropped,
            case_id
        );
    }
    if history.total > events.len() + dropped {
        tracing::debug!(
            "[History] Producer reported {} activities for case {}, received {}",
            history.total,
            case_id,
            events.len() + dropped
        );
    }
    events
}

/// HTTP client for the producer's activity history endpoint.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> AppResult<Self> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.history_timeout_secs),
        )
    }

    pub fn activities_url(&self, case_id: &str) -> String {
        format!(
            "{}/api/cases/{}/activities",
            self.base_url.trim_end_matches('/'),
            case_id
        )
    }
}

#[async_trait]
impl HistorySource for HistoryClient {
    async fn fetch(&self, case_id: &str) -> AppResult<Vec<ActivityEvent>> {
        let url = self.activities_url(case_id);
        tracing::debug!("[History] GET {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("activities for case {}", case_id)));
        }
        let history: ActivityHistory = response.error_for_status()?.json().await?;
        let events = parse_activities(history);

        tracing::info!(
            "[History] Loaded {} activities for case {}",
            events.len(),
            case_id
        );
        Ok(events)
    }
}

/// Fixed history, for hosts without a case API.
#[derive(Debug, Clone, Default)]
pub struct StaticHistory {
    events: Vec<ActivityEvent>,
}

impl StaticHistory {
    pub fn new(events: Vec<ActivityEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl HistorySource for StaticHistory {
    async fn fetch(&self, case_id: &str) -> AppResult<Vec<ActivityEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|event| event.case_id == case_id)
            .cloned()
            .collect())
    }
}
