//! Hypothesis REST client and the traits the bridge consumes.

use crate::error::{AnnotationError, AnnotationResult};
use crate::model::{timestamp, Annotation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Annotation operations for one (token, group) pair.
#[async_trait]
pub trait AnnotationClient: Send + Sync {
    /// Fetch a single annotation by id.
    async fn annotation(&self, id: &str) -> AnnotationResult<Annotation>;

    /// Annotations in the group updated strictly after `after`, oldest first.
    async fn annotations_after(&self, after: DateTime<Utc>) -> AnnotationResult<Vec<Annotation>>;

    /// Post a group-visible reply and return the new annotation's id.
    ///
    /// `references` must be non-empty; its last entry is the parent.
    async fn reply(&self, text: &str, references: &[String], uri: &str)
        -> AnnotationResult<String>;
}

/// Hands out clients bound to a subscription's credentials.
pub trait AnnotationClientFactory: Send + Sync {
    fn client(&self, token: &str, group: &str) -> Arc<dyn AnnotationClient>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    rows: Vec<Annotation>,
}

/// Factory for [`HypothesisClient`]s sharing one HTTP connection pool.
#[derive(Clone)]
pub struct HypothesisClientFactory {
    http_client: reqwest::Client,
    api_url: String,
}

impl HypothesisClientFactory {
    /// Create a factory for the API rooted at `api_url`
    /// (e.g. `https://api.hypothes.is/api`).
    pub fn new(api_url: impl Into<String>) -> AnnotationResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// A concrete client, for callers that do not need the trait object.
    pub fn hypothesis_client(&self, token: &str, group: &str) -> HypothesisClient {
        HypothesisClient {
            http_client: self.http_client.clone(),
            api_url: self.api_url.clone(),
            token: token.to_string(),
            group: group.to_string(),
        }
    }
}

impl AnnotationClientFactory for HypothesisClientFactory {
    fn client(&self, token: &str, group: &str) -> Arc<dyn AnnotationClient> {
        Arc::new(self.hypothesis_client(token, group))
    }
}

impl std::fmt::Debug for HypothesisClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypothesisClientFactory")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Hypothesis REST API client for one group, authenticated by bearer token.
#[derive(Clone)]
pub struct HypothesisClient {
    http_client: reqwest::Client,
    api_url: String,
    token: String,
    group: String,
}

impl HypothesisClient {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// Turn a non-success response into `AnnotationError::Api`.
    async fn check_response(&self, response: reqwest::Response) -> AnnotationResult<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, group = %self.group, "Hypothesis request failed: {}", body);
            return Err(AnnotationError::Api {
                status,
                message: body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AnnotationClient for HypothesisClient {
    async fn annotation(&self, id: &str) -> AnnotationResult<Annotation> {
        debug!(annotation_id = id, "Fetching annotation");

        let response = self
            .http_client
            .get(self.endpoint(&format!("annotations/{}", id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AnnotationError::NotFound(id.to_string()));
        }
        let response = self.check_response(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn annotations_after(&self, after: DateTime<Utc>) -> AnnotationResult<Vec<Annotation>> {
        let search_after = timestamp::format(&after);
        debug!(group = %self.group, search_after = %search_after, "Searching annotations");

        let response = self
            .http_client
            .get(self.endpoint("search"))
            .bearer_auth(&self.token)
            .query(&[
                ("sort", "updated"),
                ("order", "asc"),
                ("group", self.group.as_str()),
                ("search_after", search_after.as_str()),
            ])
            .send()
            .await?;

        let response = self.check_response(response).await?;
        let body = response.text().await?;
        let search: SearchResponse = serde_json::from_str(&body)?;

        debug!(group = %self.group, count = search.rows.len(), "Search returned");
        Ok(search.rows)
    }

    async fn reply(
        &self,
        text: &str,
        references: &[String],
        uri: &str,
    ) -> AnnotationResult<String> {
        if references.is_empty() {
            return Err(AnnotationError::InvalidRequest(
                "a reply needs at least one reference".to_string(),
            ));
        }

        let body = Annotation::reply_template(text, self.group.as_str(), references.to_vec(), uri);
        debug!(
            group = %self.group,
            parent = references.last().map(String::as_str).unwrap_or_default(),
            "Posting annotation reply"
        );

        let response = self
            .http_client
            .post(self.endpoint("annotations"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let response = self.check_response(response).await?;
        let created: Annotation = serde_json::from_str(&response.text().await?)?;
        if created.id.is_empty() {
            return Err(AnnotationError::Api {
                status: 200,
                message: "created annotation has no id".to_string(),
            });
        }
        Ok(created.id)
    }
}

impl std::fmt::Debug for HypothesisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypothesisClient")
            .field("api_url", &self.api_url)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}
