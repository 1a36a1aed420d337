use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::api::OpinionApi;
use crate::error::ApiError;
use crate::types::{
  ContractStatus, Opinion, ProcessStatus, Submission, WorkflowRequest, WorkflowStarted,
};

/// [`OpinionApi`] over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpOpinionApi {
  client: Client,
  base: Url,
}

impl HttpOpinionApi {
  /// Create a client for the backend at `base_url`.
  pub fn new(base_url: &str) -> Result<Self, ApiError> {
    Self::with_client(Client::new(), base_url)
  }

  /// Create a client that reuses an existing `reqwest` client.
  pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
    // Without a trailing slash `Url::join` would replace the last segment.
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };

    let base = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl {
      url: base_url.to_string(),
      message: e.to_string(),
    })?;

    if base.cannot_be_a_base() {
      return Err(ApiError::InvalidUrl {
        url: base_url.to_string(),
        message: "url cannot be used as a base".to_string(),
      });
    }

    Ok(Self { client, base })
  }

  /// The normalized base URL.
  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self.base.join(path).map_err(|e| ApiError::InvalidUrl {
      url: format!("{}{}", self.base, path),
      message: e.to_string(),
    })
  }

  async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
    let response = request
      .header(CONTENT_TYPE, "application/json")
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    debug!(status = status.as_u16(), bytes = body.len(), "backend response");

    if !status.is_success() {
      return Err(rejection(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
      message: e.to_string(),
    })
  }
}

/// Build the error for a non-2xx response, preferring the backend's own
/// `detail` message.
pub(crate) fn rejection(status: u16, body: &str) -> ApiError {
  let detail = serde_json::from_str::<serde_json::Value>(body)
    .ok()
    .and_then(|value| {
      value
        .get("detail")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
    })
    .filter(|detail| !detail.trim().is_empty());

  ApiError::Rejected {
    status,
    message: detail.unwrap_or_else(|| format!("服务端错误 ({})", status)),
  }
}

#[async_trait]
impl OpinionApi for HttpOpinionApi {
  async fn submit_opinion(&self, topic_id: u64, content: &str) -> Result<Submission, ApiError> {
    let url = self.endpoint(&format!("topics/{}/opinions", topic_id))?;
    debug!(%url, "submitting opinion");

    let body = serde_json::json!({ "content": content });
    self.send(self.client.post(url).json(&body)).await
  }

  async fn start_workflow(&self, request: &WorkflowRequest) -> Result<WorkflowStarted, ApiError> {
    let url = self.endpoint("workflow/opinions/")?;
    debug!(%url, topic_id = request.topic_id, action = %request.action, "starting workflow");

    self.send(self.client.post(url).json(request)).await
  }

  async fn process_status(&self, task_id: &str) -> Result<ProcessStatus, ApiError> {
    let mut url = self.endpoint("workflow/status/")?;
    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidUrl {
        url: self.base.to_string(),
        message: "url cannot be used as a base".to_string(),
      })?
      .pop_if_empty()
      .push(task_id);

    self.send(self.client.get(url)).await
  }

  async fn opinions_by_topic(&self, topic_id: u64) -> Result<Vec<Opinion>, ApiError> {
    let url = self.endpoint(&format!("topics/{}/opinions", topic_id))?;
    self.send(self.client.get(url)).await
  }

  async fn contract_status(&self) -> Result<ContractStatus, ApiError> {
    let url = self.endpoint("contract/status")?;
    self.send(self.client.get(url)).await
  }
}
