use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;

use super::error::FetchError;

/// Read access to the catalog API.
pub trait ProductApi: Send + Sync {
  /// GET `{base}/{segments...}` and decode the body as JSON.
  fn get_json(
    &self,
    segments: Vec<String>,
  ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Catalog API client over HTTP
#[derive(Clone, Debug)]
pub struct FakeStoreClient {
  client: Client,
  base_url: Url,
}

impl FakeStoreClient {
  pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(FetchError::InvalidUrl(config.base_url.clone()));
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self { client, base_url })
  }

  /// Build the URL for a path below the base, percent-encoding each segment.
  pub fn endpoint(&self, segments: &[String]) -> Result<Url, FetchError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }
}

impl ProductApi for FakeStoreClient {
  async fn get_json(&self, segments: Vec<String>) -> Result<Value, FetchError> {
    let url = self.endpoint(&segments)?;
    debug!(%url, "GET");

    let response = self.client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        status: status.as_u16(),
      });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
  }
}
