/// Bookmark API over HTTP
///
/// Endpoints:
/// 1. List: `GET /bookmarks` → array of `{ itemId, itemType, title, posterPath }`
/// 2. Create: `POST /bookmark` with the same body → `{ message }`
/// 3. Delete: `DELETE /bookmarks/{itemId}` → `{ message }`
///
/// Every failure carries a `{ message }` body, which is what classification keys on.
use std::time::Duration;

use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, Url};

use crate::{
    config::Config,
    error::{AppError, AppResult, StoreError},
    models::{BookmarkKey, BookmarkPayload, BookmarkRecord, MessageBody},
    services::store::RemoteBookmarkStore,
};

/// Message used when a failed response has no usable `{ message }` body
const GENERIC_FAILURE: &str = "Something went wrong!";

#[derive(Clone)]
pub struct HttpBookmarkStore {
    http_client: HttpClient,
    api_url: Url,
    auth_token: Option<String>,
}

impl HttpBookmarkStore {
    /// Creates a store client; `timeout` bounds every request at the transport level
    pub fn new(api_url: String, auth_token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let parsed = Url::parse(&api_url)
            .map_err(|e| AppError::InvalidInput(format!("bookmark API URL {}: {}", api_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(AppError::InvalidInput(format!(
                "bookmark API URL {} cannot have a path",
                api_url
            )));
        }

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: parsed,
            auth_token,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.api_url.clone(),
            config.auth_token.clone(),
            config.request_timeout(),
        )
    }

    /// API URL with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // Only fails for cannot-be-a-base URLs, which `new` rejects
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let request = self.http_client.request(method, self.endpoint(segments));

        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Passes successful responses through and classifies the rest by their `{ message }` body
    async fn ensure_success(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        tracing::warn!(
            status = %status,
            body = %body,
            "Bookmark API request failed"
        );

        let message = serde_json::from_str::<MessageBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());

        Err(StoreError::from_response(status.as_u16(), message))
    }

    /// Message of a successful mutation; an empty or non-JSON body yields an empty message
    async fn read_message(response: Response) -> Result<String, StoreError> {
        let body = Self::ensure_success(response).await?.text().await?;

        Ok(serde_json::from_str::<MessageBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl RemoteBookmarkStore for HttpBookmarkStore {
    async fn list(&self) -> Result<Vec<BookmarkRecord>, StoreError> {
        let response = self.request(Method::GET, &["bookmarks"]).send().await?;
        let body = Self::ensure_success(response).await?.text().await?;

        let payloads: Vec<BookmarkPayload> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Malformed(format!("bookmark list: {}", e)))?;

        let records = payloads
            .into_iter()
            .map(BookmarkRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Malformed)?;

        tracing::debug!(count = records.len(), "Fetched bookmarks");

        Ok(records)
    }

    async fn create(&self, record: &BookmarkRecord) -> Result<String, StoreError> {
        let response = self
            .request(Method::POST, &["bookmark"])
            .json(&BookmarkPayload::from(record))
            .send()
            .await?;

        Self::read_message(response).await
    }

    async fn delete(&self, key: &BookmarkKey) -> Result<String, StoreError> {
        let response = self
            .request(Method::DELETE, &["bookmarks", key.item_id()])
            .send()
            .await?;

        Self::read_message(response).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
