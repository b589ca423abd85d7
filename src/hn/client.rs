use crate::hn::types::{Category, ItemId, StoryItem, MAX_STORIES};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Public Firebase root of the Hacker News API.
pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB

/// Errors that can occur while fetching from the Hacker News API.
///
/// Every failure of a fetch ends up here, so callers never see a partially
/// decoded value.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not the expected JSON shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// The fetch task panicked before producing a result
    #[error("Fetch task panicked: {0}")]
    TaskPanicked(String),
}

/// The two fetch operations the state machine depends on.
///
/// Implementations must turn every failure into a [`FetchError`]. Returned
/// futures own everything they need so they can be spawned.
pub trait StorySource: Send + Sync + 'static {
    /// Ordered story identifiers for `category`, at most [`MAX_STORIES`].
    fn story_ids(&self, category: Category) -> BoxFuture<'static, Result<Vec<ItemId>, FetchError>>;

    /// One story record.
    fn story_item(&self, id: ItemId) -> BoxFuture<'static, Result<StoryItem, FetchError>>;
}

/// HTTP client for the Hacker News API.
///
/// Cheap to clone: the underlying `reqwest::Client` and base URL are shared.
#[derive(Clone)]
pub struct HnClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    timeout: Duration,
}

impl HnClient {
    /// Create a client rooted at `base_url` (e.g. [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hnskim/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, base_url, timeout))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the index for `category`, keeping the first [`MAX_STORIES`] ids.
    pub async fn fetch_story_ids(&self, category: Category) -> Result<Vec<ItemId>, FetchError> {
        let url = format!("{}/{}.json", self.base_url, category.endpoint());
        let mut ids: Vec<ItemId> = self.get_json(&url).await?;
        let total = ids.len();
        ids.truncate(MAX_STORIES);
        tracing::debug!(category = %category, total, kept = ids.len(), "Fetched story index");
        Ok(ids)
    }

    /// Fetch and decode a single story.
    pub async fn fetch_story_item(&self, id: ItemId) -> Result<StoryItem, FetchError> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let item: StoryItem = self.get_json(&url).await?;
        tracing::debug!(id, score = item.score, "Fetched story item");
        Ok(item)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.get_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Non-success response");
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }
}

impl StorySource for HnClient {
    fn story_ids(&self, category: Category) -> BoxFuture<'static, Result<Vec<ItemId>, FetchError>> {
        let client = self.clone();
        async move { client.fetch_story_ids(category).await }.boxed()
    }

    fn story_item(&self, id: ItemId) -> BoxFuture<'static, Result<StoryItem, FetchError>> {
        let client = self.clone();
        async move { client.fetch_story_item(id).await }.boxed()
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STORY_2: &str = r#"{"id":2,"title":"B","url":"https://example.com/b","score":10,"time":1700000000}"#;

    fn client_for(server: &MockServer) -> HnClient {
        HnClient::with_client(
            reqwest::Client::new(),
            &server.uri(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_fetch_story_ids_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/newstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[3,2,1]"))
            .mount(&mock_server)
            .await;

        let ids = client_for(&mock_server)
            .fetch_story_ids(Category::New)
            .await
            .unwrap();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_fetch_story_ids_truncates_in_order() {
        let mock_server = MockServer::start().await;
        let body = serde_json::to_string(&(100..130u64).collect::<Vec<_>>()).unwrap();
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let ids = client_for(&mock_server)
            .fetch_story_ids(Category::Top)
            .await
            .unwrap();
        assert_eq!(ids, (100..110u64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fetch_story_ids_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1) // No retry
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_story_ids(Category::Best).await;
        match result {
            Err(FetchError::HttpStatus(503)) => {}
            other => panic!("Expected HttpStatus(503), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_story_ids_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"not":"a list"}"#))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_story_ids(Category::Job).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_story_item_success_ignores_unknown_fields() {
        let mock_server = MockServer::start().await;
        let body = r#"{"id":2,"title":"B","score":10,"time":1700000000,"type":"story","kids":[1,2,3]}"#;
        Mock::given(method("GET"))
            .and(path("/item/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let item = client_for(&mock_server).fetch_story_item(2).await.unwrap();
        assert_eq!(item.id, 2);
        assert_eq!(item.title, "B");
        assert!(item.url.is_none());
    }

    #[tokio::test]
    async fn test_fetch_story_item_with_url() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STORY_2))
            .mount(&mock_server)
            .await;

        let item = client_for(&mock_server).fetch_story_item(2).await.unwrap();
        assert_eq!(item.url.as_deref(), Some("https://example.com/b"));
    }

    #[tokio::test]
    async fn test_fetch_story_item_missing_field_is_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item/5.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":5,"score":1,"time":1}"#))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_story_item(5).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_deleted_item_is_decode_error() {
        // The API answers `null` for items that no longer exist.
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item/6.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_story_item(6).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_story_item_404() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_story_item(1).await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[1]")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = HnClient::with_client(
            reqwest::Client::new(),
            &mock_server.uri(),
            Duration::from_millis(100),
        );
        let err = client.fetch_story_ids(Category::New).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(100)));
        assert_eq!(err.to_string(), "Request timed out after 100ms");
    }

    #[tokio::test]
    async fn test_response_too_large() {
        let mock_server = MockServer::start().await;
        let huge = format!("[{}1]", "1,".repeat(MAX_RESPONSE_SIZE / 2));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(huge))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_story_ids(Category::New).await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_story_source_impl_uses_same_endpoints() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/beststories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[2]"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STORY_2))
            .mount(&mock_server)
            .await;

        let source: Arc<dyn StorySource> = Arc::new(client_for(&mock_server));
        assert_eq!(source.story_ids(Category::Best).await.unwrap(), vec![2]);
        assert_eq!(source.story_item(2).await.unwrap().title, "B");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HnClient::with_client(
            reqwest::Client::new(),
            "https://example.com/v0/",
            Duration::from_secs(1),
        );
        assert_eq!(client.base_url(), "https://example.com/v0");
    }
}
