//! # REST backend client
//!
//! [`ForumApi`] is the seam between the views and the forum backend. The production
//! implementation, [`HttpForumApi`], speaks JSON over HTTP with `reqwest`; tests swap in
//! an in-memory double.
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | [`ForumApi::list_topics`] | GET | `api/topic` |
//! | [`ForumApi::get_topic`] | GET | `api/topic/{id}` |
//! | [`ForumApi::post_message`] | POST | `api/message/` |
//! | [`ForumApi::update_message`] | PATCH | `api/message/{id}` |
//! | [`ForumApi::delete_message`] | DELETE | `api/message/{id}` |
//! | [`ForumApi::list_users`] | GET | `api/user` |
//! | [`ForumApi::create_user`] | POST | `api/user` |
//! | [`ForumApi::login`] | POST | `login` |
//! | [`ForumApi::update_user`] | PATCH | `api/user/{id}` |
//! | [`ForumApi::delete_user`] | DELETE | `api/user/{id}` |

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::models::{Message, Topic, User, UserUpdate};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("{0} has no id yet")]
    MissingId(&'static str),

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

impl ApiError {
    /// True for 404 responses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status(404))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations the forum backend exposes.
///
/// Futures are `Send` so calls can run inside spawned tasks (polling, debounced checks).
pub trait ForumApi: Send + Sync + 'static {
    fn list_topics(&self) -> impl Future<Output = ApiResult<Vec<Topic>>> + Send;

    fn get_topic(&self, id: i64) -> impl Future<Output = ApiResult<Topic>> + Send;

    fn post_message(&self, message: &Message) -> impl Future<Output = ApiResult<Message>> + Send;

    fn update_message(&self, message: &Message) -> impl Future<Output = ApiResult<Message>> + Send;

    fn delete_message(&self, id: i64) -> impl Future<Output = ApiResult<()>> + Send;

    fn list_users(&self) -> impl Future<Output = ApiResult<Vec<User>>> + Send;

    fn create_user(&self, user: &User) -> impl Future<Output = ApiResult<User>> + Send;

    fn login(&self, credentials: &User) -> impl Future<Output = ApiResult<User>> + Send;

    fn update_user(&self, id: i64, update: &UserUpdate) -> impl Future<Output = ApiResult<User>> + Send;

    fn delete_user(&self, id: i64) -> impl Future<Output = ApiResult<()>> + Send;
}

/// `reqwest`-backed [`ForumApi`].
#[derive(Debug, Clone)]
pub struct HttpForumApi {
    base: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpForumApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let mut raw = config.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| ApiError::Url(format!("{}: {}", raw, e)))?;
        Ok(Self {
            base,
            timeout: config.timeout(),
            client: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Url(format!("{}: {}", path, e)))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<reqwest::Response> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} {} returned {}", method, url, status);
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// Bound a whole exchange, body included, by the configured timeout.
    async fn within<T>(&self, exchange: impl Future<Output = ApiResult<T>>) -> ApiResult<T> {
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))?
    }

    async fn fetch_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.within(async {
            let response = self.send(method, path, body).await?;
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        })
        .await
    }

    async fn fetch_empty(&self, method: Method, path: &str) -> ApiResult<()> {
        self.within(async {
            let response = self.send::<()>(method, path, None).await?;
            // Some backends answer DELETE with 200 and a body; anything 2xx counts.
            if response.status() != StatusCode::NO_CONTENT {
                let _ = response.bytes().await;
            }
            Ok(())
        })
        .await
    }
}

impl ForumApi for HttpForumApi {
    async fn list_topics(&self) -> ApiResult<Vec<Topic>> {
        self.fetch_json::<_, ()>(Method::GET, "api/topic", None).await
    }

    async fn get_topic(&self, id: i64) -> ApiResult<Topic> {
        self.fetch_json::<_, ()>(Method::GET, &format!("api/topic/{}", id), None)
            .await
    }

    async fn post_message(&self, message: &Message) -> ApiResult<Message> {
        self.fetch_json(Method::POST, "api/message/", Some(message)).await
    }

    async fn update_message(&self, message: &Message) -> ApiResult<Message> {
        let id = message.id.ok_or(ApiError::MissingId("message"))?;
        self.fetch_json(Method::PATCH, &format!("api/message/{}", id), Some(message))
            .await
    }

    async fn delete_message(&self, id: i64) -> ApiResult<()> {
        self.fetch_empty(Method::DELETE, &format!("api/message/{}", id))
            .await
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.fetch_json::<_, ()>(Method::GET, "api/user", None).await
    }

    async fn create_user(&self, user: &User) -> ApiResult<User> {
        self.fetch_json(Method::POST, "api/user", Some(user)).await
    }

    async fn login(&self, credentials: &User) -> ApiResult<User> {
        self.fetch_json(Method::POST, "login", Some(credentials)).await
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> ApiResult<User> {
        self.fetch_json(Method::PATCH, &format!("api/user/{}", id), Some(update))
            .await
    }

    async fn delete_user(&self, id: i64) -> ApiResult<()> {
        self.fetch_empty(Method::DELETE, &format!("api/user/{}", id))
            .await
    }
}
