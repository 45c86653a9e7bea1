//! REST client for the Xornet backend.
//!
//! Every call carries the stored token as `Authorization`, or the
//! literal `unset` when logged out. Non-2xx responses surface as
//! [`ApiError::Status`] with the parsed JSON body.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use xornet_core::{EntityFetcher, EntityId, FetchError};

use crate::error::ApiError;
use crate::token::TokenHolder;

/// Sent as `Authorization` when no token is stored.
pub const UNSET_TOKEN: &str = "unset";

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<dyn TokenHolder>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        token: Arc<dyn TokenHolder>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// JSON request. `body` is omitted from the wire when `None`.
    pub async fn request<T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut builder = self
            .prepare(method.clone(), endpoint)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        debug!("{} {}", method, endpoint);
        read_response(builder.send().await?).await
    }

    pub async fn get<T>(&self, endpoint: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, endpoint, None).await
    }

    /// Serialize `body` and send it with `method`.
    pub async fn send<B, T>(&self, method: Method, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        self.request(method, endpoint, Some(&body)).await
    }

    /// Multipart upload; the content type comes from the form boundary.
    pub async fn request_multipart<T>(
        &self,
        method: Method,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        debug!("{} {} (multipart)", method, endpoint);
        let builder = self.prepare(method, endpoint).multipart(form);
        read_response(builder.send().await?).await
    }

    fn prepare(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let authorization = self.token.get().unwrap_or_else(|| UNSET_TOKEN.to_string());
        self.http
            .request(method, format!("{}{}", self.base_url, endpoint))
            .header(AUTHORIZATION, authorization)
    }
}

async fn read_response<T>(response: Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        warn!("Request failed with {}: {}", status, body);
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    // Some endpoints answer 2xx with no body.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(ApiError::Decode);
    }
    serde_json::from_slice(&bytes).map_err(ApiError::Decode)
}

/// Loads one entity by `GET <prefix>/<id>`.
pub struct RestFetcher<T> {
    api: Arc<ApiClient>,
    prefix: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RestFetcher<T> {
    pub fn new(api: Arc<ApiClient>, prefix: impl Into<String>) -> Self {
        RestFetcher {
            api,
            prefix: prefix.into().trim_end_matches('/').to_string(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T> EntityFetcher<T> for RestFetcher<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch(&self, id: &EntityId) -> Result<T, FetchError> {
        let endpoint = format!("{}/{}", self.prefix, id);
        Ok(self.api.get(&endpoint).await?)
    }
}
