use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// Header the National Rail data portal expects its session token in.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Wraps `inner`, sending `key` in the `header_name` header.
    ///
    /// # Errors
    ///
    /// Fails if the name or value are not valid in an HTTP header.
    pub fn new(inner: C, header_name: &str, key: &str) -> anyhow::Result<Self> {
        let mut key = HeaderValue::from_str(key)?;
        key.set_sensitive(true);
        Ok(Self {
            inner,
            header_name: HeaderName::from_bytes(header_name.as_bytes())?,
            key,
        })
    }

    /// Uses the portal's `X-Auth-Token` header.
    pub fn auth_token(inner: C, token: &str) -> anyhow::Result<Self> {
        Self::new(inner, AUTH_TOKEN_HEADER, token)
    }

    fn apply(&self, req: &mut reqwest::Request) {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.apply(&mut req);
        self.inner.execute(req).await
    }
}
