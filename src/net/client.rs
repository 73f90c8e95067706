use std::sync::Arc;

use crate::cookies::PersistentCookieJar;
use crate::net::Response;

/// Thin wrapper around `reqwest::Client` with an optional persistent cookie
/// jar.
///
/// Every request/response cycle reads cookies before sending and writes
/// cookies received in `Set-Cookie` headers back into the jar; that plumbing
/// lives in `reqwest`, this type only supplies the jar. A client built with
/// [`Client::new`] has no jar and simply skips cookie injection.
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    /// Creates a client without cookie persistence.
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Creates a client that reads and writes cookies through `jar`.
    pub fn with_cookie_jar(jar: Arc<PersistentCookieJar>) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().cookie_provider(jar).build()?;
        Ok(Self { inner })
    }

    pub async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.execute(self.inner.get(url), headers, None).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.execute(self.inner.post(url), headers, Some(body)).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.execute(self.inner.put(url), headers, Some(body)).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.execute(self.inner.patch(url), headers, Some(body)).await
    }

    pub async fn delete(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.execute(self.inner.delete(url), headers, None).await
    }

    async fn execute(
        &self,
        mut request: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<Response, reqwest::Error> {
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let res = request.send().await?;

        let final_url = res.url().clone();
        let status = res.status().as_u16();
        let status_text = res
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();
        let headers = res.headers().clone();

        // Note: does not deal with streaming
        let body = res.bytes().await?.to_vec();

        Ok(Response {
            url: final_url,
            status,
            status_text,
            headers,
            body,
        })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
