use std::fmt::Debug;

use async_trait::async_trait;
use futures::future::{AbortRegistration, Abortable, Aborted};
use reqwest::{Client, Url, header::ACCEPT};
use serde_json::Value;

use crate::{error::FetchError, schema::Schema};

/// Performs a single GET and decodes the body as JSON.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get_json(&self, url: Url) -> Result<Value, FetchError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        let path = url.path().to_owned();

        let res = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        // Status codes are not special-cased: an error body fails decoding or validation.
        if !status.is_success() {
            log::debug!("{path} answered {status}: {}", truncate_body(&body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Issues one request and validates the decoded body as `T`.
///
/// The request stops as soon as the handle paired with `abort` is aborted, in which case the
/// result is [`FetchError::Cancelled`].
pub async fn fetch_validated<T: Schema>(
    transport: &dyn Transport,
    url: Url,
    abort: AbortRegistration,
) -> Result<T, FetchError> {
    let request = async move {
        let body = transport.get_json(url).await?;
        Ok::<T, FetchError>(T::parse(&body)?)
    };

    match Abortable::new(request, abort).await {
        Ok(result) => result,
        Err(Aborted) => Err(FetchError::Cancelled),
    }
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}
