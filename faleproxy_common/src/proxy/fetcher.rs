use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use futures_util::StreamExt;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use scorched::{logf, LogData, LogImportance};
use url::Url;

use crate::state::Config;

use super::util::{charset, is_markup, target_url, FetchError};

/// A document retrieved from a remote origin.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Where the body came from, after any redirects
    pub url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

/// Retrieves remote documents. Cloning is cheap; the underlying client shares its connection
/// pool between clones.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();

        if let Some(proxy) = &config.outbound_proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        let client = builder
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .zstd(true)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Issues a single GET for `url` and reads the whole body, up to the configured limit.
    ///
    /// Anything other than a 2xx response is an error. The body is decoded with the charset the
    /// `Content-Type` names, falling back to UTF-8, with invalid sequences replaced.
    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let url = target_url(url)?;

        let res = self.client.get(url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: res.url().clone(),
                status,
            });
        }

        if res
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_body_bytes,
            });
        }

        let url = res.url().clone();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let mut body = Vec::new();
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;

            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }

            body.extend_from_slice(&chunk);
        }

        let encoding = content_type
            .as_deref()
            .and_then(charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);

        // A byte order mark wins over the declared charset
        let (text, used, had_errors) = encoding.decode(&body);
        if had_errors {
            logf!(
                Info,
                "Body of {} is not valid {}, replacing invalid sequences",
                url,
                used.name()
            );
        }
        let body = text.into_owned();

        if let Some(content_type) = content_type.as_deref().filter(|ct| !is_markup(ct)) {
            logf!(
                Info,
                "Fetched {} as {}, rewriting it as markup anyway",
                url,
                content_type
            );
        }

        logf!(Info, "Fetched {} ({}, {} bytes)", url, status, body.len());

        Ok(FetchedDocument {
            url,
            status,
            content_type,
            body,
        })
    }
}
