use std::{convert::Infallible, sync::Arc};

use anyhow::Context;
use axum::{async_trait, debug_handler};
use axum::{
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use scorched::{logf, LogData, LogImportance};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::rewriting::rewriter::Rewriter;
use crate::state::APIState;

#[derive(Deserialize)]
pub struct FetchRequest {
    pub url: Option<String>,
}

/// The request body, read as a form when the caller says so and as JSON otherwise.
///
/// Bodies that fail to parse, including a `url` that is not a string, yield `None` so that the
/// handler reports them the same way as a missing URL.
pub struct FetchPayload(pub Option<FetchRequest>);

#[async_trait]
impl<S> FromRequest<S> for FetchPayload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        let request = if is_form {
            Form::<FetchRequest>::from_request(req, state)
                .await
                .ok()
                .map(|Form(request)| request)
        } else {
            Json::<FetchRequest>::from_request(req, state)
                .await
                .ok()
                .map(|Json(request)| request)
        };

        Ok(Self(request))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub success: bool,
    pub content: String,
    pub title: String,
    pub original_url: String,
}

/// Fetches the requested page and returns it with its visible text rewritten.
///
/// A missing or unreadable body counts as a missing URL, so the caller always gets the same
/// validation message, and nothing is fetched.
#[debug_handler]
pub async fn post_fetch(
    State(state): State<Arc<APIState>>,
    FetchPayload(request): FetchPayload,
) -> Result<Json<FetchResponse>> {
    let url = match request.and_then(|FetchRequest { url }| url) {
        Some(url) if !url.trim().is_empty() => url,
        _ => return Err(AppError::BadRequest("URL is required")),
    };

    match relay(&state, &url).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            logf!(Error, "Error fetching {}: {:#}", url, e);
            Err(e.context("Failed to fetch content").into())
        }
    }
}

async fn relay(state: &APIState, url: &str) -> anyhow::Result<FetchResponse> {
    let document = state.fetcher.fetch(url).await?;

    let rewritten = state
        .html_rewriter
        .rewrite(document.body.as_bytes())
        .with_context(|| format!("failed to rewrite {}", document.url))?;

    Ok(FetchResponse {
        success: true,
        content: rewritten.content,
        title: rewritten.title,
        original_url: url.to_string(),
    })
}
