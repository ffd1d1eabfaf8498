use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme `{0}`, expected http or https")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{url} responded with status {status}")]
    Status {
        url: Url,
        status: reqwest::StatusCode,
    },
    #[error("response body exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
}

/// Parses the URL a caller asked to relay. Only absolute `http` and `https` URLs are accepted,
/// so nothing else ever reaches the network.
pub fn target_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FetchError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Whether a `Content-Type` value announces a markup document.
pub fn is_markup(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    matches!(
        essence.as_str(),
        "text/html" | "application/xhtml+xml" | "application/xml" | "text/xml"
    )
}

/// The `charset` parameter of a `Content-Type` value, without quotes.
pub fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;

        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}
