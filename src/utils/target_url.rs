//! Target URL validation and normalization.

use url::Url;

/// Errors that can occur while accepting a target URL.
#[derive(Debug, thiserror::Error)]
pub enum TargetUrlError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

/// Parses `input` as an absolute http(s) URL and returns its canonical form.
///
/// The hostname is lowercased, the fragment and default ports are dropped.
/// Path and query are kept as given.
///
/// # Errors
///
/// Rejects relative URLs, other schemes (`javascript:`, `data:`, `file:`, ...)
/// and URLs without a host.
pub fn normalize_target_url(input: &str) -> Result<String, TargetUrlError> {
    let mut url = Url::parse(input.trim()).map_err(|e| TargetUrlError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TargetUrlError::UnsupportedProtocol);
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(TargetUrlError::MissingHost)?
        .to_ascii_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| TargetUrlError::NormalizationFailed(e.to_string()))?;

    url.set_fragment(None);

    if matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        url.set_port(None)
            .map_err(|_| TargetUrlError::NormalizationFailed("cannot drop port".to_string()))?;
    }

    Ok(url.to_string())
}
