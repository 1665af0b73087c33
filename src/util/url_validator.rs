use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The endpoint is plain HTTP on a non-local host.
    #[error("Insecure endpoint: HTTPS required (except localhost for testing)")]
    InsecureEndpoint,
}

/// Validates a media reference URL before it is stored on an article.
///
/// Media references end up as `src` attributes in rendered markup, so only
/// absolute `http`/`https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use gazette::util::validate_media_url;
///
/// assert!(validate_media_url("https://cdn.example.com/a.png").is_ok());
/// assert!(validate_media_url("javascript:alert(1)").is_err());
/// assert!(validate_media_url("/relative/path.png").is_err());
/// ```
pub fn validate_media_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Validates an outbound service endpoint (the mailer).
///
/// HTTPS is required so credentials are never sent in the clear. Plain HTTP
/// is allowed only for `localhost`/`127.0.0.1`, which is what mock servers bind to.
pub fn validate_endpoint(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = validate_media_url(url_str)?;

    if url.scheme() == "http" {
        let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
        if !is_localhost {
            return Err(UrlValidationError::InsecureEndpoint);
        }
        tracing::warn!(endpoint = %url, "Using non-HTTPS endpoint (localhost only)");
    }

    Ok(url)
}
