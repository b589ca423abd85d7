use thiserror::Error;
use url::Url;

/// Reasons a story link is not handed to the browser.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Check a link before passing it to `open::that`.
///
/// Story URLs come from the network, so anything that is not a plain
/// http(s) link with a host is refused: `file://`, `javascript:`, custom
/// protocol handlers and so on.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlValidationError::MissingHost),
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url_for_open("https://example.com/story").is_ok());
        assert!(validate_url_for_open("http://news.example.org").is_ok());
        assert!(validate_url_for_open("https://news.ycombinator.com/item?id=1").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_url_for_open("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_url_for_open("javascript:alert(1)").is_err());
        assert!(validate_url_for_open("ftp://example.com").is_err());
    }

    #[test]
    fn test_unparseable() {
        assert!(matches!(
            validate_url_for_open("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
