//! Source URL validation shared by the API and the client.

use url::Url;

use crate::error::{ModelError, ModelResult};

/// Domains accepted when `ALLOWED_DOMAINS` is not configured.
pub const DEFAULT_ALLOWED_DOMAINS: [&str; 3] = ["youtube.com", "youtu.be", "tiktok.com"];

/// Ensure the URL has an http(s) scheme and a host on an allowed domain.
///
/// A host matches a domain when it equals it or is a subdomain of it.
pub fn validate_url<S: AsRef<str>>(url: &str, allowed_domains: &[S]) -> ModelResult<()> {
    let parsed = Url::parse(url.trim()).map_err(|e| ModelError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ModelError::InvalidScheme);
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let allowed = allowed_domains.iter().any(|d| {
        let d = d.as_ref().to_lowercase();
        host == d || host.ends_with(&format!(".{}", d))
    });

    if allowed {
        Ok(())
    } else {
        Err(ModelError::DomainNotAllowed(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc", &DEFAULT_ALLOWED_DOMAINS).is_ok());
        assert!(validate_url("https://youtu.be/abc", &DEFAULT_ALLOWED_DOMAINS).is_ok());
        assert_eq!(
            validate_url("ftp://example.com/video", &DEFAULT_ALLOWED_DOMAINS),
            Err(ModelError::InvalidScheme)
        );
        assert!(matches!(
            validate_url("https://example.com/video", &DEFAULT_ALLOWED_DOMAINS),
            Err(ModelError::DomainNotAllowed(_))
        ));
        assert!(matches!(
            validate_url("not a url", &DEFAULT_ALLOWED_DOMAINS),
            Err(ModelError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_lookalike_domains_are_rejected() {
        assert!(validate_url("https://notyoutube.com/watch", &DEFAULT_ALLOWED_DOMAINS).is_err());
        assert!(validate_url("https://m.tiktok.com/@user/video/1", &DEFAULT_ALLOWED_DOMAINS).is_ok());
    }

    #[test]
    fn test_custom_domain_list() {
        let domains = vec!["x".to_string()];
        assert!(validate_url("https://x/video", &domains).is_ok());
    }
}
