use regex::Regex;
use url::Url;

/// A URL reduced to the host the rules care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTarget {
    pub url: String,
    /// Lowercased host as the `url` crate sees it (IDNA applied)
    pub domain: String,
    /// Lowercased host exactly as written, before IDNA
    pub raw_host: String,
}

/// Offline URL classification: domain normalization, shorteners, IP literals.
pub struct UrlResolver {
    shorteners: Vec<String>,
    ipv4_regex: Regex,
    scheme_regex: Regex,
}

const NON_NETWORK_PREFIXES: [&str; 6] = ["mailto:", "tel:", "javascript:", "data:", "#", "/"];

impl UrlResolver {
    pub fn new(shorteners: &[String]) -> anyhow::Result<Self> {
        Ok(Self {
            shorteners: shorteners.iter().map(|s| s.to_lowercase()).collect(),
            ipv4_regex: Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$")?,
            scheme_regex: Regex::new(r"^[a-z][a-z0-9+.-]*://")?,
        })
    }

    /// Normalize a URL or `www.` token to its host; `None` when malformed
    pub fn normalize(&self, url: &str) -> Option<UrlTarget> {
        let trimmed = url.trim();
        let lower = trimmed.to_lowercase();

        if trimmed.is_empty() || NON_NETWORK_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return None;
        }

        // A `://` later in the token (query strings, redirects) is not a scheme
        let candidate = if self.scheme_regex.is_match(&lower) {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let parsed = match Url::parse(&candidate) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("Skipping malformed URL {}: {}", url, e);
                return None;
            }
        };
        let domain = parsed.host_str()?.trim_end_matches('.').to_lowercase();
        if domain.is_empty() {
            return None;
        }

        Some(UrlTarget {
            url: trimmed.to_string(),
            raw_host: Self::raw_host(&candidate).unwrap_or_else(|| domain.clone()),
            domain,
        })
    }

    /// Host component as written: authority minus userinfo and port.
    fn raw_host(candidate: &str) -> Option<String> {
        let (_, rest) = candidate.split_once("://")?;
        let authority = rest.split(['/', '?', '#']).next()?;
        let host_port = authority.rsplit('@').next()?;
        let host = if host_port.starts_with('[') {
            host_port
        } else {
            host_port.split(':').next()?
        };
        let host = host.trim_end_matches('.').to_lowercase();
        (!host.is_empty()).then_some(host)
    }

    /// Exact denylist membership of a normalized domain. A leading `www.`
    /// label names the same service and is ignored.
    pub fn is_shortener(&self, domain: &str) -> bool {
        let host = domain.strip_prefix("www.").unwrap_or(domain);
        self.shorteners.iter().any(|s| s == host)
    }

    pub fn is_ip_literal(&self, domain: &str) -> bool {
        self.ipv4_regex.is_match(domain)
    }

    pub fn is_punycode(domain: &str) -> bool {
        domain.split('.').any(|label| label.starts_with("xn--"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_loader::RulesConfig;

    fn resolver() -> UrlResolver {
        UrlResolver::new(&RulesConfig::default().shortener_domains).unwrap()
    }

    #[test]
    fn test_is_shortener() {
        let resolver = resolver();

        assert!(resolver.is_shortener("bit.ly"));
        assert!(resolver.is_shortener("tinyurl.com"));
        assert!(resolver.is_shortener("t.co"));
        assert!(!resolver.is_shortener("google.com"));
        // Exact membership only
        assert!(!resolver.is_shortener("notbit.ly"));
        assert!(resolver.is_shortener("www.bit.ly"));
        assert!(!resolver.is_shortener("x.bit.ly"));
    }

    #[test]
    fn test_normalize_domain() {
        let resolver = resolver();

        let target = resolver.normalize("https://Example.com/path").unwrap();
        assert_eq!(target.domain, "example.com");

        let target = resolver.normalize("www.Example.org/login").unwrap();
        assert_eq!(target.domain, "www.example.org");

        let target = resolver.normalize("http://bit.ly/xyz123").unwrap();
        assert_eq!(target.domain, "bit.ly");

        assert!(resolver.normalize("mailto:someone@example.com").is_none());
        assert!(resolver.normalize("#top").is_none());
        assert!(resolver.normalize("http://").is_none());
    }

    #[test]
    fn test_embedded_url_in_query_is_not_a_scheme() {
        let resolver = resolver();

        let target = resolver
            .normalize("www.bit.ly/abc?next=https://example.com")
            .unwrap();
        assert_eq!(target.domain, "www.bit.ly");
        assert_eq!(target.raw_host, "www.bit.ly");
        assert!(resolver.is_shortener(&target.domain));

        let target = resolver
            .normalize("HTTPS://Login.Example.com/?r=http://evil.example")
            .unwrap();
        assert_eq!(target.domain, "login.example.com");
    }

    #[test]
    fn test_userinfo_does_not_hide_host() {
        let resolver = resolver();
        let target = resolver
            .normalize("http://paypal.com@evil.example/login")
            .unwrap();
        assert_eq!(target.domain, "evil.example");
        assert_eq!(target.raw_host, "evil.example");
    }

    #[test]
    fn test_raw_host_keeps_unicode() {
        let resolver = resolver();
        let target = resolver.normalize("http://pаypal.com/").unwrap();
        assert!(UrlResolver::is_punycode(&target.domain));
        assert_eq!(target.raw_host, "pаypal.com");
    }

    #[test]
    fn test_ip_literal() {
        let resolver = resolver();
        let target = resolver.normalize("http://192.168.10.5:8080/a").unwrap();
        assert_eq!(target.domain, "192.168.10.5");
        assert!(resolver.is_ip_literal(&target.domain));
        assert!(!resolver.is_ip_literal("example.com"));
    }
}
