/// Address parsing and domain hierarchy utilities
pub struct DomainUtils;

/// An address split into its display name and mailbox parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub display_name: Option<String>,
    pub address: String,
}

impl DomainUtils {
    /// Split `"Name" <user@domain>` / `user@domain (Comment)` / `<user@domain>`.
    pub fn parse_address(value: &str) -> ParsedAddress {
        let value = value.trim();

        if let Some(open) = value.rfind('<') {
            if let Some(close_rel) = value[open..].find('>') {
                let address = value[open + 1..open + close_rel].trim().to_string();
                let name = value[..open].trim().trim_matches('"').trim();
                return ParsedAddress {
                    display_name: (!name.is_empty()).then(|| name.to_string()),
                    address,
                };
            }
        }

        // Bare address, optionally followed by a parenthesised comment
        let (address, comment) = match (value.find('('), value.rfind(')')) {
            (Some(open), Some(close)) if open < close => {
                (value[..open].trim(), Some(value[open + 1..close].trim()))
            }
            _ => (value, None),
        };

        ParsedAddress {
            display_name: comment.filter(|c| !c.is_empty()).map(str::to_string),
            address: address.to_string(),
        }
    }

    /// Extract the lowercase domain of an address-bearing header value
    pub fn extract_domain(value: &str) -> Option<String> {
        let parsed = Self::parse_address(value);
        Self::domain_of_address(&parsed.address)
    }

    /// Domain part of a bare mailbox, `None` when there is no usable `@domain`
    pub fn domain_of_address(address: &str) -> Option<String> {
        let (_, domain) = address.rsplit_once('@')?;
        let domain = domain
            .trim()
            .trim_end_matches('>')
            .trim_end_matches('.')
            .to_lowercase();

        if domain.is_empty() || domain.chars().any(|c| c.is_whitespace() || c == '@') {
            return None;
        }
        Some(domain)
    }

    /// Domain portion of a Message-ID such as `<abc.123@mail.example.com>`
    pub fn message_id_domain(message_id: &str) -> Option<String> {
        let (_, domain) = message_id.rsplit_once('@')?;
        let domain = domain.trim().trim_end_matches('>').trim().to_lowercase();
        (!domain.is_empty()).then_some(domain)
    }

    /// `domain` equals `base` or is one of its subdomains.
    ///
    /// This is the only alignment predicate in the crate; every identity and
    /// authentication comparison goes through it.
    pub fn is_related(domain: &str, base: &str) -> bool {
        let domain = domain.to_lowercase();
        let base = base.to_lowercase();
        domain == base || domain.ends_with(&format!(".{}", base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            DomainUtils::extract_domain("user@Example.COM"),
            Some("example.com".to_string())
        );
        assert_eq!(
            DomainUtils::extract_domain("\"PayPal Support\" <support@paypaI.com>"),
            Some("paypai.com".to_string())
        );
        assert_eq!(
            DomainUtils::extract_domain("<bounce@mailer.example.net>"),
            Some("mailer.example.net".to_string())
        );
        assert_eq!(
            DomainUtils::extract_domain("bob@example.org (Bob Smith)"),
            Some("example.org".to_string())
        );
        assert_eq!(DomainUtils::extract_domain("invalid"), None);
        assert_eq!(DomainUtils::extract_domain("user@"), None);
        assert_eq!(DomainUtils::extract_domain(""), None);
        assert_eq!(DomainUtils::extract_domain("<>"), None);
    }

    #[test]
    fn test_parse_display_name() {
        let parsed = DomainUtils::parse_address("\"Bank of Example\" <alerts@bank.example>");
        assert_eq!(parsed.display_name.as_deref(), Some("Bank of Example"));
        assert_eq!(parsed.address, "alerts@bank.example");

        let bare = DomainUtils::parse_address("alerts@bank.example");
        assert_eq!(bare.display_name, None);
        assert_eq!(bare.address, "alerts@bank.example");

        let unquoted = DomainUtils::parse_address("Support Team <help@example.com>");
        assert_eq!(unquoted.display_name.as_deref(), Some("Support Team"));
    }

    #[test]
    fn test_is_related() {
        assert!(DomainUtils::is_related("example.com", "example.com"));
        assert!(DomainUtils::is_related("mail.example.com", "example.com"));
        assert!(!DomainUtils::is_related("example.com.evil.net", "example.com"));
        assert!(!DomainUtils::is_related("notexample.com", "example.com"));
        assert!(!DomainUtils::is_related("example.com", "mail.example.com"));
    }

    #[test]
    fn test_message_id_domain() {
        assert_eq!(
            DomainUtils::message_id_domain("<CAF123.456@mail.gmail.com>"),
            Some("mail.gmail.com".to_string())
        );
        assert_eq!(DomainUtils::message_id_domain("<no-at-sign>"), None);
    }
}
