use regex::Regex;
use std::collections::BTreeSet;

/// Deduplicated entities pulled out of a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub urls: BTreeSet<String>,
    pub anchors: BTreeSet<String>,
    pub emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
}

/// Best-effort lexical scanner for URLs, anchor targets, addresses and phone numbers.
pub struct EntityExtractor {
    url_regex: Regex,
    link_regex: Regex,
    email_regex: Regex,
    phone_regex: Regex,
}

impl EntityExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            url_regex: Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s"'<>()\[\]]+"#)?,
            link_regex: Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#)?,
            email_regex: Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}")?,
            // International `+CC area local`, or `(NNN) NNN NNNN` style; fixed
            // group widths so trailing digit runs are not absorbed
            phone_regex: Regex::new(
                r"(?:\+\d{1,3}[\s-]?\d{2,4}[\s-]?\d{3,4}[\s-]?\d{3,4}|(?:\(\d{3}\)|\b\d{3})[\s-]?\d{3}[\s-]?\d{4})\b",
            )?,
        })
    }

    pub fn extract(&self, text: &str, html: &str) -> ExtractedEntities {
        let mut entities = ExtractedEntities::default();

        for m in self.url_regex.find_iter(text) {
            let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
            if !url.is_empty() {
                entities.urls.insert(url.to_string());
            }
        }

        let markup = if html.is_empty() { text } else { html };
        for cap in self.link_regex.captures_iter(markup) {
            if let Some(href) = cap.get(1) {
                let href = Self::decode_entities(href.as_str().trim());
                if !href.is_empty() {
                    entities.anchors.insert(href);
                }
            }
        }

        for m in self.email_regex.find_iter(text) {
            entities.emails.insert(m.as_str().to_string());
        }

        for m in self.phone_regex.find_iter(text) {
            let candidate = m.as_str().trim();
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            if (7..=15).contains(&digits) {
                entities.phones.insert(candidate.to_string());
            }
        }

        log::debug!(
            "Extracted {} urls, {} anchors, {} emails, {} phones",
            entities.urls.len(),
            entities.anchors.len(),
            entities.emails.len(),
            entities.phones.len()
        );
        entities
    }

    fn decode_entities(value: &str) -> String {
        // Ampersand last, so `&amp;#47;` stays the literal text `&#47;`
        let entities = [
            ("&quot;", "\""),
            ("&#46;", "."),
            ("&#47;", "/"),
            ("&#58;", ":"),
            ("&#38;", "&"),
            ("&amp;", "&"),
        ];

        let mut result = value.to_string();
        for (entity, replacement) in &entities {
            result = result.replace(entity, replacement);
        }
        result
    }
}
