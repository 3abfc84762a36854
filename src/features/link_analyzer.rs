use super::entity_extractor::EntityExtractor;
use super::{Finding, FindingDetail, Status};
use crate::components::{AnalysisComponent, ComponentOutput};
use crate::config_loader::RulesConfig;
use crate::media_analyzer::MediaAnalyzer;
use crate::message::BodyText;
use crate::normalization::HomoglyphTable;
use crate::url_resolver::{UrlResolver, UrlTarget};
use crate::ParsedMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyAnalysis {
    pub status: Status,
    pub urls: Vec<String>,
    pub anchors: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    /// Links to images, audio, video and archives; reported, never flagged on their own
    pub media_urls: Vec<String>,
    pub actionable_urls: Vec<String>,
    pub keywords: Vec<String>,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentOutput for BodyAnalysis {
    fn status(&self) -> Status {
        self.status
    }

    fn failed(error: String) -> Self {
        Self {
            status: Status::Error,
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Body rule set: shorteners, IP literals, lookalike domains and words, keywords.
pub struct LinkAnalyzer {
    extractor: EntityExtractor,
    url_resolver: UrlResolver,
    media: MediaAnalyzer,
    homoglyphs: HomoglyphTable,
    keywords: Vec<String>,
    check_words: bool,
}

impl LinkAnalyzer {
    pub fn new(config: &RulesConfig) -> anyhow::Result<Self> {
        Ok(Self {
            extractor: EntityExtractor::new()?,
            url_resolver: UrlResolver::new(&config.shortener_domains)?,
            media: MediaAnalyzer::new(&config.media_extensions),
            homoglyphs: HomoglyphTable::new(&config.homoglyphs),
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            check_words: config.check_body_words,
        })
    }

    pub fn analyze_body(&self, body: &BodyText) -> BodyAnalysis {
        if body.text.trim().is_empty() {
            log::debug!("Empty body, skipping body rules");
            return BodyAnalysis {
                status: Status::Empty,
                ..Default::default()
            };
        }

        let entities = self.extractor.extract(&body.text, &body.html);
        let mut findings = Vec::new();
        let mut media_urls = Vec::new();
        let mut actionable_urls = Vec::new();

        let targets: BTreeSet<&String> = entities.urls.iter().chain(&entities.anchors).collect();
        for url in targets {
            let Some(target) = self.url_resolver.normalize(url) else {
                continue;
            };
            self.check_target(&target, &mut findings);

            if self.media.is_media_url(url) {
                media_urls.push(url.clone());
            } else {
                actionable_urls.push(url.clone());
            }
        }

        if self.check_words {
            self.check_words(&body.text, &mut findings);
        }

        let keywords = self.check_keywords(&body.text, &mut findings);

        log::debug!(
            "Body analysis: {} targets, {} findings",
            media_urls.len() + actionable_urls.len(),
            findings.len()
        );

        BodyAnalysis {
            status: Status::Done,
            urls: entities.urls.into_iter().collect(),
            anchors: entities.anchors.into_iter().collect(),
            emails: entities.emails.into_iter().collect(),
            phones: entities.phones.into_iter().collect(),
            media_urls,
            actionable_urls,
            keywords,
            findings,
            error: None,
        }
    }

    fn check_target(&self, target: &UrlTarget, findings: &mut Vec<Finding>) {
        let url_detail = || FindingDetail::Url {
            url: target.url.clone(),
            domain: target.domain.clone(),
        };

        if self.url_resolver.is_shortener(&target.domain) {
            findings.push(Finding::medium("Shortened URL detected", url_detail()));
        }

        if self.url_resolver.is_ip_literal(&target.domain) {
            findings.push(Finding::high("IP address URL detected", url_detail()));
            // Digits in an address are not lookalikes
            return;
        }

        let matched = self.homoglyphs.matches(&target.raw_host);
        if !matched.is_empty() {
            findings.push(Finding::high(
                "Lookalike / Unicode characters in URL domain",
                FindingDetail::Lookalike {
                    value: target.raw_host.clone(),
                    matched,
                },
            ));
        }

        if UrlResolver::is_punycode(&target.domain) {
            findings.push(Finding::medium("Punycode domain detected", url_detail()));
        }
    }

    fn check_words(&self, text: &str, findings: &mut Vec<Finding>) {
        let mut seen = BTreeSet::new();
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if word.is_empty() || seen.contains(word) {
                continue;
            }
            let matched = self.homoglyphs.word_matches(word);
            if !matched.is_empty() {
                seen.insert(word);
                findings.push(Finding::medium(
                    "Lookalike / Unicode characters in body text",
                    FindingDetail::Lookalike {
                        value: word.to_string(),
                        matched,
                    },
                ));
            }
        }
    }

    fn check_keywords(&self, text: &str, findings: &mut Vec<Finding>) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut hits = Vec::new();
        for keyword in &self.keywords {
            if lower.contains(keyword.as_str()) && !hits.contains(keyword) {
                hits.push(keyword.clone());
                findings.push(Finding::medium(
                    format!("Keyword match: '{}'", keyword),
                    FindingDetail::Keyword {
                        keyword: keyword.clone(),
                    },
                ));
            }
        }
        hits
    }
}

impl AnalysisComponent for LinkAnalyzer {
    type Output = BodyAnalysis;

    fn analyze(&self, message: &ParsedMessage) -> anyhow::Result<BodyAnalysis> {
        Ok(self.analyze_body(&message.body.resolve()))
    }

    fn name(&self) -> &str {
        "body"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Severity;

    fn analyzer_with(keywords: &[&str]) -> LinkAnalyzer {
        let config = RulesConfig {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        };
        LinkAnalyzer::new(&config).unwrap()
    }

    fn text(body: &str) -> BodyText {
        BodyText {
            text: body.to_string(),
            html: String::new(),
        }
    }

    #[test]
    fn test_whitespace_body_is_empty() {
        let analysis = analyzer_with(&["urgent"]).analyze_body(&text("  \n\t "));

        assert_eq!(analysis.status, Status::Empty);
        assert!(analysis.findings.is_empty());
        assert!(analysis.urls.is_empty());
        assert!(analysis.anchors.is_empty());
        assert!(analysis.emails.is_empty());
        assert!(analysis.phones.is_empty());
    }

    #[test]
    fn test_shortened_url() {
        let analysis = analyzer_with(&[]).analyze_body(&text("Track it: http://bit.ly/xyz123"));

        assert_eq!(analysis.status, Status::Done);
        assert_eq!(analysis.findings.len(), 1);
        let finding = &analysis.findings[0];
        assert_eq!(finding.issue, "Shortened URL detected");
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(
            finding.detail,
            FindingDetail::Url {
                url: "http://bit.ly/xyz123".to_string(),
                domain: "bit.ly".to_string(),
            }
        );
    }

    #[test]
    fn test_ip_literal_url() {
        let analysis = analyzer_with(&[]).analyze_body(&text("Login at http://10.0.0.1/secure now"));

        assert_eq!(analysis.findings.len(), 1);
        assert_eq!(analysis.findings[0].issue, "IP address URL detected");
        assert_eq!(analysis.findings[0].severity, Severity::High);
    }

    #[test]
    fn test_unicode_domain_in_anchor() {
        let body = BodyText {
            text: "Verify your account".to_string(),
            html: "<a href=\"https://pаypal.com/verify\">Verify</a>".to_string(),
        };
        let analysis = analyzer_with(&[]).analyze_body(&body);

        let issues: Vec<&str> = analysis.findings.iter().map(|f| f.issue.as_str()).collect();
        assert_eq!(
            issues,
            vec![
                "Lookalike / Unicode characters in URL domain",
                "Punycode domain detected",
            ]
        );
        assert_eq!(analysis.anchors, vec!["https://pаypal.com/verify".to_string()]);
    }

    #[test]
    fn test_lookalike_word_in_text() {
        let analysis = analyzer_with(&[]).analyze_body(&text("Your Pаypal account, Pаypal team!"));

        assert_eq!(analysis.findings.len(), 1);
        assert_eq!(analysis.findings[0].severity, Severity::Medium);
        assert_eq!(
            analysis.findings[0].detail,
            FindingDetail::Lookalike {
                value: "Pаypal".to_string(),
                matched: vec!['а'],
            }
        );
    }

    #[test]
    fn test_word_check_can_be_disabled() {
        let config = RulesConfig {
            check_body_words: false,
            ..Default::default()
        };
        let analysis = LinkAnalyzer::new(&config)
            .unwrap()
            .analyze_body(&text("Your Pаypal account"));
        assert!(analysis.findings.is_empty());
    }

    #[test]
    fn test_keyword_matches_once_per_keyword() {
        let analysis = analyzer_with(&["verify your account", "urgent", "wire transfer"])
            .analyze_body(&text("URGENT: Verify your account. This is urgent."));

        assert_eq!(
            analysis.keywords,
            vec!["verify your account".to_string(), "urgent".to_string()]
        );
        let issues: Vec<&str> = analysis.findings.iter().map(|f| f.issue.as_str()).collect();
        assert_eq!(
            issues,
            vec!["Keyword match: 'verify your account'", "Keyword match: 'urgent'"]
        );
    }

    #[test]
    fn test_media_urls_reported_separately() {
        let analysis = analyzer_with(&[]).analyze_body(&text(
            "Logo https://cdn.example.com/logo.png and https://example.com/account",
        ));

        assert_eq!(
            analysis.media_urls,
            vec!["https://cdn.example.com/logo.png".to_string()]
        );
        assert_eq!(
            analysis.actionable_urls,
            vec!["https://example.com/account".to_string()]
        );
        assert!(analysis.findings.is_empty());
    }

    #[test]
    fn test_www_url_with_redirect_query() {
        let analysis = analyzer_with(&[])
            .analyze_body(&text("Go to www.bit.ly/abc?next=https://example.com now"));

        assert_eq!(
            analysis.actionable_urls,
            vec!["www.bit.ly/abc?next=https://example.com".to_string()]
        );
        assert_eq!(analysis.findings.len(), 1);
        assert_eq!(analysis.findings[0].issue, "Shortened URL detected");
        assert_eq!(analysis.findings[0].severity, Severity::Medium);
        assert_eq!(
            analysis.findings[0].detail,
            FindingDetail::Url {
                url: "www.bit.ly/abc?next=https://example.com".to_string(),
                domain: "www.bit.ly".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_url_skipped() {
        let analysis = analyzer_with(&[]).analyze_body(&text("Broken link http://example.com:99999/reset here"));
        assert_eq!(analysis.status, Status::Done);
        assert!(analysis.findings.is_empty());
        assert!(analysis.actionable_urls.is_empty());
    }
}
