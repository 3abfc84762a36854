use super::{Finding, FindingDetail, Status};
use crate::components::authentication_analyzer::{
    AuthenticationAnalyzer, AuthenticationResults, Mechanism,
};
use crate::components::{AnalysisComponent, ComponentOutput};
use crate::domain_utils::DomainUtils;
use crate::message::HeaderValue;
use crate::normalization::HomoglyphTable;
use crate::ParsedMessage;
use serde::{Deserialize, Serialize};

/// Address-bearing headers compared against the From domain
const IDENTITY_HEADERS: [&str; 3] = ["Return-Path", "Reply-To", "Sender"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderAnalysis {
    pub status: Status,
    pub from_domain: Option<String>,
    pub auth: AuthenticationResults,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentOutput for HeaderAnalysis {
    fn status(&self) -> Status {
        self.status
    }

    fn failed(error: String) -> Self {
        Self {
            status: Status::Error,
            from_domain: None,
            auth: AuthenticationResults::default(),
            findings: Vec::new(),
            error: Some(error),
        }
    }
}

/// Header rule set: sender identity alignment, spoofing and auth consistency.
pub struct SenderAlignmentAnalyzer {
    homoglyphs: HomoglyphTable,
    auth: AuthenticationAnalyzer,
}

impl SenderAlignmentAnalyzer {
    pub fn new(homoglyphs: HomoglyphTable) -> anyhow::Result<Self> {
        Ok(Self {
            homoglyphs,
            auth: AuthenticationAnalyzer::new()?,
        })
    }

    pub fn analyze_headers(&self, message: &ParsedMessage) -> HeaderAnalysis {
        let mut findings = Vec::new();

        let from_header = message.header("From");
        let from_raw = from_header
            .as_ref()
            .and_then(HeaderValue::first)
            .unwrap_or_default();
        let Some(from_domain) = DomainUtils::extract_domain(from_raw) else {
            log::info!("No resolvable From domain, skipping header rules");
            findings.push(Finding::high(
                "Missing or invalid From header",
                FindingDetail::None,
            ));
            return HeaderAnalysis {
                status: Status::Weak,
                from_domain: None,
                auth: AuthenticationResults::default(),
                findings,
                error: None,
            };
        };

        self.check_display_name(from_raw, &from_domain, &mut findings);

        if let Some(from) = from_header.as_ref().filter(|h| h.occurrences() > 1) {
            findings.push(Finding::high(
                "Multiple From headers detected",
                FindingDetail::Text {
                    value: from.values().join(", "),
                },
            ));
        }

        self.check_identity_alignment(message, &from_domain, &mut findings);
        self.check_lookalikes(message, from_raw, &mut findings);

        let auth = self
            .auth
            .analyze_authentication(message.header_str("Authentication-Results"));
        self.check_auth_alignment(&auth, &from_domain, &mut findings);

        if !message.has_header("Message-ID") {
            findings.push(Finding::medium(
                "Missing Message-ID header",
                FindingDetail::None,
            ));
        }

        if findings.is_empty() {
            log::debug!("Header analysis clean for {}", from_domain);
        } else {
            log::debug!(
                "{} header anomalies for {}",
                findings.len(),
                from_domain
            );
        }

        HeaderAnalysis {
            status: Status::Done,
            from_domain: Some(from_domain),
            auth,
            findings,
            error: None,
        }
    }

    /// Plain substring test of the From domain against the display name.
    fn check_display_name(&self, from_raw: &str, from_domain: &str, findings: &mut Vec<Finding>) {
        let Some(display_name) = DomainUtils::parse_address(from_raw).display_name else {
            return;
        };
        if !display_name.to_lowercase().contains(from_domain) {
            findings.push(Finding::medium(
                "Display-name spoofing suspected",
                FindingDetail::DisplayName {
                    display_name,
                    from_domain: from_domain.to_string(),
                },
            ));
        }
    }

    fn check_identity_alignment(
        &self,
        message: &ParsedMessage,
        from_domain: &str,
        findings: &mut Vec<Finding>,
    ) {
        let mut identities: Vec<(&str, Option<String>)> = IDENTITY_HEADERS
            .iter()
            .map(|&name| {
                let domain = message
                    .header_str(name)
                    .and_then(DomainUtils::extract_domain);
                (name, domain)
            })
            .collect();
        identities.push((
            "Message-ID",
            message
                .header_str("Message-ID")
                .and_then(DomainUtils::message_id_domain),
        ));

        for (source, domain) in identities {
            let Some(domain) = domain else { continue };
            if !DomainUtils::is_related(&domain, from_domain) {
                findings.push(Finding::high(
                    format!("{} domain mismatch", source),
                    FindingDetail::DomainMismatch {
                        domain,
                        from_domain: from_domain.to_string(),
                    },
                ));
            }
        }
    }

    /// Message-ID is checked on its domain part only; the local part is random.
    fn check_lookalikes(&self, message: &ParsedMessage, from_raw: &str, findings: &mut Vec<Finding>) {
        let mut values: Vec<(&str, String)> = vec![("From", from_raw.to_string())];
        for name in IDENTITY_HEADERS {
            if let Some(value) = message.header_str(name) {
                values.push((name, value.to_string()));
            }
        }
        if let Some(domain) = message
            .header_str("Message-ID")
            .and_then(DomainUtils::message_id_domain)
        {
            values.push(("Message-ID", domain));
        }

        for (source, value) in values {
            let matched = self.homoglyphs.matches(&value);
            if !matched.is_empty() {
                findings.push(Finding::high(
                    format!("Lookalike / Unicode characters in {}", source),
                    FindingDetail::Lookalike { value, matched },
                ));
            }
        }
    }

    fn check_auth_alignment(
        &self,
        auth: &AuthenticationResults,
        from_domain: &str,
        findings: &mut Vec<Finding>,
    ) {
        for mechanism in [Mechanism::Spf, Mechanism::Dkim] {
            let Some(verdict) = auth.get(mechanism) else { continue };
            let Some(domain) = verdict.asserted_domain.as_deref() else { continue };
            if verdict.result.is_pass() && !DomainUtils::is_related(domain, from_domain) {
                findings.push(Finding::high(
                    format!("{} passed but misaligned", mechanism),
                    FindingDetail::DomainMismatch {
                        domain: domain.to_string(),
                        from_domain: from_domain.to_string(),
                    },
                ));
            }
        }

        if let Some(dmarc) = auth.dmarc.as_ref().filter(|v| !v.result.is_pass()) {
            findings.push(Finding::medium(
                format!("DMARC {}", dmarc.result.as_str()),
                FindingDetail::None,
            ));
        }

        if let Some(arc) = auth.arc.as_ref().filter(|v| !v.result.is_pass()) {
            findings.push(Finding::low(
                format!("ARC chain issue ({})", arc.result.as_str()),
                FindingDetail::None,
            ));
        }
    }
}

impl AnalysisComponent for SenderAlignmentAnalyzer {
    type Output = HeaderAnalysis;

    fn analyze(&self, message: &ParsedMessage) -> anyhow::Result<HeaderAnalysis> {
        Ok(self.analyze_headers(message))
    }

    fn name(&self) -> &str {
        "headers"
    }
}
