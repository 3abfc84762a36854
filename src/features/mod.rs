pub mod entity_extractor;
pub mod link_analyzer;
pub mod sender_alignment;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed three-level scale; rule sets never add levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

/// Outcome discriminator shared by all rule-set results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Done,
    Weak,
    #[default]
    Empty,
    Error,
}

/// Rule-specific evidence attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetail {
    None,
    Text { value: String },
    DisplayName { display_name: String, from_domain: String },
    DomainMismatch { domain: String, from_domain: String },
    Lookalike { value: String, matched: Vec<char> },
    Url { url: String, domain: String },
    Keyword { keyword: String },
    Attachment { filename: String },
    ArchiveEntries { filename: String, entries: Vec<String> },
    ContentType { filename: String, content_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub issue: String,
    pub severity: Severity,
    pub detail: FindingDetail,
}

impl Finding {
    pub fn new(issue: impl Into<String>, severity: Severity, detail: FindingDetail) -> Self {
        Self {
            issue: issue.into(),
            severity,
            detail,
        }
    }

    pub fn high(issue: impl Into<String>, detail: FindingDetail) -> Self {
        Self::new(issue, Severity::High, detail)
    }

    pub fn medium(issue: impl Into<String>, detail: FindingDetail) -> Self {
        Self::new(issue, Severity::Medium, detail)
    }

    pub fn low(issue: impl Into<String>, detail: FindingDetail) -> Self {
        Self::new(issue, Severity::Low, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::High.to_string(), "high");
    }

    #[test]
    fn test_finding_serializes_issue_severity_detail() {
        let finding = Finding::medium(
            "Shortened URL detected",
            FindingDetail::Url {
                url: "http://bit.ly/x".to_string(),
                domain: "bit.ly".to_string(),
            },
        );
        let value = serde_json::to_value(&finding).unwrap();

        assert_eq!(value["issue"], "Shortened URL detected");
        assert_eq!(value["severity"], "medium");
        assert_eq!(value["detail"]["kind"], "url");
        assert_eq!(value["detail"]["domain"], "bit.ly");
    }
}
