//! Authentication-Results Interpreter
//!
//! Reads the verdicts an upstream MTA already recorded. No DNS lookups and no
//! signature checks happen here: a forged annotation is taken at face value.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mechanism {
    #[serde(rename = "SPF")]
    Spf,
    #[serde(rename = "DKIM")]
    Dkim,
    #[serde(rename = "DMARC")]
    Dmarc,
    #[serde(rename = "ARC")]
    Arc,
}

impl Mechanism {
    pub const ALL: [Mechanism; 4] = [
        Mechanism::Spf,
        Mechanism::Dkim,
        Mechanism::Dmarc,
        Mechanism::Arc,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Mechanism::Spf => "spf",
            Mechanism::Dkim => "dkim",
            Mechanism::Dmarc => "dmarc",
            Mechanism::Arc => "arc",
        }
    }

    fn carries_domain(&self) -> bool {
        matches!(self, Mechanism::Spf | Mechanism::Dkim)
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key().to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AuthResult {
    Pass,
    Fail,
    None,
    Other(String),
}

impl AuthResult {
    fn from_token(token: &str) -> Self {
        match token {
            "pass" => AuthResult::Pass,
            "fail" => AuthResult::Fail,
            "none" => AuthResult::None,
            other => AuthResult::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthResult::Pass => "pass",
            AuthResult::Fail => "fail",
            AuthResult::None => "none",
            AuthResult::Other(token) => token,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, AuthResult::Pass)
    }
}

impl From<String> for AuthResult {
    fn from(token: String) -> Self {
        AuthResult::from_token(&token.to_lowercase())
    }
}

impl From<AuthResult> for String {
    fn from(result: AuthResult) -> Self {
        result.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthVerdict {
    pub mechanism: Mechanism,
    pub result: AuthResult,
    pub asserted_domain: Option<String>,
}

/// Verdict per mechanism; `None` when the header or key is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResults {
    #[serde(rename = "SPF")]
    pub spf: Option<AuthVerdict>,
    #[serde(rename = "DKIM")]
    pub dkim: Option<AuthVerdict>,
    #[serde(rename = "DMARC")]
    pub dmarc: Option<AuthVerdict>,
    #[serde(rename = "ARC")]
    pub arc: Option<AuthVerdict>,
}

impl AuthenticationResults {
    pub fn get(&self, mechanism: Mechanism) -> Option<&AuthVerdict> {
        match mechanism {
            Mechanism::Spf => self.spf.as_ref(),
            Mechanism::Dkim => self.dkim.as_ref(),
            Mechanism::Dmarc => self.dmarc.as_ref(),
            Mechanism::Arc => self.arc.as_ref(),
        }
    }

    fn set(&mut self, verdict: AuthVerdict) {
        match verdict.mechanism {
            Mechanism::Spf => self.spf = Some(verdict),
            Mechanism::Dkim => self.dkim = Some(verdict),
            Mechanism::Dmarc => self.dmarc = Some(verdict),
            Mechanism::Arc => self.arc = Some(verdict),
        }
    }
}

struct MechanismPattern {
    mechanism: Mechanism,
    result: Regex,
}

pub struct AuthenticationAnalyzer {
    patterns: Vec<MechanismPattern>,
    header_i_regex: Regex,
    bare_at_regex: Regex,
}

impl AuthenticationAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let mut patterns = Vec::new();
        for mechanism in Mechanism::ALL {
            // Word boundary keeps `arc=` from matching inside `dmarc=`
            patterns.push(MechanismPattern {
                mechanism,
                result: Regex::new(&format!(r"(?i)\b{}=([a-z]+)", mechanism.key()))?,
            });
        }

        Ok(Self {
            patterns,
            header_i_regex: Regex::new(r"(?i)header\.i=@([a-z0-9.-]+)")?,
            bare_at_regex: Regex::new(r"(?i)@([a-z0-9.-]+)")?,
        })
    }

    /// Parse an `Authentication-Results` value; the first clause per mechanism wins.
    pub fn analyze_authentication(&self, header: Option<&str>) -> AuthenticationResults {
        let mut results = AuthenticationResults::default();
        let Some(header) = header else {
            return results;
        };

        for pattern in &self.patterns {
            let Some(caps) = pattern.result.captures(header) else {
                continue;
            };
            let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let asserted_domain = if pattern.mechanism.carries_domain() {
                let clause_end = header[whole.end()..]
                    .find(';')
                    .map(|i| whole.end() + i)
                    .unwrap_or(header.len());
                self.clause_domain(&header[whole.start()..clause_end])
            } else {
                None
            };

            let verdict = AuthVerdict {
                mechanism: pattern.mechanism,
                result: AuthResult::from_token(&token.as_str().to_lowercase()),
                asserted_domain,
            };
            log::debug!(
                "{} verdict: {} (domain: {:?})",
                verdict.mechanism,
                verdict.result.as_str(),
                verdict.asserted_domain
            );
            results.set(verdict);
        }

        results
    }

    fn clause_domain(&self, clause: &str) -> Option<String> {
        let caps = self
            .header_i_regex
            .captures(clause)
            .or_else(|| self.bare_at_regex.captures(clause))?;
        let domain = caps.get(1)?.as_str().trim_end_matches('.').to_lowercase();
        (!domain.is_empty()).then_some(domain)
    }
}
