//! Finding aggregator
//!
//! Runs the header, body and attachment rule sets side by side and merges
//! their results into one report. A rule set that errors or panics is
//! reported with `status = error` and the other two are kept.

use crate::attachment_analyzer::{AttachmentAnalysis, AttachmentAnalyzer};
use crate::components::{AnalysisComponent, ComponentOutput};
use crate::config_loader::RulesConfig;
use crate::features::link_analyzer::{BodyAnalysis, LinkAnalyzer};
use crate::features::sender_alignment::{HeaderAnalysis, SenderAlignmentAnalyzer};
use crate::features::{Finding, Severity};
use crate::normalization::HomoglyphTable;
use crate::ParsedMessage;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::thread;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub headers: HeaderAnalysis,
    pub body: BodyAnalysis,
    pub attachments: AttachmentAnalysis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl AnalysisReport {
    /// Every finding, headers first, then body, then attachments.
    pub fn all_findings(&self) -> Vec<&Finding> {
        self.headers
            .findings
            .iter()
            .chain(&self.body.findings)
            .chain(&self.attachments.findings)
            .collect()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.all_findings().iter().map(|f| f.severity).max()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for finding in self.all_findings() {
            match finding.severity {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }
}

/// The three rule sets, built once from the loaded rule tables.
pub struct PhishingEngine {
    headers: SenderAlignmentAnalyzer,
    body: LinkAnalyzer,
    attachments: AttachmentAnalyzer,
}

impl PhishingEngine {
    pub fn new(config: &RulesConfig) -> anyhow::Result<Self> {
        Ok(Self {
            headers: SenderAlignmentAnalyzer::new(HomoglyphTable::new(&config.homoglyphs))?,
            body: LinkAnalyzer::new(config)?,
            attachments: AttachmentAnalyzer::new(config),
        })
    }

    pub fn analyze(&self, message: &ParsedMessage) -> AnalysisReport {
        run_rule_sets(&self.headers, &self.body, &self.attachments, message)
    }
}

/// Run three independent rule sets in parallel and assemble a report.
pub fn run_rule_sets<H, B, A>(
    headers: &H,
    body: &B,
    attachments: &A,
    message: &ParsedMessage,
) -> AnalysisReport
where
    H: AnalysisComponent<Output = HeaderAnalysis>,
    B: AnalysisComponent<Output = BodyAnalysis>,
    A: AnalysisComponent<Output = AttachmentAnalysis>,
{
    let report = thread::scope(|scope| {
        let headers_handle = scope.spawn(|| run_component(headers, message));
        let body_handle = scope.spawn(|| run_component(body, message));
        let attachments_handle = scope.spawn(|| run_component(attachments, message));

        AnalysisReport {
            headers: join_component(headers.name(), headers_handle.join()),
            body: join_component(body.name(), body_handle.join()),
            attachments: join_component(attachments.name(), attachments_handle.join()),
        }
    });

    let counts = report.severity_counts();
    log::info!(
        "Analysis complete: {} high, {} medium, {} low (headers={:?}, body={:?}, attachments={:?})",
        counts.high,
        counts.medium,
        counts.low,
        report.headers.status,
        report.body.status,
        report.attachments.status
    );
    report
}

fn run_component<C: AnalysisComponent>(component: &C, message: &ParsedMessage) -> C::Output {
    match component.analyze(message) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("Rule set '{}' failed: {:#}", component.name(), e);
            C::Output::failed(format!("{:#}", e))
        }
    }
}

fn join_component<T: ComponentOutput>(name: &str, joined: thread::Result<T>) -> T {
    joined.unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        log::warn!("Rule set '{}' panicked: {}", name, reason);
        T::failed(format!("rule set panicked: {}", reason))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
