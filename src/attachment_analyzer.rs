use crate::components::{AnalysisComponent, ComponentOutput};
use crate::config_loader::RulesConfig;
use crate::features::{Finding, FindingDetail, Status};
use crate::media_analyzer::MediaAnalyzer;
use crate::message::Attachment;
use crate::ParsedMessage;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

const PDF_MIME: &str = "application/pdf";

/// Hex digests over the full payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHashes {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
}

impl ContentHashes {
    pub fn compute(payload: &[u8]) -> Self {
        Self {
            md5: format!("{:x}", Md5::digest(payload)),
            sha1: format!("{:x}", Sha1::digest(payload)),
            sha256: format!("{:x}", Sha256::digest(payload)),
            sha512: format!("{:x}", Sha512::digest(payload)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSize {
    pub bytes: usize,
    pub display: String,
}

impl AttachmentSize {
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes,
            display: format_bytes(bytes),
        }
    }
}

fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{} bytes", bytes)
    } else if size < MB {
        format!("{:.2} KB", size / KB)
    } else {
        format!("{:.2} MB", size / MB)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentReport {
    pub filename: Option<String>,
    pub content_type: String,
    pub size: AttachmentSize,
    pub hashes: ContentHashes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_entries: Option<Vec<String>>,
    pub findings: Vec<Finding>,
}

impl AttachmentReport {
    /// Issue names in the order the rules fired
    pub fn issues(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.issue.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentAnalysis {
    pub status: Status,
    pub attachments: Vec<AttachmentReport>,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentOutput for AttachmentAnalysis {
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

fn lowercase(items: &[String]) -> Vec<String> {
    items.iter().map(|i| i.to_lowercase()).collect()
}

/// Attachment rule set. Every rule runs for every named attachment and findings accumulate.
pub struct AttachmentAnalyzer {
    high_risk_extensions: Vec<String>,
    double_extension_risky: Vec<String>,
    archive_extensions: Vec<String>,
    office_extensions: Vec<String>,
    media: MediaAnalyzer,
}

impl AttachmentAnalyzer {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            high_risk_extensions: lowercase(&config.high_risk_extensions),
            double_extension_risky: config
                .double_extension_risky
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            archive_extensions: lowercase(&config.archive_extensions),
            office_extensions: lowercase(&config.office_extensions),
            media: MediaAnalyzer::new(&config.media_extensions),
        }
    }

    pub fn analyze_attachments(&self, attachments: &[Attachment]) -> AttachmentAnalysis {
        if attachments.is_empty() {
            return AttachmentAnalysis {
                status: Status::Empty,
                ..Default::default()
            };
        }

        let reports: Vec<AttachmentReport> =
            attachments.iter().map(|a| self.analyze_attachment(a)).collect();
        let findings = reports.iter().flat_map(|r| r.findings.clone()).collect();

        AttachmentAnalysis {
            status: Status::Done,
            attachments: reports,
            findings,
            error: None,
        }
    }

    pub fn analyze_attachment(&self, attachment: &Attachment) -> AttachmentReport {
        let mut report = AttachmentReport {
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            size: AttachmentSize::new(attachment.payload.len()),
            hashes: ContentHashes::compute(&attachment.payload),
            archive_entries: None,
            findings: Vec::new(),
        };

        let Some(filename) = attachment.filename.as_deref().filter(|f| !f.trim().is_empty()) else {
            log::debug!("Unnamed attachment ({} bytes), no rules applied", report.size.bytes);
            return report;
        };
        let name = filename.trim().to_lowercase();
        let detail = || FindingDetail::Attachment {
            filename: filename.to_string(),
        };

        if self.is_high_risk(&name) {
            report
                .findings
                .push(Finding::high("Executable or script attachment", detail()));
        }

        if self.has_double_extension(&name) {
            report
                .findings
                .push(Finding::high("Double extension detected", detail()));
        }

        if self.archive_extensions.iter().any(|ext| name.ends_with(ext)) {
            report.findings.push(Finding::medium(
                "Archive attachment (manual inspection advised)",
                detail(),
            ));

            if name.ends_with(".zip") {
                if let Some(entries) = self.media.list_archive_entries(&attachment.payload) {
                    let executables: Vec<String> = entries
                        .iter()
                        .filter(|entry| self.is_high_risk(&entry.to_lowercase()))
                        .cloned()
                        .collect();
                    if !executables.is_empty() {
                        report.findings.push(Finding::high(
                            "Archive contains executable",
                            FindingDetail::ArchiveEntries {
                                filename: filename.to_string(),
                                entries: executables,
                            },
                        ));
                    }
                    report.archive_entries = Some(entries);
                }
            }
        }

        if self.office_extensions.iter().any(|ext| name.ends_with(ext))
            && self.media.has_vba_project(&attachment.payload)
        {
            report
                .findings
                .push(Finding::high("Office document contains VBA macros", detail()));
        }

        if name.ends_with(".pdf") {
            if self.media.has_pdf_script(&attachment.payload) {
                report
                    .findings
                    .push(Finding::medium("PDF contains embedded JavaScript", detail()));
            }

            let mime = attachment
                .content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim();
            if !mime.eq_ignore_ascii_case(PDF_MIME) {
                report.findings.push(Finding::medium(
                    "MIME type mismatch for PDF",
                    FindingDetail::ContentType {
                        filename: filename.to_string(),
                        content_type: attachment.content_type.clone(),
                    },
                ));
            }
        }

        if !report.findings.is_empty() {
            log::info!("Attachment {}: {:?}", filename, report.issues());
        }
        report
    }

    fn is_high_risk(&self, name: &str) -> bool {
        self.high_risk_extensions.iter().any(|ext| name.ends_with(ext))
    }

    fn has_double_extension(&self, name: &str) -> bool {
        let parts: Vec<&str> = name.split('.').filter(|p| !p.is_empty()).collect();
        parts.len() > 2
            && parts
                .last()
                .is_some_and(|last| self.double_extension_risky.iter().any(|r| r == last))
    }
}

impl AnalysisComponent for AttachmentAnalyzer {
    type Output = AttachmentAnalysis;

    fn analyze(&self, message: &ParsedMessage) -> anyhow::Result<AttachmentAnalysis> {
        Ok(self.analyze_attachments(&message.attachments))
    }

    fn name(&self) -> &str {
        "attachments"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Severity;
    use crate::media_analyzer::tests::zip_with_entries;

    fn analyzer() -> AttachmentAnalyzer {
        AttachmentAnalyzer::new(&RulesConfig::default())
    }

    fn named(filename: &str, content_type: &str, payload: &[u8]) -> Attachment {
        Attachment::new(Some(filename), content_type, payload.to_vec())
    }

    #[test]
    fn test_no_attachments_is_empty() {
        let analysis = analyzer().analyze_attachments(&[]);
        assert_eq!(analysis.status, Status::Empty);
        assert!(analysis.attachments.is_empty());
        assert!(analysis.findings.is_empty());
    }

    #[test]
    fn test_double_extension_executable_fires_both_rules() {
        let report = analyzer().analyze_attachment(&named(
            "invoice.pdf.exe",
            "application/octet-stream",
            b"MZ",
        ));

        assert_eq!(
            report.issues(),
            vec!["Executable or script attachment", "Double extension detected"]
        );
        assert!(report.findings.iter().all(|f| f.severity == Severity::High));
    }

    #[test]
    fn test_single_extension_is_not_double() {
        let report = analyzer().analyze_attachment(&named("setup.exe", "application/x-msdownload", b""));
        assert_eq!(report.issues(), vec!["Executable or script attachment"]);

        let report = analyzer().analyze_attachment(&named("report..exe", "application/x-msdownload", b""));
        assert_eq!(report.issues(), vec!["Executable or script attachment"]);
    }

    #[test]
    fn test_archive_with_executable_inside() {
        let payload = zip_with_entries(&["docs/readme.txt", "docs/Invoice.EXE"]);
        let report = analyzer().analyze_attachment(&named("docs.zip", "application/zip", &payload));

        assert_eq!(
            report.issues(),
            vec![
                "Archive attachment (manual inspection advised)",
                "Archive contains executable",
            ]
        );
        assert_eq!(
            report.findings[1].detail,
            FindingDetail::ArchiveEntries {
                filename: "docs.zip".to_string(),
                entries: vec!["docs/Invoice.EXE".to_string()],
            }
        );
        assert_eq!(report.archive_entries.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_unreadable_archive_is_advisory_only() {
        let report = analyzer().analyze_attachment(&named("photos.zip", "application/zip", b"junk"));
        assert_eq!(
            report.issues(),
            vec!["Archive attachment (manual inspection advised)"]
        );
        assert!(report.archive_entries.is_none());
    }

    #[test]
    fn test_office_macro_detection() {
        let macro_doc = zip_with_entries(&["[Content_Types].xml", "xl/vbaProject.bin"]);
        let report = analyzer().analyze_attachment(&named(
            "budget.xlsm",
            "application/vnd.ms-excel.sheet.macroEnabled.12",
            &macro_doc,
        ));
        assert_eq!(report.issues(), vec!["Office document contains VBA macros"]);

        let broken = analyzer().analyze_attachment(&named("letter.docx", "application/msword", b"not zip"));
        assert!(broken.findings.is_empty());
    }

    #[test]
    fn test_pdf_rules() {
        let scripted = b"%PDF-1.7\n<< /OpenAction << /S /JavaScript >> >>";
        let report = analyzer().analyze_attachment(&named(
            "statement.PDF",
            "application/pdf; name=statement.pdf",
            scripted,
        ));
        assert_eq!(report.issues(), vec!["PDF contains embedded JavaScript"]);

        let report = analyzer().analyze_attachment(&named("statement.pdf", "text/html", b"%PDF-1.4"));
        assert_eq!(report.issues(), vec!["MIME type mismatch for PDF"]);
        assert_eq!(report.findings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_unnamed_attachment_reported_without_rules() {
        let attachment = Attachment::new(None, "application/octet-stream", b"MZ payload".to_vec());
        let analysis = analyzer().analyze_attachments(&[attachment]);

        assert_eq!(analysis.status, Status::Done);
        assert_eq!(analysis.attachments.len(), 1);
        assert!(analysis.attachments[0].findings.is_empty());
        assert_eq!(analysis.attachments[0].size.bytes, 10);
    }

    #[test]
    fn test_hashes_are_deterministic() {
        let first = ContentHashes::compute(b"hello");
        let second = ContentHashes::compute(b"hello");

        assert_eq!(first, second);
        assert_eq!(first.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(first.sha1, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(
            first.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(first.sha512.len(), 128);
        assert_ne!(first, ContentHashes::compute(b"hello!"));
    }

    #[test]
    fn test_size_display() {
        assert_eq!(AttachmentSize::new(512).display, "512 bytes");
        assert_eq!(AttachmentSize::new(1536).display, "1.50 KB");
        assert_eq!(AttachmentSize::new(3 * 1024 * 1024).display, "3.00 MB");
    }

    #[test]
    fn test_findings_flattened_in_attachment_order() {
        let analysis = analyzer().analyze_attachments(&[
            named("a.js", "text/javascript", b"x"),
            named("notes.txt", "text/plain", b"x"),
            named("b.iso", "application/x-iso9660-image", b"x"),
        ]);

        let issues: Vec<&str> = analysis.findings.iter().map(|f| f.issue.as_str()).collect();
        assert_eq!(
            issues,
            vec![
                "Executable or script attachment",
                "Archive attachment (manual inspection advised)",
            ]
        );
        assert_eq!(analysis.attachments.len(), 3);
    }
}
