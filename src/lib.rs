pub mod attachment_analyzer;
pub mod components;
pub mod config_loader;
pub mod domain_utils;
pub mod features;
pub mod media_analyzer;
pub mod message;
pub mod normalization;
pub mod url_resolver;

pub use components::aggregator::{AnalysisReport, PhishingEngine, SeverityCounts};
pub use config_loader::{ConfigLoader, RulesConfig};
pub use features::{Finding, FindingDetail, Severity, Status};
pub use message::{Attachment, HeaderValue, MessageBody, ParsedMessage};
