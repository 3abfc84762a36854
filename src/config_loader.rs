use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::normalization::default_homoglyphs;

/// Static rule tables, loaded once at startup and handed to each rule set.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RulesConfig {
    pub keywords: Vec<String>,
    pub keyword_file: Option<PathBuf>,
    pub shortener_domains: Vec<String>,
    pub homoglyphs: BTreeMap<char, Vec<char>>,
    pub high_risk_extensions: Vec<String>,
    pub double_extension_risky: Vec<String>,
    pub archive_extensions: Vec<String>,
    pub office_extensions: Vec<String>,
    pub media_extensions: Vec<String>,
    pub check_body_words: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            keyword_file: None,
            shortener_domains: strings(&[
                "bit.ly",
                "tinyurl.com",
                "t.co",
                "goo.gl",
                "is.gd",
                "ow.ly",
                "buff.ly",
                "rebrand.ly",
                "cutt.ly",
                "shorturl.at",
            ]),
            homoglyphs: default_homoglyphs(),
            high_risk_extensions: strings(&[
                ".exe", ".bat", ".cmd", ".scr", ".js", ".vbs", ".ps1", ".com", ".msi",
            ]),
            double_extension_risky: strings(&["exe", "js", "bat", "scr", "vbs", "ps1", "com"]),
            archive_extensions: strings(&[".zip", ".rar", ".7z", ".iso"]),
            office_extensions: strings(&[".docx", ".xlsx", ".pptx", ".docm", ".xlsm", ".pptm"]),
            media_extensions: strings(&[
                ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico", ".mp3",
                ".mp4", ".mov", ".avi", ".wav", ".zip", ".rar", ".7z", ".gz", ".tar",
            ]),
            check_body_words: true,
        }
    }
}

/// Keyword list shipped in `config/keywords.txt`, used when no config is given.
const BUNDLED_KEYWORDS: &str = include_str!("../config/keywords.txt");

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load rule tables from YAML, then merge any referenced keyword file.
    pub fn load(path: &Path) -> anyhow::Result<RulesConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules config {:?}", path))?;
        let mut config: RulesConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse rules config {:?}", path))?;

        if let Some(keyword_file) = config.keyword_file.clone() {
            // Relative keyword paths are resolved next to the config file
            let keyword_path = match path.parent() {
                Some(dir) if keyword_file.is_relative() => dir.join(keyword_file),
                _ => keyword_file,
            };
            let keywords = Self::load_keywords(&keyword_path)?;
            Self::merge_keywords(&mut config, keywords);
        }

        config.keywords = Self::normalize_keywords(&config.keywords);
        log::info!(
            "Loaded rules config {:?}: {} keywords, {} shorteners",
            path,
            config.keywords.len(),
            config.shortener_domains.len()
        );
        Ok(config)
    }

    /// Built-in rule tables plus the bundled keyword list.
    pub fn bundled() -> RulesConfig {
        let mut config = RulesConfig::default();
        Self::merge_keywords(&mut config, Self::parse_keywords(BUNDLED_KEYWORDS));
        config
    }

    /// One keyword per line; blank lines and `#` comments are skipped.
    pub fn load_keywords(path: &Path) -> anyhow::Result<Vec<String>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword list {:?}", path))?;
        Ok(Self::parse_keywords(&content))
    }

    pub fn parse_keywords(content: &str) -> Vec<String> {
        content
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    }

    /// Append keywords not already present, keeping first-seen order
    pub fn merge_keywords(config: &mut RulesConfig, keywords: Vec<String>) {
        config.keywords.extend(keywords);
        config.keywords = Self::normalize_keywords(&config.keywords);
    }

    fn normalize_keywords(keywords: &[String]) -> Vec<String> {
        let mut seen = Vec::new();
        for keyword in keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !seen.contains(&keyword) {
                seen.push(keyword);
            }
        }
        seen
    }
}
