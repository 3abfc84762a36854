use anyhow::Context;
use clap::{Arg, Command};
use log::LevelFilter;
use phishcat::{
    AnalysisReport, ConfigLoader, ParsedMessage, PhishingEngine, RulesConfig, Severity,
    SeverityCounts,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Serialize)]
struct Summary {
    highest_severity: Option<Severity>,
    counts: SeverityCounts,
}

#[derive(Serialize)]
struct Output<'a> {
    #[serde(flatten)]
    report: &'a AnalysisReport,
    summary: Summary,
}

fn main() {
    let matches = Command::new("phishcat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Offline phishing-indicator analysis for decoded email messages")
        .arg(
            Arg::new("message")
                .value_name("MESSAGE_JSON")
                .help("Decoded message (headers, bodies, attachments) as JSON")
                .required_unless_present("generate-config")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Rules configuration file (YAML); built-in tables and the bundled keyword list when omitted")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("keywords")
                .short('k')
                .long("keywords")
                .value_name("FILE")
                .help("Keyword list, one phrase per line")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the built-in rule tables to FILE and exit")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .help("Pretty-print the JSON report")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if let Some(path) = matches.get_one::<PathBuf>("generate-config") {
        if let Err(e) = generate_default_config(path) {
            eprintln!("Error writing configuration: {e:#}");
            process::exit(1);
        }
        println!("Default rules written to {}", path.display());
        return;
    }

    let config = match load_config(
        matches.get_one::<PathBuf>("config"),
        matches.get_one::<PathBuf>("keywords"),
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    let Some(message_path) = matches.get_one::<PathBuf>("message") else {
        eprintln!("No message file given");
        process::exit(1);
    };

    let message = match load_message(message_path) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("Error loading message: {e:#}");
            process::exit(1);
        }
    };

    let engine = match PhishingEngine::new(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error building rule sets: {e:#}");
            process::exit(1);
        }
    };

    let report = engine.analyze(&message);
    let output = Output {
        report: &report,
        summary: Summary {
            highest_severity: report.highest_severity(),
            counts: report.severity_counts(),
        },
    };

    let rendered = if matches.get_flag("pretty") {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };

    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error rendering report: {e}");
            process::exit(1);
        }
    }
}

fn load_config(config: Option<&PathBuf>, keywords: Option<&PathBuf>) -> anyhow::Result<RulesConfig> {
    let mut rules = match config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Rules config not found: {}", path.display());
            }
            ConfigLoader::load(path)?
        }
        None => {
            log::debug!("No rules config given, using built-in tables and keywords");
            ConfigLoader::bundled()
        }
    };

    if let Some(path) = keywords {
        let list = ConfigLoader::load_keywords(path)?;
        log::info!("Loaded {} keywords from {}", list.len(), path.display());
        ConfigLoader::merge_keywords(&mut rules, list);
    }

    Ok(rules)
}

fn load_message(path: &Path) -> anyhow::Result<ParsedMessage> {
    if !path.exists() {
        anyhow::bail!("Message file not found: {}", path.display());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read message {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse message JSON {}", path.display()))
}

fn generate_default_config(path: &Path) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(&RulesConfig::default())
        .context("Failed to serialize default rules")?;
    fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))
}
