//! Command-line interface for sentinel.
//!
//! Provides commands for running an agreement workflow end to end,
//! listing the built-in templates, inspecting configuration and
//! starting the HTTP service.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, ResolvedConfig};
use crate::core::Orchestrator;
use crate::domain::ledger::render_line;
use crate::domain::{find_template, parse_operations, Project, TEMPLATES};

/// sentinel - Auditable agreement workflow engine
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate, transform, sign and archive one agreement
    Run {
        /// Template id or alias (e.g. TPL-NDA-V2 or NDA)
        template: String,

        /// Field value as key=value (repeatable; template defaults otherwise)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Transform to apply: watermark, linearize (repeatable)
        #[arg(short, long = "op", value_name = "OPERATION")]
        ops: Vec<String>,

        /// Email address of the signee
        #[arg(short, long)]
        signee: String,

        /// Project name (derived from the template if not given)
        #[arg(short, long)]
        name: Option<String>,

        /// Write the final PDF here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the finished project as JSON instead of the ledger
        #[arg(long)]
        json: bool,
    },

    /// List built-in templates
    Templates,

    /// Show resolved configuration (debug)
    Config,

    /// Start the HTTP API
    Serve {
        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                template,
                fields,
                ops,
                signee,
                name,
                output,
                json,
            } => {
                let cfg = config::load_config()?;
                run_workflow(&cfg, &template, &fields, &ops, &signee, name, output, json).await
            }
            Commands::Templates => list_templates(),
            Commands::Config => {
                let cfg = config::load_config()?;
                show_config(&cfg);
                Ok(())
            }
            Commands::Serve { port } => {
                let cfg = config::load_config()?;
                let port = port.unwrap_or(cfg.server_port);
                crate::server::serve(&cfg, port).await
            }
        }
    }
}

/// Parse repeated `key=value` arguments
fn parse_fields(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Invalid field '{}', expected KEY=VALUE", pair))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("Invalid field '{}', key is empty", pair);
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Run one workflow, streaming events to stderr as they are recorded
#[allow(clippy::too_many_arguments)]
async fn run_workflow(
    cfg: &ResolvedConfig,
    template_id: &str,
    raw_fields: &[String],
    raw_ops: &[String],
    signee: &str,
    name: Option<String>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let template = find_template(template_id);
    let operations = parse_operations(raw_ops)?;

    let mut fields = template.map(|t| t.default_fields()).unwrap_or_default();
    fields.extend(parse_fields(raw_fields)?);

    let name = name.unwrap_or_else(|| {
        let base = template.map(|t| t.name).unwrap_or("Custom Document");
        format!("{} Auto-Gen", base)
    });
    let template_id = template.map(|t| t.id).unwrap_or(template_id);

    let project = Project::new(name, template_id, fields, operations, signee);
    let orchestrator = Orchestrator::from_config(cfg)?;

    let mut printed = 0;
    let result = orchestrator
        .run(project, |patch| {
            if let Some(status) = patch.status {
                eprintln!("[{}]", status);
            }
            if let Some(ref ledger) = patch.events {
                for event in &ledger.events()[printed..] {
                    eprintln!("  {}", render_line(event));
                }
                printed = ledger.len();
            }
        })
        .await;

    let project = match result {
        Ok(project) => project,
        Err(failure) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&failure.project)?);
            }
            eprintln!("\n[Project {} failed: {}]", failure.project.id, failure.source);
            std::process::exit(1);
        }
    };

    if let (Some(path), Some(artifact)) = (output, project.output()) {
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
        eprintln!("Wrote {} ({} bytes)", path.display(), artifact.size_bytes);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&project)?);
    } else {
        println!("{}", project.ledger().render());
    }

    eprintln!(
        "\n[Project {} completed; trace {}]",
        project.id,
        project
            .trace_id()
            .map(|t| t.to_string())
            .unwrap_or_default()
    );
    if let Some(url) = project.output_url() {
        eprintln!("Archived at {}", url);
    }

    Ok(())
}

/// List built-in templates
fn list_templates() -> Result<()> {
    println!("{:<12} {:<6} {:<30} {}", "ID", "ALIAS", "NAME", "FIELDS");
    println!("{}", "-".repeat(80));

    for template in TEMPLATES.iter() {
        let fields: Vec<&str> = template.fields.iter().map(|(k, _)| *k).collect();
        println!(
            "{:<12} {:<6} {:<30} {}",
            template.id,
            template.alias,
            template.name,
            fields.join(", ")
        );
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) {
    println!("Sentinel Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Cloud service:");
    println!("  Base URL:      {}", cfg.service.base_url);
    println!(
        "  Credentials:   {}",
        if cfg.service.has_credentials() { "configured" } else { "(missing)" }
    );
    println!("  Timeout:       {}s", cfg.service.request_timeout_seconds);
    println!();
    println!("Polling:");
    println!("  Interval:      {}ms", cfg.polling.interval_ms);
    println!("  Max attempts:  {}", cfg.polling.max_attempts);
    println!();
    println!("Signing delay:   {}ms", cfg.signing_delay_ms);
    println!("Watermark label: {}", cfg.watermark_label);
    println!("Server port:     {}", cfg.server_port);
}
