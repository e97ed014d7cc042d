mod config;

use abtguard_core::adapters::{FsArtifactSource, FsTableSource};
use abtguard_core::pipeline::{
    ToolError, run_assess, run_inspect, run_list_artifacts, run_trust,
};
use abtguard_core::settings::{AssessSettings, InspectSettings, TrustSettings};
use abtguard_core::builtin_rule_metas;
use abtguard_render::{render_artifact_md, render_assessment_md, render_trust_md};
use abtguard_types::artifact::FormatVersion;
use abtguard_types::change::ChangeRequest;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use config::{ConfigMerger, MergedConfig};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "abtguard",
    version,
    about = "Offline inspection of FORScan module backups and risk assessment of planned edits."
)]
struct Cli {
    #[command(flatten)]
    tables: TableArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Directory searched for abtguard.toml (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    root: Utf8PathBuf,

    /// Evidence table overriding the built-in one.
    #[arg(long, global = true, env = "ABTGUARD_EVIDENCE_TABLE")]
    evidence_table: Option<Utf8PathBuf>,

    /// Offset table overriding the built-in one.
    #[arg(long, global = true, env = "ABTGUARD_OFFSET_TABLE")]
    offset_table: Option<Utf8PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode and classify a module backup.
    Inspect(InspectArgs),
    /// Assess the risk of a planned module edit.
    Assess(AssessArgs),
    /// Show the trust report behind the rule table.
    TrustReport(TrustReportArgs),
    /// List the risk rules with their tiers and patterns.
    ListRules(ListRulesArgs),
    /// List backups in a directory, newest first.
    ListArtifacts(ListArtifactsArgs),
}

#[derive(Debug, Parser)]
struct InspectArgs {
    /// Backup file (.abt binary or hex text dump).
    #[arg(long)]
    file: Utf8PathBuf,

    /// Second backup of the same module, used to spot volatile blocks.
    #[arg(long)]
    companion: Option<Utf8PathBuf>,

    /// Expected format version; rejected if the file's signature disagrees.
    #[arg(long, value_enum)]
    format_version: Option<FormatArg>,

    /// Print JSON instead of markdown.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Parser)]
struct AssessArgs {
    #[arg(long)]
    module: String,

    /// Parameter name, or `<block>@<offset>` to cross-check against a backup.
    #[arg(long)]
    parameter: String,

    #[arg(long)]
    current: String,

    #[arg(long)]
    target: String,

    /// Confirmed prerequisite id (repeatable).
    #[arg(long = "confirm")]
    confirm: Vec<String>,

    /// Backup to cross-check the request against.
    #[arg(long)]
    artifact: Option<Utf8PathBuf>,

    #[arg(long, requires = "artifact")]
    companion: Option<Utf8PathBuf>,

    #[arg(long, value_enum)]
    format_version: Option<FormatArg>,

    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Parser)]
struct TrustReportArgs {
    /// Restrict the report to these rule ids (repeatable).
    #[arg(long = "rule")]
    rules: Vec<String>,

    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Parser)]
struct ListRulesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ListArtifactsArgs {
    #[arg(long, default_value = ".")]
    dir: Utf8PathBuf,

    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Legacy,
    Extended,
}

impl From<FormatArg> for FormatVersion {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Legacy => FormatVersion::Legacy,
            FormatArg::Extended => FormatVersion::Extended,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        let code = e.downcast_ref::<ToolError>().map_or(1, ToolError::exit_code);
        return ExitCode::from(code);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(&cli.tables, args),
        Command::Assess(args) => cmd_assess(&cli.tables, args),
        Command::TrustReport(args) => cmd_trust_report(&cli.tables, args),
        Command::ListRules(args) => cmd_list_rules(args),
        Command::ListArtifacts(args) => cmd_list_artifacts(args),
    }
}

fn merged_config(tables: &TableArgs, confirm: &[String]) -> anyhow::Result<MergedConfig> {
    let file_config = config::load_or_default(&tables.root)?;
    let merged = ConfigMerger::new(file_config).merge(
        tables.evidence_table.clone(),
        tables.offset_table.clone(),
        confirm,
    );
    debug!(
        "merged config: evidence={:?}, offsets={:?}, confirmed={:?}",
        merged.evidence_table, merged.offset_table, merged.confirmed
    );
    Ok(merged)
}

fn table_source(merged: &MergedConfig) -> FsTableSource {
    FsTableSource::new(merged.evidence_table.clone(), merged.offset_table.clone())
}

fn cmd_inspect(tables: &TableArgs, args: InspectArgs) -> anyhow::Result<()> {
    let merged = merged_config(tables, &[])?;
    let settings = InspectSettings {
        artifact: args.file,
        companion: args.companion,
        format_version: args.format_version.map(FormatVersion::from),
    };
    let outcome = run_inspect(&settings, &FsArtifactSource, &table_source(&merged))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!(
            "{}",
            render_artifact_md(outcome.source.as_str(), &outcome.sha256, &outcome.artifact)
        );
    }
    Ok(())
}

fn cmd_assess(tables: &TableArgs, args: AssessArgs) -> anyhow::Result<()> {
    let merged = merged_config(tables, &args.confirm)?;
    let mut settings = AssessSettings::new(ChangeRequest::new(
        args.module,
        args.parameter,
        args.current,
        args.target,
    ));
    settings.confirmed = merged.confirmed.clone();
    settings.artifact = args.artifact;
    settings.companion = args.companion;
    settings.format_version = args.format_version.map(FormatVersion::from);

    let assessment = run_assess(&settings, &FsArtifactSource, &table_source(&merged))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print!("{}", render_assessment_md(&assessment));
    }
    Ok(())
}

fn cmd_trust_report(tables: &TableArgs, args: TrustReportArgs) -> anyhow::Result<()> {
    let merged = merged_config(tables, &[])?;
    let settings = TrustSettings {
        rule_ids: args.rules,
    };
    let report = run_trust(&settings, &table_source(&merged))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_trust_md(&report));
    }
    Ok(())
}

fn cmd_list_rules(args: ListRulesArgs) -> anyhow::Result<()> {
    let rules = builtin_rule_metas();

    match args.format {
        OutputFormat::Text => {
            println!("Risk rules:\n");
            println!("  {:<28} {:<8} {:<24} PARAMETERS", "RULE", "TIER", "MODULES");
            println!("  {:<28} {:<8} {:<24} ----------", "----", "----", "-------");
            for rule in &rules {
                let params = if rule.parameter_patterns.is_empty() {
                    "*".to_string()
                } else {
                    rule.parameter_patterns.join(", ")
                };
                println!(
                    "  {:<28} {:<8} {:<24} {}",
                    rule.rule_id,
                    rule.tier,
                    rule.module_patterns.join(", "),
                    params
                );
            }
            println!();
            println!("Unmatched module/parameter pairs are assessed as medium.");
        }
        OutputFormat::Json => {
            let rules: Vec<_> = rules
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "rule_id": r.rule_id,
                        "tier": r.tier,
                        "description": r.description,
                        "module_patterns": r.module_patterns,
                        "parameter_patterns": r.parameter_patterns,
                        "evidence": r.evidence,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }
    Ok(())
}

fn cmd_list_artifacts(args: ListArtifactsArgs) -> anyhow::Result<()> {
    let found = run_list_artifacts(&args.dir)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    if found.is_empty() {
        println!("No backups found in {}.", args.dir);
        return Ok(());
    }
    println!("  {:<20} {:<8} {:<20} FILE", "VIN", "SYSTEM", "CAPTURED");
    for meta in &found {
        println!(
            "  {:<20} {:<8} {:<20} {}",
            meta.vin,
            meta.system,
            meta.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            meta.file_name
        );
    }
    Ok(())
}
