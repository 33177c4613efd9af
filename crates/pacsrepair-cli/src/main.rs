use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pacsrepair::xml::to_pretty_string;
use pacsrepair::{
    AddressMode, ConsistencyChecker, ConsistencyConfig, ConsistencyReport, Envelope,
    EnvelopeConfig, Party, RepairConfig, RepairOptions, Session,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pacsrepair",
    version,
    about = "Repair and cross-check ISO 20022 payment messages"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List required blocks missing from a message
    Detect {
        /// Input file, `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Repair a message and print the result
    Repair {
        /// Input file, `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// How the postal address is rebuilt
        #[arg(long, value_enum, default_value_t = AddressArg::Structured)]
        address: AddressArg,
        /// Party whose address and LEI are repaired
        #[arg(long, value_enum, default_value_t = PartyArg::Debtor)]
        party: PartyArg,
        /// Add or overwrite the party LEI
        #[arg(long)]
        fix_lei: bool,
        /// Add or overwrite the purpose code
        #[arg(long)]
        fix_purpose: bool,
        /// Add or overwrite the structured remittance reference
        #[arg(long)]
        fix_remittance: bool,
        /// Wrap the repaired AppHdr and Document in an envelope
        #[arg(long)]
        envelope: bool,
        /// TOML file overriding placeholder values
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Wrap a header and a body fragment in one envelope
    Envelope {
        #[arg(value_name = "HEADER")]
        header: PathBuf,
        #[arg(value_name = "BODY")]
        body: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Compare an MT103 with its pacs.008 translation
    Check {
        #[arg(value_name = "MT103")]
        legacy: PathBuf,
        #[arg(value_name = "PACS008")]
        structured: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one editable field and print the audit trail
    Edit {
        /// Input file, `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Field path, e.g. `RmtInf/Ustrd`
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
        #[arg(long, default_value = "")]
        justification: String,
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AddressArg {
    Structured,
    Hybrid,
    /// Leave the address untouched
    None,
}

impl From<AddressArg> for Option<AddressMode> {
    fn from(value: AddressArg) -> Self {
        match value {
            AddressArg::Structured => Some(AddressMode::Structured),
            AddressArg::Hybrid => Some(AddressMode::Hybrid),
            AddressArg::None => None,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PartyArg {
    Debtor,
    Creditor,
}

impl From<PartyArg> for Party {
    fn from(value: PartyArg) -> Self {
        match value {
            PartyArg::Debtor => Self::Debtor,
            PartyArg::Creditor => Self::Creditor,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(Args::parse()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Detect { input } => detect(&input),
        Command::Repair {
            input,
            address,
            party,
            fix_lei,
            fix_purpose,
            fix_remittance,
            envelope,
            config,
            output,
        } => {
            let options = RepairOptions {
                address: address.into(),
                party: party.into(),
                fix_lei,
                fix_purpose,
                fix_remittance,
            };
            let config = load_config(config.as_deref())?;
            repair(&input, &options, &config, envelope, output.as_deref())
        }
        Command::Envelope {
            header,
            body,
            output,
        } => {
            let header = read_input(&header)?;
            let body = read_input(&body)?;
            let xml = pacsrepair::build_envelope(&header, &body, &EnvelopeConfig::default())
                .context("failed to build envelope")?;
            write_output(output.as_deref(), xml.as_bytes())
        }
        Command::Check {
            legacy,
            structured,
            json,
        } => check(&legacy, &structured, json),
        Command::Edit {
            input,
            field,
            value,
            justification,
            actor,
        } => edit(&input, &field, &value, &justification, &actor),
    }
}

fn detect(input: &Path) -> Result<()> {
    let doc = parse_input(input)?;
    let issues = pacsrepair::repair::find_missing_fields(&doc);
    let mut report = String::new();
    if issues.is_empty() {
        report.push_str("No issues found\n");
    }
    for issue in &issues {
        report.push_str(issue.message());
        report.push('\n');
    }
    write_output(None, report.as_bytes())
}

fn repair(
    input: &Path,
    options: &RepairOptions,
    config: &RepairConfig,
    envelope: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut doc = parse_input(input)?;
    let outcome = pacsrepair::repair(&mut doc, options, config);
    info!(
        issues = outcome.issues.len(),
        applied = outcome.report.applied.len(),
        skipped = outcome.report.skipped.len(),
        "repair finished"
    );

    let xml = if envelope {
        Envelope::from_document(&doc, &EnvelopeConfig::default())
            .context("failed to build envelope from repaired message")?
            .to_xml()
    } else {
        to_pretty_string(&doc)
    };
    write_output(output, xml.as_bytes())
}

fn check(legacy: &Path, structured: &Path, json: bool) -> Result<()> {
    let checker = ConsistencyChecker::new(ConsistencyConfig::default())
        .context("invalid identifier pattern")?;
    let report = checker
        .check(&read_input(legacy)?, &read_input(structured)?)
        .context("cannot correlate messages")?;

    let rendered = if json {
        let mut text = serde_json::to_string_pretty(&report)?;
        text.push('\n');
        text
    } else {
        render_table(&report)
    };
    write_output(None, rendered.as_bytes())
}

fn edit(input: &Path, field: &str, value: &str, justification: &str, actor: &str) -> Result<()> {
    let doc = parse_input(input)?;
    let mut session = Session::new(doc, actor, "Analyst");
    session
        .edit_field(field, value, justification)
        .with_context(|| format!("failed to edit {field}"))?;

    let result = serde_json::json!({
        "session": session.id(),
        "document": to_pretty_string(session.document()),
        "audit": session.audit(),
    });
    let mut text = serde_json::to_string_pretty(&result)?;
    text.push('\n');
    write_output(None, text.as_bytes())
}

fn render_table(report: &ConsistencyReport) -> String {
    let mut out = format!("Matched UETR: {}\n\n", report.uetr);
    out.push_str("Travel rule fields (truncation is a heuristic)\n");
    for row in &report.comparisons {
        let status = match (row.present, row.truncated) {
            (false, _) => "MISSING",
            (true, true) => "TRUNCATED",
            (true, false) => "OK",
        };
        out.push_str(&format!(
            "  {:<17} {:<10} {} -> {}\n",
            row.field,
            status,
            row.source.as_deref().unwrap_or("-"),
            row.target
        ));
    }
    out.push_str("\nMT103 fields\n");
    for field in &report.legacy_fields {
        let marker = if field.truncated { " (truncated)" } else { "" };
        out.push_str(&format!("  :{}: {}{marker}\n", field.tag, field.value));
    }
    let verdict = if report.travel_rule_compliant() {
        "compliant"
    } else {
        "not compliant"
    };
    out.push_str(&format!("\nTravel rule: {verdict}\n"));
    out
}

fn load_config(path: Option<&Path>) -> Result<RepairConfig> {
    let Some(path) = path else {
        return Ok(RepairConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_input(path: &Path) -> Result<pacsrepair::Document> {
    let content = read_input(path)?;
    pacsrepair::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    if path != Path::new("-") {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()));
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    if buffer.trim().is_empty() {
        bail!("no input provided on stdin");
    }
    Ok(buffer)
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(data).context("failed to write stdout")?;
            Ok(())
        }
    }
}
