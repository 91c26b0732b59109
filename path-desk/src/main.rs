use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use path_client::HttpClient;
use path_desk::{
    DeskConfig, IntakeFlow, IntakeForm, LabelJob, ReprintResolver, dispatcher,
    init_logger_with_file,
};
use path_printer::{CSS_PX_PER_MM, LabelFormat};
use shared::{AppError, ErrorCategory, LabelIdentifier};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "path-desk")]
#[command(about = "Pathology label desk: patient intake, reprint and label printing")]
struct Cli {
    /// Label stock: `a` (63.5x38.1mm) or `b` (43.5x18.1mm)
    #[arg(long, global = true)]
    format: Option<String>,
    /// Directory print surfaces are created in
    #[arg(long, global = true)]
    spool_dir: Option<PathBuf>,
    /// Print queue passed to the print command
    #[arg(long, global = true)]
    printer: Option<String>,
    /// Patient service base URL
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the prefix catalog
    Catalog,
    /// Register a patient and print their label
    Intake {
        #[arg(long)]
        prefix: String,
        #[arg(long)]
        path_id: String,
        /// Hospital UHID
        #[arg(long, default_value = "")]
        uhid: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        age: String,
        /// male, female or other
        #[arg(long, default_value = "")]
        gender: String,
        /// Fill name, age and gender from the health-record system
        #[arg(long)]
        autofill: bool,
        /// Save without printing
        #[arg(long)]
        no_print: bool,
        /// Also write the label preview SVG here
        #[arg(long)]
        preview_out: Option<PathBuf>,
    },
    /// Look up a path id and print its label again
    Reprint {
        path_id: String,
        /// Skip the prefix prompt
        #[arg(long)]
        prefix: Option<String>,
        /// Show the record without printing
        #[arg(long)]
        no_print: bool,
    },
    /// Render a label preview as SVG
    Preview {
        prefix: String,
        path_id: String,
        #[arg(long, default_value_t = CSS_PX_PER_MM)]
        px_per_mm: f32,
        /// Write the SVG here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Print the operator-facing message and pick an exit status by category
fn report(err: &anyhow::Error) -> ExitCode {
    let Some(app) = err.downcast_ref::<AppError>() else {
        tracing::error!(error = ?err, "Command failed");
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    };

    tracing::error!(code = %app.code, details = ?app.details, "{}", app.message);
    eprintln!("Error: {}", app.message);
    match app.code.category() {
        ErrorCategory::General => ExitCode::from(2),
        ErrorCategory::Label => ExitCode::from(3),
        ErrorCategory::Print => ExitCode::from(4),
        ErrorCategory::System => ExitCode::from(5),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = apply_overrides(DeskConfig::from_env(), &cli)?;

    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config.warn_rejected();
    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Catalog => catalog(&config).await,
        Commands::Intake {
            prefix,
            path_id,
            uhid,
            name,
            age,
            gender,
            autofill,
            no_print,
            preview_out,
        } => {
            let mut form = IntakeForm {
                prefix,
                path_id,
                uhid,
                patient_name: name,
                age,
                gender,
            };
            intake(&config, &mut form, autofill, no_print, preview_out).await
        }
        Commands::Reprint {
            path_id,
            prefix,
            no_print,
        } => reprint(&config, &path_id, prefix.as_deref(), no_print).await,
        Commands::Preview {
            prefix,
            path_id,
            px_per_mm,
            out,
        } => preview(&config, &prefix, &path_id, px_per_mm, out),
    }
}

fn apply_overrides(mut config: DeskConfig, cli: &Cli) -> anyhow::Result<DeskConfig> {
    if let Some(format) = &cli.format {
        config.label_format = format.parse::<LabelFormat>().map_err(AppError::from)?;
    }
    if let Some(dir) = &cli.spool_dir {
        config.spool_dir = dir.clone();
    }
    if let Some(printer) = &cli.printer {
        config.printer_name = Some(printer.clone());
    }
    if let Some(api) = &cli.api {
        config.api_base_url = api.clone();
    }
    Ok(config)
}

async fn catalog(config: &DeskConfig) -> anyhow::Result<()> {
    let client = HttpClient::new(&config.client_config()).map_err(AppError::from)?;
    let flow = IntakeFlow::new(&client, &config.org_code, config.label_format);
    let entries = flow.selectable_prefixes().await?;

    if entries.is_empty() {
        println!("No active prefixes.");
    }
    for entry in entries {
        println!("{:<8} {}", entry.prefix, entry.description);
    }
    Ok(())
}

async fn intake(
    config: &DeskConfig,
    form: &mut IntakeForm,
    autofill: bool,
    no_print: bool,
    preview_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = HttpClient::new(&config.client_config()).map_err(AppError::from)?;
    let flow = IntakeFlow::new(&client, &config.org_code, config.label_format)
        .with_user(config.user_id.clone());

    if autofill && !flow.autofill(form).await {
        eprintln!("Autofill unavailable, using the values given");
    }

    let outcome = flow.submit(form).await?;
    println!("{}", outcome.message);
    println!(
        "{}  {}  {} {}",
        outcome.patient.composite_barcode,
        outcome.patient.patient_name,
        outcome.patient.age,
        outcome.patient.gender
    );

    if let Some(path) = preview_out {
        write_preview(&path, &outcome.label.preview_svg(CSS_PX_PER_MM))?;
    }
    if !no_print {
        print_label(config, outcome.label).await?;
    }
    Ok(())
}

async fn reprint(
    config: &DeskConfig,
    path_id: &str,
    prefix: Option<&str>,
    no_print: bool,
) -> anyhow::Result<()> {
    let client = HttpClient::new(&config.client_config()).map_err(AppError::from)?;
    let mut resolver = ReprintResolver::new(client);

    let prefixes = resolver.resolve_prefixes(path_id).await?;

    if let Some(prefix) = prefix {
        resolver.select(prefix)?;
    } else if resolver.selected().is_none() {
        let chosen = prompt_prefix(&prefixes, resolver.highlighted()).await?;
        resolver.select(&chosen)?;
    }

    let record = resolver.resolve_record().await?;
    println!(
        "{}  {}  {} {}  issued {} {}",
        record.composite_barcode,
        record.patient_name,
        record.age,
        record.gender,
        record.date,
        record.time
    );

    if !no_print {
        let label = LabelJob::from_record(
            &record,
            &config.org_code,
            config.label_format,
            config.decompose_policy,
        )?;
        print_label(config, label).await?;
    }
    Ok(())
}

/// Ask which prefix to reprint under. Empty input takes the highlighted one,
/// a number picks by position, anything else is taken as the prefix itself.
async fn prompt_prefix(prefixes: &[String], highlighted: Option<&str>) -> anyhow::Result<String> {
    println!("Path ID was issued under several prefixes:");
    for (i, p) in prefixes.iter().enumerate() {
        let mark = if Some(p.as_str()) == highlighted { "*" } else { " " };
        println!(" {mark} {}) {p}", i + 1);
    }
    print!("Prefix [{}]: ", highlighted.unwrap_or_default());
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read prefix choice")?;
    let answer = line.trim();

    if answer.is_empty() {
        return highlighted
            .map(str::to_string)
            .context("No prefix to choose from");
    }
    if let Ok(n) = answer.parse::<usize>()
        && let Some(p) = n.checked_sub(1).and_then(|i| prefixes.get(i))
    {
        return Ok(p.clone());
    }
    Ok(answer.to_string())
}

async fn print_label(config: &DeskConfig, label: LabelJob) -> anyhow::Result<()> {
    let dispatcher = dispatcher(config)?;
    dispatcher
        .print_once(label.tree)
        .await
        .map_err(AppError::from)?;
    println!("Label sent to printer");

    // Let the print system pick up the surface before it is torn down
    tokio::time::sleep(config.print_settle()).await;
    dispatcher.flush();
    Ok(())
}

fn preview(
    config: &DeskConfig,
    prefix: &str,
    path_id: &str,
    px_per_mm: f32,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let identifier = LabelIdentifier::new(prefix, path_id)?;
    let label = LabelJob::new(&config.org_code, &identifier, config.label_format)?;
    let svg = label.preview_svg(px_per_mm);

    match out {
        Some(path) => write_preview(&path, &svg)?,
        None => println!("{svg}"),
    }
    Ok(())
}

fn write_preview(path: &std::path::Path, svg: &str) -> anyhow::Result<()> {
    std::fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Preview written to {}", path.display());
    Ok(())
}
