use std::process::ExitCode;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ceo_bars_catalog::app::{App, ProgressEvent, ProgressSink, ProgressSinkKind};
use ceo_bars_catalog::config::{ConfigLoader, ResolvedConfig};
use ceo_bars_catalog::error::CatalogError;
use ceo_bars_catalog::fetch::HttpFetcher;
use ceo_bars_catalog::notify::Toast;
use ceo_bars_catalog::output::{JsonOutput, OutputMode};
use ceo_bars_catalog::patch::PatchReport;
use ceo_bars_catalog::save::DirectorySave;
use ceo_bars_catalog::tui::Tui;

const BANNER_WIDTH: usize = 70;

#[derive(Parser)]
#[command(name = "ceo-bars")]
#[command(about = "Maintain the CEO Bars track catalog and download the collection")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Project configuration (defaults to ./ceo-bars.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Append newly uploaded tracks to the catalog")]
    Patch(PatchArgs),
    #[command(about = "Replace local asset paths in the catalog with public URLs")]
    Relink,
    #[command(about = "Print the catalog")]
    List(QueryArgs),
    #[command(about = "Check catalog invariants")]
    Validate,
    #[command(about = "Write the catalog as a JSON array")]
    Export(ExportArgs),
    #[command(about = "Download every track as one archive")]
    DownloadAll(DownloadAllArgs),
    #[command(about = "Download a single track")]
    Download(DownloadArgs),
}

#[derive(Args)]
struct PatchArgs {
    /// Collection to patch; all configured collections when omitted
    collection: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long)]
    query: Option<String>,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct DownloadAllArgs {
    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    id: u64,

    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(error.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    match cli.command {
        Commands::Patch(args) => run_patch(build_app(config)?, args, output_mode),
        Commands::Relink => run_relink(build_app(config)?, output_mode),
        Commands::List(args) => run_list(build_app(config)?, args, output_mode),
        Commands::Validate => run_validate(build_app(config)?, output_mode),
        Commands::Export(args) => run_export(build_app(config)?, args, output_mode),
        Commands::DownloadAll(args) => {
            override_download_dir(&mut config, args.output_dir.as_deref());
            run_download_all(build_app(config)?, args.query, output_mode)
        }
        Commands::Download(args) => {
            override_download_dir(&mut config, args.output_dir.as_deref());
            run_download(build_app(config)?, args.id, output_mode)
        }
    }
}

type CliApp = App<HttpFetcher, DirectorySave>;

fn build_app(config: ResolvedConfig) -> miette::Result<CliApp> {
    let fetcher = HttpFetcher::new(
        config.base_url.clone(),
        Duration::from_secs(config.fetch_timeout_secs),
    )?;
    let saver = DirectorySave::new(config.download_dir.clone());
    Ok(App::new(config, fetcher, saver))
}

fn override_download_dir(config: &mut ResolvedConfig, dir: Option<&Utf8Path>) {
    if let Some(dir) = dir {
        config.download_dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            config.root.join(dir)
        };
    }
}

/// Echoes progress lines to stdout the way the catalog scripts always have.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        match event.percent {
            Some(percent) => println!("[{percent:>3}%] {}", event.message),
            None if event.message.starts_with("Added: ") => println!("  {}", event.message),
            None => println!("{}", event.message),
        }
    }

    fn notify(&self, toast: &Toast) {
        if let Some(message) = toast.message() {
            println!("{message}");
        }
    }
}

fn print_banner(lines: &[String]) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("\n{rule}");
    for line in lines {
        println!("  {line}");
    }
    println!("{rule}\n");
}

fn run_patch(app: CliApp, args: PatchArgs, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let reports = app.patch(args.collection.as_deref(), &JsonOutput)?;
            JsonOutput::print_patch(&reports).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let names: Vec<String> = match args.collection {
                Some(name) => vec![app.config().collection(&name)?.name.clone()],
                None => app
                    .config()
                    .collections
                    .iter()
                    .map(|collection| collection.name.clone())
                    .collect(),
            };
            for name in names {
                let label = app.config().collection(&name)?.label();
                print_banner(&[format!("CEO BARS - Add {label} to Tracks Page")]);
                let reports = app.patch(Some(&name), &ConsoleSink)?;
                for report in &reports {
                    print_patch_summary(report, &label);
                }
            }
            Ok(())
        }
    }
}

fn print_patch_summary(report: &PatchReport, label: &str) {
    if !report.written {
        return;
    }
    print_banner(&[
        format!("Added {} {label} to tracks page!", report.added.len()),
        format!("New highest ID: {}", report.highest_id),
    ]);
}

fn run_relink(app: CliApp, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let report = app.relink(&JsonOutput)?;
            JsonOutput::print_relink(&report).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            print_banner(&["CEO BARS - Update Tracks with Blob URLs".to_string()]);
            let report = app.relink(&ConsoleSink)?;
            print_banner(&[
                "Update Complete!".to_string(),
                format!("Replaced {} URLs in tracks page", report.replaced.len()),
            ]);
            Ok(())
        }
    }
}

fn run_list(app: CliApp, args: QueryArgs, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.list(args.query.as_deref(), &JsonOutput)?;
            JsonOutput::print_list(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app.list(args.query.as_deref(), &ConsoleSink)?;
            for track in &result.tracks {
                println!(
                    "{:>4}  {:<48}  {:<24}  {:<24}  {:>5}",
                    track.id, track.title, track.artist, track.album, track.duration
                );
            }
            println!("\n{} of {} tracks", result.tracks.len(), result.total);
            Ok(())
        }
    }
}

fn run_validate(app: CliApp, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.validate(&JsonOutput)?;
            JsonOutput::print_validate(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app.validate(&ConsoleSink)?;
            let highest = result
                .highest_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "Catalog OK: {} tracks, highest ID {highest}, {} warnings",
                result.tracks,
                result.warnings.len()
            );
            Ok(())
        }
    }
}

fn run_export(app: CliApp, args: ExportArgs, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.export(args.output.as_deref(), &JsonOutput)?;
            JsonOutput::print_export(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            app.export(args.output.as_deref(), &ConsoleSink)?;
            Ok(())
        }
    }
}

fn run_download_all(
    app: CliApp,
    query: Option<String>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let report = app.download_all(query.as_deref(), &JsonOutput)?;
            JsonOutput::print_bulk(&report).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new(ProgressSinkKind::BulkDownload);
            let report = tui.run(move |sink| app.download_all(query.as_deref(), sink))?;
            tui.finish(vec![
                format!("{} tracks archived", report.entries.len()),
                format!("Saved to {}", report.saved_to),
            ])?;
            println!("Saved {} ({} tracks)", report.saved_to, report.entries.len());
            Ok(())
        }
    }
}

fn run_download(app: CliApp, id: u64, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let report = app.download_one(id, &JsonOutput)?;
            JsonOutput::print_single(&report).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new(ProgressSinkKind::SingleDownload);
            let report = tui.run(move |sink| app.download_one(id, sink))?;
            tui.finish(vec![format!("Saved to {}", report.saved_to)])?;
            println!("Saved {}", report.saved_to);
            Ok(())
        }
    }
}
