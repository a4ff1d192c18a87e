//! quire - build the editions of an ebook

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use quire::build::ArtifactKind;
use quire::{Build, BuildConfig, BuildReport, Error, ExternalTools, ToolPaths};

#[derive(Parser)]
#[command(name = "quire")]
#[command(version, about = "Build EPUB3, compatible epub, kepub and azw3 editions of an ebook", long_about = None)]
#[command(after_help = "EXAMPLES:
    quire books/persuasion              Build the epub3 and compatible epub
    quire -k -b -o dist books/emma      Also build the Kindle and Kobo editions
    quire -t books/emma                 Also write the cover and its thumbnail
    quire -c books/emma                 Validate the compatible epub")]
struct Cli {
    /// Source directory containing src/
    #[arg(value_name = "DIRECTORY")]
    directory: PathBuf,

    /// Directory to write the editions to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Validate the compatible epub (skips Kindle on failure)
    #[arg(short = 'c', long)]
    check: bool,

    /// Also build the Kindle azw3
    #[arg(short, long)]
    kindle: bool,

    /// Also build the Kobo kepub
    #[arg(short = 'b', long)]
    kobo: bool,

    /// Also write the rasterized cover and a thumbnail
    #[arg(short = 't', long)]
    covers: bool,

    /// Include proofreading styles
    #[arg(short, long)]
    proof: bool,

    /// Look for tools here before searching PATH
    #[arg(long, value_name = "DIR", env = "QUIRE_TOOLS_DIR")]
    tools_dir: Option<PathBuf>,

    /// Print the build report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "quire=info",
        1 => "quire=debug",
        _ => "quire=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = BuildConfig::default()
        .with_output_dir(&cli.output_dir)
        .with_kobo(cli.kobo)
        .with_kindle(cli.kindle)
        .with_covers(cli.covers)
        .with_check(cli.check)
        .with_proof(cli.proof);
    let tools = ExternalTools::new(ToolPaths::discover(cli.tools_dir.as_deref()));
    let report = Build::new(config, tools).run(&cli.directory)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::Precondition(format!("Couldn't serialize report: {e}")))?;
        println!("{json}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    for artifact in &report.artifacts {
        let label = match artifact.kind {
            ArtifactKind::Book(target) => target.to_string(),
            ArtifactKind::Cover => "cover".to_string(),
            ArtifactKind::CoverThumbnail => "cover thumbnail".to_string(),
            ArtifactKind::KindleThumbnail => "kindle thumbnail".to_string(),
        };
        println!("{label:>16}  {}", artifact.path.display());
    }
    if let Some(asin) = &report.asin {
        println!("{:>16}  {asin}", "asin");
    }
}
