use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_metadata_extract::app::{self, App, SeriesOptions};
use kira_metadata_extract::config::ConfigLoader;
use kira_metadata_extract::convert::TimeConverter;
use kira_metadata_extract::domain::GeoSeriesAccession;
use kira_metadata_extract::error::KiraError;
use kira_metadata_extract::geo::GeoHttpClient;
use kira_metadata_extract::output::{JsonOutput, LogProgress};
use kira_metadata_extract::pubmed::PubmedHttpClient;
use kira_metadata_extract::store::Store;
use kira_metadata_extract::units::TimeUnit;

#[derive(Parser)]
#[command(name = "kira-mx")]
#[command(about = "Extract organism age and sample flags from GEO metadata")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Convert a free-text time phrase to a single unit")]
    Convert(ConvertArgs),
    #[command(about = "Extract metadata for every sample of a GEO series")]
    Series(SeriesArgs),
}

#[derive(Args)]
struct ConvertArgs {
    text: String,

    #[arg(long, value_enum, default_value_t = TimeUnit::Week)]
    to: TimeUnit,

    #[arg(long = "from", value_enum, value_delimiter = ',')]
    from_units: Vec<TimeUnit>,

    #[arg(long)]
    no_flag: bool,
}

#[derive(Args)]
struct SeriesArgs {
    accession: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    no_study: bool,

    #[arg(long)]
    no_text: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidUnit(_)
        | KiraError::InvalidSection(_)
        | KiraError::InvalidHeaderStyle(_)
        | KiraError::InvalidSeriesAccession(_)
        | KiraError::InvalidPmid(_)
        | KiraError::EmptySeries(_) => 2,
        error if error.is_upstream() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => run_convert(args),
        Commands::Series(args) => run_series(args),
    }
}

fn run_convert(args: ConvertArgs) -> miette::Result<()> {
    let from_units = if args.from_units.is_empty() {
        TimeUnit::ALL.to_vec()
    } else {
        args.from_units
    };
    let converter = TimeConverter::new(args.to, from_units).with_flag_range(!args.no_flag);
    let result = app::convert_text(&args.text, &converter);
    JsonOutput::print_convert(&result).into_diagnostic()?;
    Ok(())
}

fn run_series(args: SeriesArgs) -> miette::Result<()> {
    let accession = args
        .accession
        .parse::<GeoSeriesAccession>()
        .into_diagnostic()?;
    let mut config = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;
    if args.no_study {
        config.try_study = false;
    }
    if args.no_text {
        config.try_text = false;
    }

    let store = Store::new().into_diagnostic()?;
    store.ensure_cache_root().into_diagnostic()?;
    let geo = GeoHttpClient::new().into_diagnostic()?;
    let articles = PubmedHttpClient::new().into_diagnostic()?;
    let app = App::new(store, geo, articles);

    let options = SeriesOptions {
        no_cache: args.no_cache,
    };
    let result = app
        .series(&accession, &config, &options, &LogProgress)
        .into_diagnostic()?;
    JsonOutput::print_series(&result).into_diagnostic()?;
    Ok(())
}
