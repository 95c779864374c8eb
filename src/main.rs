//main.rs
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use geocluster::record::{self, BuildingRecord, RawRow};
use geocluster::{ClusterConfig, ClusterJob, DistanceMode, ExportOptions, ReferenceLine, export};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[clap(version, about = "Select buildings by street, cluster them and export coordinates")]
struct Opts {
    /// Log debug output
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the street names found in the input
    Streets(InputArgs),
    /// List house numbers on the selected streets
    Show {
        #[clap(flatten)]
        input: InputArgs,
        #[clap(short, long = "street", required = true)]
        streets: Vec<String>,
    },
    /// Cluster buildings and write the labeled table
    Cluster(ClusterArgs),
    /// Write latitude/longitude of the selected streets
    Coordinates {
        #[clap(flatten)]
        input: InputArgs,
        #[clap(short, long = "street", required = true)]
        streets: Vec<String>,
        #[clap(short, long, default_value = "clustered_buildings.csv")]
        outfile: PathBuf,
        #[clap(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Building table (.csv, or .json/.geojson)
    #[clap(short, long)]
    file: PathBuf,

    /// Field delimiter of a CSV input
    #[clap(long, default_value_t = ';')]
    input_delimiter: char,
}

#[derive(Args)]
struct OutputArgs {
    #[clap(long, default_value_t = ';')]
    delimiter: char,

    /// Omit the header row
    #[clap(long)]
    no_header: bool,
}

#[derive(Args)]
struct ClusterArgs {
    #[clap(flatten)]
    input: InputArgs,

    #[clap(short, long, default_value = "clustered_buildings.csv")]
    outfile: PathBuf,

    #[clap(flatten)]
    output: OutputArgs,

    /// JSON file with clustering parameters; flags below override it
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// GeoJSON line to split buildings by (e.g. a river)
    #[clap(short, long)]
    river: Option<PathBuf>,

    /// Neighborhood radius; defaults to 0.2 (scaled) or 50 m (geodesic)
    #[clap(long)]
    eps: Option<f64>,

    #[clap(long)]
    min_samples: Option<usize>,

    #[clap(long, value_enum)]
    mode: Option<ModeArg>,

    #[clap(long)]
    street_multiplier: Option<f64>,

    #[clap(short, long = "street")]
    streets: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Scaled,
    Geodesic,
}

impl From<ModeArg> for DistanceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Scaled => DistanceMode::Scaled,
            ModeArg::Geodesic => DistanceMode::Geodesic,
        }
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match opts.command {
        Command::Streets(input) => {
            let records = load_records(&input)?;
            for street in record::street_names(&records) {
                println!("{}", street);
            }
        }
        Command::Show { input, streets } => {
            let records = load_records(&input)?;
            let houses = record::buildings_on(&records, &streets);
            if houses.is_empty() {
                warn!("No buildings found on {:?}", streets);
            }
            for house in houses {
                println!("{}", house);
            }
        }
        Command::Cluster(args) => run_cluster(args)?,
        Command::Coordinates {
            input,
            streets,
            outfile,
            output,
        } => {
            let records = load_records(&input)?;
            let selected = record::filter_streets(&records, &streets);
            if selected.is_empty() {
                bail!("No buildings found on {:?}", streets);
            }
            export::write_coordinates(&outfile, &selected, &export_options(&output)?)
                .with_context(|| format!("Failed to write {:?}", outfile))?;
        }
    }

    Ok(())
}

fn run_cluster(args: ClusterArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ClusterConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {:?}", path))?,
        None => ClusterConfig::default(),
    };
    if let Some(eps) = args.eps {
        config.eps = Some(eps);
    }
    if let Some(min_samples) = args.min_samples {
        config.min_samples = min_samples;
    }
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(multiplier) = args.street_multiplier {
        config.street_multiplier = multiplier;
    }
    if !args.streets.is_empty() {
        config.selected_streets = args.streets.clone();
    }

    let line = match &args.river {
        Some(path) => {
            config.split_by_line = true;
            Some(
                ReferenceLine::from_geojson_file(path)
                    .with_context(|| format!("Failed to read reference line {:?}", path))?,
            )
        }
        None => None,
    };

    let records = load_records(&args.input)?;

    let mut job = ClusterJob::new(&config);
    if let Some(line) = &line {
        job = job.with_line(line);
    }

    let table = job
        .run_to_file(&records, &args.outfile, &export_options(&args.output)?)
        .context("Clustering failed")?;

    for subset in &table.subsets {
        let side = subset
            .side
            .map(|s| s.to_string())
            .unwrap_or_else(|| "all".to_string());
        info!(
            "{}: {} buildings, {} clusters, {} noise",
            side, subset.n_records, subset.n_clusters, subset.n_noise
        );
    }
    println!(
        "Assigned {} buildings into {} clusters ({} noise), saved to {:?}",
        table.len(),
        table.n_clusters(),
        table.n_noise(),
        args.outfile
    );

    Ok(())
}

fn load_records(input: &InputArgs) -> Result<Vec<BuildingRecord>> {
    let rows = read_rows(&input.file, input.input_delimiter)
        .with_context(|| format!("Failed to load {:?}", input.file))?;
    Ok(record::normalize(rows)?)
}

fn read_rows(path: &Path, delimiter: char) -> geocluster::Result<Vec<RawRow>> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("geojson"));

    if is_json {
        record::load_json(path)
    } else {
        record::load_csv(path, delimiter_byte(delimiter)?)
    }
}

fn export_options(output: &OutputArgs) -> Result<ExportOptions> {
    Ok(ExportOptions {
        delimiter: delimiter_byte(output.delimiter)?,
        has_header: !output.no_header,
    })
}

fn delimiter_byte(c: char) -> std::result::Result<u8, geocluster::Error> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| geocluster::Error::parameter(format!("delimiter {:?} is not a single ASCII character", c)))
}
