use clap::{Parser, Subcommand};
use metro_lens::config::Config;
use metro_lens::location::{build_geocoder, registry, CoordinateCache, GeocoderKind, LocationResolver, MetroRegistry};
use metro_lens::pipeline::{Pipeline, RunOptions};
use metro_lens::scrape::HttpClient;
use metro_lens::{logging, states, Error, Result};
use std::path::PathBuf;

/// Metro Lens: city market scanner
///
/// Scrapes city statistics from city-data.com, attaches the closest
/// metropolitan area and its BLS job growth, and writes one spreadsheet per
/// state.
///
/// Examples:
///   metrolens run
///   metrolens run --state "North Carolina" --state GA --min-population 100000
///   metrolens nearest "Durham, NC"
///   metrolens seed-registry --input areas.csv
#[derive(Parser)]
#[command(name = "metrolens", version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to ~/.metro_lens/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: only use the coordinate cache, never geocode.
    #[arg(long, global = true)]
    offline: bool,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape the configured states and export spreadsheets.
    Run {
        /// State name or abbreviation; repeatable. Overrides the config.
        #[arg(long = "state", short = 's')]
        states: Vec<String>,

        /// Minimum city population (exclusive).
        #[arg(long)]
        min_population: Option<u64>,

        /// Output directory for spreadsheets.
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,

        /// Reuse stored <state>_cities_population.json files.
        #[arg(long)]
        reuse_city_list: bool,
    },

    /// Print the metro area closest to a place as JSON.
    Nearest {
        /// Place name, e.g. "Durham, NC".
        place: String,
    },

    /// Build the metro area registry from an `area_code,area_name` CSV.
    SeedRegistry {
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Geocoding provider (overrides the config).
        #[arg(long, value_enum)]
        provider: Option<GeocoderKind>,
    },

    /// Print the default configuration as TOML.
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Config = cli.command {
        print!("{}", Config::default_toml()?);
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            states: state_args,
            min_population,
            output_dir,
            reuse_city_list,
        } => {
            if !state_args.is_empty() {
                config.states = state_args;
            }
            if let Some(min) = min_population {
                config.min_population = min;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            let selected = config
                .states
                .iter()
                .map(|s| states::resolve(s))
                .collect::<Result<Vec<_>>>()?;

            let mut resolver = build_resolver(&config, cli.offline)?;
            let fetcher = HttpClient::new(config.timeout(), &config.http.user_agent);
            let options = RunOptions {
                min_population: config.min_population,
                data_dir: config.data_dir.clone(),
                output_dir: config.output_dir.clone(),
                reuse_city_list,
                city_data_url: config.sources.city_data_url.clone(),
                bls_url: config.sources.bls_url.clone(),
            };

            let reports = Pipeline::new(&fetcher, &mut resolver, options).run(&selected)?;
            for report in &reports {
                match &report.output {
                    Some(path) => eprintln!(
                        "  {}: {} of {} cities, {} with job growth -> {}",
                        report.state,
                        report.processed,
                        report.listed,
                        report.with_job_growth,
                        path.display()
                    ),
                    None => eprintln!("  {}: no cities processed", report.state),
                }
            }
        }

        Command::Nearest { place } => {
            let mut resolver = build_resolver(&config, cli.offline)?;
            let coordinate = resolver.resolve_coordinate(&place)?;
            let found = resolver
                .find_closest_metro_area(&place)
                .ok_or_else(|| Error::NoMetroArea {
                    place: place.clone(),
                    registry: config.registry_path(),
                })?;
            eprintln!("  {} ({})", coordinate.name, coordinate.coordinate);
            println!(
                "{}",
                serde_json::to_string_pretty(&found).map_err(|e| Error::json("<stdout>", e))?
            );
        }

        Command::SeedRegistry { input, provider } => {
            if let Some(kind) = provider {
                config.geocoder.provider = kind;
            }
            let areas = registry::read_area_list(&input)?;
            let path = config.registry_path();
            let existing = match MetroRegistry::load(&path) {
                Ok(r) => r,
                Err(Error::RegistryMissing { .. }) => MetroRegistry::default(),
                Err(e) => return Err(e),
            };
            let geocoder = build_geocoder(
                config.geocoder.provider,
                config.geocoder.api_key.as_deref(),
                config.geocoder.country.as_deref(),
                config.timeout(),
                &config.http.user_agent,
            )?;
            let seeded = registry::seed(&areas, &existing, geocoder.as_ref());
            seeded.save(&path)?;
            eprintln!("  Wrote {} metro areas to {}", seeded.len(), path.display());
        }

        Command::Config => {}
    }

    Ok(())
}

/// Registry first: a missing registry is fatal before any network work.
fn build_resolver(config: &Config, offline: bool) -> Result<LocationResolver> {
    let registry = MetroRegistry::load(&config.registry_path())?;
    let cache = CoordinateCache::load_from(config.cache_path())?;

    if offline {
        return Ok(LocationResolver::offline(registry, cache));
    }
    let geocoder = build_geocoder(
        config.geocoder.provider,
        config.geocoder.api_key.as_deref(),
        config.geocoder.country.as_deref(),
        config.timeout(),
        &config.http.user_agent,
    )
    .map_err(|e| Error::Config(format!("{} (set {} or use --offline)", e, metro_lens::config::API_KEY_ENV)))?;
    Ok(LocationResolver::new(registry, cache, geocoder))
}
