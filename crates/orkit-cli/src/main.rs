use clap::{Parser, Subcommand};
use orkit_api::{Api, Config, Endpoint};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "orkit")]
#[command(about = "Run optimization requests against the orkit engines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON file with solver settings and request limits
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Branch-and-bound node budget
    #[arg(long, global = true)]
    max_nodes: Option<usize>,

    /// Column generation and Lagrangian iteration cap
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Wall-clock limit for iterative engines, in milliseconds
    #[arg(long, global = true)]
    time_limit_ms: Option<u64>,

    /// Pretty-print the JSON response
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a JSON request file and print the response
    Solve {
        /// Endpoint path or name, e.g. /api/lp or lp
        endpoint: String,
        /// The request file
        file: PathBuf,
    },
    /// Validate a JSON request file without solving it
    Check {
        /// Endpoint path or name
        endpoint: String,
        /// The request file
        file: PathBuf,
    },
    /// List the available endpoints
    Endpoints,
}

fn setup_logger(verbose: u8) {
    use fern::colors::{Color, ColoredLevelConfig};
    let colors = ColoredLevelConfig::new()
        .debug(Color::White)
        .info(Color::Green)
        .warn(Color::BrightYellow)
        .error(Color::BrightRed);
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("{:5} | {} | {}", colors.color(record.level()), record.target(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();
    if let Err(e) = result {
        eprintln!("Could not install logger: {}", e);
    }
}

fn read_file(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.settings {
        Some(path) => match serde_json::from_str::<Config>(&read_file(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid settings file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Some(nodes) = cli.max_nodes {
        config.solver = config.solver.with_max_nodes(nodes);
    }
    if let Some(max) = cli.max_iterations {
        config.solver = config.solver.with_max_iterations(max);
    }
    if let Some(ms) = cli.time_limit_ms {
        config.solver = config.solver.with_time_limit_ms(ms);
    }
    config
}

fn print_json(value: &serde_json::Value, pretty: bool) {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match text {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error encoding response: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logger(cli.verbose);
    let api = Api::from_config(load_config(&cli));

    match &cli.command {
        Commands::Solve { endpoint, file } => {
            let body = read_file(file);
            let response = api.handle(endpoint, &body);
            print_json(&response.body, cli.pretty);
            if !response.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Check { endpoint, file } => {
            let body = read_file(file);
            match api.check(endpoint, &body) {
                Ok(endpoint) => println!("{}: request is valid", endpoint),
                Err(e) => {
                    eprintln!("{} ({})", e, e.status_code());
                    std::process::exit(1);
                }
            }
        }
        Commands::Endpoints => {
            for endpoint in Endpoint::ALL {
                let method = if endpoint.takes_body() { "POST" } else { "GET" };
                println!("{:5} {}", method, endpoint.path());
            }
        }
    }
}
