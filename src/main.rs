use clap::{Parser, Subcommand};
use retirement_planner::api::{self, Cli};
use retirement_planner::core::{DEFAULT_EPF_DIVIDEND_RATE, ProjectionEngine};

#[derive(Parser, Debug)]
#[command(
    name = "retirement_planner",
    about = "Deterministic retirement funding projection (EPF + PRS)"
)]
struct Args {
    #[arg(
        long,
        global = true,
        env = "RETIREMENT_EPF_DIVIDEND_RATE",
        default_value_t = DEFAULT_EPF_DIVIDEND_RATE,
        help = "Annual EPF dividend assumption in percent"
    )]
    epf_dividend_rate: f64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the projection HTTP API
    Serve {
        #[arg(long, env = "RETIREMENT_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Compute one projection and print it as JSON
    Project(Cli),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let engine = ProjectionEngine::with_epf_dividend_rate(args.epf_dividend_rate);

    match args.command {
        Command::Serve { port } => {
            if let Err(e) = api::run_http_server(port, engine).await {
                log::error!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(cli) => match api::run_projection_cli(cli, &engine) {
            Ok(json) => println!("{json}"),
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(1);
            }
        },
    }
}
