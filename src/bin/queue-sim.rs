use queue_sim::config::{self, Command, FormatArg};
use queue_sim::engine;
use queue_sim::error::Result;
use queue_sim::optimizer;
use queue_sim::output::{self, Formatter, HumanFormatter, JsonFormatter, SummaryFormatter};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = config::parse_args()?;
    init_tracing(args.verbose);

    match args.command {
        Command::Run(run) => {
            let config = config::build_sim_config(&run.scenario)?;
            let result = engine::run_simulation(&config)?;
            print!("{}", formatter_for(run.format).write_run(&config, &result)?);
        }
        Command::Optimize(opt) => {
            let request = config::build_optimization(&opt)?;
            let outcome = optimizer::optimize(&request)?;
            print!(
                "{}",
                formatter_for(opt.format).write_optimization(&request, &outcome)?
            );
        }
        Command::ShowConfig(scenario) => {
            let config = config::build_sim_config(&scenario)?;
            engine::validate_config(&config)?;
            print!("{}", output::show_config(&config)?);
        }
        Command::ListDistributions => print!("{}", output::list_distributions()),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn formatter_for(format: FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}
