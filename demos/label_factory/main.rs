use labsim::core::execution::{run_replications, ConcurrencyMode, SweepConfig};
use labsim::workload::{run_factory, FactoryConfig, FactoryRun};
use std::fs;

/// Command line options: `[CONFIG.json] [--json] [--replications N]`
#[derive(Debug, Default)]
struct Options {
    config_path: Option<String>,
    json: bool,
    replications: Option<usize>,
}

fn parse_args() -> Result<Options, Box<dyn std::error::Error>> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => options.json = true,
            "--replications" => {
                let count = args.next().ok_or("--replications needs a count")?;
                options.replications = Some(count.parse()?);
            }
            path if !path.starts_with("--") => options.config_path = Some(path.to_string()),
            other => return Err(format!("unknown option {}", other).into()),
        }
    }
    Ok(options)
}

fn load_config(path: Option<&str>) -> Result<FactoryConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => FactoryConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_run(run: &FactoryRun, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        print!("{}", run.report);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let options = parse_args()?;
    let config = load_config(options.config_path.as_deref())?;

    println!("Label factory simulation");
    println!("  Horizon: {} days, one order every {} h", config.days, config.hours_per_order);
    println!(
        "  Staff: {} designers, {} supervisors",
        config.resources.designers, config.resources.supervisors
    );
    println!(
        "  Machines: {} printers, {} stampers, {} plotters, {} finishing machines",
        config.resources.printers,
        config.resources.stampers,
        config.resources.plotters,
        config.resources.finishing_machines
    );
    println!();

    match options.replications {
        None => {
            let run = run_factory(&config)?;
            print_run(&run, options.json)?;
        }
        Some(count) => {
            let sweep = SweepConfig::new(count, config.random_seed.unwrap_or(0))
                .with_concurrency(ConcurrencyMode::Rayon);
            let runs = run_replications(&sweep, |seed| {
                run_factory(&config.clone().with_random_seed(Some(seed)))
            })?;

            if options.json {
                let reports: Vec<_> = runs.iter().map(|run| &run.report).collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!("{:>6} | {:>8} | {:>16}", "seed", "orders", "mean time [min]");
                for run in &runs {
                    println!(
                        "{:>6} | {:>8} | {:>16.2}",
                        run.report.seed,
                        run.orders_completed(),
                        run.mean_time_in_system().unwrap_or(f64::NAN)
                    );
                }
            }
        }
    }

    Ok(())
}
