use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use duty_cover::config::AppConfig;
use duty_cover::demo::{generate_demo_input, DemoParameters};
use duty_cover::display::{print_plan, write_plan_csv, write_plan_to_file};
use duty_cover::error::AppError;
use duty_cover::parser::load_coverage_input;
use duty_cover::schedule::{plan_coverage_with, summarize, CoverageInput, Options, PlanSettings};
use duty_cover::{telemetry, web};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "duty-cover",
    about = "Assign free staff to cover absent teachers' classes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan cover from a directory of CSV files
    Assign {
        /// Directory holding staff.csv, availability.csv and optionally locks.csv / excluded.csv
        #[arg(long, default_value = "data")]
        data: PathBuf,
        #[command(flatten)]
        rules: RuleArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Plan cover for a seeded random problem
    Demo {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 12)]
        staff: usize,
        #[arg(long, default_value_t = 20)]
        classes: usize,
        #[command(flatten)]
        rules: RuleArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Start the HTTP service
    Web {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Engine rules; anything left unset falls back to the environment configuration
#[derive(Args, Debug, Default)]
struct RuleArgs {
    /// Don't give anyone a first duty in a period next to one they already cover
    #[arg(long)]
    prevent_consecutive: bool,
    /// How many classes one person may cover in the same period
    #[arg(long)]
    max_per_slot: Option<i64>,
    /// Switch the consecutive-period rule off even when requested
    #[arg(long)]
    ignore_consecutive_limit: bool,
    /// Skip the fairness rebalancing pass
    #[arg(long)]
    no_fairness: bool,
}

impl RuleArgs {
    fn options(&self, defaults: Options) -> Options {
        Options {
            prevent_consecutive: self.prevent_consecutive || defaults.prevent_consecutive,
            max_per_slot: match self.max_per_slot {
                Some(raw) => duty_cover::schedule::types::normalize_max_per_slot(Some(raw)),
                None => defaults.max_per_slot,
            },
            ignore_consecutive_limit: self.ignore_consecutive_limit || defaults.ignore_consecutive_limit,
        }
    }

    fn settings(&self) -> PlanSettings {
        PlanSettings {
            fairness: !self.no_fairness,
            ..PlanSettings::default()
        }
    }
}

#[derive(Args, Debug, Default)]
struct OutputArgs {
    /// Write the text rendering of the plan to this file
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write the plan as CSV rows to this file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let cli = Cli::parse();
    match cli.command {
        Command::Assign { data, rules, output } => {
            let input = load_coverage_input(&data)?;
            run_plan(&input, &rules, &output, config.options)
        }
        Command::Demo {
            seed,
            staff,
            classes,
            rules,
            output,
        } => {
            let params = DemoParameters {
                staff,
                classes,
                ..DemoParameters::default()
            };
            info!(seed, staff, classes, "generating demo problem");
            let input = generate_demo_input(seed, &params);
            run_plan(&input, &rules, &output, config.options)
        }
        Command::Web { port } => {
            let mut server = config.server.clone();
            if let Some(port) = port {
                server.port = port;
            }
            let addr = server.socket_addr()?;
            println!("Access the service at http://{}", addr);
            web::start_server(addr, config.options).await?;
            Ok(())
        }
    }
}

fn run_plan(input: &CoverageInput, rules: &RuleArgs, output: &OutputArgs, defaults: Options) -> Result<(), AppError> {
    let options = rules.options(defaults);
    let plan = plan_coverage_with(input, &options, &rules.settings());
    let loads = summarize(&plan, input);
    print_plan(&plan, input, &loads);

    if let Some(path) = &output.output {
        write_plan_to_file(&plan, path)?;
        println!("\nPlan saved to {}", path.display());
    }
    if let Some(path) = &output.csv {
        write_plan_csv(&plan, path)?;
        println!("CSV saved to {}", path.display());
    }
    Ok(())
}
