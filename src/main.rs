use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clusterprobe::migration_from_config;
use clusterprobe::ClientBuilder;
use clusterprobe::ProbeConfig;
use clusterprobe::Result;
use clusterprobe::Session;
use clusterprobe::Suite;
use clusterprobe::SuiteReport;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clusterprobe")]
#[command(version)]
#[command(about = "Verifies cluster properties across dump/restore and routing reloads", long_about = None)]
struct Args {
    /// TOML file applied on top of CONFIG_PATH and defaults
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Overrides client.endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Check the source round trip only, even if a migration command is configured
    #[arg(long, default_value_t = false)]
    skip_migration: bool,

    /// Leave fixture databases on the server after the run
    #[arg(long, default_value_t = false)]
    keep_databases: bool,

    /// Run only the named case; repeatable
    #[arg(long = "case", value_name = "NAME")]
    cases: Vec<String>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_observability();

    match run(args).await {
        Ok(report) => {
            print_summary(&report);
            if report.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<SuiteReport> {
    let mut config = ProbeConfig::new()?;
    if let Some(path) = &args.config {
        config = config.with_override_config(path)?;
    }
    if let Some(endpoint) = args.endpoint {
        config.client.endpoint = endpoint;
    }
    let config = config.validate()?;
    info!("verifying {}", config.client.endpoint);

    let client = ClientBuilder::new(config.client.endpoint.clone())
        .set_config(config.client.clone())
        .build()?;

    let migration = if args.skip_migration {
        None
    } else {
        migration_from_config(&config.migration, &config.client.endpoint)
    };

    let suite = Suite::from_config(&config, migration, args.keep_databases)?;
    let mut session = Session::new(Arc::new(client));
    suite.run(&mut session, &args.cases).await
}

fn print_summary(report: &SuiteReport) {
    for case in &report.cases {
        let status = match (case.passed(), case.scope_note) {
            (true, Some(note)) => format!("PASS ({note})"),
            (true, None) => "PASS".to_string(),
            (false, _) => "FAIL".to_string(),
        };
        println!("{status} {} ({:?})", case.name, case.elapsed);
        if let Some(e) = case.error() {
            println!("     {e}");
        }
        for failure in &case.cleanup.failures {
            println!("     cleanup: {failure}");
        }
    }
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
