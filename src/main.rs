use std::io;
use std::process;

use tracing::{info, warn};

mod config;
mod csv_handler;
mod errors;
mod logging;
mod models;
mod platform;
mod provisioner;
mod report;
mod validator;

use config::Cli;
use errors::ProvisionError;
use platform::firebase::FirebaseClient;
use provisioner::Provisioner;

fn main() {
    let cli = Cli::parse_or_exit();
    logging::init_logging();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), ProvisionError> {
    println!("RefractiveExchange Bulk User Creator");
    println!("{}", "=".repeat(40));

    // 1. Read and check the input before touching the platform.
    info!("Processing CSV file: {}", cli.input_file.display());
    let rows = csv_handler::read_users(&cli.input_file)?;
    if rows.is_empty() {
        return Err(ProvisionError::NothingProcessed);
    }

    // 2. Connect to Firebase.
    let client = FirebaseClient::connect(&cli.platform_settings())?;
    info!("Firebase initialized for project {}", client.project_id());
    warn!(
        "Every account receives the same shared temporary password; distribute the report securely"
    );

    // 3. Provision each row.
    let mut provisioner = Provisioner::new(client).with_rollback(cli.rollback_orphans);
    let outcomes = csv_handler::process_users(&rows, &mut provisioner);

    // 4. Write the credentials report, then summarize.
    if let Err(e) = report::finish_run(&outcomes, &cli.output, io::stdout().lock()) {
        eprintln!("{}", e);
    }
    Ok(())
}
