use clap::Parser;
use std::path::PathBuf;
use std::process;

pub const DEFAULT_REPORT_PATH: &str = "user_credentials.csv";
pub const DEFAULT_COLLECTION: &str = "users";

/// Creates Firebase users in bulk from a CSV file.
#[derive(Debug, Parser)]
#[command(name = "bulk_user_creator", version, about)]
pub struct Cli {
    /// CSV file with first_name, last_name, email and practice_name columns
    pub input_file: PathBuf,

    /// Service account key file; ambient credentials are used when omitted
    pub service_account: Option<PathBuf>,

    /// Where to write the credentials report
    #[arg(short, long, default_value = DEFAULT_REPORT_PATH)]
    pub output: PathBuf,

    /// Firebase project id, if it cannot be read from the credentials
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project_id: Option<String>,

    /// Document collection that holds user profiles
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Delete an identity again when its profile document could not be written
    #[arg(long)]
    pub rollback_orphans: bool,

    #[arg(long, env = "FIREBASE_AUTH_EMULATOR_HOST", hide = true)]
    pub auth_emulator_host: Option<String>,

    #[arg(long, env = "FIRESTORE_EMULATOR_HOST", hide = true)]
    pub firestore_emulator_host: Option<String>,
}

/// Everything the platform client needs to connect.
#[derive(Debug, Clone, Default)]
pub struct PlatformSettings {
    pub service_account: Option<PathBuf>,
    pub project_id: Option<String>,
    pub collection: String,
    pub auth_emulator_host: Option<String>,
    pub firestore_emulator_host: Option<String>,
}

impl PlatformSettings {
    /// Both services point at local emulators, so no real credentials are needed.
    pub fn emulators_only(&self) -> bool {
        self.auth_emulator_host.is_some() && self.firestore_emulator_host.is_some()
    }
}

impl Cli {
    /// Parses the command line, exiting with status 1 on usage errors.
    pub fn parse_or_exit() -> Self {
        match Cli::try_parse() {
            Ok(cli) => cli,
            Err(e) => {
                let code = if e.use_stderr() { 1 } else { 0 };
                let _ = e.print();
                process::exit(code);
            }
        }
    }

    pub fn platform_settings(&self) -> PlatformSettings {
        PlatformSettings {
            service_account: self.service_account.clone(),
            project_id: self.project_id.clone(),
            collection: self.collection.clone(),
            auth_emulator_host: self.auth_emulator_host.clone(),
            firestore_emulator_host: self.firestore_emulator_host.clone(),
        }
    }
}
