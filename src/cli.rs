//! CLI argument parsing and execution

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::LevelFilter;

use rucio_register::client_config::{self, ClientConfig};
use rucio_register::config::{self, Settings};
use rucio_register::item::UploadItem;
use rucio_register::logging::LogContext;
use rucio_register::orchestrator::Orchestrator;
use rucio_register::output::OutputConfig;
use rucio_register::replica::{ReplicaCatalogue, RestCatalogue, UnconfiguredCatalogue};
use rucio_register::rucio::{self, GlobalOptions};
use rucio_register::upload::RucioUploadClient;

/// Registers files to Rucio
#[derive(Parser, Debug)]
#[command(name = "rucio-register")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Local file path(s) to upload
    #[arg(short = 'f', long = "file", value_name = "PATH", num_args = 1.., required = true)]
    files: Vec<PathBuf>,

    /// Data identifier(s) for the Rucio catalogue, one per file
    #[arg(short = 'd', long = "did", value_name = "DID", num_args = 1.., required = true)]
    dids: Vec<String>,

    /// Scope applied to every file and its dataset
    #[arg(short = 's', long = "scope", value_name = "SCOPE")]
    scope: String,

    /// Storage element to upload to (defaults to the config file, then EIC-XRD)
    #[arg(short = 'r', long = "rse", value_name = "RSE")]
    rse: Option<String>,

    /// Transfer the bytes without registering the replicas in the catalogue
    #[arg(long = "noregister", visible_alias = "no-register")]
    no_register: bool,

    /// Path to config file
    #[arg(long, value_name = "PATH", env = "RUCIO_REGISTER_CONFIG")]
    config: Option<PathBuf>,

    /// Rucio server URL
    #[arg(long, value_name = "URL", env = "RUCIO_HOST")]
    rucio_host: Option<String>,

    /// Rucio account to act as
    #[arg(long, value_name = "NAME", env = "RUCIO_ACCOUNT")]
    account: Option<String>,

    /// Rucio auth token for catalogue requests
    #[arg(long, value_name = "TOKEN", env = "RUCIO_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Path to the rucio executable
    #[arg(long, value_name = "PATH", env = "RUCIO_REGISTER_BIN")]
    rucio_bin: Option<PathBuf>,

    /// Print the upload descriptors as JSON and exit without uploading
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Suppress summary output
    #[arg(short, long)]
    quiet: bool,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Rewrites the single-dash `-noregister` spelling into the long flag clap
/// understands.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-noregister" {
                OsString::from("--noregister")
            } else {
                arg
            }
        })
        .collect()
}

impl Cli {
    /// Execute the registration
    pub fn execute(self) -> Result<()> {
        let output = OutputConfig::from_env_and_flag(&self.color, self.quiet);
        let level: LevelFilter = self
            .log_level
            .parse()
            .map_err(|_| anyhow!("Invalid log level: {}", self.log_level))?;
        let log = LogContext::stderr(level, output.use_color);

        let settings = config::load(self.config.as_deref())?.merge(self.overrides());
        let rse = settings.rse().to_string();

        let items = UploadItem::batch(
            &self.files,
            &self.dids,
            &self.scope,
            &rse,
            self.no_register,
        )?;

        if self.dry_run {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        let uploader = RucioUploadClient::new(
            rucio::resolve_bin(settings.rucio_bin.as_deref()),
            GlobalOptions {
                host: settings.rucio_host.clone(),
                account: settings.account.clone(),
            },
        );

        // The rucio command reads rucio.cfg itself; only the catalogue needs it here
        let settings = match ClientConfig::discover(&client_config::process_env)? {
            Some(client) => {
                log.debug(format_args!(
                    "Read Rucio client settings from {}",
                    client.path.display()
                ));
                client.settings().merge(settings)
            }
            None => settings,
        };
        let catalogue = connect_catalogue(&settings, &log)?;

        match Orchestrator::new(&uploader, catalogue.as_ref(), &log).run(&items) {
            Ok(()) => {
                output.summary(
                    "✅",
                    "[OK]",
                    &format!("Uploaded {} file(s) to {}", items.len(), rse),
                );
                Ok(())
            }
            Err(e) if e.is_incomplete_upload() => {
                output.summary(
                    "❌",
                    "[FAILED]",
                    &format!("Upload incomplete, replicas at {} reconciled", rse),
                );
                Err(e.into())
            }
            Err(e) => {
                output.summary("❌", "[FAILED]", "Upload failed");
                Err(e.into())
            }
        }
    }

    fn overrides(&self) -> Settings {
        Settings {
            rucio_host: self.rucio_host.clone(),
            account: self.account.clone(),
            auth_token: self.auth_token.clone(),
            rucio_bin: self.rucio_bin.clone(),
            rse: self.rse.clone(),
            timeout_secs: None,
            ca_cert: None,
        }
    }
}

fn connect_catalogue(settings: &Settings, log: &LogContext) -> Result<Box<dyn ReplicaCatalogue>> {
    let Some(url) = settings.catalogue_url()? else {
        log.debug(format_args!(
            "No Rucio host configured; replicas cannot be reconciled"
        ));
        return Ok(Box::new(UnconfiguredCatalogue));
    };

    let auth_token = settings.auth_token.clone().or_else(|| {
        let account = settings.account.as_deref()?;
        let token = client_config::cached_token(account, &client_config::process_env);
        if token.is_some() {
            log.debug(format_args!(
                "Forwarding the token the Rucio client cached for {}",
                account
            ));
        }
        token
    });

    let catalogue = RestCatalogue::new(
        url,
        settings.account.as_deref(),
        auth_token.as_deref(),
        settings.ca_cert.as_deref(),
        settings.timeout(),
    )?;
    log.debug(format_args!(
        "Using Rucio catalogue at {}",
        catalogue.base_url()
    ));
    Ok(Box::new(catalogue))
}
