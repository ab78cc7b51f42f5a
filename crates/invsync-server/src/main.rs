use std::env;

use invsync_server::InventoryApp;
use invsync_server::config::loader::{DEFAULT_CONFIG_FILE, load_config, render_toml};

/// Where the configuration path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigOrigin {
    Flag,
    Env,
    Default,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Flag => "--config",
            Self::Env => "INVSYNC_CONFIG",
            Self::Default => "default",
        })
    }
}

/// Command line of the service binary.
#[derive(Debug)]
struct Cli {
    config_path: String,
    origin: ConfigOrigin,
    /// Print the effective configuration as TOML and exit.
    print_config: bool,
    /// Run every target once, print the reports and exit.
    once: bool,
}

impl Cli {
    /// Scans `args` once. `--config` wins over `INVSYNC_CONFIG`, which wins
    /// over `invsync.toml`. Unknown arguments are reported and ignored.
    fn parse(args: impl IntoIterator<Item = String>, env_path: Option<String>) -> Self {
        let mut flag_path = None;
        let mut print_config = false;
        let mut once = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => flag_path = args.next(),
                "--print-config" => print_config = true,
                "--once" => once = true,
                other => eprintln!("Ignoring unknown argument: {other}"),
            }
        }

        let (config_path, origin) = match (flag_path, env_path.filter(|p| !p.is_empty())) {
            (Some(path), _) => (path, ConfigOrigin::Flag),
            (None, Some(path)) => (path, ConfigOrigin::Env),
            (None, None) => (DEFAULT_CONFIG_FILE.to_string(), ConfigOrigin::Default),
        };

        Self {
            config_path,
            origin,
            print_config,
            once,
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    invsync_server::observability::init_tracing();

    let cli = Cli::parse(env::args().skip(1), env::var("INVSYNC_CONFIG").ok());
    let cfg = match load_config(Some(&cli.config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    if cli.print_config {
        match render_toml(&cfg) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        }
        return;
    }

    tracing::info!(
        path = %cli.config_path,
        origin = %cli.origin,
        targets = cfg.scheduler.targets.len(),
        "Configuration loaded"
    );
    invsync_server::observability::apply_logging_level(&cfg.logging.level);

    if let Err(err) = run(cfg, cli.once).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cfg: invsync_server::AppConfig, once: bool) -> anyhow::Result<()> {
    let app = InventoryApp::from_config(cfg).await?;

    if once {
        let mut failed = 0usize;
        for result in app.run_once().await {
            match result {
                Ok(report) => println!("{}", serde_json::to_string(&report)?),
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, "Cycle failed");
                }
            }
        }
        anyhow::ensure!(failed == 0, "{failed} cycle(s) failed");
        return Ok(());
    }

    app.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await;
    Ok(())
}
