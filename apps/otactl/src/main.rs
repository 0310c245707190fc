#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! otactl - A/B over-the-air update orchestrator
//!
//! Wires configuration, the state database, the platform layer and the
//! update engine into an orchestrator and exposes its operations as
//! commands.

mod cli;
mod display;
mod error;
mod events;
mod follow;
mod logging;
mod packages;
mod setup;

use crate::cli::{Cli, Commands};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use crate::setup::SystemSetup;
use clap::Parser;
use ota_config::{constants, Config, GeneralConfig};
use ota_events::{EventEmitter, EventReceiver, EventSender};
use ota_net::{Download, DownloadOutcome};
use ota_types::{ColorChoice, OutputFormat, UpdateConfig, UpdaterState};
use std::path::PathBuf;
use std::process;
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!(command = cli.command.name(), "Starting otactl v{}", env!("CARGO_PKG_VERSION"));
    cli.command
        .validate()
        .map_err(CliError::InvalidArguments)?;

    // Precedence: file (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global)?;

    let mut setup = SystemSetup::new(config.clone());
    setup.initialize().await?;

    let (event_sender, event_receiver) = ota_events::channel();
    let (json_output, color) = output_mode(cli.global.json, &config.general);
    let renderer = OutputRenderer::new(json_output, color);

    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, !json_output, cli.global.debug);

    let result = execute_command_with_events(
        run_command(cli.command, &setup, event_sender),
        event_receiver,
        &mut event_handler,
    )
    .await;
    setup.shutdown().await;

    renderer.render_result(&result?)?;
    info!("Command completed successfully");
    Ok(())
}

/// Drive `command` while rendering events as they arrive
async fn execute_command_with_events(
    command: impl std::future::Future<Output = Result<CommandResult, CliError>>,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(command);

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute `command`, bracketed by operation events
async fn run_command(
    command: Commands,
    setup: &SystemSetup,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    let operation = command.name();
    event_sender.emit_operation_started(operation);
    let result = execute_command(command, setup, event_sender.clone()).await;
    match &result {
        Ok(_) => event_sender.emit_operation_completed(operation, true),
        Err(e) => event_sender.emit_operation_failed(operation, e.to_string()),
    }
    result
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    setup: &SystemSetup,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Inspect { package } => {
            let device = setup.platform().device().product().await?;
            let descriptor = ota_package::inspect_file(&package, &device).await?;
            Ok(CommandResult::Descriptor {
                path: package,
                device,
                descriptor,
            })
        }

        Commands::Status => {
            let record = setup.persistence()?.load_or_default().await;
            Ok(CommandResult::Status {
                state: record.updater_state(),
                record,
            })
        }

        Commands::Apply { package } => apply_package(setup, event_sender, package).await,

        Commands::Recover => {
            let orchestrator = setup.orchestrator(event_sender)?;
            let states = follow::watch_states(&orchestrator).await;
            orchestrator.reconcile_on_start().await?;
            orchestrator.bind().await?;
            let mut interrupts = follow::interrupts();
            let state = follow::follow_update(&orchestrator, states, &mut interrupts).await?;
            finish(&orchestrator, state).await
        }

        Commands::Reset => {
            let orchestrator = setup.orchestrator(event_sender)?;
            orchestrator.reconcile_on_start().await?;
            orchestrator.force_idle("reset from otactl").await;
            Ok(CommandResult::Status {
                state: Some(orchestrator.state().await),
                record: orchestrator.record().await,
            })
        }

        Commands::Reboot => {
            let orchestrator = setup.orchestrator(event_sender)?;
            orchestrator.reconcile_on_start().await?;
            orchestrator.request_reboot().await?;
            Ok(CommandResult::Success {
                message: "Reboot requested".to_string(),
            })
        }

        Commands::Check => {
            let (device, build_time) = setup.device_build().await?;
            let update = ota_net::check_for_update(
                &setup.net_client()?,
                &setup.config().network.updates_url,
                &device,
                build_time,
                &event_sender,
            )
            .await?;
            Ok(CommandResult::Update {
                device,
                build_time,
                update,
            })
        }

        Commands::Download {
            url,
            restart,
            apply,
        } => download_package(setup, event_sender, url, restart, apply).await,

        Commands::List => {
            let dir = setup.config().packages_dir();
            let packages = packages::list_packages(&dir).await?;
            Ok(CommandResult::Packages { dir, packages })
        }
    }
}

/// Download `url`, or the build offered by the update server, into the
/// packages directory, optionally applying it
async fn download_package(
    setup: &SystemSetup,
    event_sender: EventSender,
    url: Option<String>,
    restart: bool,
    apply: bool,
) -> Result<CommandResult, CliError> {
    let client = setup.net_client()?;
    let (url, expected_size) = match url {
        Some(url) => (url, None),
        None => {
            let (device, build_time) = setup.device_build().await?;
            let update = ota_net::check_for_update(
                &client,
                &setup.config().network.updates_url,
                &device,
                build_time,
                &event_sender,
            )
            .await?;
            match update {
                Some(update) => (update.url, Some(update.size)),
                None => {
                    return Ok(CommandResult::Update {
                        device,
                        build_time,
                        update: None,
                    })
                }
            }
        }
    };

    let dest = setup
        .config()
        .packages_dir()
        .join(ota_net::file_name_from_url(&url)?);
    let mut download = Download::new(&url, dest)?;
    if let Some(size) = expected_size.filter(|&size| size > 0) {
        download = download.with_expected_size(size);
    }
    if restart && download.discard_partial().await? {
        info!(path = %download.partial_path().display(), "partial download discarded");
    }

    let (path, size) = fetch(download, client, event_sender.clone()).await?;
    if apply {
        return apply_package(setup, event_sender, path).await;
    }
    Ok(CommandResult::Downloaded { url, path, size })
}

/// Apply `package` and follow the update to its end
async fn apply_package(
    setup: &SystemSetup,
    event_sender: EventSender,
    package: PathBuf,
) -> Result<CommandResult, CliError> {
    let orchestrator = setup.orchestrator(event_sender)?;
    orchestrator.reconcile_on_start().await?;
    orchestrator.bind().await?;

    let states = follow::watch_states(&orchestrator).await;
    let config = UpdateConfig::from_package_path(package);
    orchestrator.apply_update(&config).await?;
    let mut interrupts = follow::interrupts();
    let state = follow::follow_update(&orchestrator, states, &mut interrupts).await?;
    finish(&orchestrator, state).await
}

/// Run `download` to completion. Ctrl-C pauses it and keeps the partial
/// file for the next run.
async fn fetch(
    download: Download,
    client: ota_net::NetClient,
    event_sender: EventSender,
) -> Result<(PathBuf, u64), CliError> {
    let mut handle = download.start(client, event_sender);
    let mut interrupts = follow::interrupts();

    let finished = select! {
        outcome = handle.wait() => Some(outcome),
        Some(()) = interrupts.recv() => None,
    };
    let outcome = match finished {
        Some(outcome) => outcome?,
        None => {
            info!("interrupt received, pausing download");
            handle.pause();
            handle.finish().await?
        }
    };

    match outcome {
        DownloadOutcome::Completed { path, size } => Ok((path, size)),
        DownloadOutcome::Paused { bytes_downloaded } => Err(CliError::Interrupted(format!(
            "download paused at {bytes_downloaded} bytes; run `otactl download` again to resume"
        ))),
        DownloadOutcome::Cancelled => Err(CliError::Interrupted("download cancelled".to_string())),
    }
}

/// Switch slots if the engine left that to us, then persist, unbind, and
/// turn the final state into a result
async fn finish(
    orchestrator: &ota_orchestrator::UpdateOrchestrator,
    state: UpdaterState,
) -> Result<CommandResult, CliError> {
    let switched = if state == UpdaterState::SlotSwitchRequired {
        info!("payload written to the inactive slot, switching on next reboot");
        orchestrator.set_switch_slot_on_reboot().await
    } else {
        Ok(())
    };
    if let Err(e) = &switched {
        warn!(error = %e, "slot switch refused");
    }
    let state = orchestrator.state().await;

    orchestrator.persist_snapshot().await?;
    orchestrator.unbind().await?;
    switched?;
    let record = orchestrator.record().await;

    match state {
        UpdaterState::Idle => Ok(CommandResult::Status {
            state: Some(state),
            record,
        }),
        other => Err(CliError::Unfinished(format!(
            "{} ({})",
            other.record_text(),
            record.engine_error_state
        ))),
    }
}

/// JSON output and color choice. `--json` or a `json` default output
/// selects JSON; a `plain` default output turns colors off unless a color
/// was chosen explicitly.
fn output_mode(json_flag: bool, general: &GeneralConfig) -> (bool, ColorChoice) {
    match general.default_output {
        OutputFormat::Json => (true, general.color),
        OutputFormat::Plain if general.color == ColorChoice::Auto => (json_flag, ColorChoice::Never),
        OutputFormat::Plain | OutputFormat::Tty => (json_flag, general.color),
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        let log_dir = std::path::Path::new(constants::LOGS_DIR);
        let log_file = log_dir.join(format!(
            "otactl-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        let file = std::fs::create_dir_all(log_dir).and_then(|()| std::fs::File::create(&log_file));
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(filter("info,otactl=debug,ota_orchestrator=debug"))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // Keep stdout clean for the JSON result
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn"))
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) -> Result<(), CliError> {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Some(device) = &global.device {
        if device.trim().is_empty() {
            return Err(CliError::InvalidArguments(
                "--device must not be empty".to_string(),
            ));
        }
        config.device.product = Some(device.clone());
    }

    Ok(())
}
