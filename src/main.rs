//! Feed Harvester - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use feed_harvester::{
    api::SocialDataApi,
    cli::Args,
    config::{validate_config, Config},
    download::{
        status_channel, stop_channel, DownloadPool, GlobalState, HarvestSettings, Harvester,
        StopHandle,
    },
    error::{exit_codes, Error, Result},
    output::{
        print_banner, print_config_summary, print_error, print_global_stats, print_info,
        print_run_status, print_success, print_warning, spawn_progress,
    },
    store::DurableStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Upstream { .. } | Error::Http(_) => {
                    ExitCode::from(exit_codes::API_ERROR as u8)
                }
                Error::Download(_) => ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8),
                Error::Cancelled => ExitCode::from(exit_codes::ABORT as u8),
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    // Load configuration
    let config_path = args.config.clone();
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    let usernames = config.resolve_usernames()?;
    validate_config(&config, &usernames)?;

    print_config_summary(
        &usernames,
        config.data_directory(),
        config.options.max_concurrent_downloads,
        config.options.export_directory.as_deref(),
    );

    let api = Arc::new(SocialDataApi::new(
        config.api.api_key.clone(),
        &config.api.base_url,
        &config.api.user_agent,
        Duration::from_secs(config.api.request_timeout_seconds),
    )?);

    let (status_tx, status_rx) = status_channel();
    let (stop_handle, stop_signal) = stop_channel();
    install_ctrl_c(stop_handle);

    let harvester = Harvester::new(
        api.clone(),
        DownloadPool::new(api, config.options.max_concurrent_downloads),
        DurableStore::new(config.data_directory()),
        HarvestSettings::from_config(&config),
    )
    .with_status(status_tx)
    .with_stop_signal(stop_signal.clone());

    let progress = spawn_progress(status_rx, config.options.show_progress);

    print_info(&format!("Harvesting {} user(s)", usernames.len()));
    let statuses = harvester.run_all(&usernames).await;

    // Closing the status channel ends the progress task
    drop(harvester);
    if let Err(e) = progress.await {
        tracing::debug!("Progress task ended abnormally: {}", e);
    }

    let mut global_state = GlobalState::default();
    for status in &statuses {
        print_run_status(status);
        global_state.add_run(status);
    }
    print_global_stats(&global_state);

    if stop_signal.is_stopped() {
        return Err(Error::Cancelled);
    }

    if global_state.collections_failed > 0 {
        print_warning(&format!(
            "{} user(s) failed, run again to resume",
            global_state.collections_failed
        ));
        return Ok(exit_codes::SOME_USERS_FAILED);
    }

    print_success("All users harvested");
    Ok(exit_codes::SUCCESS)
}

/// Stop all runs on the first Ctrl-C.
fn install_ctrl_c(handle: StopHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            print_warning("Interrupted, saving progress...");
            handle.stop();
        }
    });
}
