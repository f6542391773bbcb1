//! Long-running monitor: poller, sinks and the optional web server.

use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use deathwatch_core::sinks::DEATH_FILE_NAME;
use deathwatch_core::{
    CounterSink, DeathCounter, DeathPoller, Profile, TextFileSink, WebError, WebServer,
};
use deathwatch_types::AppConfig;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Web(#[from] WebError),

    #[error("{task} task failed: {source}")]
    Task {
        task: &'static str,
        #[source]
        source: JoinError,
    },
}

/// Prints each published change to stdout with a local timestamp.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    fn line(profile: &Profile, timestamp: &str) -> String {
        format!("[{timestamp}] {} - Deaths: {}", profile.name, profile.deaths)
    }
}

impl CounterSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn publish(&self, profile: &Profile) -> io::Result<()> {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        println!("{}", Self::line(profile, &timestamp));
        Ok(())
    }
}

/// Run until Ctrl+C. The web server is bound before anything is spawned so a
/// port conflict fails fast.
pub async fn run_service(config: AppConfig, output_dir: &Path) -> Result<(), ServiceError> {
    let counter = Arc::new(DeathCounter::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut sinks: Vec<Box<dyn CounterSink>> = vec![Box::new(ConsoleSink)];
    if config.enable_web_ui {
        sinks.push(Box::new(Arc::clone(&counter)));
    }
    if config.enable_text_file {
        let sink = TextFileSink::new(output_dir.join(DEATH_FILE_NAME));
        println!("Death count will be written to: {}", sink.path().display());
        sinks.push(Box::new(sink));
    }

    let server = if config.enable_web_ui {
        Some(WebServer::bind(config.web_port, Arc::clone(&counter)).await?)
    } else {
        None
    };

    println!("Monitoring character in slot {}", config.character_slot);
    if server.is_some() {
        println!("Web overlay: http://localhost:{}", config.web_port);
    }
    println!("Press Ctrl+C to stop");

    let mut poller = tokio::spawn(DeathPoller::new(config, sinks).run(shutdown_rx.clone()));
    let mut web = server.map(|server| tokio::spawn(server.serve(shutdown_rx)));

    // A handle that already completed inside the select must not be polled again
    let mut poller_done = None;
    let mut web_done = None;
    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown requested"),
        result = &mut poller => {
            warn!("Poller stopped unexpectedly");
            poller_done = Some(result);
        }
        result = wait_for(web.as_mut()) => {
            warn!("Web server stopped unexpectedly");
            web_done = Some(result);
        }
    }

    let _ = shutdown_tx.send(true);

    join("poller", poller_done, poller).await?;
    if let Some(web) = web {
        join("web server", web_done, web).await?;
    }

    info!("Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Resolves when the task does; never resolves without one.
async fn wait_for(handle: Option<&mut JoinHandle<()>>) -> Result<(), JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn join(
    task: &'static str,
    finished: Option<Result<(), JoinError>>,
    handle: JoinHandle<()>,
) -> Result<(), ServiceError> {
    let result = match finished {
        Some(result) => result,
        None => handle.await,
    };
    result.map_err(|source| ServiceError::Task { task, source })
}
