//! `pqueue`: bounded priority queue served over a console and an HTTP API.

mod config;
mod console;
mod http;
mod seed;
mod telemetry;
mod wire;

use std::sync::Arc;
use std::time::Duration;

use pqueue_core::BoundedQueue;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{BufReader, stdin, stdout};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::console::{Console, ConsoleError};
use crate::http::AppState;

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler, continuing without it");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}

/// Why the front ends stopped running.
#[derive(Debug)]
enum Stopped {
    Console,
    Signal,
    /// The HTTP task finished on its own, typically because the bind failed.
    Http(std::io::Result<()>),
}

/// Wait until the console exits, the HTTP task ends, or shutdown is signalled.
async fn wait_for_stop<C>(
    console: Option<C>,
    http_task: Option<&mut JoinHandle<std::io::Result<()>>>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Stopped
where
    C: Future<Output = Result<(), ConsoleError>>,
{
    let console = async {
        match console {
            Some(console) => {
                if let Err(e) = console.await {
                    error!(error = %e, "console stopped");
                }
            }
            None => std::future::pending().await,
        }
    };
    let http = async {
        match http_task {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => Err(std::io::Error::other(e)),
            },
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        () = console => Stopped::Console,
        result = http => Stopped::Http(result),
        _ = shutdown.recv() => Stopped::Signal,
    }
}

/// Bounds how long a pending stdin read can hold up process exit.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(200);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    telemetry::init(config.log_file.as_deref())?;
    info!(
        queue = %config.queue_name,
        capacity = config.capacity,
        http = config.http_enabled,
        console = config.console_enabled,
        "starting pqueue"
    );

    let state: AppState = Arc::new(BoundedQueue::new(
        config.queue_name.clone(),
        config.queue_description.clone(),
        config.capacity,
    ));

    let mut rng = StdRng::from_entropy();
    seed::seed_demo_tasks(state.as_ref(), config.seed_tasks, &mut rng).await;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut signal_rx = shutdown_tx.subscribe();
    tokio::spawn(shutdown_signal(shutdown_tx.clone()));

    let mut http_task = config.http_enabled.then(|| {
        tokio::spawn(http::serve(
            config.http_addr(),
            Arc::clone(&state),
            shutdown_tx.subscribe(),
        ))
    });
    let console = config.console_enabled.then(|| {
        let mut console = Console::new(Arc::clone(&state), BufReader::new(stdin()), stdout());
        async move { console.run().await }
    });

    if console.is_some() || http_task.is_some() {
        let stopped = wait_for_stop(console, http_task.as_mut(), &mut signal_rx).await;
        let _ = shutdown_tx.send(());
        if let Stopped::Http(result) = stopped {
            http_task = None;
            if let Err(e) = result {
                error!(error = %e, "HTTP API failed");
                return Err(e.into());
            }
            info!("HTTP API exited");
        }
    }

    if let Some(task) = http_task {
        task.await.map_err(std::io::Error::other)??;
    }
    info!("pqueue stopped");
    Ok(())
}
