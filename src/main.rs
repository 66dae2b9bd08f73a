use clap::Parser;
use eyre::Result;
use otlp_metrics_example::{Config, Telemetry, sample};
use std::future::pending;
use tokio::{signal, task::block_in_place, time::sleep};
use tracing::{info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let config = Config::parse();
    let telemetry = Telemetry::init(&config)?;

    let meter = telemetry.meter(config.sample.meter_name.clone());
    let _instruments = sample::record(&meter, &config.sample);

    // The tonic channel lives on this runtime, so blocking SDK calls must not park a worker.
    if let Err(error) = block_in_place(|| telemetry.flush()) {
        warn!(error = %format!("{error:#}"), "Failed to flush telemetry");
    }

    info!(linger = %humantime::format_duration(config.linger), "Waiting before shutdown");
    tokio::select! {
        _ = sleep(config.linger) => {}
        _ = interrupted() => info!("Interrupted, shutting down early"),
    }

    if let Err(error) = block_in_place(|| telemetry.shutdown()) {
        warn!(error = %format!("{error:#}"), "Failed to shut down telemetry");
    }

    println!("done");
    Ok(())
}

async fn interrupted() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "Failed to listen for Ctrl-C");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "Failed to listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
