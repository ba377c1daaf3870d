// SPDX-License-Identifier: AGPL-3.0-or-later

mod steering;

use std::path::PathBuf;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

use steering::Steering;
use steering::config::SteeringConfig;
use steering::show::DisplayRequest;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Arg {
    #[arg(
        short,
        long,
        help = "Configuration file",
        default_value = "/etc/steerd/steerd.yaml"
    )]
    config: PathBuf,

    #[arg(short, long, help = "Run as daemon in background")]
    daemon: bool,
}

fn tracing_set() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let arg = Arg::parse();

    tracing_set();

    if arg.daemon {
        tracing::warn!("daemon mode is not wired up yet, running in foreground");
    }

    let config = SteeringConfig::from_path(&arg.config)?;

    let (dtx, mut drx) = tokio::sync::mpsc::unbounded_channel();
    let mut steering = Steering::new(config, dtx);
    steering.init()?;

    // TODO: replace the logging drain with nl80211 driver glue feeding
    // Associate/Disassociate/Probe into steering.tx.
    tokio::spawn(async move {
        while let Some(msg) = drx.recv().await {
            tracing::info!("actuator: {:?}", msg);
        }
    });

    // SIGUSR1 dumps the client table to the log.
    let show_tx = steering.show.tx.clone();
    tokio::spawn(async move {
        let Ok(mut usr1) = signal(SignalKind::user_defined1()) else {
            return;
        };
        while usr1.recv().await.is_some() {
            let (resp, mut rx) = tokio::sync::mpsc::channel(1);
            let req = DisplayRequest {
                detail: true,
                json: false,
                resp,
            };
            if show_tx.send(req).is_err() {
                break;
            }
            if let Some(output) = rx.recv().await {
                for line in output.lines() {
                    tracing::info!("{}", line);
                }
            }
        }
    });

    tracing::info!("steerd started");

    steering.event_loop().await;

    Ok(())
}
