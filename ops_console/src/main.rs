use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{info, warn};

use mission_proto::ClientMessage;
use ops_console::app::{ClientEvent, ConsoleApp};
use ops_console::bootstrap::{run_bootstrap, Bootstrap, BootstrapConfig};
use ops_console::config::resolve_port;

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = String::from_utf8(buf.to_vec()) {
            let _ = self.sender.send(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Project Tauntaun operations console", long_about = None)]
struct Cli {
    /// Mission server host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Mission server port. Defaults to the mission web port when omitted.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (log_tx, log_rx) = mpsc::channel::<String>();
    let log_writer_tx = log_tx.clone();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(move || ChannelWriter {
            sender: log_writer_tx.clone(),
        })
        .init();

    let cli = Cli::parse();
    let port = resolve_port(cli.port);
    info!("Connecting to mission server at {}:{}", cli.host, port);

    let (event_tx, event_rx) = mpsc::channel::<ClientEvent>();
    let (command_tx, mut command_rx) = tokio_mpsc::unbounded_channel::<ClientMessage>();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let ui_handle = std::thread::spawn(move || -> color_eyre::Result<()> {
        let app = ConsoleApp::new(event_rx, command_tx, shutdown_tx, log_rx)?;
        app.run()
    });

    let mut machine = Bootstrap::new();
    let outcome = run_bootstrap(&cli.host, port, BootstrapConfig::default(), &mut machine).await;

    let _ = event_tx.send(ClientEvent::Status(machine.status()));
    let _ = event_tx.send(ClientEvent::Connection(machine.is_connected()));

    match outcome {
        Ok((mut gateway, world)) => {
            let close_events = event_tx.clone();
            gateway.on_close(move || {
                let _ = close_events.send(ClientEvent::Connection(false));
            });
            let _ = event_tx.send(ClientEvent::World(Box::new(world)));
            info!("Console initialized. Press 'q' to exit.");

            loop {
                tokio::select! {
                    update = gateway.next_update() => {
                        match update {
                            Some(update) => {
                                let _ = event_tx.send(ClientEvent::Update(update));
                            }
                            None => {
                                warn!("Mission channel closed");
                                break;
                            }
                        }
                    }
                    command = command_rx.recv() => {
                        match command {
                            Some(message) => {
                                if let Err(err) = gateway.send(message) {
                                    warn!("Failed to send command: {}", err);
                                }
                            }
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        if shutdown_rx.try_recv().is_ok() {
                            break;
                        }
                    }
                }
            }
        }
        Err(err) => {
            warn!("Initialization failed: {}", err);
        }
    }

    wait_for_shutdown(&shutdown_rx, &ui_handle).await;
    match ui_handle.join() {
        Ok(result) => result?,
        Err(_) => warn!("Console thread panicked"),
    }
    Ok(())
}

async fn wait_for_shutdown(
    shutdown_rx: &mpsc::Receiver<()>,
    ui_handle: &std::thread::JoinHandle<color_eyre::Result<()>>,
) {
    loop {
        if shutdown_rx.try_recv().is_ok() || ui_handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
