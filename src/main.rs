use clap::Parser;
use eyre::Result;
use tracing::info;
use wave_portal_client::{init_logging, Command, Options, WavePortalController};

fn show(controller: &WavePortalController, json: bool) -> Result<()> {
    for notice in controller.take_notices() {
        eprintln!("{}", notice);
    }

    let view = controller.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", view);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();
    let options = Options::parse();

    let ethereum = options.ethereum()?;
    let controller = WavePortalController::new(ethereum, options.variant());

    controller.initialize().await;

    match options.command.clone() {
        Command::Status => {}
        Command::Connect => {
            if controller.session().is_none() {
                controller.connect_wallet().await;
            } else {
                info!("Already connected");
            }
        }
        Command::Wave { message } => {
            if let Some(message) = message {
                controller.set_message(message);
            }

            if controller.view().can_wave() {
                println!("Sending wave...");
                controller.submit_wave().await;
            } else {
                eprintln!("Wave at Me is disabled: connect a wallet and write a message first");
            }
        }
        Command::Watch => {
            let mut changes = controller.changes();
            show(&controller, options.json)?;

            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        show(&controller, options.json)?;
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    controller.teardown().await;
    show(&controller, options.json)
}
