use std::collections::BTreeSet;
use std::io::{self, BufRead};
use std::sync::Arc;
use tokio::{runtime::Builder, sync::mpsc, task::LocalSet};

use bluer::adv::Advertisement;
use gatt_peripheral::{
    config::AppConfig, gatt::request::AccessRequest, AdapterLocator, BluezBridge, BluezLocator,
    FixedNetworks, Peripheral,
};

fn main() {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    LocalSet::new().block_on(&runtime, async {
        if let Err(err) = start_app().await {
            log::error!("{}", err);
            std::process::exit(1);
        }
    });
}

async fn start_app() -> Result<(), gatt_peripheral::error::Error> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    if let Err(err) = pretty_env_logger::try_init() {
        eprintln!("WARNING: failed to initialize logging framework: {}", err);
    }

    // Optional JSON tree description as first argument
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    let locator = BluezLocator::new().await?;
    let Some(adapter) = locator.find_adapter().await? else {
        log::error!("GattManager1 interface not found");
        return Ok(());
    };

    let networks = Arc::new(FixedNetworks::default());
    let app = config.build(networks.clone())?;

    let service_uuids: BTreeSet<_> = app.services().iter().map(|s| s.uuid).collect();
    let _adv_handle = adapter
        .advertise(Advertisement {
            service_uuids,
            discoverable: Some(true),
            local_name: Some("RustGATT".to_string()),
            ..Default::default()
        })
        .await?;
    log::info!("Advertising Started");

    // Each console line becomes the list of observed networks, comma separated
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(input) => {
                    let ids = input
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    networks.set(ids);
                }
                Err(err) => {
                    log::error!("Error reading from console: {}", err);
                    break;
                }
            }
        }
    });

    let (sender_tx, receiver_rx) = mpsc::channel::<AccessRequest>(256);
    let bridge = BluezBridge::new(adapter, sender_tx);
    Peripheral::new(app, bridge, receiver_rx).run().await
}
