mod bluez_utils;
mod characteristic_utils;

use super::{AdapterLocator, ManagerBridge, RegisterOptions};
use crate::{
    error::{Error, ErrorType},
    gatt::{
        export::{Interface, ManagedObjects, PropertyMap, PropertyValue},
        path::AttributePath,
        request::AccessRequest,
    },
};
use async_trait::async_trait;
use bluer::{
    gatt::{
        local::{Application, ApplicationHandle, CharacteristicControlEvent},
        CharacteristicWriter,
    },
    Adapter, Session,
};
use bluez_utils::{CharNotifyHandler, Subscribers};
use characteristic_utils::parse_services;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc::Sender, oneshot};

/// Locates the first BlueZ adapter and powers it on.
pub struct BluezLocator {
    session: Session,
}

impl BluezLocator {
    pub async fn new() -> Result<Self, Error> {
        let session = Session::new().await?;
        Ok(BluezLocator { session })
    }
}

#[async_trait]
impl AdapterLocator for BluezLocator {
    type Adapter = Adapter;

    async fn find_adapter(&self) -> Result<Option<Adapter>, Error> {
        let names = self.session.adapter_names().await?;
        let Some(name) = names.first() else {
            return Ok(None);
        };
        let adapter = self.session.adapter(name)?;
        adapter.set_powered(true).await?;
        log::debug!(
            "Initialize Bluetooth adapter {} with address {}",
            adapter.name(),
            adapter.address().await?
        );
        Ok(Some(adapter))
    }
}

/// Serves the attribute tree through BlueZ's GATT manager.
///
/// Reads, writes and notify sessions arriving from BlueZ are forwarded to the event loop
/// as [`AccessRequest`]s over `sender_tx`.
#[derive(Debug)]
pub struct BluezBridge {
    adapter: Adapter,
    sender_tx: Sender<AccessRequest>,
    app_handle: Option<ApplicationHandle>,
    writers: Arc<Mutex<Subscribers<CharacteristicWriter>>>,
}

impl BluezBridge {
    pub fn new(adapter: Adapter, sender_tx: Sender<AccessRequest>) -> Self {
        BluezBridge {
            adapter,
            sender_tx,
            app_handle: None,
            writers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    // Handle Characteristic Subscriptions
    fn setup_char_handlers(&mut self, handlers: Vec<CharNotifyHandler>) {
        for mut handler in handlers {
            let sender_tx = self.sender_tx.clone();
            let writers = self.writers.clone();

            tokio::spawn(async move {
                while let Some(CharacteristicControlEvent::Notify(writer)) =
                    handler.control.next().await
                {
                    let writer = Arc::new(writer);
                    log::info!(
                        "{} subscribed to {}",
                        writer.device_address(),
                        handler.path
                    );

                    let first = match writers.lock() {
                        Ok(mut writers_lock) => writers_lock.add(&handler.path, writer.clone()),
                        Err(_) => {
                            log::error!("Failed to lock writers for adding a writer");
                            continue;
                        }
                    };
                    if first {
                        send_notify_request(&sender_tx, &handler.path, true).await;
                    }

                    // Each session closes on its own; the event loop is told to stop
                    // only once no client is left on this path.
                    let sender_tx = sender_tx.clone();
                    let writers = writers.clone();
                    let path = handler.path.clone();
                    tokio::spawn(async move {
                        if let Err(err) = writer.closed().await {
                            log::error!("NotifyClosedErr {err:?}");
                        }
                        let last = match writers.lock() {
                            Ok(mut writers_lock) => writers_lock.remove(&path, &writer),
                            Err(_) => {
                                log::error!("Failed to lock writers for removing a writer");
                                false
                            }
                        };
                        if last {
                            send_notify_request(&sender_tx, &path, false).await;
                        }
                    });
                }
            });
        }
    }
}

async fn send_notify_request(sender_tx: &Sender<AccessRequest>, path: &AttributePath, start: bool) {
    let (res_tx, res_rx) = oneshot::channel();
    let path = path.clone();
    let request = if start {
        AccessRequest::StartNotify {
            path,
            responder: res_tx,
        }
    } else {
        AccessRequest::StopNotify {
            path,
            responder: res_tx,
        }
    };
    if let Err(err) = sender_tx.send(request).await {
        log::error!("Error sending notify request: {:?}", err);
        return;
    }
    match res_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::error!("Notify request failed: {}", err),
        Err(_) => log::error!("Event loop dropped notify request"),
    }
}

#[async_trait]
impl ManagerBridge for BluezBridge {
    async fn register(
        &mut self,
        root: &AttributePath,
        options: &RegisterOptions,
        objects: ManagedObjects,
    ) -> Result<(), Error> {
        log::debug!("Registering {} with options {:?}", root, options);
        let (handlers, services) = parse_services(&objects, self.sender_tx.clone())?;

        let app_handle = self
            .adapter
            .serve_gatt_application(Application {
                services,
                ..Default::default()
            })
            .await
            .map_err(|err| Error::from_string(err.to_string(), ErrorType::Registration))?;

        self.setup_char_handlers(handlers);
        self.app_handle = Some(app_handle);
        Ok(())
    }

    async fn unregister(&mut self) -> Result<(), Error> {
        self.app_handle = None;
        Ok(())
    }

    fn properties_changed(
        &mut self,
        path: &AttributePath,
        interface: Interface,
        changed: PropertyMap,
        _invalidated: Vec<String>,
    ) {
        if interface != Interface::Characteristic {
            return;
        }
        let Some(PropertyValue::Bytes(value)) = changed.get("Value").cloned() else {
            return;
        };
        let writers = match self.writers.lock() {
            Ok(writers) => writers.get(path),
            Err(err) => {
                log::error!("Failed to lock writers: {}", err);
                return;
            }
        };
        for writer in writers {
            let value = value.clone();
            tokio::spawn(async move {
                if let Err(err) = writer.send(&value).await {
                    log::error!("Error sending value {err:?}")
                }
            });
        }
    }
}
