#[cfg(all(feature = "bluez", target_os = "linux"))]
mod bluez;
#[cfg(all(feature = "bluez", target_os = "linux"))]
pub use self::bluez::{BluezBridge, BluezLocator};

use crate::{
    error::Error,
    gatt::{
        application::Application,
        export::{Interface, ManagedObjects, PropertyMap},
        notify::Scheduler,
        path::AttributePath,
        request::AccessRequest,
    },
};
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Mutex};
use tokio::{sync::mpsc::Receiver, time::Instant};

/// Options passed along with the application at registration.
pub type RegisterOptions = BTreeMap<String, String>;

/// Platform peripheral manager the attribute tree is exported to.
#[async_trait]
pub trait ManagerBridge: Send {
    /// Registers the application rooted at `root`. An error here is terminal.
    async fn register(
        &mut self,
        root: &AttributePath,
        options: &RegisterOptions,
        objects: ManagedObjects,
    ) -> Result<(), Error>;

    async fn unregister(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Relays a property change outward. Must not block the event loop.
    fn properties_changed(
        &mut self,
        path: &AttributePath,
        interface: Interface,
        changed: PropertyMap,
        invalidated: Vec<String>,
    );
}

/// Finds the adapter exposing the peripheral manager.
#[async_trait]
pub trait AdapterLocator {
    type Adapter: Send;

    async fn find_adapter(&self) -> Result<Option<Self::Adapter>, Error>;
}

/// Source of network identifiers observed by an external scanner.
pub trait NetworkObserver: Send + Sync {
    fn current_network_ids(&self) -> Vec<String>;
}

/// [`NetworkObserver`] backed by a list that is replaced from outside.
#[derive(Debug, Default)]
pub struct FixedNetworks {
    ids: Mutex<Vec<String>>,
}

impl FixedNetworks {
    pub fn new(ids: Vec<String>) -> Self {
        FixedNetworks {
            ids: Mutex::new(ids),
        }
    }

    pub fn set(&self, ids: Vec<String>) {
        match self.ids.lock() {
            Ok(mut guard) => *guard = ids,
            Err(err) => log::error!("Failed to lock network list: {}", err),
        }
    }
}

impl NetworkObserver for FixedNetworks {
    fn current_network_ids(&self) -> Vec<String> {
        match self.ids.lock() {
            Ok(guard) => guard.clone(),
            Err(err) => {
                log::error!("Failed to lock network list: {}", err);
                Vec::new()
            }
        }
    }
}

/// Single-threaded event loop serving one attribute tree.
///
/// Incoming [`AccessRequest`]s and due notification ticks are handled one at a time, so
/// attribute values never see concurrent writers.
pub struct Peripheral<B: ManagerBridge> {
    app: Application,
    scheduler: Scheduler,
    bridge: B,
    options: RegisterOptions,
    receiver_rx: Receiver<AccessRequest>,
}

impl<B: ManagerBridge> Peripheral<B> {
    pub fn new(app: Application, bridge: B, receiver_rx: Receiver<AccessRequest>) -> Self {
        Peripheral {
            app,
            scheduler: Scheduler::new(),
            bridge,
            options: RegisterOptions::new(),
            receiver_rx,
        }
    }

    pub fn with_options(mut self, options: RegisterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn application(&self) -> &Application {
        &self.app
    }

    /// Registers the tree, then serves requests and ticks until the request channel closes.
    ///
    /// A failed registration ends the loop with that error.
    pub async fn run(mut self) -> Result<(), Error> {
        log::info!("Registering GATT application...");
        let objects = self.app.get_managed_objects();
        if let Err(err) = self
            .bridge
            .register(self.app.path(), &self.options, objects)
            .await
        {
            log::error!("Failed to register application: {}", err);
            return Err(err);
        }
        log::info!("GATT application registered");

        loop {
            tokio::select! {
                request = self.receiver_rx.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
                _ = self.scheduler.sleep() => {
                    self.app.fire_due(Instant::now(), &mut self.scheduler, &mut self.bridge);
                }
            }
        }

        self.app.release(&mut self.scheduler);
        if let Err(err) = self.bridge.unregister().await {
            log::error!("Failed to unregister application: {}", err);
        }
        log::info!("GATT application deregistered");
        Ok(())
    }

    fn handle_request(&mut self, request: AccessRequest) {
        log::debug!("{} request", request.name());
        let delivered = match request {
            AccessRequest::GetManagedObjects { responder } => {
                log::info!("GetManagedObjects");
                responder.send(self.app.get_managed_objects()).is_ok()
            }
            AccessRequest::GetAll {
                path,
                interface,
                responder,
            } => responder.send(self.app.get_all(&path, &interface)).is_ok(),
            AccessRequest::ReadValue {
                path,
                options,
                responder,
            } => responder.send(self.app.read_value(&path, &options)).is_ok(),
            AccessRequest::WriteValue {
                path,
                value,
                options,
                responder,
            } => responder
                .send(self.app.write_value(&path, value, &options))
                .is_ok(),
            AccessRequest::StartNotify { path, responder } => responder
                .send(self.app.start_notify(&path, &mut self.scheduler))
                .is_ok(),
            AccessRequest::StopNotify { path, responder } => {
                responder.send(self.app.stop_notify(&path)).is_ok()
            }
        };
        if !delivered {
            log::warn!("Requester went away before the reply was sent");
        }
    }
}
