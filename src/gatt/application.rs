use super::{
    access::{ReadOptions, WriteOptions},
    characteristic::Characteristic,
    export::{self, Interface, ManagedObjects, PropertyMap},
    notify::Scheduler,
    path::{AttributePath, PathKind},
    service::Service,
};
use crate::error::{Error, ErrorType};
use crate::peripheral::ManagerBridge;
use tokio::time::Instant;
use uuid::Uuid;

/// Root of the attribute tree registered with the peripheral manager.
#[derive(Debug)]
pub struct Application {
    path: AttributePath,
    services: Vec<Service>,
}

impl Application {
    pub fn new(path: AttributePath) -> Self {
        Application {
            path,
            services: Vec::new(),
        }
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    /// Appends a service and returns it; its path is `<root>/service<index>`.
    pub fn add_service(&mut self, uuid: Uuid, primary: bool) -> &mut Service {
        let index = self.services.len();
        let path = self.path.child(PathKind::Service, index);
        self.services.push(Service::new(path, uuid, primary));
        &mut self.services[index]
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn get_managed_objects(&self) -> ManagedObjects {
        export::export(&self.services)
    }

    /// Properties of one interface of the object at `path`.
    ///
    /// Fails with `InvalidArgs` when `interface` is not the kind of that object.
    pub fn get_all(&self, path: &AttributePath, interface: &str) -> Result<PropertyMap, Error> {
        let requested: Interface = interface.parse()?;
        let (kind, props) = self.properties_of(path)?;
        if kind != requested {
            return Err(Error::from_string(
                format!("{} does not implement {}", path, interface),
                ErrorType::InvalidArgs,
            ));
        }
        Ok(props)
    }

    fn properties_of(&self, path: &AttributePath) -> Result<(Interface, PropertyMap), Error> {
        for service in &self.services {
            if service.path() == path {
                return Ok((Interface::Service, service.properties()));
            }
            for chrc in service.characteristics() {
                if chrc.path() == path {
                    return Ok((Interface::Characteristic, chrc.properties()));
                }
                if let Some(desc) = chrc.descriptors().iter().find(|d| d.path() == path) {
                    return Ok((Interface::Descriptor, desc.properties()));
                }
            }
        }
        Err(unknown_object(path))
    }

    pub fn characteristic(&self, path: &AttributePath) -> Option<&Characteristic> {
        self.services
            .iter()
            .flat_map(|s| s.characteristics())
            .find(|c| c.path() == path)
    }

    fn characteristic_mut(&mut self, path: &AttributePath) -> Option<&mut Characteristic> {
        self.services
            .iter_mut()
            .flat_map(|s| s.characteristics_mut().iter_mut())
            .find(|c| c.path() == path)
    }

    /// Characteristic owning the descriptor at `path`.
    fn descriptor_owner_mut(&mut self, path: &AttributePath) -> Option<&mut Characteristic> {
        self.services
            .iter_mut()
            .flat_map(|s| s.characteristics_mut().iter_mut())
            .find(|c| c.descriptors().iter().any(|d| d.path() == path))
    }

    /// Reads the characteristic or descriptor at `path`.
    pub fn read_value(
        &mut self,
        path: &AttributePath,
        options: &ReadOptions,
    ) -> Result<Vec<u8>, Error> {
        if let Some(chrc) = self.characteristic_mut(path) {
            return chrc.read(options);
        }
        match self
            .descriptor_owner_mut(path)
            .and_then(|c| c.descriptor_mut(path))
        {
            Some(desc) => desc.read(options),
            None => Err(unknown_object(path)),
        }
    }

    /// Writes the characteristic or descriptor at `path`.
    pub fn write_value(
        &mut self,
        path: &AttributePath,
        value: Vec<u8>,
        options: &WriteOptions,
    ) -> Result<(), Error> {
        if let Some(chrc) = self.characteristic_mut(path) {
            return chrc.write(value, options);
        }
        match self.descriptor_owner_mut(path) {
            Some(chrc) => chrc.write_descriptor(path, value, options),
            None => Err(unknown_object(path)),
        }
    }

    pub fn start_notify(
        &mut self,
        path: &AttributePath,
        scheduler: &mut Scheduler,
    ) -> Result<(), Error> {
        match self.characteristic_mut(path) {
            Some(chrc) => chrc.start_notify(scheduler),
            None => Err(self.not_a_characteristic(path)),
        }
    }

    pub fn stop_notify(&mut self, path: &AttributePath) -> Result<(), Error> {
        match self.characteristic_mut(path) {
            Some(chrc) => chrc.stop_notify(),
            None => Err(self.not_a_characteristic(path)),
        }
    }

    /// Descriptors have no notify operations; anything else is not in the tree.
    fn not_a_characteristic(&self, path: &AttributePath) -> Error {
        let is_descriptor = self
            .services
            .iter()
            .flat_map(|s| s.characteristics())
            .any(|c| c.descriptors().iter().any(|d| d.path() == path));
        if is_descriptor {
            Error::from_type(ErrorType::NotSupported)
        } else {
            unknown_object(path)
        }
    }

    /// Runs every tick due at `now`. Returns how many ticks were consumed.
    pub fn fire_due(
        &mut self,
        now: Instant,
        scheduler: &mut Scheduler,
        bridge: &mut dyn ManagerBridge,
    ) -> usize {
        let due = scheduler.take_due(now);
        let fired = due.len();
        for (id, path) in due {
            match self.characteristic_mut(&path) {
                Some(chrc) => chrc.tick(id, scheduler, bridge),
                None => log::warn!("Dropping tick for unknown characteristic {}", path),
            }
        }
        fired
    }

    /// Cancels every subscription and queued tick ahead of teardown.
    pub fn release(&mut self, scheduler: &mut Scheduler) {
        for chrc in self
            .services
            .iter_mut()
            .flat_map(|s| s.characteristics_mut().iter_mut())
        {
            chrc.release(scheduler);
        }
        scheduler.clear();
    }
}

impl Default for Application {
    fn default() -> Self {
        Application::new(AttributePath::root())
    }
}

fn unknown_object(path: &AttributePath) -> Error {
    Error::from_string(format!("No object at {}", path), ErrorType::Failed)
}
