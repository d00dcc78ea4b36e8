use super::{
    access::{CharacteristicAccess, DescriptorAccess, ReadOptions, WriteOptions},
    descriptor::Descriptor,
    notify::{NotifyState, Scheduler, Subscription, TimerId},
    path::{AttributePath, PathKind},
    properties::{AttributeFlag, AttributeFlags},
};
use crate::error::{Error, ErrorType};
use crate::gatt::export::{Interface, PropertyMap, PropertyValue};
use crate::peripheral::ManagerBridge;
use std::fmt;
use uuid::Uuid;

pub struct Characteristic {
    path: AttributePath,
    pub uuid: Uuid,
    pub flags: AttributeFlags,
    service: AttributePath,
    descriptors: Vec<Descriptor>,
    value: Vec<u8>,
    subscription: Subscription,
    handler: Box<dyn CharacteristicAccess>,
}

impl Characteristic {
    pub(crate) fn new(
        path: AttributePath,
        service: AttributePath,
        uuid: Uuid,
        flags: AttributeFlags,
        handler: Box<dyn CharacteristicAccess>,
    ) -> Self {
        Characteristic {
            path,
            uuid,
            flags,
            service,
            descriptors: Vec::new(),
            value: Vec::new(),
            subscription: Subscription::default(),
            handler,
        }
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    /// Path of the owning service.
    pub fn service(&self) -> &AttributePath {
        &self.service
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn with_value(&mut self, value: Vec<u8>) -> &mut Self {
        self.value = value;
        self
    }

    pub fn notify_state(&self) -> NotifyState {
        self.subscription.state()
    }

    /// Appends a descriptor and returns it; its path is `<characteristic>/desc<index>`.
    pub fn add_descriptor<H: DescriptorAccess + 'static>(
        &mut self,
        uuid: Uuid,
        flags: impl Into<AttributeFlags>,
        handler: H,
    ) -> &mut Descriptor {
        let index = self.descriptors.len();
        let path = self.path.child(PathKind::Descriptor, index);
        self.descriptors.push(Descriptor::new(
            path,
            self.path.clone(),
            uuid,
            flags.into(),
            Box::new(handler),
        ));
        &mut self.descriptors[index]
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn get_descriptor_paths(&self) -> Vec<AttributePath> {
        self.descriptors.iter().map(|d| d.path().clone()).collect()
    }

    pub(crate) fn descriptor_mut(&mut self, path: &AttributePath) -> Option<&mut Descriptor> {
        self.descriptors.iter_mut().find(|d| d.path() == path)
    }

    pub fn read(&mut self, options: &ReadOptions) -> Result<Vec<u8>, Error> {
        self.handler.read(&self.value, options)
    }

    pub fn write(&mut self, data: Vec<u8>, options: &WriteOptions) -> Result<(), Error> {
        log::debug!("Characteristic {} write: {:?}", self.path, data);
        self.handler.write(&mut self.value, data, options)
    }

    /// Writes the descriptor at `path` with this characteristic's flags as its owner flags.
    pub fn write_descriptor(
        &mut self,
        path: &AttributePath,
        data: Vec<u8>,
        options: &WriteOptions,
    ) -> Result<(), Error> {
        let flags = self.flags.clone();
        match self.descriptor_mut(path) {
            Some(desc) => desc.write(data, &flags, options),
            None => Err(Error::from_string(
                format!("No descriptor at {}", path),
                ErrorType::Failed,
            )),
        }
    }

    pub fn start_notify(&mut self, scheduler: &mut Scheduler) -> Result<(), Error> {
        let interval = match self.handler.notify_source() {
            Some(source) if self.flags.contains(AttributeFlag::Notify) => source.interval(),
            _ => {
                log::info!("Default StartNotify called, returning error");
                return Err(Error::from_type(ErrorType::NotSupported));
            }
        };
        if self.subscription.start(&self.path, interval, scheduler) {
            log::info!("Notifying {} every {:?}", self.path, interval);
        } else {
            log::info!("Already notifying {}, nothing to do", self.path);
        }
        Ok(())
    }

    pub fn stop_notify(&mut self) -> Result<(), Error> {
        if !self.flags.contains(AttributeFlag::Notify) || self.handler.notify_source().is_none() {
            log::info!("Default StopNotify called, returning error");
            return Err(Error::from_type(ErrorType::NotSupported));
        }
        if self.subscription.stop() {
            log::info!("Stopped notifying {}", self.path);
        } else {
            log::info!("Not notifying {}, nothing to do", self.path);
        }
        Ok(())
    }

    /// Runs one queued tick: samples a new value, emits it and queues the next tick.
    pub(crate) fn tick(
        &mut self,
        id: TimerId,
        scheduler: &mut Scheduler,
        bridge: &mut dyn ManagerBridge,
    ) {
        if !self.subscription.fire(id) {
            log::debug!("Tick for {} after StopNotify, dropping", self.path);
            return;
        }
        let Some(source) = self.handler.notify_source() else {
            return;
        };
        self.value = source.sample();
        let interval = source.interval();

        let mut changed = PropertyMap::new();
        changed.insert("Value".to_string(), PropertyValue::Bytes(self.value.clone()));
        bridge.properties_changed(&self.path, Interface::Characteristic, changed, Vec::new());

        self.subscription.reschedule(&self.path, interval, scheduler);
    }

    /// Cancels any subscription and its queued tick.
    pub(crate) fn release(&mut self, scheduler: &mut Scheduler) {
        self.subscription.cancel(scheduler);
    }
}

impl fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("path", &self.path)
            .field("uuid", &self.uuid)
            .field("flags", &self.flags)
            .field("service", &self.service)
            .field("descriptors", &self.descriptors)
            .field("value", &self.value)
            .field("notify", &self.subscription.state())
            .finish()
    }
}
