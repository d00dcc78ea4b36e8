use super::{
    access::{DescriptorAccess, ReadOptions, WriteOptions},
    path::AttributePath,
    properties::AttributeFlags,
};
use crate::error::Error;
use std::fmt;
use uuid::Uuid;

pub struct Descriptor {
    path: AttributePath,
    pub uuid: Uuid,
    pub flags: AttributeFlags,
    characteristic: AttributePath,
    value: Vec<u8>,
    handler: Box<dyn DescriptorAccess>,
}

impl Descriptor {
    pub(crate) fn new(
        path: AttributePath,
        characteristic: AttributePath,
        uuid: Uuid,
        flags: AttributeFlags,
        handler: Box<dyn DescriptorAccess>,
    ) -> Self {
        Descriptor {
            path,
            uuid,
            flags,
            characteristic,
            value: Vec::new(),
            handler,
        }
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    /// Path of the owning characteristic.
    pub fn characteristic(&self) -> &AttributePath {
        &self.characteristic
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn with_value(&mut self, value: Vec<u8>) -> &mut Self {
        self.value = value;
        self
    }

    pub fn read(&mut self, options: &ReadOptions) -> Result<Vec<u8>, Error> {
        self.handler.read(&self.value, options)
    }

    pub fn write(
        &mut self,
        data: Vec<u8>,
        owner: &AttributeFlags,
        options: &WriteOptions,
    ) -> Result<(), Error> {
        log::debug!("Descriptor {} write: {:?}", self.path, data);
        self.handler.write(&mut self.value, data, owner, options)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("path", &self.path)
            .field("uuid", &self.uuid)
            .field("flags", &self.flags)
            .field("characteristic", &self.characteristic)
            .field("value", &self.value)
            .finish()
    }
}
