//! Flattening of the attribute tree into the object/property map read by the peripheral manager.

use super::{
    characteristic::Characteristic, descriptor::Descriptor, path::AttributePath,
    properties::AttributeFlags, service::Service,
};
use crate::error::{Error, ErrorType};
use std::{collections::BTreeMap, fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Interface {
    Service,
    Characteristic,
    Descriptor,
}

impl Interface {
    pub fn as_str(self) -> &'static str {
        match self {
            Interface::Service => "Service",
            Interface::Characteristic => "Characteristic",
            Interface::Descriptor => "Descriptor",
        }
    }

    /// Interface name on the BlueZ bus.
    pub fn bus_name(self) -> &'static str {
        match self {
            Interface::Service => "org.bluez.GattService1",
            Interface::Characteristic => "org.bluez.GattCharacteristic1",
            Interface::Descriptor => "org.bluez.GattDescriptor1",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the short and the bus form of the interface name.
impl FromStr for Interface {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Interface::Service,
            Interface::Characteristic,
            Interface::Descriptor,
        ]
        .into_iter()
        .find(|i| i.as_str() == s || i.bus_name() == s)
        .ok_or_else(|| {
            Error::from_string(format!("Unknown interface: {}", s), ErrorType::InvalidArgs)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Uuid(Uuid),
    Bool(bool),
    Path(AttributePath),
    Paths(Vec<AttributePath>),
    Flags(AttributeFlags),
    Bytes(Vec<u8>),
}

impl PropertyValue {
    pub fn as_path(&self) -> Option<&AttributePath> {
        match self {
            PropertyValue::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_paths(&self) -> Option<&[AttributePath]> {
        match self {
            PropertyValue::Paths(paths) => Some(paths),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&AttributeFlags> {
        match self {
            PropertyValue::Flags(flags) => Some(flags),
            _ => None,
        }
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

pub type InterfaceMap = BTreeMap<Interface, PropertyMap>;

/// Exported objects in depth-first insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagedObjects(Vec<(AttributePath, InterfaceMap)>);

impl ManagedObjects {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, path: &AttributePath) -> Option<&InterfaceMap> {
        self.0.iter().find(|(p, _)| p == path).map(|(_, i)| i)
    }

    pub fn paths(&self) -> impl Iterator<Item = &AttributePath> {
        self.0.iter().map(|(p, _)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributePath, &InterfaceMap)> {
        self.0.iter().map(|(p, i)| (p, i))
    }

    fn push(&mut self, path: &AttributePath, interface: Interface, properties: PropertyMap) {
        let mut interfaces = InterfaceMap::new();
        interfaces.insert(interface, properties);
        self.0.push((path.clone(), interfaces));
    }
}

impl IntoIterator for ManagedObjects {
    type Item = (AttributePath, InterfaceMap);
    type IntoIter = std::vec::IntoIter<(AttributePath, InterfaceMap)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Service {
    pub fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("UUID".to_string(), PropertyValue::Uuid(self.uuid));
        props.insert("Primary".to_string(), PropertyValue::Bool(self.primary));
        props.insert(
            "Characteristics".to_string(),
            PropertyValue::Paths(self.get_characteristic_paths()),
        );
        props
    }
}

impl Characteristic {
    pub fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert(
            "Service".to_string(),
            PropertyValue::Path(self.service().clone()),
        );
        props.insert("UUID".to_string(), PropertyValue::Uuid(self.uuid));
        props.insert("Flags".to_string(), PropertyValue::Flags(self.flags.clone()));
        props.insert(
            "Descriptors".to_string(),
            PropertyValue::Paths(self.get_descriptor_paths()),
        );
        props
    }
}

impl Descriptor {
    pub fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert(
            "Characteristic".to_string(),
            PropertyValue::Path(self.characteristic().clone()),
        );
        props.insert("UUID".to_string(), PropertyValue::Uuid(self.uuid));
        props.insert("Flags".to_string(), PropertyValue::Flags(self.flags.clone()));
        props
    }
}

/// Walks services, then their characteristics, then their descriptors, in insertion order.
pub fn export(services: &[Service]) -> ManagedObjects {
    let mut objects = ManagedObjects::default();
    for service in services {
        objects.push(service.path(), Interface::Service, service.properties());
        for chrc in service.characteristics() {
            objects.push(chrc.path(), Interface::Characteristic, chrc.properties());
            for desc in chrc.descriptors() {
                objects.push(desc.path(), Interface::Descriptor, desc.properties());
            }
        }
    }
    objects
}
