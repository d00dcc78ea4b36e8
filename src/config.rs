//! Declarative description of the attribute tree.
//!
//! ```json
//! {
//!   "root": "/org/bluez/example",
//!   "services": [{
//!     "uuid": "181c5678-1234-5678-1234-56789abcdef0",
//!     "characteristics": [{
//!       "uuid": "181c5678-1234-5678-1234-56789abcdef1",
//!       "flags": ["read", "write", "writable-auxiliaries"],
//!       "kind": { "type": "stored" },
//!       "descriptors": [{ "uuid": "2901", "kind": { "type": "user-description", "text": "Wifi" } }]
//!     }]
//!   }]
//! }
//! ```

use crate::{
    error::{Error, ErrorType},
    gatt::{
        access::{NetworkScan, RandomSample, StaticValue, StoredValue, UserDescription},
        application::Application,
        characteristic::Characteristic,
        path::AttributePath,
        properties::{AttributeFlag, AttributeFlags},
    },
    peripheral::NetworkObserver,
    uuid::ShortUuid,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc, time::Duration};
use uuid::Uuid;

const WIFI_SVC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef0";
const WIFI_CHRC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef1";
const WIFI_DESC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef2";
const WIFI_ENCRYPT_CHRC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef3";
const WIFI_ENCRYPT_DESC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef4";
const WIFI_SECURE_CHRC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef5";
const WIFI_SECURE_DESC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef6";
const WIFI_SCAN_CHRC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef7";
const SIGNAL_CHRC_UUID: &str = "181c5678-1234-5678-1234-56789abcdef8";
const CUD_UUID: &str = "2901";
const CUD_TEXT: &str = "Wifi config characteristic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_root")]
    pub root: String,
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub uuid: String,
    #[serde(default = "default_primary")]
    pub primary: bool,
    #[serde(default)]
    pub characteristics: Vec<CharacteristicConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicConfig {
    pub uuid: String,
    pub flags: AttributeFlags,
    pub kind: CharacteristicKind,
    #[serde(default)]
    pub descriptors: Vec<DescriptorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CharacteristicKind {
    /// Read returns what was last written.
    Stored {
        #[serde(default)]
        initial: Vec<u8>,
    },
    /// Read-only fixed value.
    Static { value: Vec<u8> },
    /// Notifies a random byte in `min..=max` every `interval_ms`.
    RandomSample { interval_ms: u64, min: u8, max: u8 },
    /// Notifies the first observed network identifier every `interval_ms`.
    NetworkScan { interval_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    pub uuid: String,
    #[serde(default = "default_descriptor_flags")]
    pub flags: AttributeFlags,
    pub kind: DescriptorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DescriptorKind {
    Static { value: Vec<u8> },
    Stored {
        #[serde(default)]
        initial: Vec<u8>,
    },
    UserDescription { text: String },
}

fn default_root() -> String {
    "/org/bluez/example".to_string()
}

fn default_primary() -> bool {
    true
}

fn default_descriptor_flags() -> AttributeFlags {
    AttributeFlags::from([AttributeFlag::Read, AttributeFlag::Write])
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        AppConfig::from_json(&json)
    }

    /// Assembles the attribute tree. `observer` feeds every network-scan characteristic.
    pub fn build(&self, observer: Arc<dyn NetworkObserver>) -> Result<Application, Error> {
        let mut app = Application::new(AttributePath::new(self.root.as_str()));
        for service_config in &self.services {
            let service = app.add_service(Uuid::from_string(&service_config.uuid)?, service_config.primary);
            for char_config in &service_config.characteristics {
                let uuid = Uuid::from_string(&char_config.uuid)?;
                let flags = char_config.flags.clone();
                let chrc = match &char_config.kind {
                    CharacteristicKind::Stored { initial } => service
                        .add_characteristic(uuid, flags, StoredValue)
                        .with_value(initial.clone()),
                    CharacteristicKind::Static { value } => {
                        service.add_characteristic(uuid, flags, StaticValue(value.clone()))
                    }
                    CharacteristicKind::RandomSample {
                        interval_ms,
                        min,
                        max,
                    } => service.add_characteristic(
                        uuid,
                        flags,
                        RandomSample::new(tick_interval(*interval_ms)?, *min, *max),
                    ),
                    CharacteristicKind::NetworkScan { interval_ms } => service.add_characteristic(
                        uuid,
                        flags,
                        NetworkScan::new(tick_interval(*interval_ms)?, observer.clone()),
                    ),
                };
                add_descriptors(chrc, &char_config.descriptors)?;
            }
        }
        log::debug!("Built application at {} with {} services", self.root, self.services.len());
        Ok(app)
    }
}

fn tick_interval(interval_ms: u64) -> Result<Duration, Error> {
    if interval_ms == 0 {
        return Err(Error::from_string(
            "Notify interval must be at least 1 ms".to_string(),
            ErrorType::Config,
        ));
    }
    Ok(Duration::from_millis(interval_ms))
}

fn add_descriptors(chrc: &mut Characteristic, descriptors: &[DescriptorConfig]) -> Result<(), Error> {
    for desc_config in descriptors {
        let uuid = Uuid::from_string(&desc_config.uuid)?;
        let flags = desc_config.flags.clone();
        match &desc_config.kind {
            DescriptorKind::Static { value } => {
                chrc.add_descriptor(uuid, flags, StaticValue(value.clone()));
            }
            DescriptorKind::Stored { initial } => {
                chrc.add_descriptor(uuid, flags, StoredValue)
                    .with_value(initial.clone());
            }
            DescriptorKind::UserDescription { text } => {
                chrc.add_descriptor(uuid, flags, UserDescription)
                    .with_value(text.as_bytes().to_vec());
            }
        }
    }
    Ok(())
}

fn wifi_characteristic(
    uuid: &str,
    flags: AttributeFlags,
    desc_uuid: &str,
    desc_flags: AttributeFlags,
) -> CharacteristicConfig {
    CharacteristicConfig {
        uuid: uuid.to_string(),
        flags,
        kind: CharacteristicKind::Stored {
            initial: Vec::new(),
        },
        descriptors: vec![
            DescriptorConfig {
                uuid: desc_uuid.to_string(),
                flags: desc_flags,
                kind: DescriptorKind::Static {
                    value: b"Test".to_vec(),
                },
            },
            DescriptorConfig {
                uuid: CUD_UUID.to_string(),
                flags: default_descriptor_flags(),
                kind: DescriptorKind::UserDescription {
                    text: CUD_TEXT.to_string(),
                },
            },
        ],
    }
}

/// Wi-Fi configuration service with a scan result and a signal sample characteristic.
impl Default for AppConfig {
    fn default() -> Self {
        use AttributeFlag::*;

        let characteristics = vec![
            wifi_characteristic(
                WIFI_CHRC_UUID,
                AttributeFlags::from([Read, Write, WritableAuxiliaries]),
                WIFI_DESC_UUID,
                AttributeFlags::from([Read, Write]),
            ),
            wifi_characteristic(
                WIFI_ENCRYPT_CHRC_UUID,
                AttributeFlags::from([EncryptRead, EncryptWrite]),
                WIFI_ENCRYPT_DESC_UUID,
                AttributeFlags::from([EncryptRead, EncryptWrite]),
            ),
            wifi_characteristic(
                WIFI_SECURE_CHRC_UUID,
                AttributeFlags::from([SecureRead, SecureWrite]),
                WIFI_SECURE_DESC_UUID,
                AttributeFlags::from([SecureRead, SecureWrite]),
            ),
            CharacteristicConfig {
                uuid: WIFI_SCAN_CHRC_UUID.to_string(),
                flags: AttributeFlags::from([Read, Notify]),
                kind: CharacteristicKind::NetworkScan { interval_ms: 5000 },
                descriptors: Vec::new(),
            },
            CharacteristicConfig {
                uuid: SIGNAL_CHRC_UUID.to_string(),
                flags: AttributeFlags::from([Read, Notify]),
                kind: CharacteristicKind::RandomSample {
                    interval_ms: 1000,
                    min: 0,
                    max: 100,
                },
                descriptors: Vec::new(),
            },
        ];

        AppConfig {
            root: default_root(),
            services: vec![ServiceConfig {
                uuid: WIFI_SVC_UUID.to_string(),
                primary: true,
                characteristics,
            }],
        }
    }
}
