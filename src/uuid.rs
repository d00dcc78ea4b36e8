use crate::error::{Error, ErrorType};
use uuid::Uuid;

/// Expansion of 16-bit and 32-bit SIG UUIDs against the Bluetooth base UUID.
pub trait ShortUuid: Sized {
    fn from_short(uuid: u16) -> Self;

    fn from_string(uuid_str: &str) -> Result<Self, Error>;
}

impl ShortUuid for Uuid {
    fn from_short(uuid: u16) -> Uuid {
        Uuid::from_fields(uuid.into(), 0, 0x1000, b"\x80\x00\x00\x80\x5F\x9B\x34\xFB")
    }

    fn from_string(uuid_str: &str) -> Result<Uuid, Error> {
        if let Ok(uuid) = Uuid::parse_str(uuid_str) {
            return Ok(uuid);
        }
        let long_uuid_str = match uuid_str.len() {
            4 => format!("0000{}-0000-1000-8000-00805f9b34fb", uuid_str),
            8 => format!("{}-0000-1000-8000-00805f9b34fb", uuid_str),
            _ => uuid_str.to_string(),
        };
        Uuid::parse_str(&long_uuid_str).map_err(|_| {
            Error::from_string(format!("Invalid UUID string: {}", uuid_str), ErrorType::Config)
        })
    }
}
