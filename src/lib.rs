pub mod config;
pub mod error;
pub mod gatt;
pub mod uuid;

mod peripheral;
pub use self::peripheral::{
    AdapterLocator, FixedNetworks, ManagerBridge, NetworkObserver, Peripheral, RegisterOptions,
};
#[cfg(all(feature = "bluez", target_os = "linux"))]
pub use self::peripheral::{BluezBridge, BluezLocator};
