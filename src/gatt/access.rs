//! Read/Write/StartNotify/StopNotify behavior of individual attributes.
//!
//! Every operation of [`CharacteristicAccess`] and [`DescriptorAccess`] fails with
//! [`ErrorType::NotSupported`] unless the concrete attribute overrides it.

use super::properties::{AttributeFlag, AttributeFlags};
use crate::error::{Error, ErrorType};
use crate::peripheral::NetworkObserver;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

/// Caller context of a read. Opaque to the attribute tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    pub offset: u16,
    pub device: Option<String>,
    pub mtu: Option<u16>,
}

/// Caller context of a write. Opaque to the attribute tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    pub offset: u16,
    pub device: Option<String>,
    pub mtu: Option<u16>,
}

/// Produces the values pushed to a subscribed client.
pub trait NotifySource: Send {
    /// Delay between two consecutive ticks.
    fn interval(&self) -> Duration;

    /// Computes the next value of the characteristic.
    fn sample(&mut self) -> Vec<u8>;
}

pub trait CharacteristicAccess: Send {
    fn read(&mut self, _value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        log::info!("Default ReadValue called, returning error");
        Err(Error::from_type(ErrorType::NotSupported))
    }

    fn write(
        &mut self,
        _value: &mut Vec<u8>,
        _data: Vec<u8>,
        _options: &WriteOptions,
    ) -> Result<(), Error> {
        log::info!("Default WriteValue called, returning error");
        Err(Error::from_type(ErrorType::NotSupported))
    }

    /// Notification source of a notify-capable characteristic.
    ///
    /// `None` makes StartNotify and StopNotify fail with `NotSupported`.
    fn notify_source(&mut self) -> Option<&mut dyn NotifySource> {
        None
    }
}

pub trait DescriptorAccess: Send {
    fn read(&mut self, _value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        log::info!("Default ReadValue called, returning error");
        Err(Error::from_type(ErrorType::NotSupported))
    }

    /// `owner` holds the flags of the characteristic this descriptor belongs to.
    fn write(
        &mut self,
        _value: &mut Vec<u8>,
        _data: Vec<u8>,
        _owner: &AttributeFlags,
        _options: &WriteOptions,
    ) -> Result<(), Error> {
        log::info!("Default WriteValue called, returning error");
        Err(Error::from_type(ErrorType::NotSupported))
    }
}

/// Attribute that overrides nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl CharacteristicAccess for Unsupported {}

impl DescriptorAccess for Unsupported {}

/// Holds whatever was last written.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredValue;

impl CharacteristicAccess for StoredValue {
    fn read(&mut self, value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        log::debug!("StoredValue read: {:?}", value);
        Ok(value.to_vec())
    }

    fn write(
        &mut self,
        value: &mut Vec<u8>,
        data: Vec<u8>,
        _options: &WriteOptions,
    ) -> Result<(), Error> {
        log::debug!("StoredValue write: {:?}", data);
        *value = data;
        Ok(())
    }
}

impl DescriptorAccess for StoredValue {
    fn read(&mut self, value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        Ok(value.to_vec())
    }

    fn write(
        &mut self,
        value: &mut Vec<u8>,
        data: Vec<u8>,
        _owner: &AttributeFlags,
        _options: &WriteOptions,
    ) -> Result<(), Error> {
        *value = data;
        Ok(())
    }
}

/// Always reads back a fixed value; writes are unsupported.
#[derive(Debug, Clone, Default)]
pub struct StaticValue(pub Vec<u8>);

impl CharacteristicAccess for StaticValue {
    fn read(&mut self, _value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        Ok(self.0.clone())
    }
}

impl DescriptorAccess for StaticValue {
    fn read(&mut self, _value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        Ok(self.0.clone())
    }
}

/// Characteristic User Description (0x2901).
///
/// Writable only when the owning characteristic declares `writable-auxiliaries`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDescription;

impl UserDescription {
    pub const UUID: u16 = 0x2901;
}

impl DescriptorAccess for UserDescription {
    fn read(&mut self, value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        Ok(value.to_vec())
    }

    fn write(
        &mut self,
        value: &mut Vec<u8>,
        data: Vec<u8>,
        owner: &AttributeFlags,
        _options: &WriteOptions,
    ) -> Result<(), Error> {
        if !owner.contains(AttributeFlag::WritableAuxiliaries) {
            return Err(Error::from_type(ErrorType::NotPermitted));
        }
        *value = data;
        Ok(())
    }
}

/// Simulated sensor: each tick stores one random byte in `min..=max`.
#[derive(Debug)]
pub struct RandomSample {
    interval: Duration,
    min: u8,
    max: u8,
    rng: StdRng,
}

impl RandomSample {
    pub fn new(interval: Duration, min: u8, max: u8) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        RandomSample {
            interval,
            min,
            max,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for reproducible sequences.
    pub fn with_seed(interval: Duration, min: u8, max: u8, seed: u64) -> Self {
        let mut sample = RandomSample::new(interval, min, max);
        sample.rng = StdRng::seed_from_u64(seed);
        sample
    }
}

impl NotifySource for RandomSample {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Vec<u8> {
        vec![self.rng.gen_range(self.min..=self.max)]
    }
}

impl CharacteristicAccess for RandomSample {
    fn read(&mut self, value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        Ok(value.to_vec())
    }

    fn notify_source(&mut self) -> Option<&mut dyn NotifySource> {
        Some(self)
    }
}

/// Publishes the first identifier reported by a [`NetworkObserver`].
pub struct NetworkScan {
    interval: Duration,
    observer: Arc<dyn NetworkObserver>,
}

impl NetworkScan {
    pub fn new(interval: Duration, observer: Arc<dyn NetworkObserver>) -> Self {
        NetworkScan { interval, observer }
    }
}

impl NotifySource for NetworkScan {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Vec<u8> {
        match self.observer.current_network_ids().into_iter().next() {
            Some(id) => id.into_bytes(),
            None => {
                log::debug!("No networks observed");
                Vec::new()
            }
        }
    }
}

impl CharacteristicAccess for NetworkScan {
    fn read(&mut self, value: &[u8], _options: &ReadOptions) -> Result<Vec<u8>, Error> {
        Ok(value.to_vec())
    }

    fn notify_source(&mut self) -> Option<&mut dyn NotifySource> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::FixedNetworks;

    #[test]
    fn unsupported_fails_every_operation() {
        let mut value = vec![1, 2];
        let mut chrc = Unsupported;
        let err = CharacteristicAccess::read(&mut chrc, &value, &ReadOptions::default());
        assert_eq!(err.unwrap_err().error_type(), ErrorType::NotSupported);
        let err = CharacteristicAccess::write(
            &mut chrc,
            &mut value,
            vec![3],
            &WriteOptions::default(),
        );
        assert_eq!(err.unwrap_err().error_type(), ErrorType::NotSupported);
        assert!(CharacteristicAccess::notify_source(&mut chrc).is_none());
        assert_eq!(value, vec![1, 2]);

        let mut desc = Unsupported;
        let err = DescriptorAccess::write(
            &mut desc,
            &mut value,
            vec![3],
            &AttributeFlags::new(),
            &WriteOptions::default(),
        );
        assert_eq!(err.unwrap_err().error_type(), ErrorType::NotSupported);
    }

    #[test]
    fn static_value_rejects_writes() {
        let mut desc = StaticValue(b"Test".to_vec());
        let mut value = Vec::new();
        assert_eq!(
            DescriptorAccess::read(&mut desc, &value, &ReadOptions::default()).unwrap(),
            b"Test"
        );
        let err = DescriptorAccess::write(
            &mut desc,
            &mut value,
            b"x".to_vec(),
            &AttributeFlags::new(),
            &WriteOptions::default(),
        );
        assert_eq!(err.unwrap_err().error_type(), ErrorType::NotSupported);
    }

    #[test]
    fn user_description_honors_writable_auxiliaries() {
        let mut cud = UserDescription;
        let mut value = b"Wifi config characteristic".to_vec();

        let locked = AttributeFlags::from([AttributeFlag::Read, AttributeFlag::Write]);
        let err = cud.write(&mut value, b"new".to_vec(), &locked, &WriteOptions::default());
        assert_eq!(err.unwrap_err().error_type(), ErrorType::NotPermitted);
        assert_eq!(value, b"Wifi config characteristic");

        let open = AttributeFlags::from([
            AttributeFlag::Read,
            AttributeFlag::WritableAuxiliaries,
        ]);
        cud.write(&mut value, b"new".to_vec(), &open, &WriteOptions::default())
            .unwrap();
        assert_eq!(cud.read(&value, &ReadOptions::default()).unwrap(), b"new");
    }

    #[test]
    fn random_sample_stays_in_range() {
        let mut sample = RandomSample::with_seed(Duration::from_secs(1), 90, 60, 7);
        for _ in 0..64 {
            let v = sample.sample();
            assert_eq!(v.len(), 1);
            assert!((60..=90).contains(&v[0]));
        }
    }

    #[test]
    fn network_scan_takes_first_identifier() {
        let observer = Arc::new(FixedNetworks::new(vec!["home".into(), "office".into()]));
        let mut scan = NetworkScan::new(Duration::from_secs(5), observer);
        assert_eq!(scan.sample(), b"home");

        let mut empty = NetworkScan::new(
            Duration::from_secs(5),
            Arc::new(FixedNetworks::new(Vec::new())),
        );
        assert!(empty.sample().is_empty());
    }
}
