use crate::error::{self, Error, ErrorType};
use crate::gatt::path::AttributePath;
use bluer::gatt::local::{CharacteristicControl, ReqError};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct CharNotifyHandler {
    pub path: AttributePath,
    pub control: CharacteristicControl,
}

/// Open notify sessions per characteristic. Several clients may subscribe to one path.
#[derive(Debug)]
pub(crate) struct Subscribers<W> {
    by_path: HashMap<AttributePath, Vec<Arc<W>>>,
}

impl<W> Default for Subscribers<W> {
    fn default() -> Self {
        Subscribers {
            by_path: HashMap::new(),
        }
    }
}

impl<W> Subscribers<W> {
    /// Adds a session. Returns `true` for the first session on `path`.
    pub fn add(&mut self, path: &AttributePath, writer: Arc<W>) -> bool {
        let writers = self.by_path.entry(path.clone()).or_default();
        writers.push(writer);
        writers.len() == 1
    }

    /// Removes a session. Returns `true` when it was the last one on `path`.
    pub fn remove(&mut self, path: &AttributePath, writer: &Arc<W>) -> bool {
        let Some(writers) = self.by_path.get_mut(path) else {
            return false;
        };
        let before = writers.len();
        writers.retain(|w| !Arc::ptr_eq(w, writer));
        if writers.is_empty() {
            self.by_path.remove(path);
            return before > 0;
        }
        false
    }

    pub fn get(&self, path: &AttributePath) -> Vec<Arc<W>> {
        self.by_path.get(path).cloned().unwrap_or_default()
    }
}

impl From<bluer::Error> for error::Error {
    fn from(error: bluer::Error) -> Self {
        Error::from_string(error.to_string(), ErrorType::Bluez)
    }
}

impl ErrorType {
    pub(crate) fn to_req_err(self) -> ReqError {
        match self {
            ErrorType::NotSupported => ReqError::NotSupported,
            ErrorType::NotPermitted => ReqError::NotPermitted,
            ErrorType::InvalidValueLength => ReqError::InvalidValueLength,
            ErrorType::InvalidArgs
            | ErrorType::Failed
            | ErrorType::Bluez
            | ErrorType::Config
            | ErrorType::Registration => ReqError::Failed,
        }
    }
}
