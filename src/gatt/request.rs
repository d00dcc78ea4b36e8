use super::{
    access::{ReadOptions, WriteOptions},
    export::{ManagedObjects, PropertyMap},
    path::AttributePath,
};
use crate::error::Error;
use tokio::sync::oneshot;

/// Calls the peripheral manager makes into the event loop, answered through `responder`.
#[derive(Debug)]
pub enum AccessRequest {
    GetManagedObjects {
        responder: oneshot::Sender<ManagedObjects>,
    },
    GetAll {
        path: AttributePath,
        interface: String,
        responder: oneshot::Sender<Result<PropertyMap, Error>>,
    },
    ReadValue {
        path: AttributePath,
        options: ReadOptions,
        responder: oneshot::Sender<Result<Vec<u8>, Error>>,
    },
    WriteValue {
        path: AttributePath,
        value: Vec<u8>,
        options: WriteOptions,
        responder: oneshot::Sender<Result<(), Error>>,
    },
    StartNotify {
        path: AttributePath,
        responder: oneshot::Sender<Result<(), Error>>,
    },
    StopNotify {
        path: AttributePath,
        responder: oneshot::Sender<Result<(), Error>>,
    },
}

impl AccessRequest {
    pub fn name(&self) -> &'static str {
        match self {
            AccessRequest::GetManagedObjects { .. } => "GetManagedObjects",
            AccessRequest::GetAll { .. } => "GetAll",
            AccessRequest::ReadValue { .. } => "ReadValue",
            AccessRequest::WriteValue { .. } => "WriteValue",
            AccessRequest::StartNotify { .. } => "StartNotify",
            AccessRequest::StopNotify { .. } => "StopNotify",
        }
    }
}
