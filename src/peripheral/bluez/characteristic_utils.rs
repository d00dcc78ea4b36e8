use super::bluez_utils::CharNotifyHandler;
use crate::error::{Error, ErrorType};
use crate::gatt::{
    access::{ReadOptions, WriteOptions},
    export::{Interface, ManagedObjects, PropertyMap, PropertyValue},
    path::AttributePath,
    properties::{AttributeFlag, AttributeFlags},
    request::AccessRequest,
};
use bluer::gatt::local::{
    characteristic_control, Characteristic, CharacteristicControlHandle, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest,
    CharacteristicWrite, CharacteristicWriteMethod, CharacteristicWriteRequest, Descriptor,
    DescriptorRead, DescriptorReadRequest, DescriptorWrite, DescriptorWriteRequest, ReqError,
    Service,
};
use futures::FutureExt;
use tokio::sync::mpsc::Sender;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Builds bluer services from the exported object map, forwarding every access to `sender_tx`.
pub(crate) fn parse_services(
    objects: &ManagedObjects,
    sender_tx: Sender<AccessRequest>,
) -> Result<(Vec<CharNotifyHandler>, Vec<Service>), Error> {
    let mut services: Vec<Service> = vec![];
    let mut char_notify_handlers: Vec<CharNotifyHandler> = vec![];

    for (path, interfaces) in objects.iter() {
        let Some(props) = interfaces.get(&Interface::Service) else {
            continue;
        };

        let mut characteristics: Vec<Characteristic> = Vec::new();
        for char_path in paths(props, "Characteristics")? {
            let char_props = lookup(objects, char_path, Interface::Characteristic)?;
            let (char, control) =
                parse_characteristic(objects, char_path, char_props, sender_tx.clone())?;
            if let Some(control) = control {
                char_notify_handlers.push(control);
            }
            characteristics.push(char);
        }

        let primary = matches!(props.get("Primary"), Some(PropertyValue::Bool(true)));
        log::debug!("Serving service {} ({} characteristics)", path, characteristics.len());
        services.push(Service {
            uuid: uuid(props)?,
            primary,
            characteristics,
            ..Default::default()
        });
    }
    Ok((char_notify_handlers, services))
}

fn parse_characteristic(
    objects: &ManagedObjects,
    path: &AttributePath,
    props: &PropertyMap,
    sender_tx: Sender<AccessRequest>,
) -> Result<(Characteristic, Option<CharNotifyHandler>), Error> {
    let flags = flags(props)?;

    let mut descriptors: Vec<Descriptor> = Vec::new();
    for desc_path in paths(props, "Descriptors")? {
        let desc_props = lookup(objects, desc_path, Interface::Descriptor)?;
        descriptors.push(parse_descriptor(desc_path, desc_props, sender_tx.clone())?);
    }

    let notify = get_characteristic_notify(flags);
    let mut handler: Option<CharNotifyHandler> = None;
    let control_handle = match notify {
        Some(_) => {
            let (control, handle) = characteristic_control();
            handler = Some(CharNotifyHandler {
                path: path.clone(),
                control,
            });
            handle
        }
        None => CharacteristicControlHandle::default(),
    };

    let char = Characteristic {
        uuid: uuid(props)?,
        read: get_characteristic_read(flags, path, sender_tx.clone()),
        write: get_characteristic_write(flags, path, sender_tx),
        notify,
        descriptors,
        control_handle,
        ..Default::default()
    };
    Ok((char, handler))
}

fn get_characteristic_read(
    flags: &AttributeFlags,
    path: &AttributePath,
    sender_tx: Sender<AccessRequest>,
) -> Option<CharacteristicRead> {
    if !flags.is_readable() {
        return None;
    }
    let path = path.clone();
    Some(CharacteristicRead {
        read: flags.contains(AttributeFlag::Read),
        encrypt_read: flags.contains(AttributeFlag::EncryptRead),
        secure_read: flags.contains(AttributeFlag::SecureRead),
        fun: Box::new(move |request: CharacteristicReadRequest| {
            let sender_tx = sender_tx.clone();
            let path = path.clone();
            async move {
                let options = ReadOptions {
                    offset: request.offset,
                    device: Some(request.device_address.to_string()),
                    mtu: Some(request.mtu),
                };
                on_read_request(sender_tx, path, options).await
            }
            .boxed()
        }),
        ..Default::default()
    })
}

fn get_characteristic_write(
    flags: &AttributeFlags,
    path: &AttributePath,
    sender_tx: Sender<AccessRequest>,
) -> Option<CharacteristicWrite> {
    if !flags.is_writable() {
        return None;
    }
    let path = path.clone();
    Some(CharacteristicWrite {
        write: flags.contains(AttributeFlag::Write),
        encrypt_write: flags.contains(AttributeFlag::EncryptWrite),
        secure_write: flags.contains(AttributeFlag::SecureWrite),
        method: CharacteristicWriteMethod::Fun(Box::new(
            move |value: Vec<u8>, request: CharacteristicWriteRequest| {
                let sender_tx = sender_tx.clone();
                let path = path.clone();
                async move {
                    let options = WriteOptions {
                        offset: request.offset,
                        device: Some(request.device_address.to_string()),
                        mtu: Some(request.mtu),
                    };
                    on_write_request(sender_tx, path, value, options).await
                }
                .boxed()
            },
        )),
        ..Default::default()
    })
}

fn get_characteristic_notify(flags: &AttributeFlags) -> Option<CharacteristicNotify> {
    if !flags.contains(AttributeFlag::Notify) {
        return None;
    }
    Some(CharacteristicNotify {
        notify: true,
        method: CharacteristicNotifyMethod::Io,
        ..Default::default()
    })
}

fn parse_descriptor(
    path: &AttributePath,
    props: &PropertyMap,
    sender_tx: Sender<AccessRequest>,
) -> Result<Descriptor, Error> {
    let flags = flags(props)?;

    let read = flags.is_readable().then(|| {
        let sender_tx = sender_tx.clone();
        let path = path.clone();
        DescriptorRead {
            read: flags.contains(AttributeFlag::Read),
            encrypt_read: flags.contains(AttributeFlag::EncryptRead),
            secure_read: flags.contains(AttributeFlag::SecureRead),
            fun: Box::new(move |request: DescriptorReadRequest| {
                let sender_tx = sender_tx.clone();
                let path = path.clone();
                async move {
                    let options = ReadOptions {
                        offset: request.offset,
                        device: Some(request.device_address.to_string()),
                        mtu: None,
                    };
                    on_read_request(sender_tx, path, options).await
                }
                .boxed()
            }),
            ..Default::default()
        }
    });

    let write = flags.is_writable().then(|| {
        let path = path.clone();
        DescriptorWrite {
            write: flags.contains(AttributeFlag::Write),
            encrypt_write: flags.contains(AttributeFlag::EncryptWrite),
            secure_write: flags.contains(AttributeFlag::SecureWrite),
            fun: Box::new(move |value: Vec<u8>, request: DescriptorWriteRequest| {
                let sender_tx = sender_tx.clone();
                let path = path.clone();
                async move {
                    let options = WriteOptions {
                        offset: request.offset,
                        device: Some(request.device_address.to_string()),
                        mtu: None,
                    };
                    on_write_request(sender_tx, path, value, options).await
                }
                .boxed()
            }),
            ..Default::default()
        }
    });

    Ok(Descriptor {
        uuid: uuid(props)?,
        read,
        write,
        ..Default::default()
    })
}

fn lookup<'a>(
    objects: &'a ManagedObjects,
    path: &AttributePath,
    interface: Interface,
) -> Result<&'a PropertyMap, Error> {
    objects
        .get(path)
        .and_then(|interfaces| interfaces.get(&interface))
        .ok_or_else(|| {
            Error::from_string(
                format!("{} has no {} properties", path, interface),
                ErrorType::Registration,
            )
        })
}

fn uuid(props: &PropertyMap) -> Result<Uuid, Error> {
    match props.get("UUID") {
        Some(PropertyValue::Uuid(uuid)) => Ok(*uuid),
        _ => Err(missing("UUID")),
    }
}

fn flags(props: &PropertyMap) -> Result<&AttributeFlags, Error> {
    props
        .get("Flags")
        .and_then(PropertyValue::as_flags)
        .ok_or_else(|| missing("Flags"))
}

fn paths<'a>(props: &'a PropertyMap, name: &str) -> Result<&'a [AttributePath], Error> {
    props
        .get(name)
        .and_then(PropertyValue::as_paths)
        .ok_or_else(|| missing(name))
}

fn missing(name: &str) -> Error {
    Error::from_string(format!("Missing property {}", name), ErrorType::Registration)
}

/// Handle Requests
async fn on_read_request(
    sender_tx: Sender<AccessRequest>,
    path: AttributePath,
    options: ReadOptions,
) -> Result<Vec<u8>, ReqError> {
    let (res_tx, res_rx) = oneshot::channel();
    if let Err(err) = sender_tx
        .send(AccessRequest::ReadValue {
            path,
            options,
            responder: res_tx,
        })
        .await
    {
        log::error!("Error sending read request: {:?}", err);
        return Err(ReqError::Failed);
    }

    match res_rx.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.error_type().to_req_err()),
        Err(_) => Err(ReqError::Failed),
    }
}

async fn on_write_request(
    sender_tx: Sender<AccessRequest>,
    path: AttributePath,
    value: Vec<u8>,
    options: WriteOptions,
) -> Result<(), ReqError> {
    let (res_tx, res_rx) = oneshot::channel();
    if let Err(err) = sender_tx
        .send(AccessRequest::WriteValue {
            path,
            value,
            options,
            responder: res_tx,
        })
        .await
    {
        log::error!("Error sending write request: {:?}", err);
        return Err(ReqError::Failed);
    }

    match res_rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.error_type().to_req_err()),
        Err(_) => Err(ReqError::Failed),
    }
}
