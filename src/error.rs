use std::{error, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    InvalidArgs,
    NotSupported,
    NotPermitted,
    InvalidValueLength,
    Failed,
    Bluez,
    Config,
    Registration,
}

impl ErrorType {
    /// Error name reported to the peripheral manager.
    pub fn dbus_name(self) -> &'static str {
        match self {
            ErrorType::InvalidArgs => "org.freedesktop.DBus.Error.InvalidArgs",
            ErrorType::NotSupported => "org.bluez.Error.NotSupported",
            ErrorType::NotPermitted => "org.bluez.Error.NotPermitted",
            ErrorType::InvalidValueLength => "org.bluez.Error.InvalidValueLength",
            ErrorType::Failed
            | ErrorType::Bluez
            | ErrorType::Config
            | ErrorType::Registration => "org.bluez.Error.Failed",
        }
    }
}

impl From<ErrorType> for &'static str {
    fn from(error_type: ErrorType) -> &'static str {
        match error_type {
            ErrorType::InvalidArgs => "InvalidArgs",
            ErrorType::NotSupported => "NotSupported",
            ErrorType::NotPermitted => "NotPermitted",
            ErrorType::InvalidValueLength => "InvalidValueLength",
            ErrorType::Failed => "Failed",
            ErrorType::Bluez => "Bluez",
            ErrorType::Config => "Config",
            ErrorType::Registration => "Registration",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(self: &Self, f: &mut fmt::Formatter) -> fmt::Result {
        let error_type: &str = (*self).into();
        write!(f, "<GattPeripheral {} Error>", error_type)
    }
}

impl error::Error for ErrorType {}

#[derive(Debug, Clone)]
pub struct Error {
    name: String,
    description: String,
    error_type: ErrorType,
}

impl Error {
    pub fn new<T: Into<String>>(name: T, description: T, error_type: ErrorType) -> Self {
        Error {
            name: name.into(),
            description: description.into(),
            error_type,
        }
    }

    pub fn from_type(error_type: ErrorType) -> Self {
        let name: String = error_type.to_string();
        let description: String = error_type.dbus_name().to_string();
        Error {
            name,
            description,
            error_type,
        }
    }

    pub fn from_string(error: String, error_type: ErrorType) -> Self {
        let name: String = error_type.to_string();
        Error {
            name,
            description: error,
            error_type,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn details(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Error {
    fn fmt(self: &Self, f: &mut fmt::Formatter) -> fmt::Result {
        let error_type: &str = self.error_type.into();
        write!(
            f,
            "**GattPeripheral {} Error**\n\n\t{}:\n\t\t{}",
            error_type, self.name, self.description,
        )
    }
}

impl error::Error for Error {
    fn source(self: &Self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error_type)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::from_string(error.to_string(), ErrorType::Config)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::from_string(error.to_string(), ErrorType::Config)
    }
}

impl From<uuid::Error> for Error {
    fn from(error: uuid::Error) -> Self {
        Error::from_string(error.to_string(), ErrorType::Config)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
