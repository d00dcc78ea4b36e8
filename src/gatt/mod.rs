pub mod access;
pub mod application;
pub mod characteristic;
pub mod descriptor;
pub mod export;
pub mod notify;
pub mod path;
pub mod properties;
pub mod request;
pub mod service;
