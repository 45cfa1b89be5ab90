use serde::Deserialize;
use thiserror::Error;

use crate::database::NewDevice;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name and IP are required")]
    MissingNameOrIp,
}

/// Body accepted by device registration. Every field is optional on the wire
/// so a missing `name`/`ip` becomes a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterDevice {
    pub name: Option<String>,
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub location: Option<String>,
}

impl RegisterDevice {
    /// Check required fields and apply defaults. The ip is not parsed or resolved.
    pub fn validate(self) -> Result<NewDevice, ValidationError> {
        let name = self.name.filter(|name| !name.is_empty());
        let ip = self.ip.filter(|ip| !ip.is_empty());

        match (name, ip) {
            (Some(name), Some(ip)) => Ok(NewDevice::new(name, ip, self.device_type, self.location)),
            _ => Err(ValidationError::MissingNameOrIp),
        }
    }
}
