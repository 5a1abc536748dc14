use crate::error::PanelError;
use crate::logger::Logger;
use crate::transport::{BleSession, CharacteristicRef, Property, ServiceInfo};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Logical channels used to drive the panel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Write,
    Notify,
}

/// Command channels found on the panel, first match per role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleTable {
    write: Option<CharacteristicRef>,
    notify: Option<CharacteristicRef>,
}

impl HandleTable {
    pub fn get(&self, role: Role) -> Option<&CharacteristicRef> {
        match role {
            Role::Write => self.write.as_ref(),
            Role::Notify => self.notify.as_ref(),
        }
    }

    pub fn write(&self) -> Option<&CharacteristicRef> {
        self.write.as_ref()
    }

    pub fn notify(&self) -> Option<&CharacteristicRef> {
        self.notify.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.write.is_some() && self.notify.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.write.is_none() && self.notify.is_none()
    }

    /// Fill `role` unless an earlier characteristic already took it
    fn assign(&mut self, role: Role, char: &CharacteristicRef) {
        let slot = match role {
            Role::Write => &mut self.write,
            Role::Notify => &mut self.notify,
        };
        if slot.is_none() {
            *slot = Some(char.clone());
        }
    }
}

impl fmt::Display for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn uuid(char: &Option<CharacteristicRef>) -> String {
            char.as_ref().map_or("None".to_string(), |c| c.uuid.to_string())
        }
        write!(f, "write: {}, notify: {}", uuid(&self.write), uuid(&self.notify))
    }
}

/// Device Information Service fields
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum InfoField {
    Manufacturer,
    Model,
    SerialNumber,
    DeviceName,
}

impl InfoField {
    pub const ALL: [InfoField; 4] = [
        InfoField::Manufacturer,
        InfoField::Model,
        InfoField::SerialNumber,
        InfoField::DeviceName,
    ];

    pub fn uuid(self) -> Uuid {
        match self {
            InfoField::Manufacturer => gatt_uuids::MANUFACTURER_NAME,
            InfoField::Model => gatt_uuids::MODEL_NUMBER,
            InfoField::SerialNumber => gatt_uuids::SERIAL_NUMBER,
            InfoField::DeviceName => gatt_uuids::DEVICE_NAME,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InfoField::Manufacturer => "manufacturer",
            InfoField::Model => "model",
            InfoField::SerialNumber => "serial_number",
            InfoField::DeviceName => "device_name",
        }
    }
}

/// Raw values read from the Device Information Service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo(BTreeMap<InfoField, Vec<u8>>);

impl DeviceInfo {
    pub fn get(&self, field: InfoField) -> Option<&[u8]> {
        self.0.get(&field).map(Vec::as_slice)
    }

    /// Field decoded as text, with trailing NULs and whitespace stripped
    pub fn text(&self, field: InfoField) -> Option<String> {
        let raw = self.get(field)?;
        let text = String::from_utf8_lossy(raw);
        Some(text.trim_end_matches(['\0', ' ', '\n', '\r']).to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InfoField, &[u8])> {
        self.0.iter().map(|(field, value)| (*field, value.as_slice()))
    }
}

/// Maps what a session discovered onto the handles higher level code works with
///
/// Sessions are only borrowed for the duration of a call.
pub struct CapabilityResolver {
    logger: Arc<dyn Logger>,
}

impl CapabilityResolver {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        CapabilityResolver { logger }
    }

    /// Pick the first writable and the first notifiable characteristic, in discovery order
    ///
    /// Stops scanning services once both are found. Missing roles are left empty.
    pub async fn resolve_command_channels<S: BleSession>(&self, session: &S) -> HandleTable {
        let services = match session.services().await {
            Ok(services) => services,
            Err(e) => {
                let err = PanelError::Resolution(format!("service enumeration: {:#}", e));
                self.logger
                    .error(&format!("Failed to retrieve characteristics: {}", err));
                return HandleTable::default();
            }
        };
        let table = Self::select_channels(&services);
        self.logger
            .debug(&format!("Characteristics retrieved: {}", table));
        table
    }

    fn select_channels<'a>(services: impl IntoIterator<Item = &'a ServiceInfo>) -> HandleTable {
        let mut table = HandleTable::default();
        for service in services {
            for char in &service.characteristics {
                if char.has(Property::Write) {
                    table.assign(Role::Write, char);
                }
                if char.has(Property::Notify) {
                    table.assign(Role::Notify, char);
                }
            }
            if table.is_complete() {
                break;
            }
        }
        table
    }

    /// Read the well-known Device Information Service fields the panel exposes
    ///
    /// A field that fails to read is skipped, the others are still read.
    pub async fn resolve_device_info<S: BleSession>(&self, session: &S) -> DeviceInfo {
        let services = match session.services().await {
            Ok(services) => services,
            Err(e) => {
                let err = PanelError::Resolution(format!("service enumeration: {:#}", e));
                self.logger
                    .error(&format!("Failed to retrieve device information: {}", err));
                return DeviceInfo::default();
            }
        };
        let Some(service) = services
            .iter()
            .find(|s| s.uuid == gatt_uuids::DEVICE_INFORMATION_SERVICE)
        else {
            self.logger.warn("Device Information Service not found");
            return DeviceInfo::default();
        };

        let mut info = DeviceInfo::default();
        for field in InfoField::ALL {
            let uuid = field.uuid();
            if !service.characteristics.iter().any(|c| c.uuid == uuid) {
                continue;
            }
            match session.read(uuid).await {
                Ok(value) => {
                    info.0.insert(field, value);
                }
                Err(e) => {
                    let err = PanelError::Resolution(format!("reading {} ({}): {:#}", field.name(), uuid, e));
                    self.logger
                        .error(&format!("Failed to read device information: {}", err));
                }
            }
        }
        self.logger
            .debug(&format!("Device information retrieved: {} field(s)", info.len()));
        info
    }
}

/// Standard Bluetooth SIG service & characteristic UUIDs
pub mod gatt_uuids {
    use uuid::Uuid;
    /// Device Information Service (16 bit UUID 0x180A)
    pub const DEVICE_INFORMATION_SERVICE: Uuid = Uuid::from_u128(0x0000180A_0000_1000_8000_00805F9B34FB);
    /// Device Name (0x2A00)
    pub const DEVICE_NAME: Uuid = Uuid::from_u128(0x00002A00_0000_1000_8000_00805F9B34FB);
    /// Model Number String (0x2A24)
    pub const MODEL_NUMBER: Uuid = Uuid::from_u128(0x00002A24_0000_1000_8000_00805F9B34FB);
    /// Serial Number String (0x2A25)
    pub const SERIAL_NUMBER: Uuid = Uuid::from_u128(0x00002A25_0000_1000_8000_00805F9B34FB);
    /// Manufacturer Name String (0x2A29)
    pub const MANUFACTURER_NAME: Uuid = Uuid::from_u128(0x00002A29_0000_1000_8000_00805F9B34FB);
}
