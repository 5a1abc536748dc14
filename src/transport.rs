use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// GATT characteristic properties
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
    AuthenticatedSignedWrites,
    ExtendedProperties,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::Broadcast => "broadcast",
            Property::Read => "read",
            Property::WriteWithoutResponse => "write-without-response",
            Property::Write => "write",
            Property::Notify => "notify",
            Property::Indicate => "indicate",
            Property::AuthenticatedSignedWrites => "authenticated-signed-writes",
            Property::ExtendedProperties => "extended-properties",
        };
        f.write_str(name)
    }
}

/// A characteristic as it was discovered, with its property set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicRef {
    pub uuid: Uuid,
    pub properties: BTreeSet<Property>,
}

impl CharacteristicRef {
    pub fn new(uuid: Uuid, properties: impl IntoIterator<Item = Property>) -> Self {
        CharacteristicRef {
            uuid,
            properties: properties.into_iter().collect(),
        }
    }

    pub fn has(&self, property: Property) -> bool {
        self.properties.contains(&property)
    }
}

/// A discovered service and its characteristics, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicRef>,
}

/// Platform specific peripheral identifier (MAC address, or a CoreBluetooth UUID on macOS)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(address: impl Into<String>) -> Self {
        DeviceAddress(address.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(address: &str) -> Self {
        DeviceAddress::new(address)
    }
}

/// BLE radio stack entry point: locates a peripheral and opens a session to it
#[allow(async_fn_in_trait)]
pub trait BleTransport {
    type Session: BleSession;
    /// Scan for the peripheral at `address` and open a session, giving up after `timeout`
    async fn scan_and_open(&self, address: &DeviceAddress, timeout: Duration) -> Result<Self::Session>;
}

/// An open session to a single peripheral
#[allow(async_fn_in_trait)]
pub trait BleSession {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    /// Live connection status as reported by the radio stack
    async fn is_connected(&self) -> Result<bool>;
    /// Services and their characteristics, in discovery order
    async fn services(&self) -> Result<Vec<ServiceInfo>>;
    async fn read(&self, char: Uuid) -> Result<Vec<u8>>;
    async fn write(&self, char: Uuid, bytes: &[u8]) -> Result<()>;
    /// Subscribe to notifications on the given characteristic
    async fn subscribe(&self, char: Uuid) -> Result<()>;
}
