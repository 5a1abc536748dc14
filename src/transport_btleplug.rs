use crate::logger::Logger;
use crate::transport::{BleSession, BleTransport, CharacteristicRef, DeviceAddress, Property, ServiceInfo};

use anyhow::{Context, Result, anyhow};
use btleplug::api::{
    BDAddr, Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    WriteType,
};
use btleplug::platform::Adapter;
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct BtleplugTransport {
    adapter: Adapter,
    logger: Arc<dyn Logger>,
}

impl BtleplugTransport {
    pub async fn new(logger: Arc<dyn Logger>) -> anyhow::Result<Self> {
        let manager = btleplug::platform::Manager::new().await?;
        let adapters = manager.adapters().await?;
        if let Some(adapter) = adapters.into_iter().next() {
            Ok(BtleplugTransport { adapter, logger })
        } else {
            Err(anyhow!("No Bluetooth adapter found"))
        }
    }

    async fn find_peripheral(&self, address: &DeviceAddress) -> Result<Peripheral> {
        let target = Target::parse(address)?;
        self.adapter.start_scan(ScanFilter::default()).await?;
        let mut events = self.adapter.events().await?;

        // peripherals seen by an earlier scan do not produce a new discovery event
        for peripheral in self.adapter.peripherals().await? {
            if target.matches(&peripheral) {
                return Ok(peripheral);
            }
        }

        while let Some(event) = events.next().await {
            if let CentralEvent::DeviceDiscovered(id) = event {
                let peripheral = self.adapter.peripheral(&id).await?;
                if target.matches(&peripheral) {
                    return Ok(peripheral);
                }
            }
        }
        Err(anyhow!("Scanning stopped unexpectedly"))
    }
}

/// How a [`DeviceAddress`] is matched against scan results on this platform
#[cfg_attr(target_os = "macos", allow(dead_code))]
enum Target {
    Address(BDAddr),
    Id(String),
}

impl Target {
    #[cfg(target_os = "macos")]
    fn parse(address: &DeviceAddress) -> Result<Self> {
        // CoreBluetooth hides MAC addresses and identifies peripherals by UUID
        anyhow::ensure!(
            BDAddr::from_str(address.as_str()).is_err(),
            "BLE MAC addresses are not supported on macOS"
        );
        Ok(Target::Id(address.as_str().to_lowercase()))
    }

    #[cfg(not(target_os = "macos"))]
    fn parse(address: &DeviceAddress) -> Result<Self> {
        match BDAddr::from_str(address.as_str()) {
            Ok(addr) => Ok(Target::Address(addr)),
            Err(_) => Ok(Target::Id(address.as_str().to_lowercase())),
        }
    }

    fn matches(&self, peripheral: &Peripheral) -> bool {
        match self {
            Target::Address(addr) => peripheral.address() == *addr,
            Target::Id(id) => peripheral.id().to_string().eq_ignore_ascii_case(id),
        }
    }
}

impl BleTransport for BtleplugTransport {
    type Session = BtleplugSession;

    async fn scan_and_open(&self, address: &DeviceAddress, timeout: Duration) -> Result<BtleplugSession> {
        let found = tokio::time::timeout(timeout, self.find_peripheral(address)).await;
        if let Err(e) = self.adapter.stop_scan().await {
            self.logger.debug(&format!("Failed to stop scanning: {}", e));
        }
        let peripheral = found.map_err(|_| anyhow!("no advertisement within {:?}", timeout))??;
        Ok(BtleplugSession { peripheral })
    }
}

pub struct BtleplugSession {
    peripheral: Peripheral,
}

impl BtleplugSession {
    fn characteristic(&self, uuid: uuid::Uuid) -> Result<Characteristic> {
        for char in self.peripheral.characteristics() {
            if uuid == char.uuid {
                return Ok(char);
            }
        }
        Err(anyhow!("characteristic {} not found", uuid))
    }

    fn properties(flags: CharPropFlags) -> impl Iterator<Item = Property> {
        [
            (CharPropFlags::BROADCAST, Property::Broadcast),
            (CharPropFlags::READ, Property::Read),
            (CharPropFlags::WRITE_WITHOUT_RESPONSE, Property::WriteWithoutResponse),
            (CharPropFlags::WRITE, Property::Write),
            (CharPropFlags::NOTIFY, Property::Notify),
            (CharPropFlags::INDICATE, Property::Indicate),
            (CharPropFlags::AUTHENTICATED_SIGNED_WRITES, Property::AuthenticatedSignedWrites),
            (CharPropFlags::EXTENDED_PROPERTIES, Property::ExtendedProperties),
        ]
        .into_iter()
        .filter(move |(flag, _)| flags.contains(*flag))
        .map(|(_, property)| property)
    }
}

impl BleSession for BtleplugSession {
    async fn connect(&self) -> Result<()> {
        self.peripheral.connect().await.context("Failed to establish a connection")
    }

    async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await.context("Failed to close the connection")
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn services(&self) -> Result<Vec<ServiceInfo>> {
        if self.peripheral.services().is_empty() {
            self.peripheral.discover_services().await.context("Service discovery failed")?;
        }
        let services = self
            .peripheral
            .services()
            .into_iter()
            .map(|service| ServiceInfo {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|char| CharacteristicRef::new(char.uuid, Self::properties(char.properties)))
                    .collect(),
            })
            .collect();
        Ok(services)
    }

    async fn read(&self, char: uuid::Uuid) -> Result<Vec<u8>> {
        let char = self.characteristic(char)?;
        Ok(self.peripheral.read(&char).await?)
    }

    async fn write(&self, char: uuid::Uuid, bytes: &[u8]) -> Result<()> {
        let char = self.characteristic(char)?;
        // TODO: size chunks from the negotiated MTU once btleplug exposes it
        // 20 bytes fits the default ATT MTU of 23
        const CHUNK: usize = 20;
        let write_type = if char.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        for chunk in bytes.chunks(CHUNK) {
            self.peripheral.write(&char, chunk, write_type).await?;
        }
        Ok(())
    }

    async fn subscribe(&self, char: uuid::Uuid) -> Result<()> {
        let char = self.characteristic(char)?;
        self.peripheral.subscribe(&char).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_property_flags() {
        let properties: Vec<_> =
            BtleplugSession::properties(CharPropFlags::WRITE | CharPropFlags::NOTIFY | CharPropFlags::READ).collect();
        assert_eq!(properties, vec![Property::Read, Property::Write, Property::Notify]);
        assert_eq!(BtleplugSession::properties(CharPropFlags::empty()).count(), 0);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn parses_mac_and_platform_ids() {
        let target = Target::parse(&DeviceAddress::new("AA:BB:CC:DD:EE:FF")).unwrap();
        assert!(matches!(target, Target::Address(_)));
        let target = Target::parse(&DeviceAddress::new("0CCF7211-8818-5CE3-5257-D7FC2B5B542F")).unwrap();
        assert!(matches!(target, Target::Id(id) if id == "0ccf7211-8818-5ce3-5257-d7fc2b5b542f"));
    }
}
