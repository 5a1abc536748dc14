//! Connection layer for BLE LED matrix panels
//!
//! [`ConnectionManager`] finds the panel by address, opens and verifies the link, and tears
//! it down again. [`CapabilityResolver`] turns the services the panel exposes into the
//! write/notify handles command code needs, plus the standard device information fields.
//!
//! ```ignore
//! use ble_led_panel::{CapabilityResolver, ConnectionManager, LogFacade, Logger, transport_btleplug::BtleplugTransport};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let logger: Arc<dyn Logger> = Arc::new(LogFacade);
//! let transport = BtleplugTransport::new(logger.clone()).await?;
//! let mut manager = ConnectionManager::new(transport, "AA:BB:CC:DD:EE:FF".into(), logger.clone());
//! manager.search(Duration::from_secs(10)).await?;
//! manager.connect().await?;
//! let resolver = CapabilityResolver::new(logger);
//! let channels = resolver.resolve_command_channels(manager.session().unwrap()).await;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod logger;
pub mod resolver;
pub mod transport;
pub mod transport_btleplug;

#[cfg(test)]
mod testing;

pub use config::PanelConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{PanelError, Precondition};
pub use logger::{LogFacade, Logger};
pub use resolver::{CapabilityResolver, DeviceInfo, HandleTable, InfoField, Role};
pub use transport::{BleSession, BleTransport, CharacteristicRef, DeviceAddress, Property, ServiceInfo};
