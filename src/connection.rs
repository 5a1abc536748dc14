//! Connection lifecycle for a single panel
//!
//! `ConnectionManager` owns the device address and at most one open session, and walks
//! the `Idle → Searching → Found → Connecting → Connected → Disconnecting → Idle` state
//! machine. Every failure is logged where it happens and reported as a [`PanelError`];
//! any failure path falls back to `Idle`.

use crate::error::{PanelError, Precondition};
use crate::logger::Logger;
use crate::transport::{BleSession, BleTransport, CharacteristicRef, DeviceAddress};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Extra time the transport gets past the search limit to finish its own cleanup
pub const SEARCH_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Searching,
    Found,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct ConnectionManager<T: BleTransport> {
    transport: T,
    address: DeviceAddress,
    session: Option<T::Session>,
    state: ConnectionState,
    logger: Arc<dyn Logger>,
}

impl<T: BleTransport> ConnectionManager<T> {
    pub fn new(transport: T, address: DeviceAddress, logger: Arc<dyn Logger>) -> Self {
        ConnectionManager {
            transport,
            address,
            session: None,
            state: ConnectionState::Idle,
            logger,
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The open session, lent out for capability resolution
    pub fn session(&self) -> Option<&T::Session> {
        self.session.as_ref()
    }

    /// Look for the panel and open a session to it, giving up after `limit`
    ///
    /// The transport enforces `limit` itself; a transport that overruns it by more than
    /// [`SEARCH_GRACE`] is cut off. A session held from an earlier search is released first.
    /// On failure the manager is left `Idle` without a session.
    pub async fn search(&mut self, limit: Duration) -> Result<(), PanelError> {
        self.logger.info("Searching for BLE devices...");
        if let Some(previous) = self.session.take() {
            self.logger.debug("Releasing session from a previous search");
            if let Err(e) = previous.disconnect().await {
                self.logger.debug(&format!("Previous session did not close cleanly: {:#}", e));
            }
        }
        self.state = ConnectionState::Searching;

        let result = if self.address.is_empty() {
            Err(PanelError::Discovery {
                address: self.address.clone(),
                reason: "address is empty".to_string(),
            })
        } else {
            match timeout(limit + SEARCH_GRACE, self.transport.scan_and_open(&self.address, limit)).await {
                Ok(Ok(session)) => Ok(session),
                Ok(Err(e)) => Err(PanelError::Discovery {
                    address: self.address.clone(),
                    reason: format!("{:#}", e),
                }),
                Err(_) => Err(PanelError::Discovery {
                    address: self.address.clone(),
                    reason: format!("timed out after {:?}", limit + SEARCH_GRACE),
                }),
            }
        };

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.state = ConnectionState::Found;
                self.logger.info(&format!("Found target BLE device: {}", self.address));
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Idle;
                self.logger.warn(&format!("No BLE device found with address {}: {}", self.address, e));
                Err(e)
            }
        }
    }

    /// Establish the link on the session opened by [`search`](Self::search)
    ///
    /// Succeeds without reconnecting if the link is already up. A failed attempt drops the
    /// session, so the caller has to search again before retrying.
    pub async fn connect(&mut self) -> Result<(), PanelError> {
        self.logger
            .info(&format!("Connecting to BLE device with the address: {}", self.address));
        let Some(session) = self.session.as_ref() else {
            return Err(self.precondition_failed("connect to", Precondition::NoClient));
        };
        if self.address.is_empty() {
            return Err(self.precondition_failed("connect to", Precondition::NoAddress));
        }

        if matches!(session.is_connected().await, Ok(true)) {
            self.state = ConnectionState::Connected;
            self.logger
                .debug(&format!("Already connected to BLE device at {}", self.address));
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        match session.connect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.logger
                    .info(&format!("Connected to BLE device with the address: {}", self.address));
                Ok(())
            }
            Err(e) => {
                self.session = None;
                self.state = ConnectionState::Idle;
                let err = PanelError::transport("connect", e);
                self.logger.error(&format!("Failed to connect to BLE device: {}", err));
                Err(err)
            }
        }
    }

    /// Tear down the link and release the session
    ///
    /// The session is released even when the radio stack reports a failure.
    pub async fn disconnect(&mut self) -> Result<(), PanelError> {
        self.logger
            .info(&format!("Disconnecting from BLE device with the address: {}", self.address));
        let Some(session) = self.session.take() else {
            return Err(self.precondition_failed("disconnect from", Precondition::NoClient));
        };

        self.state = ConnectionState::Disconnecting;
        let result = session.disconnect().await;
        self.state = ConnectionState::Idle;
        match result {
            Ok(()) => {
                self.logger
                    .info(&format!("Disconnected from BLE device at {}", self.address));
                Ok(())
            }
            Err(e) => {
                let err = PanelError::transport("disconnect", e);
                self.logger
                    .error(&format!("Failed to disconnect from BLE device: {}", err));
                Err(err)
            }
        }
    }

    /// Live link status from the radio stack; `false` whenever it cannot be determined
    pub async fn is_connected(&self) -> bool {
        let Some(session) = self.session.as_ref() else {
            self.logger.error("No client available to check connection status");
            return false;
        };
        match session.is_connected().await {
            Ok(connected) => {
                self.logger.debug(&format!(
                    "Connection status with BLE device with the address: {}: {}",
                    self.address, connected
                ));
                connected
            }
            Err(e) => {
                self.logger
                    .error(&format!("Failed to check connection status: {:#}", e));
                false
            }
        }
    }

    /// Write a command to a resolved characteristic
    pub async fn write(&self, char: &CharacteristicRef, bytes: &[u8]) -> Result<(), PanelError> {
        let Some(session) = self.session.as_ref() else {
            return Err(self.precondition_failed("write to", Precondition::NoClient));
        };
        session.write(char.uuid, bytes).await.map_err(|e| {
            let err = PanelError::transport("write", e);
            self.logger.error(&format!("Failed to write to {}: {}", char.uuid, err));
            err
        })
    }

    /// Enable notifications on a resolved characteristic
    pub async fn subscribe(&self, char: &CharacteristicRef) -> Result<(), PanelError> {
        let Some(session) = self.session.as_ref() else {
            return Err(self.precondition_failed("subscribe on", Precondition::NoClient));
        };
        session.subscribe(char.uuid).await.map_err(|e| {
            let err = PanelError::transport("subscribe", e);
            self.logger.error(&format!("Failed to subscribe to {}: {}", char.uuid, err));
            err
        })
    }

    fn precondition_failed(&self, action: &str, precondition: Precondition) -> PanelError {
        self.logger
            .error(&format!("Couldn't {} BLE device: {}", action, precondition));
        precondition.into()
    }
}
