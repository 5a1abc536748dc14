//! Scriptable in-memory radio stack for unit tests

use crate::transport::{BleSession, BleTransport, CharacteristicRef, DeviceAddress, Property, ServiceInfo};

use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub reachable: HashSet<String>,
    /// `scan_and_open` never completes
    pub hang: bool,
    /// `scan_and_open` scans until its own deadline, then stops the scan and fails
    pub scans_to_deadline: bool,
    pub scan_stopped: bool,
    pub connected: bool,
    pub connect_fails: bool,
    pub disconnect_fails: bool,
    pub status_fails: bool,
    pub services_fail: bool,
    pub services: Vec<ServiceInfo>,
    pub values: HashMap<Uuid, Vec<u8>>,
    pub failing_reads: HashSet<Uuid>,
    pub opened: usize,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub reads: Vec<Uuid>,
    pub writes: Vec<(Uuid, Vec<u8>)>,
    pub subscriptions: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub(crate) fn reachable(address: &str) -> Self {
        let transport = MockTransport::default();
        transport.state().reachable.insert(address.to_string());
        transport
    }

    pub(crate) fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn session(&self) -> MockSession {
        MockSession {
            state: self.state.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl BleTransport for MockTransport {
    type Session = MockSession;

    async fn scan_and_open(&self, address: &DeviceAddress, timeout: Duration) -> Result<MockSession> {
        let (hang, scans_to_deadline) = {
            let state = self.state();
            (state.hang, state.scans_to_deadline)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if scans_to_deadline {
            let _ = tokio::time::timeout(timeout, std::future::pending::<()>()).await;
            // stopping the scan takes a round trip to the adapter
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.state().scan_stopped = true;
            return Err(anyhow!("no advertisement within {:?}", timeout));
        }
        let mut state = self.state();
        if !state.reachable.contains(address.as_str()) {
            return Err(anyhow!("device not found after {:?}", timeout));
        }
        state.opened += 1;
        drop(state);
        Ok(self.session())
    }
}

impl BleSession for MockSession {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.connect_calls += 1;
        anyhow::ensure!(!state.connect_fails, "peer refused connection");
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.disconnect_calls += 1;
        anyhow::ensure!(!state.disconnect_fails, "controller busy");
        state.connected = false;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        let state = self.state.lock().unwrap();
        anyhow::ensure!(!state.status_fails, "adapter went away");
        Ok(state.connected)
    }

    async fn services(&self) -> Result<Vec<ServiceInfo>> {
        let state = self.state.lock().unwrap();
        anyhow::ensure!(!state.services_fail, "malformed service listing");
        Ok(state.services.clone())
    }

    async fn read(&self, char: Uuid) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.reads.push(char);
        anyhow::ensure!(!state.failing_reads.contains(&char), "read of {} timed out", char);
        state
            .values
            .get(&char)
            .cloned()
            .ok_or_else(|| anyhow!("characteristic not found"))
    }

    async fn write(&self, char: Uuid, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        anyhow::ensure!(state.connected, "not connected");
        state.writes.push((char, bytes.to_vec()));
        Ok(())
    }

    async fn subscribe(&self, char: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        anyhow::ensure!(state.connected, "not connected");
        state.subscriptions.push(char);
        Ok(())
    }
}

pub(crate) fn char(n: u128, properties: &[Property]) -> CharacteristicRef {
    CharacteristicRef::new(Uuid::from_u128(n), properties.iter().copied())
}

pub(crate) fn service(uuid: Uuid, characteristics: Vec<CharacteristicRef>) -> ServiceInfo {
    ServiceInfo { uuid, characteristics }
}
