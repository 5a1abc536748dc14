use crate::transport::DeviceAddress;
use thiserror::Error;

/// Lifecycle operations that were attempted in a required state which did not hold
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Precondition {
    #[error("no client available")]
    NoClient,
    #[error("no address given")]
    NoAddress,
}

/// Failures of the connection layer
///
/// Every radio stack fault is mapped to one of these at the point where it happens.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("no BLE device found with address {address}: {reason}")]
    Discovery { address: DeviceAddress, reason: String },
    #[error("{0}")]
    Precondition(#[from] Precondition),
    #[error("{operation} failed: {reason}")]
    Transport { operation: &'static str, reason: String },
    #[error("resolution failed: {0}")]
    Resolution(String),
}

impl PanelError {
    pub(crate) fn transport(operation: &'static str, err: anyhow::Error) -> Self {
        PanelError::Transport {
            operation,
            reason: format!("{:#}", err),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, PanelError::Precondition(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn transport_error_keeps_context_chain() {
        let err = Err::<(), _>(anyhow!("link lost"))
            .context("Failed to establish a connection")
            .unwrap_err();
        let err = PanelError::transport("connect", err);
        assert_eq!(err.to_string(), "connect failed: Failed to establish a connection: link lost");
    }

    #[test]
    fn precondition_messages() {
        assert_eq!(PanelError::from(Precondition::NoClient).to_string(), "no client available");
        assert!(PanelError::from(Precondition::NoAddress).is_precondition());
    }
}
