use crate::transport::DeviceAddress;
use std::time::Duration;

/// Stock discovery timeout
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Target panel and discovery settings
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub address: DeviceAddress,
    pub search_timeout: Duration,
}

impl PanelConfig {
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        PanelConfig {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            address: DeviceAddress::new(""),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_stock_timeout() {
        let config = PanelConfig::new("AA:BB:CC:DD:EE:FF");
        assert_eq!(config.address.as_str(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(config.search_timeout, Duration::from_secs(10));
        let config = config.with_search_timeout(Duration::from_secs(1));
        assert_eq!(config.search_timeout, Duration::from_secs(1));
    }
}
