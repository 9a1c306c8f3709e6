//! Sensor port discovery

use super::PortInfo;
use crate::config::DEFAULT_DEVICE_KEYWORDS;

/// Picks the port most likely to be the sensor board
///
/// A port whose description contains one of the keywords (case-sensitive)
/// wins; otherwise the first listed port is used.
#[derive(Debug, Clone)]
pub struct PortLocator {
    keywords: Vec<String>,
}

impl Default for PortLocator {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }
}

impl PortLocator {
    /// Locator matching any of `keywords`
    pub fn new(keywords: Vec<String>) -> Self {
        Self { keywords }
    }

    fn matches(&self, port: &PortInfo) -> bool {
        self.keywords
            .iter()
            .any(|keyword| port.description.contains(keyword.as_str()))
    }

    /// Choose a candidate among `ports`
    pub fn locate<'a>(&self, ports: &'a [PortInfo]) -> Option<&'a PortInfo> {
        tracing::info!("Searching for sensor port...");
        for port in ports {
            tracing::info!(port = %port.name, description = %port.description, "Found port");
        }

        if let Some(port) = ports.iter().find(|p| self.matches(p)) {
            tracing::info!(port = %port.name, "Identified likely sensor port");
            return Some(port);
        }

        match ports.first() {
            Some(port) => {
                tracing::warn!(
                    port = %port.name,
                    "No sensor port identified by description, defaulting to first available port"
                );
                Some(port)
            }
            None => {
                tracing::warn!("No serial ports found");
                None
            }
        }
    }
}
