//! Hub configuration

/// Hub configuration options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,

    /// Capacity of the inbound broadcast channel. When the hub loop falls
    /// behind, producers block here instead of piling up unboundedly.
    pub broadcast_capacity: usize,

    /// Whether a broadcast is delivered back to the connection it came from
    pub echo_to_sender: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            broadcast_capacity: 64,
            echo_to_sender: true,
        }
    }
}

impl HubConfig {
    /// Set the per-connection outbound queue capacity
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the broadcast channel capacity
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    /// Set whether senders receive their own broadcasts
    pub fn echo_to_sender(mut self, echo: bool) -> Self {
        self.echo_to_sender = echo;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.broadcast_capacity, 64);
        assert!(config.echo_to_sender);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .outbound_capacity(8)
            .broadcast_capacity(4)
            .echo_to_sender(false);

        assert_eq!(config.outbound_capacity, 8);
        assert_eq!(config.broadcast_capacity, 4);
        assert!(!config.echo_to_sender);
    }

    #[test]
    fn test_capacities_clamped_to_one() {
        let config = HubConfig::default().outbound_capacity(0).broadcast_capacity(0);

        assert_eq!(config.outbound_capacity, 1);
        assert_eq!(config.broadcast_capacity, 1);
    }
}
