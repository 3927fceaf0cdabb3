//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent listeners (0 = unlimited)
    pub max_connections: usize,

    /// Pause between polls while a listener's frame is not yet full
    pub poll_interval: Duration,

    /// Drop a listener whose socket does not accept a frame within this time
    pub write_timeout: Duration,

    /// Request head must arrive within this time
    pub request_timeout: Duration,

    /// How long shutdown waits for open listeners before aborting them
    pub drain_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6000)),
            max_connections: 0, // Unlimited
            poll_interval: Duration::from_millis(100),
            write_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(2),
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the idle poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the request head timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the shutdown drain timeout
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 6000);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:6001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 6001);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(8)
            .poll_interval(Duration::from_millis(20))
            .write_timeout(Duration::from_secs(3))
            .request_timeout(Duration::from_secs(1))
            .drain_timeout(Duration::from_millis(500));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.poll_interval, Duration::from_millis(20));
        assert_eq!(config.write_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.drain_timeout, Duration::from_millis(500));
    }
}
