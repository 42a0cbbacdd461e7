use std::path::PathBuf;
use std::time::Duration;

/// Server configuration, produced by the CLI from flags and `FINGER_*` variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Enables debug-level logging
    pub debug: bool,
    /// Path to the URN alias document
    pub urn_path: PathBuf,
    /// Path to the resource (fingers) document
    pub finger_path: PathBuf,
    /// How long in-flight requests get to finish after shutdown is requested
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Listen address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            debug: false,
            urn_path: PathBuf::from("urns.yml"),
            finger_path: PathBuf::from("fingers.yml"),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.addr(), "localhost:8080");
        assert!(!config.debug);
        assert_eq!(config.urn_path, PathBuf::from("urns.yml"));
        assert_eq!(config.finger_path, PathBuf::from("fingers.yml"));
    }

    #[test]
    fn test_addr_uses_host_and_port() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 3005,
            ..Default::default()
        };
        assert_eq!(config.addr(), "0.0.0.0:3005");
    }
}
