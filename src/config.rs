use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_port: u16,
    pub pool_base: Ipv4Addr,
    pub pool_size: u32,
    pub lease_duration_seconds: u32,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub max_in_flight: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: 67,
            pool_base: Ipv4Addr::new(192, 168, 1, 100),
            pool_size: 50,
            lease_duration_seconds: 3600,
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            dns: Ipv4Addr::new(8, 8, 8, 8),
            max_in_flight: 8,
        }
    }
}

impl Config {
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        // Addresses are generated from pool_base+1 through pool_base+pool_size.
        if u32::from(self.pool_base)
            .checked_add(self.pool_size)
            .is_none()
        {
            return Err(Error::InvalidConfig(format!(
                "pool of {} addresses starting at {} runs past the end of the address space",
                self.pool_size, self.pool_base
            )));
        }

        let gateway = u32::from(self.gateway);
        let first = u32::from(self.pool_first());
        let last = u32::from(self.pool_last());
        if gateway >= first && gateway <= last {
            return Err(Error::InvalidConfig(
                "gateway must not be within the pool range".to_string(),
            ));
        }

        if self.lease_duration_seconds == 0 {
            return Err(Error::InvalidConfig(
                "lease_duration_seconds must be greater than 0".to_string(),
            ));
        }

        if self.max_in_flight == 0 {
            return Err(Error::InvalidConfig(
                "max_in_flight must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// First address the pool will issue (`pool_base + 1`; the base itself
    /// is never handed out).
    pub fn pool_first(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.pool_base) + 1)
    }

    /// Last address the pool will issue (`pool_base + pool_size`).
    pub fn pool_last(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.pool_base) + self.pool_size)
    }
}
