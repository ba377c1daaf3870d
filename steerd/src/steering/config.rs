use std::path::Path;

use serde::Deserialize;
use strum_macros::{Display, EnumString};

use steer_packet::MacAddr;

// Seconds between periodic SCORE floods while a client is associated.
pub const SCORE_FLOOD_INTERVAL: u64 = 1;
// Seconds spent in Rejecting/Rejected before the client gets another
// chance to associate.
pub const STATE_TIMEOUT: u64 = 10;
// Seconds without a probe before the local score is considered lost.
pub const PROBE_LOSS_TIMEOUT: u64 = 34;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Display, EnumString, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SteeringMode {
    #[default]
    #[strum(serialize = "off")]
    Off,
    #[strum(serialize = "suggest")]
    Suggest,
    #[strum(serialize = "force")]
    Force,
}

/// Per-context steering configuration, loaded once at startup. The peer
/// list is the mobility domain shared with the fast-transition
/// configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SteeringConfig {
    /// Wired distribution interface shared with the peers.
    pub bridge: String,

    /// BSSID of the local BSS.
    pub bssid: MacAddr,

    /// Transport endpoint on the bridge. Defaults to the BSSID.
    #[serde(default)]
    pub own_addr: Option<MacAddr>,

    /// Current operating channel.
    #[serde(default)]
    pub channel: u8,

    #[serde(default)]
    pub net_steering_mode: SteeringMode,

    /// Peer BSSIDs in the mobility domain.
    #[serde(default)]
    pub mobility_domain: Vec<MacAddr>,
}

impl SteeringConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn mode(&self) -> SteeringMode {
        self.net_steering_mode
    }

    pub fn own_addr(&self) -> MacAddr {
        self.own_addr.unwrap_or(self.bssid)
    }

    pub fn peers(&self) -> &[MacAddr] {
        &self.mobility_domain
    }

    /// With mode off or no peers the context stays inert.
    pub fn enabled(&self) -> bool {
        self.net_steering_mode != SteeringMode::Off && !self.mobility_domain.is_empty()
    }
}
