use std::collections::BTreeMap;
use std::collections::btree_map::{Iter, IterMut};
use std::time::Instant;

use steer_packet::{MacAddr, SCORE_LOST};

use super::fsm::FsmState;
use super::task::Timer;

/// Opaque driver station record. Present while the client is locally
/// associated.
#[derive(Debug, Clone, Copy)]
pub struct StaHandle {
    pub aid: u16,
    /// Client advertises 802.11v BSS Transition Management support.
    pub bss_transition: bool,
}

#[derive(Debug, Default)]
pub struct ClientTimer {
    /// Periodic SCORE flood. Armed while Associated.
    pub flood: Option<Timer>,
    /// Armed while Rejecting/Rejected.
    pub state_timeout: Option<Timer>,
    /// Armed while the client is not locally associated.
    pub probe_loss: Option<Timer>,
}

/// Per-client steering state, one per observed client MAC.
#[derive(Debug)]
pub struct ClientEntry {
    pub mac: MacAddr,
    // State
    pub prev: FsmState,
    pub state: FsmState,
    /// Local signal score, smaller is better. SCORE_LOST when unknown.
    pub local_score: u16,
    /// BSSID currently believed to own this client, zero when none.
    pub remote_bssid: MacAddr,
    /// Local-clock estimate of when the owner last saw the client
    /// associate.
    pub remote_time: Option<Instant>,
    /// BSSID that last asked us to close this client.
    pub close_bssid: MacAddr,
    /// Operating channel of close_bssid, for BSS-Transition hints.
    pub remote_channel: u8,
    pub association_time: Option<Instant>,
    pub sta: Option<StaHandle>,
    pub timer: ClientTimer,
}

impl ClientEntry {
    pub fn new(mac: MacAddr) -> Self {
        Self {
            mac,
            prev: FsmState::Idle,
            state: FsmState::Idle,
            local_score: SCORE_LOST,
            remote_bssid: MacAddr::default(),
            remote_time: None,
            close_bssid: MacAddr::default(),
            remote_channel: 0,
            association_time: None,
            sta: None,
            timer: ClientTimer::default(),
        }
    }

    pub fn is_associated(&self) -> bool {
        self.sta.is_some()
    }
}

/// Local signal score for an RSSI reading: |rssi| clamped to 16 bits,
/// smaller meaning stronger.
pub fn score_from_rssi(rssi: i32) -> u16 {
    u16::try_from(rssi.unsigned_abs()).unwrap_or(u16::MAX)
}

/// Client registry of a steering context, keyed by client MAC.
#[derive(Debug, Default)]
pub struct Clients {
    map: BTreeMap<MacAddr, ClientEntry>,
}

impl Clients {
    pub fn get(&self, mac: &MacAddr) -> Option<&ClientEntry> {
        self.map.get(mac)
    }

    pub fn get_mut(&mut self, mac: &MacAddr) -> Option<&mut ClientEntry> {
        self.map.get_mut(mac)
    }

    pub fn ensure(&mut self, mac: MacAddr) -> &mut ClientEntry {
        self.map.entry(mac).or_insert_with(|| ClientEntry::new(mac))
    }

    /// Unlink an entry. Dropping it drops the timer handles, cancelling
    /// any outstanding callbacks before the storage goes away.
    pub fn remove(&mut self, mac: &MacAddr) -> Option<ClientEntry> {
        self.map.remove(mac)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, MacAddr, ClientEntry> {
        self.map.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, MacAddr, ClientEntry> {
        self.map.iter_mut()
    }
}
