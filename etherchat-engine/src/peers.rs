use etherchat_proto::{MacAddr, PeerStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What presence tracking knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub username: String,
    pub last_seen: Instant,
    pub status: PeerStatus,
}

/// The peer table, shared between the presence manager and the router.
///
/// All mutation happens under the mutex; external reads get a
/// defensive copy.
#[derive(Default)]
pub struct PeerTable {
    inner: Mutex<HashMap<MacAddr, PeerInfo>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or refreshes a peer record from an online beacon.
    pub fn upsert(&self, mac: MacAddr, username: &str, now: Instant) {
        self.inner.lock().insert(
            mac,
            PeerInfo {
                username: username.to_string(),
                last_seen: now,
                status: PeerStatus::Online,
            },
        );
    }

    pub fn remove(&self, mac: MacAddr) -> Option<PeerInfo> {
        self.inner.lock().remove(&mac)
    }

    /// Drops peers not seen within `timeout`, returning what was
    /// removed so the caller can log it.
    pub fn expire(&self, now: Instant, timeout: Duration) -> Vec<(MacAddr, PeerInfo)> {
        let mut inner = self.inner.lock();
        let expired: Vec<MacAddr> = inner
            .iter()
            .filter(|(_, info)| now.duration_since(info.last_seen) > timeout)
            .map(|(mac, _)| *mac)
            .collect();
        expired
            .into_iter()
            .filter_map(|mac| inner.remove(&mac).map(|info| (mac, info)))
            .collect()
    }

    pub fn snapshot(&self) -> HashMap<MacAddr, PeerInfo> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
