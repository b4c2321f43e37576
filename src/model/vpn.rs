//! Network reachability results for teams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TeamId;

/// One reachability sample for a team's network.
///
/// Round-trip times are `None` when the target did not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnStatus {
    pub team_id: TeamId,
    /// Latest WireGuard handshake seen for the team's tunnel.
    pub wireguard_handshake_time: Option<DateTime<Utc>>,
    pub gateway_ping_rtt_ms: Option<i32>,
    pub demo_ping_rtt_ms: Option<i32>,
    pub demo_service_ok: bool,
    pub vulnbox_ping_rtt_ms: Option<i32>,
    pub vulnbox_service_ok: bool,
}

impl VpnStatus {
    /// A sample where nothing answered.
    pub fn unreachable(team_id: TeamId) -> Self {
        Self {
            team_id,
            wireguard_handshake_time: None,
            gateway_ping_rtt_ms: None,
            demo_ping_rtt_ms: None,
            demo_service_ok: false,
            vulnbox_ping_rtt_ms: None,
            vulnbox_service_ok: false,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.gateway_ping_rtt_ms.is_some() || self.vulnbox_ping_rtt_ms.is_some()
    }
}

/// A stored sample with its insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnStatusRecord {
    pub status: VpnStatus,
    pub timestamp: DateTime<Utc>,
}
