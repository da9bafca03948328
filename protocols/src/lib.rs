//! Raw frame construction and parsing used by the link-layer liveness probe.

pub mod arp;
pub mod ethernet;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const MIN_ETH_FRAME_NO_FCS: usize = 60;
