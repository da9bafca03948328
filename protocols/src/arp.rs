use std::net::Ipv4Addr;

use pnet::datalink::MacAddr;
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};

use crate::ethernet::{self, FrameError};
use crate::{ARP_LEN, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS};

/// Sender half of an ARP reply, i.e. who answered and with which hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpReply {
    pub sender_addr: Ipv4Addr,
    pub sender_mac: MacAddr,
}

/// Builds a broadcast "who-has `dst_addr`" frame padded to the minimum ethernet length.
pub fn create_request(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
) -> Result<Vec<u8>, FrameError> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::make_header(&mut buffer, src_mac, MacAddr::broadcast(), EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .ok_or(FrameError::ArpBuffer)?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(ArpOperations::Request);
    arp_packet.set_sender_hw_addr(src_mac);
    arp_packet.set_target_hw_addr(MacAddr::zero());
    arp_packet.set_sender_proto_addr(src_addr);
    arp_packet.set_target_proto_addr(dst_addr);
    Ok(Vec::from(buffer))
}

/// Returns the reply carried by `frame`, or `None` when the frame is anything but an ARP reply.
pub fn parse_reply(frame: &EthernetPacket) -> Option<ArpReply> {
    if frame.get_ethertype() != EtherTypes::Arp {
        return None;
    }
    let arp_packet = ArpPacket::new(frame.payload())?;
    if arp_packet.get_operation() != ArpOperations::Reply {
        return None;
    }
    Some(ArpReply {
        sender_addr: arp_packet.get_sender_proto_addr(),
        sender_mac: arp_packet.get_sender_hw_addr(),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
