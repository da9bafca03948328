use pnet::datalink::MacAddr;
use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("buffer too small for an ethernet header")]
    EthernetBuffer,
    #[error("buffer too small for an ARP payload")]
    ArpBuffer,
    #[error("truncated or invalid ethernet frame ({0} bytes)")]
    Truncated(usize),
}

pub fn make_header(
    buffer: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    et: EtherType,
) -> Result<(), FrameError> {
    let mut eth = MutableEthernetPacket::new(buffer).ok_or(FrameError::EthernetBuffer)?;
    eth.set_source(src_mac);
    eth.set_destination(dst_mac);
    eth.set_ethertype(et);
    Ok(())
}

pub fn get_packet_from_u8(bytes: &[u8]) -> Result<EthernetPacket<'_>, FrameError> {
    EthernetPacket::new(bytes).ok_or(FrameError::Truncated(bytes.len()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS};
    use pnet::packet::ethernet::EtherTypes;

    #[test]
    fn ethernet_header_sets_fields() {
        let mut b = [0u8; MIN_ETH_FRAME_NO_FCS];
        let src = MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55);
        let dst = MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);

        make_header(&mut b, src, dst, EtherTypes::Ipv4).unwrap();

        let eth = EthernetPacket::new(&b[..ETH_HDR_LEN]).expect("parse eth");
        assert_eq!(eth.get_source(), src);
        assert_eq!(eth.get_destination(), dst);
        assert_eq!(eth.get_ethertype(), EtherTypes::Ipv4);
    }

    #[test]
    fn ethernet_header_errors_when_buffer_too_small() {
        let mut tiny: [u8; 0] = [];
        let err = make_header(&mut tiny, MacAddr::zero(), MacAddr::zero(), EtherTypes::Arp)
            .unwrap_err();
        assert_eq!(err, FrameError::EthernetBuffer);
    }

    #[test]
    fn get_packet_rejects_short_frames() {
        let short = [0u8; 4];
        assert_eq!(get_packet_from_u8(&short).unwrap_err(), FrameError::Truncated(4));
    }
}
