//! Transmit offload encoding.
//!
//! Two incompatible descriptor encodings exist. First generation chips
//! (8169, 8101e, 8168b) carry checksum and large-send flags in `opts1`;
//! everything newer puts checksum flags, MSS and the transport header
//! offset in `opts2` and only the segmentation type in `opts1`.
//!
//! Before a packet is posted, [`features_check`] narrows the offloads the
//! hardware can apply to this particular packet. When the check removes
//! an offload the packet asked for, [`software_offload`] produces
//! finished frames instead.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use super::csum::{checksum, finalize_checksum, partial_checksum, pseudo_v4, pseudo_v6};
use super::desc::*;
use crate::chip::{Capabilities, ChipRevision, CsumGen, Quirks};
use crate::features::Features;
use crate::types::{ETH_HLEN, ETH_P_8021Q, ETH_P_IP, ETH_P_IPV6, ETH_ZLEN};

const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;
const ETH_P_8021AD: u16 = 0x88a8;

const IPV4_MIN_HLEN: usize = 20;
const IPV6_HLEN: usize = 40;
const TCP_MIN_HLEN: usize = 20;
const UDP_HLEN: usize = 8;
/// Offset of the length field in the UDP header.
const UDP_LEN_OFFSET: usize = 4;

const TCP_FIN: u8 = 0x01;
const TCP_PSH: u8 = 0x08;
const TCP_CWR: u8 = 0x80;

/// Shortest transport payload the 8125 sends correctly for PTP event
/// and general messages.
pub const RTL_MIN_PATCH_LEN: usize = 47;
const PTP_EVENT_PORT: u16 = 319;
const PTP_GENERAL_PORT: u16 = 320;

static WARNED_L4: AtomicBool = AtomicBool::new(false);

// ═══════════════════════════════════════════════════════════════════════════
// PACKET
// ═══════════════════════════════════════════════════════════════════════════

/// Offload requested for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOffload {
    /// Frame is complete as given.
    None,
    /// Fill in the L3/L4 checksums.
    Checksum,
    /// Segment a TCP super-frame into `mss` sized segments.
    Tso { mss: u16 },
}

/// One frame to send, possibly split over several fragments.
///
/// The first fragment must contain every header up to and including
/// the transport header.
#[derive(Debug, Clone, Copy)]
pub struct TxPacket<'a> {
    pub frags: &'a [&'a [u8]],
    pub offload: TxOffload,
    /// Tag to insert; host byte order.
    pub vlan_tag: Option<u16>,
}

impl<'a> TxPacket<'a> {
    pub fn new(frags: &'a [&'a [u8]]) -> Self {
        Self {
            frags,
            offload: TxOffload::None,
            vlan_tag: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frags.iter().map(|f| f.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn head(&self) -> &'a [u8] {
        self.frags.first().copied().unwrap_or(&[])
    }

    /// Size of the last fragment after the head, if any.
    pub fn last_frag_len(&self) -> Option<usize> {
        if self.frags.len() > 1 {
            self.frags.last().map(|f| f.len())
        } else {
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HEADER PARSING
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L3 {
    Ipv4,
    Ipv6,
    Other,
}

/// Offsets of the headers the offload engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeaders {
    pub l3: L3,
    /// EtherType after any VLAN tags.
    pub protocol: u16,
    pub network_offset: usize,
    pub ip_header_len: usize,
    pub l4_protocol: u8,
    /// `None` when the frame is not IP or the head is truncated.
    pub transport_offset: Option<usize>,
    /// 802.1Q/802.1ad tags stacked in the frame itself.
    pub vlan_depth: usize,
}

impl FrameHeaders {
    pub fn is_udp(&self) -> bool {
        self.l3 != L3::Other && self.l4_protocol == IPPROTO_UDP
    }

    pub fn is_tcp(&self) -> bool {
        self.l3 != L3::Other && self.l4_protocol == IPPROTO_TCP
    }
}

fn be16(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*b.get(at)?, *b.get(at + 1)?]))
}

/// Locate L3 and L4 headers in `head`.
pub fn parse_headers(head: &[u8]) -> FrameHeaders {
    let mut hdrs = FrameHeaders {
        l3: L3::Other,
        protocol: 0,
        network_offset: ETH_HLEN,
        ip_header_len: 0,
        l4_protocol: 0,
        transport_offset: None,
        vlan_depth: 0,
    };

    let mut off = 12;
    let mut proto = match be16(head, off) {
        Some(p) => p,
        None => return hdrs,
    };
    while proto == ETH_P_8021Q || proto == ETH_P_8021AD {
        hdrs.vlan_depth += 1;
        off += 4;
        proto = match be16(head, off) {
            Some(p) => p,
            None => return hdrs,
        };
    }
    hdrs.protocol = proto;
    hdrs.network_offset = off + 2;
    let nh = hdrs.network_offset;

    match proto {
        ETH_P_IP => {
            let Some(&vihl) = head.get(nh) else { return hdrs };
            let ihl = ((vihl & 0x0f) as usize) * 4;
            hdrs.l3 = L3::Ipv4;
            hdrs.ip_header_len = ihl;
            if let Some(&p) = head.get(nh + 9) {
                hdrs.l4_protocol = p;
                if ihl >= IPV4_MIN_HLEN {
                    hdrs.transport_offset = Some(nh + ihl);
                }
            }
        }
        ETH_P_IPV6 => {
            hdrs.l3 = L3::Ipv6;
            hdrs.ip_header_len = IPV6_HLEN;
            if let Some(&p) = head.get(nh + 6) {
                hdrs.l4_protocol = p;
                hdrs.transport_offset = Some(nh + IPV6_HLEN);
            }
        }
        _ => {}
    }
    hdrs
}

fn tcp_header_len(head: &[u8], hdrs: &FrameHeaders) -> Option<usize> {
    let th = hdrs.transport_offset?;
    head.get(th + 12).map(|b| ((b >> 4) as usize) * 4)
}

// ═══════════════════════════════════════════════════════════════════════════
// PADDING QUIRKS
// ═══════════════════════════════════════════════════════════════════════════

/// The 8125 mangles short UDP frames, PTP ones in particular.
fn udp_padto_8125(rev: ChipRevision, pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> usize {
    let len = pkt.len();
    let mut padto = 0;
    if !rev.is_8125() || len >= 128 + RTL_MIN_PATCH_LEN || !hdrs.is_udp() {
        return 0;
    }
    let Some(th) = hdrs.transport_offset else { return 0 };

    let head = pkt.head();
    let trans_data_len = head.len().saturating_sub(th);
    if (UDP_LEN_OFFSET..RTL_MIN_PATCH_LEN).contains(&trans_data_len) {
        if let Some(dest) = be16(head, th + 2) {
            if dest == PTP_EVENT_PORT || dest == PTP_GENERAL_PORT {
                padto = len + RTL_MIN_PATCH_LEN - trans_data_len;
            }
        }
    }
    if trans_data_len < UDP_HLEN {
        padto = padto.max(len + UDP_HLEN - trans_data_len);
    }
    padto
}

/// Length the frame must be padded to before posting; 0 for none.
pub fn packet_padto(caps: &Capabilities, rev: ChipRevision, pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> usize {
    let mut padto = udp_padto_8125(rev, pkt, hdrs);
    if caps.has(Quirks::PAD_TO_ETH_ZLEN) {
        padto = padto.max(ETH_ZLEN);
    }
    padto
}

// ═══════════════════════════════════════════════════════════════════════════
// FEATURE CHECK
// ═══════════════════════════════════════════════════════════════════════════

/// The 8168evl TSO engine cannot handle IP or TCP options, or a tiny
/// trailing fragment.
fn fix_tso_8168evl(pkt: &TxPacket<'_>, hdrs: &FrameHeaders, features: Features) -> Features {
    let head = pkt.head();
    if hdrs.l3 == L3::Ipv4 && hdrs.ip_header_len > IPV4_MIN_HLEN {
        features - Features::ALL_TSO
    } else if hdrs.l3 == L3::Ipv4 && tcp_header_len(head, hdrs).unwrap_or(0) > TCP_MIN_HLEN {
        features - Features::ALL_TSO
    } else if pkt.last_frag_len().map_or(false, |l| l <= 6) {
        features - Features::ALL_TSO
    } else {
        features
    }
}

/// Offloads the hardware can apply to `pkt`, starting from `features`.
pub fn features_check(
    caps: &Capabilities,
    rev: ChipRevision,
    pkt: &TxPacket<'_>,
    hdrs: &FrameHeaders,
    features: Features,
) -> Features {
    let mut f = features;
    let v2 = caps.csum == CsumGen::V2;
    let th = hdrs.transport_offset.unwrap_or(usize::MAX);

    match pkt.offload {
        TxOffload::Tso { .. } => {
            if caps.has(Quirks::TSO_SHORT_TAIL) {
                f = fix_tso_8168evl(pkt, hdrs, f);
            }
            if th > GTTCPHO_MAX && v2 {
                f -= Features::ALL_TSO;
            }
        }
        TxOffload::Checksum => {
            if pkt.len() < ETH_ZLEN {
                f -= Features::CSUM_MASK;
            }
            if packet_padto(caps, rev, pkt, hdrs) > 0 {
                f -= Features::CSUM_MASK;
            }
            if th > TCPHO_MAX && v2 {
                f -= Features::CSUM_MASK;
            }
        }
        TxOffload::None => {}
    }

    // Stacked tags hide the IP header from the engine.
    if hdrs.vlan_depth > 1 || (hdrs.vlan_depth == 1 && pkt.vlan_tag.is_some()) {
        f -= Features::CSUM_MASK | Features::ALL_TSO;
    }
    f
}

/// `true` when `features` covers what `pkt` asks for.
pub fn offload_permitted(pkt: &TxPacket<'_>, hdrs: &FrameHeaders, features: Features) -> bool {
    match pkt.offload {
        TxOffload::None => true,
        TxOffload::Checksum => match hdrs.l3 {
            L3::Ipv4 => features.contains(Features::IP_CSUM),
            L3::Ipv6 => features.contains(Features::IPV6_CSUM),
            L3::Other => false,
        },
        TxOffload::Tso { .. } => {
            hdrs.is_tcp()
                && features.contains(Features::SG)
                && match hdrs.l3 {
                    L3::Ipv4 => features.contains(Features::TSO),
                    L3::Ipv6 => features.contains(Features::TSO6),
                    L3::Other => false,
                }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════

/// Descriptor option words shared by every fragment of one packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOpts {
    pub opts1: u32,
    pub opts2: u32,
}

pub fn vlan_opts(tag: Option<u16>) -> u32 {
    match tag {
        Some(tag) => TX_VLAN_TAG | tag.swap_bytes() as u32,
        None => 0,
    }
}

fn warn_l4_once(proto: u8) {
    if !WARNED_L4.swap(true, Ordering::Relaxed) {
        log::warn!("[r8169] checksum offload requested for L4 protocol {}", proto);
    }
}

fn encode_v1(pkt: &TxPacket<'_>, hdrs: &FrameHeaders, opts: &mut TxOpts) {
    match pkt.offload {
        TxOffload::Tso { mss } => {
            opts.opts1 |= TD_LSO | ((mss as u32) & TD0_MSS_MAX) << TD0_MSS_SHIFT;
        }
        TxOffload::Checksum => match hdrs.l4_protocol {
            IPPROTO_TCP => opts.opts1 |= TD0_IP_CS | TD0_TCP_CS,
            IPPROTO_UDP => opts.opts1 |= TD0_IP_CS | TD0_UDP_CS,
            p => warn_l4_once(p),
        },
        TxOffload::None => {}
    }
}

fn encode_v2(pkt: &TxPacket<'_>, hdrs: &FrameHeaders, opts: &mut TxOpts) {
    let th = hdrs.transport_offset.unwrap_or(0) as u32;
    match pkt.offload {
        TxOffload::Tso { mss } => {
            match hdrs.l3 {
                L3::Ipv4 => opts.opts1 |= TD1_GTSENV4,
                L3::Ipv6 => opts.opts1 |= TD1_GTSENV6,
                L3::Other => warn_l4_once(hdrs.l4_protocol),
            }
            opts.opts1 |= th << GTTCPHO_SHIFT;
            opts.opts2 |= (mss as u32) << TD1_MSS_SHIFT;
        }
        TxOffload::Checksum => {
            match hdrs.l3 {
                L3::Ipv4 => opts.opts2 |= TD1_IPV4_CS,
                L3::Ipv6 => opts.opts2 |= TD1_IPV6_CS,
                L3::Other => {}
            }
            match (hdrs.l3, hdrs.l4_protocol) {
                (L3::Other, p) => warn_l4_once(p),
                (_, IPPROTO_TCP) => opts.opts2 |= TD1_TCP_CS,
                (_, IPPROTO_UDP) => opts.opts2 |= TD1_UDP_CS,
                (_, p) => warn_l4_once(p),
            }
            opts.opts2 |= th << TCPHO_SHIFT;
        }
        TxOffload::None => {}
    }
}

/// Option words for `pkt` in the chip's encoding.
pub fn encode(csum: CsumGen, pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> TxOpts {
    let mut opts = TxOpts {
        opts1: 0,
        opts2: vlan_opts(pkt.vlan_tag),
    };
    match csum {
        CsumGen::V1 => encode_v1(pkt, hdrs, &mut opts),
        CsumGen::V2 => encode_v2(pkt, hdrs, &mut opts),
    }
    opts
}

/// Ready an IPv6 TCP super-frame for segmentation: zero the payload
/// length and seed the TCP checksum with the pseudo header.
pub fn prepare_tso_v6(head: &mut [u8], hdrs: &FrameHeaders) {
    let nh = hdrs.network_offset;
    let Some(th) = hdrs.transport_offset else { return };
    if head.len() < th + 18 || hdrs.l3 != L3::Ipv6 {
        return;
    }
    head[nh + 4] = 0;
    head[nh + 5] = 0;

    let sum = pseudo_v6(&head[nh + 8..nh + 24], &head[nh + 24..nh + 40], IPPROTO_TCP, 0);
    // The engine wants the folded sum, not its complement.
    let folded = !finalize_checksum(sum);
    head[th + 16..th + 18].copy_from_slice(&folded.to_be_bytes());
}

// ═══════════════════════════════════════════════════════════════════════════
// SOFTWARE FALLBACK
// ═══════════════════════════════════════════════════════════════════════════

/// Copy every fragment of `pkt` into one buffer.
pub fn linearize(pkt: &TxPacket<'_>) -> Vec<u8> {
    let mut frame = Vec::with_capacity(pkt.len());
    for frag in pkt.frags {
        frame.extend_from_slice(frag);
    }
    frame
}

/// Fill in the IPv4 header checksum and the TCP or UDP checksum of
/// `frame` in place.
///
/// # Returns
/// `false` if the frame is not TCP or UDP over IP, or its length fields
/// point past the end of the buffer. The frame is then left untouched.
pub fn checksum_in_software(frame: &mut [u8], hdrs: &FrameHeaders) -> bool {
    let Some(th) = hdrs.transport_offset else { return false };
    let nh = hdrs.network_offset;
    let field = match hdrs.l4_protocol {
        IPPROTO_TCP => th + 16,
        IPPROTO_UDP => th + 6,
        _ => return false,
    };
    let l4_len = match hdrs.l3 {
        L3::Ipv4 => be16(frame, nh + 2).and_then(|total| (total as usize).checked_sub(hdrs.ip_header_len)),
        L3::Ipv6 => be16(frame, nh + 4).map(usize::from),
        L3::Other => None,
    };
    let Some(l4_len) = l4_len else { return false };
    let end = th + l4_len;
    if end > frame.len() || field + 2 > end {
        return false;
    }

    if hdrs.l3 == L3::Ipv4 {
        frame[nh + 10..nh + 12].fill(0);
        let ip = checksum(&frame[nh..th]);
        frame[nh + 10..nh + 12].copy_from_slice(&ip.to_be_bytes());
    }

    frame[field..field + 2].fill(0);
    let pseudo = match hdrs.l3 {
        L3::Ipv4 => pseudo_v4(&frame[nh + 12..nh + 16], &frame[nh + 16..nh + 20], hdrs.l4_protocol, l4_len),
        _ => pseudo_v6(&frame[nh + 8..nh + 24], &frame[nh + 24..nh + 40], hdrs.l4_protocol, l4_len),
    };
    let mut sum = finalize_checksum(partial_checksum(&frame[th..end], pseudo));
    // Zero means "no checksum" to a UDP receiver.
    if sum == 0 && hdrs.l4_protocol == IPPROTO_UDP {
        sum = 0xffff;
    }
    frame[field..field + 2].copy_from_slice(&sum.to_be_bytes());
    true
}

/// Cut a TCP super-frame into segments of at most `mss` payload bytes,
/// each with its own headers and checksums.
///
/// IPv4 segments take consecutive IP IDs. FIN and PSH stay on the last
/// segment only, CWR on the first only.
pub fn segment_in_software(frame: &[u8], hdrs: &FrameHeaders, mss: u16) -> Option<Vec<Vec<u8>>> {
    if !hdrs.is_tcp() || mss == 0 {
        return None;
    }
    let nh = hdrs.network_offset;
    let th = hdrs.transport_offset?;
    let tcp_len = tcp_header_len(frame, hdrs)?;
    let hlen = th + tcp_len;
    if tcp_len < TCP_MIN_HLEN || hlen > frame.len() {
        return None;
    }

    let seq = u32::from_be_bytes(frame.get(th + 4..th + 8)?.try_into().ok()?);
    let ip_id = be16(frame, nh + 4)?;
    let flags = frame[th + 13];

    let payload = &frame[hlen..];
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![payload]
    } else {
        payload.chunks(mss as usize).collect()
    };
    let last = chunks.len() - 1;

    let mut segs = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut seg = Vec::with_capacity(hlen + chunk.len());
        seg.extend_from_slice(&frame[..hlen]);
        seg.extend_from_slice(chunk);

        match hdrs.l3 {
            L3::Ipv4 => {
                let total = (hlen - nh + chunk.len()) as u16;
                seg[nh + 2..nh + 4].copy_from_slice(&total.to_be_bytes());
                seg[nh + 4..nh + 6].copy_from_slice(&ip_id.wrapping_add(i as u16).to_be_bytes());
            }
            _ => {
                let plen = (hlen - th + chunk.len()) as u16;
                seg[nh + 4..nh + 6].copy_from_slice(&plen.to_be_bytes());
            }
        }

        let seg_seq = seq.wrapping_add((i * mss as usize) as u32);
        seg[th + 4..th + 8].copy_from_slice(&seg_seq.to_be_bytes());
        let mut f = flags;
        if i != last {
            f &= !(TCP_FIN | TCP_PSH);
        }
        if i != 0 {
            f &= !TCP_CWR;
        }
        seg[th + 13] = f;

        if !checksum_in_software(&mut seg, hdrs) {
            return None;
        }
        segs.push(seg);
    }
    Some(segs)
}

/// Apply the offload `pkt` asks for in software.
///
/// # Returns
/// The finished frames to send in place of `pkt`, or `None` if the frame
/// is not something the fallback understands.
pub fn software_offload(pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> Option<Vec<Vec<u8>>> {
    let mut frame = linearize(pkt);
    match pkt.offload {
        TxOffload::None => Some(vec![frame]),
        TxOffload::Checksum => checksum_in_software(&mut frame, hdrs).then(|| vec![frame]),
        TxOffload::Tso { mss } => segment_in_software(&frame, hdrs, mss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::capabilities;

    fn ipv4_udp(dest: u16, payload: usize) -> Vec<u8> {
        let mut f = vec![0u8; 14 + 20 + 8 + payload];
        f[12..14].copy_from_slice(&ETH_P_IP.to_be_bytes());
        f[14] = 0x45;
        f[14 + 9] = IPPROTO_UDP;
        f[34 + 2..34 + 4].copy_from_slice(&dest.to_be_bytes());
        f
    }

    fn ipv4_tcp(ihl_words: u8, doff_words: u8, payload: usize) -> Vec<u8> {
        let ip = ihl_words as usize * 4;
        let tcp = doff_words as usize * 4;
        let mut f = vec![0u8; 14 + ip + tcp + payload];
        f[12..14].copy_from_slice(&ETH_P_IP.to_be_bytes());
        f[14] = 0x40 | ihl_words;
        f[14 + 9] = IPPROTO_TCP;
        f[14 + ip + 12] = doff_words << 4;
        f
    }

    #[test]
    fn test_parse_vlan_tagged_ipv6() {
        let mut f = vec![0u8; 18 + 40 + 20];
        f[12..14].copy_from_slice(&ETH_P_8021Q.to_be_bytes());
        f[16..18].copy_from_slice(&ETH_P_IPV6.to_be_bytes());
        f[18 + 6] = IPPROTO_TCP;
        let h = parse_headers(&f);
        assert_eq!(h.l3, L3::Ipv6);
        assert_eq!(h.vlan_depth, 1);
        assert_eq!(h.transport_offset, Some(58));
        assert!(h.is_tcp());
    }

    #[test]
    fn test_parse_truncated_frame() {
        let h = parse_headers(&[0u8; 10]);
        assert_eq!(h.l3, L3::Other);
        assert_eq!(h.transport_offset, None);
    }

    #[test]
    fn test_v1_checksum_flags_in_opts1() {
        let f = ipv4_tcp(5, 5, 100);
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Checksum, ..TxPacket::new(&frags) };
        let opts = encode(CsumGen::V1, &pkt, &parse_headers(&f));
        assert_eq!(opts.opts1, TD0_IP_CS | TD0_TCP_CS);
        assert_eq!(opts.opts2, 0);
    }

    #[test]
    fn test_v2_checksum_flags_and_offset_in_opts2() {
        let f = ipv4_udp(53, 100);
        let frags = [&f[..]];
        let pkt = TxPacket {
            offload: TxOffload::Checksum,
            vlan_tag: Some(0x0123),
            ..TxPacket::new(&frags)
        };
        let opts = encode(CsumGen::V2, &pkt, &parse_headers(&f));
        assert_eq!(opts.opts1, 0);
        assert_eq!(
            opts.opts2,
            TD1_IPV4_CS | TD1_UDP_CS | 34 << TCPHO_SHIFT | TX_VLAN_TAG | 0x2301
        );
    }

    #[test]
    fn test_tso_encodings() {
        let f = ipv4_tcp(5, 5, 3000);
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1448 }, ..TxPacket::new(&frags) };
        let h = parse_headers(&f);

        let v1 = encode(CsumGen::V1, &pkt, &h);
        assert_eq!(v1.opts1, TD_LSO | 1448 << TD0_MSS_SHIFT);

        let v2 = encode(CsumGen::V2, &pkt, &h);
        assert_eq!(v2.opts1, TD1_GTSENV4 | 34 << GTTCPHO_SHIFT);
        assert_eq!(v2.opts2, 1448 << TD1_MSS_SHIFT);
    }

    #[test]
    fn test_short_frame_loses_checksum_offload() {
        let caps = capabilities(ChipRevision::V40, true);
        let f = ipv4_udp(53, 4);
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Checksum, ..TxPacket::new(&frags) };
        let f2 = features_check(&caps, ChipRevision::V40, &pkt, &parse_headers(&f), Features::all());
        assert!(!f2.intersects(Features::CSUM_MASK));
    }

    #[test]
    fn test_pad_quirk_chips_never_offload_checksum() {
        let caps = capabilities(ChipRevision::V34, true);
        let f = ipv4_udp(53, 400);
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Checksum, ..TxPacket::new(&frags) };
        let h = parse_headers(&f);
        assert_eq!(packet_padto(&caps, ChipRevision::V34, &pkt, &h), ETH_ZLEN);
        let f2 = features_check(&caps, ChipRevision::V34, &pkt, &h, Features::all());
        assert!(!f2.intersects(Features::CSUM_MASK));
    }

    #[test]
    fn test_8125_ptp_padding() {
        let caps = capabilities(ChipRevision::V61, true);
        let f = ipv4_udp(319, 10);
        let frags = [&f[..]];
        let pkt = TxPacket::new(&frags);
        let h = parse_headers(&f);
        // 18 bytes of transport data, padded up to 47.
        assert_eq!(packet_padto(&caps, ChipRevision::V61, &pkt, &h), f.len() + 47 - 18);

        let f = ipv4_udp(53, 10);
        let frags = [&f[..]];
        let pkt = TxPacket::new(&frags);
        assert_eq!(packet_padto(&caps, ChipRevision::V61, &pkt, &parse_headers(&f)), ETH_ZLEN);
    }

    #[test]
    fn test_8168evl_tso_fixups() {
        let caps = capabilities(ChipRevision::V34, true);
        let rev = ChipRevision::V34;

        let f = ipv4_tcp(6, 5, 3000);
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1400 }, ..TxPacket::new(&frags) };
        let out = features_check(&caps, rev, &pkt, &parse_headers(&f), Features::all());
        assert!(!out.intersects(Features::ALL_TSO));

        let f = ipv4_tcp(5, 8, 3000);
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1400 }, ..TxPacket::new(&frags) };
        let out = features_check(&caps, rev, &pkt, &parse_headers(&f), Features::all());
        assert!(!out.intersects(Features::ALL_TSO));

        let f = ipv4_tcp(5, 5, 3000);
        let tail = [0u8; 4];
        let frags = [&f[..], &tail[..]];
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1400 }, ..TxPacket::new(&frags) };
        let out = features_check(&caps, rev, &pkt, &parse_headers(&f), Features::all());
        assert!(!out.intersects(Features::ALL_TSO));

        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1400 }, ..TxPacket::new(&frags) };
        let out = features_check(&caps, rev, &pkt, &parse_headers(&f), Features::all());
        assert!(out.contains(Features::TSO));
    }

    #[test]
    fn test_deep_transport_offset_disables_v2_tso() {
        let caps = capabilities(ChipRevision::V40, true);
        let f = ipv4_tcp(15, 5, 3000);
        let mut big = vec![0u8; 100];
        big.extend_from_slice(&f);
        // Push the IP header past GTTCPHO_MAX with a stack of VLAN tags.
        let h = FrameHeaders {
            transport_offset: Some(GTTCPHO_MAX + 1),
            ..parse_headers(&f)
        };
        let frags = [&big[..]];
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1400 }, ..TxPacket::new(&frags) };
        let out = features_check(&caps, ChipRevision::V40, &pkt, &h, Features::all());
        assert!(!out.intersects(Features::ALL_TSO));
    }

    #[test]
    fn test_tso_v6_prep_seeds_pseudo_header() {
        let mut f = vec![0u8; 14 + 40 + 20];
        f[12..14].copy_from_slice(&ETH_P_IPV6.to_be_bytes());
        f[14 + 4] = 0x12;
        f[14 + 6] = IPPROTO_TCP;
        // saddr ::1, daddr ::2
        f[14 + 23] = 1;
        f[14 + 39] = 2;
        let h = parse_headers(&f);
        prepare_tso_v6(&mut f, &h);
        assert_eq!(&f[18..20], &[0, 0]);
        assert_eq!(&f[54 + 16..54 + 18], &[0x00, 0x09]);
    }

    /// Fill addresses, lengths and ports the way a stack would.
    fn finish_ipv4(f: &mut [u8], ihl: usize) {
        let total = (f.len() - 14) as u16;
        f[16..18].copy_from_slice(&total.to_be_bytes());
        f[18..20].copy_from_slice(&0x1c46u16.to_be_bytes());
        f[22] = 64;
        f[26..30].copy_from_slice(&[192, 168, 0, 1]);
        f[30..34].copy_from_slice(&[192, 168, 0, 199]);
        let th = 14 + ihl;
        f[th..th + 2].copy_from_slice(&40000u16.to_be_bytes());
        f[th + 2..th + 4].copy_from_slice(&80u16.to_be_bytes());
    }

    /// One's complement sum over the L4 segment and its pseudo header.
    fn l4_sum_v4(f: &[u8], th: usize, proto: u8) -> u16 {
        let pseudo = pseudo_v4(&f[26..30], &f[30..34], proto, f.len() - th);
        finalize_checksum(partial_checksum(&f[th..], pseudo))
    }

    #[test]
    fn test_software_checksum_tcp_v4() {
        let mut f = ipv4_tcp(5, 5, 0);
        finish_ipv4(&mut f, 20);
        f[34 + 13] = 0x10;
        let h = parse_headers(&f);
        assert!(checksum_in_software(&mut f, &h));
        assert_eq!(checksum(&f[14..34]), 0);
        assert_eq!(l4_sum_v4(&f, 34, IPPROTO_TCP), 0);
    }

    #[test]
    fn test_software_checksum_udp_v6() {
        let mut f = vec![0u8; 14 + 40 + 8 + 13];
        f[12..14].copy_from_slice(&ETH_P_IPV6.to_be_bytes());
        f[14] = 0x60;
        f[18..20].copy_from_slice(&21u16.to_be_bytes());
        f[20] = IPPROTO_UDP;
        f[14 + 23] = 1;
        f[14 + 39] = 2;
        f[58..60].copy_from_slice(&21u16.to_be_bytes());
        f[62..].fill(0x5a);
        let h = parse_headers(&f);
        assert!(checksum_in_software(&mut f, &h));

        let pseudo = pseudo_v6(&f[22..38], &f[38..54], IPPROTO_UDP, 21);
        assert_eq!(finalize_checksum(partial_checksum(&f[54..], pseudo)), 0);
    }

    #[test]
    fn test_software_checksum_rejects_bad_length() {
        let mut f = ipv4_tcp(5, 5, 10);
        finish_ipv4(&mut f, 20);
        f[16..18].copy_from_slice(&2000u16.to_be_bytes());
        let h = parse_headers(&f);
        let before = f.clone();
        assert!(!checksum_in_software(&mut f, &h));
        assert_eq!(f, before);
    }

    #[test]
    fn test_software_segmentation_v4() {
        let mut f = ipv4_tcp(6, 5, 3000);
        finish_ipv4(&mut f, 24);
        let th = 14 + 24;
        f[th + 4..th + 8].copy_from_slice(&1000u32.to_be_bytes());
        f[th + 13] = TCP_CWR | TCP_PSH | TCP_FIN | 0x10;
        let h = parse_headers(&f);

        let segs = segment_in_software(&f, &h, 1400).unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(
            segs.iter().map(Vec::len).collect::<Vec<_>>(),
            [th + 20 + 1400, th + 20 + 1400, th + 20 + 200]
        );
        for (i, seg) in segs.iter().enumerate() {
            let total = u16::from_be_bytes([seg[16], seg[17]]) as usize;
            assert_eq!(total, seg.len() - 14);
            assert_eq!(u16::from_be_bytes([seg[18], seg[19]]), 0x1c46 + i as u16);
            let seq = u32::from_be_bytes(seg[th + 4..th + 8].try_into().unwrap());
            assert_eq!(seq, 1000 + 1400 * i as u32);
            assert_eq!(checksum(&seg[14..th]), 0);
            assert_eq!(l4_sum_v4(seg, th, IPPROTO_TCP), 0);
        }
        assert_eq!(segs[0][th + 13], TCP_CWR | 0x10);
        assert_eq!(segs[1][th + 13], 0x10);
        assert_eq!(segs[2][th + 13], TCP_PSH | TCP_FIN | 0x10);
    }

    #[test]
    fn test_software_offload_needs_ip() {
        let f = [0u8; 64];
        let frags = [&f[..]];
        let pkt = TxPacket { offload: TxOffload::Checksum, ..TxPacket::new(&frags) };
        assert_eq!(software_offload(&pkt, &parse_headers(&f)), None);

        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1000 }, ..TxPacket::new(&frags) };
        assert_eq!(software_offload(&pkt, &parse_headers(&f)), None);
    }

    #[test]
    fn test_offload_permitted_follows_features() {
        let f = ipv4_tcp(5, 5, 100);
        let frags = [&f[..]];
        let h = parse_headers(&f);
        let pkt = TxPacket { offload: TxOffload::Tso { mss: 1000 }, ..TxPacket::new(&frags) };
        assert!(!offload_permitted(&pkt, &h, Features::TSO));
        assert!(offload_permitted(&pkt, &h, Features::TSO | Features::SG));
        assert!(offload_permitted(&TxPacket::new(&frags), &h, Features::empty()));
    }
}
