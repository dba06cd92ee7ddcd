//! Internet checksum (RFC 1071) for frames the offload engine refuses.
//!
//! # Reference
//! RFC 1071, RFC 768, RFC 793, RFC 8200 §8.1

/// Add `data` to a running one's complement sum.
pub fn partial_checksum(data: &[u8], initial: u32) -> u32 {
    let mut sum = initial;
    let mut words = data.chunks_exact(2);
    for w in &mut words {
        sum = sum.wrapping_add(u16::from_be_bytes([w[0], w[1]]) as u32);
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    sum
}

/// Fold carries and complement.
pub fn finalize_checksum(sum: u32) -> u16 {
    let mut s = sum;
    while s >> 16 != 0 {
        s = (s & 0xffff) + (s >> 16);
    }
    !(s as u16)
}

pub fn checksum(data: &[u8]) -> u16 {
    finalize_checksum(partial_checksum(data, 0))
}

/// IPv4 pseudo header sum.
pub fn pseudo_v4(src: &[u8], dst: &[u8], proto: u8, l4_len: usize) -> u32 {
    let sum = partial_checksum(dst, partial_checksum(src, 0));
    sum.wrapping_add(proto as u32).wrapping_add(l4_len as u32 & 0xffff)
}

/// IPv6 pseudo header sum.
pub fn pseudo_v6(src: &[u8], dst: &[u8], next_header: u8, l4_len: usize) -> u32 {
    let sum = partial_checksum(dst, partial_checksum(src, 0));
    sum.wrapping_add(next_header as u32)
        .wrapping_add((l4_len as u32) >> 16)
        .wrapping_add(l4_len as u32 & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc1071_example() {
        // RFC 1071 §3: sum of these words is 0xddf2.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), !0xddf2);
    }

    #[test]
    fn test_odd_length_pads_with_zero() {
        assert_eq!(checksum(&[0x12]), !0x1200);
    }

    #[test]
    fn test_valid_header_sums_to_zero() {
        let mut hdr = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8, 0x00,
            0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        let c = checksum(&hdr);
        assert_eq!(c, 0xb861);
        hdr[10..12].copy_from_slice(&c.to_be_bytes());
        assert_eq!(checksum(&hdr), 0);
    }
}
