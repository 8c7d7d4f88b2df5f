//! Internet checksum (RFC 1071) used for outbound ICMPv4 headers.

/// Compute the 16-bit one's-complement Internet checksum of `data`.
///
/// Words are summed in network byte order into a 32-bit accumulator,
/// carries are folded back twice, and the result is complemented.
///
/// For odd-length buffers, `pad_odd` controls whether the trailing
/// byte is summed as the high half of a zero-padded word (pseudo-header
/// computations rely on this) or left out of the sum entirely.
#[must_use]
pub fn internet_checksum(data: &[u8], pad_odd: bool) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in words.by_ref() {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        if pad_odd {
            sum += u32::from(u16::from_be_bytes([*last, 0]));
        }
    }

    // Fold the carries back into the low 16 bits, twice.
    sum = (sum >> 16) + (sum & 0xffff);
    sum += sum >> 16;

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Echo request header: type=8 code=0 checksum=0 id=7350 seq=1.
    const ECHO_HEADER: [u8; 8] = [8, 0, 0, 0, 0x1c, 0xb6, 0x00, 0x01];

    #[test]
    fn known_echo_header_checksum() {
        assert_eq!(internet_checksum(&ECHO_HEADER, false), 0xdb48);
    }

    #[test]
    fn verify_on_receive_identity() {
        let mut buf = ECHO_HEADER;
        let sum = internet_checksum(&buf, false);
        buf[2..4].copy_from_slice(&sum.to_be_bytes());
        assert_eq!(internet_checksum(&buf, false), 0);
    }

    #[test]
    fn even_length_ignores_pad_flag() {
        assert_eq!(
            internet_checksum(&ECHO_HEADER, true),
            internet_checksum(&ECHO_HEADER, false)
        );
    }

    #[test]
    fn odd_length_with_padding_appends_zero_byte() {
        let odd = [0x12, 0x34, 0x56];
        let padded = [0x12, 0x34, 0x56, 0x00];
        assert_eq!(
            internet_checksum(&odd, true),
            internet_checksum(&padded, false)
        );
    }

    #[test]
    fn odd_length_without_padding_drops_trailing_byte() {
        let odd = [0x12, 0x34, 0x56];
        let even = [0x12, 0x34];
        assert_eq!(
            internet_checksum(&odd, false),
            internet_checksum(&even, false)
        );
        assert_ne!(
            internet_checksum(&odd, false),
            internet_checksum(&odd, true)
        );
    }

    #[test]
    fn all_ones_buffer_sums_to_zero_complemented() {
        // 0xffff + 0xffff folds to 0xffff; complement is 0.
        assert_eq!(internet_checksum(&[0xff; 4], false), 0);
    }
}
