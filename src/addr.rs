//! Dotted-decimal IPv4 codec used on the lookup hot path.

/// Parse a dotted-decimal IPv4 address into its big-endian `u32` value.
///
/// Accepts exactly four decimal octets in `0..=255` separated by three dots.
/// Anything else (whitespace, signs, empty octets, a fifth octet) yields
/// `None`. The scan is a single pass over the bytes with no allocation.
///
/// # Examples
/// ```
/// use ip2cloud::parse_ipv4;
///
/// assert_eq!(parse_ipv4("10.0.0.1"), Some(0x0A00_0001));
/// assert_eq!(parse_ipv4("256.0.0.1"), None);
/// ```
pub fn parse_ipv4(s: &str) -> Option<u32> {
    let mut ip: u32 = 0;
    let mut octet: u32 = 0;
    let mut has_digit = false;
    let mut dots = 0u8;

    for &c in s.as_bytes() {
        match c {
            b'0'..=b'9' => {
                octet = octet * 10 + u32::from(c - b'0');
                if octet > 255 {
                    return None;
                }
                has_digit = true;
            }
            b'.' => {
                if !has_digit || dots == 3 {
                    return None;
                }
                ip = (ip << 8) | octet;
                octet = 0;
                has_digit = false;
                dots += 1;
            }
            _ => return None,
        }
    }

    if dots != 3 || !has_digit {
        return None;
    }
    Some((ip << 8) | octet)
}

/// Render a `u32` address back to dotted-decimal.
pub fn format_ipv4(ip: u32) -> String {
    let [a, b, c, d] = ip.to_be_bytes();
    format!("{}.{}.{}.{}", a, b, c, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_ipv4("0.0.0.0"), Some(0));
        assert_eq!(parse_ipv4("255.255.255.255"), Some(u32::MAX));
        assert_eq!(parse_ipv4("192.168.1.1"), Some(0xC0A8_0101));
        assert_eq!(parse_ipv4("8.8.8.8"), Some(0x0808_0808));
    }

    #[test]
    fn test_canonical_round_trip() {
        for s in [
            "0.0.0.0",
            "1.2.3.4",
            "10.0.0.255",
            "127.0.0.1",
            "172.16.254.3",
            "255.255.255.255",
        ] {
            let ip = parse_ipv4(s).unwrap();
            assert_eq!(format_ipv4(ip), s);
        }
    }

    #[test]
    fn test_agrees_with_std() {
        for ip in [0u32, 1, 0x7F00_0001, 0x0A0B_0C0D, 0xDEAD_BEEF, u32::MAX] {
            let rendered = std::net::Ipv4Addr::from(ip).to_string();
            assert_eq!(parse_ipv4(&rendered), Some(ip));
        }
    }

    #[test]
    fn test_rejects_malformed() {
        let bad = [
            "",
            "1.2.3",
            "1.2.3.4.5",
            "1.2.3.",
            ".1.2.3",
            "1..2.3",
            "256.0.0.1",
            "1.2.3.999",
            "1.2.3.4 ",
            " 1.2.3.4",
            "1.2.3.a",
            "-1.2.3.4",
            "1.2.3.4/24",
            "::1",
            "...",
        ];
        for s in bad {
            assert_eq!(parse_ipv4(s), None, "{:?} should be rejected", s);
        }
    }

    #[test]
    fn test_leading_zeros_are_decimal() {
        // Not canonical, but each octet still reads as decimal.
        assert_eq!(parse_ipv4("010.001.000.009"), Some(0x0A01_0009));
    }
}
