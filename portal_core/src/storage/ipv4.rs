use std::net::Ipv4Addr;

/// Syntactic IPv4 check: exactly four dot-separated groups of 1–3 ASCII
/// digits, each in `0..=255`. Leading zeros are fine (`01.2.3.4`).
pub fn validate_ipv4(address: &str) -> bool {
    parse_ipv4(address).is_some()
}

/// Parses with the same rules as [`validate_ipv4`]. Unlike `Ipv4Addr::from_str`
/// this tolerates leading zeros, so `010.0.0.1` is `10.0.0.1`.
pub fn parse_ipv4(address: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut groups = address.split('.');
    for octet in octets.iter_mut() {
        *octet = parse_octet(groups.next()?)?;
    }
    match groups.next() {
        Some(_) => None,
        None => Some(Ipv4Addr::from(octets)),
    }
}

fn parse_octet(group: &str) -> Option<u8> {
    if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // at most three digits, cannot overflow u16
    group.parse::<u16>().ok().and_then(|n| u8::try_from(n).ok())
}
