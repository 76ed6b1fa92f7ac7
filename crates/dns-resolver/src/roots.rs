use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rand::Rng;

/// The 13 well-known DNS root nameserver addresses, A through M.
pub const ROOTS: [Ipv4Addr; 13] = [
    Ipv4Addr::new(198, 41, 0, 4),
    Ipv4Addr::new(199, 9, 14, 201),
    Ipv4Addr::new(192, 33, 4, 12),
    Ipv4Addr::new(199, 7, 91, 13),
    Ipv4Addr::new(192, 203, 230, 10),
    Ipv4Addr::new(192, 5, 5, 241),
    Ipv4Addr::new(192, 112, 36, 4),
    Ipv4Addr::new(198, 97, 190, 53),
    Ipv4Addr::new(192, 36, 148, 17),
    Ipv4Addr::new(192, 58, 128, 30),
    Ipv4Addr::new(193, 0, 14, 129),
    Ipv4Addr::new(199, 7, 83, 42),
    Ipv4Addr::new(202, 12, 27, 33),
];

const DNS_PORT: u16 = 53;

/// Picks one root nameserver uniformly at random. Called both to pick the
/// very first candidate and to reset after an exhausted transport failure.
pub fn random_root() -> SocketAddr {
    let index = rand::thread_rng().gen_range(0..ROOTS.len());
    SocketAddr::new(IpAddr::V4(ROOTS[index]), DNS_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_thirteen_roots() {
        assert_eq!(ROOTS.len(), 13);
    }

    #[test]
    fn random_root_is_always_one_of_the_thirteen() {
        for _ in 0..100 {
            let addr = random_root();
            assert_eq!(addr.port(), DNS_PORT);
            match addr.ip() {
                IpAddr::V4(ip) => assert!(ROOTS.contains(&ip)),
                IpAddr::V6(_) => panic!("root servers are addressed by IPv4 here"),
            }
        }
    }
}
