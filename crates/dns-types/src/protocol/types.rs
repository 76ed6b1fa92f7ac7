use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// A domain name, stored both as the flat wire-order octets (for hashing and
/// equality) and as the individual labels (for traversal).
///
/// Always constructed in absolute form: the root is the empty label list.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainName {
    pub octets: Vec<u8>,
    pub labels: Vec<Vec<u8>>,
}

/// Error constructing a `DomainName` from user-supplied text or labels.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DomainNameError {
    EmptyLabel,
    LabelTooLong { label: Vec<u8> },
    NameTooLong { octets: usize },
}

impl fmt::Display for DomainNameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DomainNameError::EmptyLabel => write!(f, "domain name contains an empty label"),
            DomainNameError::LabelTooLong { label } => {
                write!(f, "label of {} octets exceeds the 63 octet limit", label.len())
            }
            DomainNameError::NameTooLong { octets } => {
                write!(f, "domain name of {octets} octets exceeds the 255 octet limit")
            }
        }
    }
}

impl std::error::Error for DomainNameError {}

impl DomainName {
    pub fn root() -> Self {
        DomainName {
            octets: vec![0],
            labels: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn from_labels(labels: Vec<Vec<u8>>) -> Result<Self, DomainNameError> {
        let mut octets = Vec::new();
        for label in &labels {
            if label.is_empty() {
                return Err(DomainNameError::EmptyLabel);
            }
            if label.len() > crate::protocol::LABEL_MAX_LEN {
                return Err(DomainNameError::LabelTooLong {
                    label: label.clone(),
                });
            }
            octets.push(label.len() as u8);
            octets.extend_from_slice(label);
        }
        octets.push(0);
        if octets.len() > crate::protocol::DOMAINNAME_MAX_LEN {
            return Err(DomainNameError::NameTooLong {
                octets: octets.len(),
            });
        }
        Ok(DomainName { octets, labels })
    }

    /// Parses an absolute or relative dotted name (`www.example.com` or
    /// `www.example.com.`) into its labels.
    pub fn from_dotted_string(s: &str) -> Result<Self, DomainNameError> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Self::from_labels(Vec::new());
        }
        let labels = trimmed
            .split('.')
            .map(|label| label.as_bytes().to_vec())
            .collect();
        Self::from_labels(labels)
    }

    /// Always-absolute textual form, e.g. `www.example.com.`.
    pub fn to_dotted_string(&self) -> String {
        if self.labels.is_empty() {
            return ".".to_string();
        }
        let mut s = String::new();
        for label in &self.labels {
            s.push_str(&String::from_utf8_lossy(label));
            s.push('.');
        }
        s
    }

    /// Absolute textual form with the trailing root dot stripped, as used in
    /// `cname_chain` entries.
    pub fn to_dotted_string_no_trailing_dot(&self) -> String {
        let mut s = self.to_dotted_string();
        s.pop();
        s
    }

    pub fn to_lowercase(&self) -> DomainName {
        let labels: Vec<Vec<u8>> = self
            .labels
            .iter()
            .map(|label| label.to_ascii_lowercase())
            .collect();
        Self::from_labels(labels).expect("lowercasing cannot make a name invalid")
    }

    pub fn is_subdomain_of(&self, other: &DomainName) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        let offset = self.labels.len() - other.labels.len();
        self.labels[offset..]
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_dotted_string())
    }
}

impl FromStr for DomainName {
    type Err = DomainNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dotted_string(s)
    }
}

/// DNS header flags and codes, independent of the section counts (which only
/// matter on the wire, see `WireHeader`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Header {
    pub id: u16,
    pub is_response: bool,
    pub opcode: Opcode,
    pub is_authoritative: bool,
    pub is_truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: Rcode,
}

/// The header as it appears on the wire, including section counts that a
/// higher-level `Message` derives from its `Vec` lengths instead of storing
/// directly.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WireHeader {
    pub header: Header,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(u8),
}

impl Opcode {
    pub fn to_u8(self) -> u8 {
        match self {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(value) => value,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(u8),
}

impl Rcode {
    pub fn to_u8(self) -> u8 {
        match self {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(value) => value,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(other),
        }
    }
}

/// The record-type space the wire codec understands. This is broader than
/// the closed `{A, AAAA, CNAME}` query-type set a resolution accepts: real
/// nameservers put `NS` and `SOA` in authority sections and an `OPT`
/// pseudo-record in additional, so the codec has to round-trip those too.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    AAAA,
    OPT,
    Unknown(u16),
}

impl RecordType {
    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::AAAA => 28,
            RecordType::OPT => 41,
            RecordType::Unknown(value) => value,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            28 => RecordType::AAAA,
            41 => RecordType::OPT,
            other => RecordType::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::NS => "NS",
            RecordType::CNAME => "CNAME",
            RecordType::SOA => "SOA",
            RecordType::AAAA => "AAAA",
            RecordType::OPT => "OPT",
            RecordType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a caller asks for a record type outside the
/// supported query-type set.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnsupportedRecordType(pub String);

impl fmt::Display for UnsupportedRecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsupported record type '{}'", self.0)
    }
}

impl std::error::Error for UnsupportedRecordType {}

impl FromStr for RecordType {
    type Err = UnsupportedRecordType;

    /// Only ever accepts the closed query-type set `{A, AAAA, CNAME}` — this
    /// is the front door for user-supplied record types, so anything else is
    /// a validation error, not a codec concern.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            other => Err(UnsupportedRecordType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RecordClass {
    IN,
    Unknown(u16),
}

impl RecordClass {
    pub fn to_u16(self) -> u16 {
        match self {
            RecordClass::IN => 1,
            RecordClass::Unknown(value) => value,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            other => RecordClass::Unknown(other),
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordClass::IN => write!(f, "IN"),
            RecordClass::Unknown(value) => write!(f, "CLASS{value}"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype_with_data: RecordTypeWithData,
    pub rclass: RecordClass,
    pub ttl: u32,
}

/// A resource record's type-specific data, trimmed to the types an
/// iterative A/AAAA/CNAME walk actually needs to parse out of real
/// nameserver responses.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RecordTypeWithData {
    A {
        address: Ipv4Addr,
    },
    NS {
        nsdname: DomainName,
    },
    CNAME {
        cname: DomainName,
    },
    SOA {
        mname: DomainName,
        rname: DomainName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    AAAA {
        address: Ipv6Addr,
    },
    OPT {
        udp_payload_size: u16,
        extended_rcode: u8,
        version: u8,
        flags: u16,
        options: Vec<u8>,
    },
    Unknown {
        tag: u16,
        octets: Vec<u8>,
    },
}

impl RecordTypeWithData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordTypeWithData::A { .. } => RecordType::A,
            RecordTypeWithData::NS { .. } => RecordType::NS,
            RecordTypeWithData::CNAME { .. } => RecordType::CNAME,
            RecordTypeWithData::SOA { .. } => RecordType::SOA,
            RecordTypeWithData::AAAA { .. } => RecordType::AAAA,
            RecordTypeWithData::OPT { .. } => RecordType::OPT,
            RecordTypeWithData::Unknown { tag, .. } => RecordType::Unknown(*tag),
        }
    }

    /// Type-specific text representation used as an RRSet record `value`.
    pub fn to_text(&self) -> String {
        match self {
            RecordTypeWithData::A { address } => address.to_string(),
            RecordTypeWithData::AAAA { address } => address.to_string(),
            RecordTypeWithData::NS { nsdname } => nsdname.to_dotted_string(),
            RecordTypeWithData::CNAME { cname } => cname.to_dotted_string(),
            RecordTypeWithData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => format!(
                "{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"
            ),
            RecordTypeWithData::OPT { .. } => String::new(),
            RecordTypeWithData::Unknown { octets, .. } => {
                octets.iter().map(|b| format!("{b:02x}")).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// Builds an iterative (recursion-desired cleared) query for a single
    /// question, with no answer/authority/additional records.
    pub fn from_question(id: u16, question: Question) -> Message {
        Message {
            header: Header {
                id,
                is_response: false,
                opcode: Opcode::Standard,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: false,
                recursion_available: false,
                rcode: Rcode::NoError,
            },
            questions: vec![question],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Appends an EDNS(0) OPT pseudo-record advertising `udp_payload_size`.
    pub fn with_edns(mut self, udp_payload_size: u16) -> Message {
        self.additional.push(ResourceRecord {
            name: DomainName::root(),
            rtype_with_data: RecordTypeWithData::OPT {
                udp_payload_size,
                extended_rcode: 0,
                version: 0,
                flags: 0,
                options: Vec::new(),
            },
            rclass: RecordClass::Unknown(udp_payload_size),
            ttl: 0,
        });
        self
    }
}

/// Test-only helpers for building small, deterministic messages and records
/// without going through the wire codec.
#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;

    pub fn domain(s: &str) -> DomainName {
        DomainName::from_dotted_string(s).expect("test domain name should be valid")
    }

    pub fn a_record(name: &str, address: Ipv4Addr) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::A { address },
            rclass: RecordClass::IN,
            ttl: 300,
        }
    }

    pub fn aaaa_record(name: &str, address: Ipv6Addr) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::AAAA { address },
            rclass: RecordClass::IN,
            ttl: 300,
        }
    }

    pub fn cname_record(name: &str, target: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::CNAME {
                cname: domain(target),
            },
            rclass: RecordClass::IN,
            ttl: 300,
        }
    }

    pub fn ns_record(name: &str, nsdname: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::NS {
                nsdname: domain(nsdname),
            },
            rclass: RecordClass::IN,
            ttl: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dotted_string_is_absolute() {
        let name = DomainName::from_dotted_string("www.example.com").unwrap();
        assert_eq!(name.to_dotted_string(), "www.example.com.");
    }

    #[test]
    fn from_dotted_string_accepts_trailing_dot() {
        let with_dot = DomainName::from_dotted_string("www.example.com.").unwrap();
        let without_dot = DomainName::from_dotted_string("www.example.com").unwrap();
        assert_eq!(with_dot, without_dot);
    }

    #[test]
    fn root_is_absolute_dot() {
        assert_eq!(DomainName::root().to_dotted_string(), ".");
    }

    #[test]
    fn rejects_empty_label() {
        assert_eq!(
            DomainName::from_dotted_string("www..com"),
            Err(DomainNameError::EmptyLabel)
        );
    }

    #[test]
    fn rejects_oversized_label() {
        let label = "a".repeat(64);
        assert!(matches!(
            DomainName::from_dotted_string(&format!("{label}.com")),
            Err(DomainNameError::LabelTooLong { .. })
        ));
    }

    #[test]
    fn is_subdomain_of_is_case_insensitive() {
        let a = DomainName::from_dotted_string("WWW.example.com.").unwrap();
        let b = DomainName::from_dotted_string("example.COM.").unwrap();
        assert!(a.is_subdomain_of(&b));
    }

    #[test]
    fn record_type_from_str_accepts_supported_types() {
        assert_eq!("A".parse::<RecordType>(), Ok(RecordType::A));
        assert_eq!("aaaa".parse::<RecordType>(), Ok(RecordType::AAAA));
        assert_eq!("CNAME".parse::<RecordType>(), Ok(RecordType::CNAME));
    }

    #[test]
    fn record_type_from_str_rejects_unsupported_types() {
        assert!("MX".parse::<RecordType>().is_err());
    }

    #[test]
    fn to_text_renders_ipv4_as_dotted_quad() {
        let rr = RecordTypeWithData::A {
            address: Ipv4Addr::new(93, 184, 216, 34),
        };
        assert_eq!(rr.to_text(), "93.184.216.34");
    }
}
