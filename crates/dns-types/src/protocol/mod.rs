pub mod deserialise;
pub mod serialise;
pub mod types;

pub(crate) const HEADER_MASK_QR: u8 = 0b1000_0000;
pub(crate) const HEADER_MASK_OPCODE: u8 = 0b0111_1000;
pub(crate) const HEADER_OFFSET_OPCODE: u8 = 3;
pub(crate) const HEADER_MASK_AA: u8 = 0b0000_0100;
pub(crate) const HEADER_MASK_TC: u8 = 0b0000_0010;
pub(crate) const HEADER_MASK_RD: u8 = 0b0000_0001;
pub(crate) const HEADER_MASK_RA: u8 = 0b1000_0000;
pub(crate) const HEADER_MASK_RCODE: u8 = 0b0000_1111;
pub(crate) const HEADER_OFFSET_RCODE: u8 = 0;

/// RFC 1035 2.3.4: a single label is at most 63 octets.
pub(crate) const LABEL_MAX_LEN: usize = 63;
/// RFC 1035 2.3.4: a full domain name is at most 255 octets on the wire.
pub(crate) const DOMAINNAME_MAX_LEN: usize = 255;
