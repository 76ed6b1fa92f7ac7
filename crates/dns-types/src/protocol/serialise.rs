use bytes::{BufMut, BytesMut};

use super::types::{
    DomainName, Header, Message, Opcode, Question, Rcode, RecordTypeWithData, ResourceRecord,
};
use super::{
    HEADER_MASK_AA, HEADER_MASK_OPCODE, HEADER_MASK_QR, HEADER_MASK_RA, HEADER_MASK_RCODE,
    HEADER_MASK_RD, HEADER_MASK_TC, HEADER_OFFSET_OPCODE, HEADER_OFFSET_RCODE,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    CounterTooLarge { what: &'static str, value: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::CounterTooLarge { what, value } => {
                write!(f, "{what} count {value} exceeds u16 range")
            }
        }
    }
}

impl std::error::Error for Error {}

fn usize_to_u16(what: &'static str, value: usize) -> Result<u16, Error> {
    u16::try_from(value).map_err(|_| Error::CounterTooLarge { what, value })
}

/// Accumulates serialised bytes and tracks the current write offset, needed
/// for backpatching `RDLENGTH` once a record's data has been written.
pub struct WritableBuffer {
    buf: BytesMut,
}

impl WritableBuffer {
    pub fn new() -> Self {
        WritableBuffer {
            buf: BytesMut::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.buf.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        self.buf.put_slice(octets);
    }

    pub fn set_u16(&mut self, index: usize, value: u16) {
        self.buf[index..index + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn into_octets(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        buffer.write_u16(self.id);

        let mut octet1 = 0u8;
        if self.is_response {
            octet1 |= HEADER_MASK_QR;
        }
        octet1 |= (self.opcode.to_u8() << HEADER_OFFSET_OPCODE) & HEADER_MASK_OPCODE;
        if self.is_authoritative {
            octet1 |= HEADER_MASK_AA;
        }
        if self.is_truncated {
            octet1 |= HEADER_MASK_TC;
        }
        if self.recursion_desired {
            octet1 |= HEADER_MASK_RD;
        }
        buffer.write_u8(octet1);

        let mut octet2 = 0u8;
        if self.recursion_available {
            octet2 |= HEADER_MASK_RA;
        }
        octet2 |= (self.rcode.to_u8() << HEADER_OFFSET_RCODE) & HEADER_MASK_RCODE;
        buffer.write_u8(octet2);
    }
}

impl DomainName {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        buffer.write_octets(&self.octets);
    }
}

impl Question {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        self.name.serialise(buffer);
        buffer.write_u16(self.qtype.to_u16());
        buffer.write_u16(self.qclass.to_u16());
    }
}

impl RecordTypeWithData {
    fn serialise_rdata(&self, buffer: &mut WritableBuffer) {
        match self {
            RecordTypeWithData::A { address } => {
                buffer.write_octets(&address.octets());
            }
            RecordTypeWithData::AAAA { address } => {
                buffer.write_octets(&address.octets());
            }
            RecordTypeWithData::NS { nsdname } => nsdname.serialise(buffer),
            RecordTypeWithData::CNAME { cname } => cname.serialise(buffer),
            RecordTypeWithData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                mname.serialise(buffer);
                rname.serialise(buffer);
                buffer.write_u32(*serial);
                buffer.write_u32(*refresh);
                buffer.write_u32(*retry);
                buffer.write_u32(*expire);
                buffer.write_u32(*minimum);
            }
            RecordTypeWithData::OPT { options, .. } => {
                buffer.write_octets(options);
            }
            RecordTypeWithData::Unknown { octets, .. } => {
                buffer.write_octets(octets);
            }
        }
    }
}

impl ResourceRecord {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        self.name.serialise(buffer);
        buffer.write_u16(self.rtype_with_data.rtype().to_u16());
        buffer.write_u16(self.rclass.to_u16());
        buffer.write_u32(self.ttl);

        let rdlength_index = buffer.index();
        buffer.write_u16(0);
        let rdata_start = buffer.index();
        self.rtype_with_data.serialise_rdata(buffer);
        let rdlength = (buffer.index() - rdata_start) as u16;
        buffer.set_u16(rdlength_index, rdlength);
    }
}

impl Message {
    pub fn serialise(&self, buffer: &mut WritableBuffer) -> Result<(), Error> {
        self.header.serialise(buffer);
        buffer.write_u16(usize_to_u16("question", self.questions.len())?);
        buffer.write_u16(usize_to_u16("answer", self.answers.len())?);
        buffer.write_u16(usize_to_u16("authority", self.authority.len())?);
        buffer.write_u16(usize_to_u16("additional", self.additional.len())?);

        for question in &self.questions {
            question.serialise(buffer);
        }
        for rr in self
            .answers
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
        {
            rr.serialise(buffer);
        }

        Ok(())
    }

    pub fn into_octets(&self) -> Result<Vec<u8>, Error> {
        let mut buffer = WritableBuffer::new();
        self.serialise(&mut buffer)?;
        Ok(buffer.into_octets())
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::test_util::*;
    use super::super::types::*;
    use super::*;

    #[test]
    fn header_roundtrips_flags() {
        let header = Header {
            id: 0xbeef,
            is_response: true,
            opcode: Opcode::Standard,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: true,
            recursion_available: true,
            rcode: Rcode::NameError,
        };
        let mut buffer = WritableBuffer::new();
        header.serialise(&mut buffer);
        let octets = buffer.into_octets();
        assert_eq!(octets.len(), 4);
        assert_eq!(octets[0..2], [0xbe, 0xef]);
        assert_eq!(octets[2] & HEADER_MASK_QR, HEADER_MASK_QR);
        assert_eq!(octets[2] & HEADER_MASK_RD, HEADER_MASK_RD);
        assert_eq!(octets[3] & HEADER_MASK_RA, HEADER_MASK_RA);
        assert_eq!(octets[3] & HEADER_MASK_RCODE, Rcode::NameError.to_u8());
    }

    #[test]
    fn message_with_edns_serialises_opt_into_additional() {
        let question = Question {
            name: domain("example.com."),
            qtype: RecordType::A,
            qclass: RecordClass::IN,
        };
        let message = Message::from_question(1, question).with_edns(4096);
        let octets = message.into_octets().unwrap();
        assert!(!octets.is_empty());
    }

    #[test]
    fn a_record_serialises_four_rdata_octets() {
        use std::net::Ipv4Addr;
        let rr = a_record("example.com.", Ipv4Addr::new(1, 2, 3, 4));
        let mut buffer = WritableBuffer::new();
        rr.serialise(&mut buffer);
        let octets = buffer.into_octets();
        assert_eq!(&octets[octets.len() - 4..], &[1, 2, 3, 4]);
    }
}
