use std::net::{Ipv4Addr, Ipv6Addr};

use super::types::{
    DomainName, Header, Message, Opcode, Question, Rcode, RecordClass, RecordType,
    RecordTypeWithData, ResourceRecord, WireHeader,
};
use super::{
    HEADER_MASK_AA, HEADER_MASK_OPCODE, HEADER_MASK_QR, HEADER_MASK_RA, HEADER_MASK_RCODE,
    HEADER_MASK_RD, HEADER_MASK_TC, HEADER_OFFSET_OPCODE, HEADER_OFFSET_RCODE, LABEL_MAX_LEN,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    CompletelyBusted,
    HeaderTooShort,
    QuestionTooShort,
    ResourceRecordTooShort,
    ResourceRecordInvalid { rtype: u16 },
    DomainTooShort,
    DomainTooLong,
    DomainLabelInvalid,
    DomainPointerInvalid,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::CompletelyBusted => write!(f, "message is truncated or malformed"),
            Error::HeaderTooShort => write!(f, "header is shorter than 12 octets"),
            Error::QuestionTooShort => write!(f, "question section is truncated"),
            Error::ResourceRecordTooShort => write!(f, "resource record is truncated"),
            Error::ResourceRecordInvalid { rtype } => {
                write!(f, "resource record of type {rtype} has invalid rdata")
            }
            Error::DomainTooShort => write!(f, "domain name is truncated"),
            Error::DomainTooLong => write!(f, "domain name exceeds 255 octets"),
            Error::DomainLabelInvalid => write!(f, "domain name label exceeds 63 octets"),
            Error::DomainPointerInvalid => {
                write!(f, "domain name compression pointer does not point backward")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A cursor over the whole message, since domain name compression pointers
/// can jump to any earlier offset in the buffer.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    pos: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        ConsumableBuffer { octets, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_offset(&self, offset: usize) -> ConsumableBuffer<'a> {
        ConsumableBuffer {
            octets: self.octets,
            pos: offset,
        }
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        let value = *self.octets.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        let hi = self.next_u8()?;
        let lo = self.next_u8()?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        let a = self.next_u16()?;
        let b = self.next_u16()?;
        Some(((a as u32) << 16) | (b as u32))
    }

    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.octets.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(slice)
    }
}

impl Header {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<WireHeader, Error> {
        let id = buffer.next_u16().ok_or(Error::HeaderTooShort)?;
        let octet1 = buffer.next_u8().ok_or(Error::HeaderTooShort)?;
        let octet2 = buffer.next_u8().ok_or(Error::HeaderTooShort)?;
        let qdcount = buffer.next_u16().ok_or(Error::HeaderTooShort)?;
        let ancount = buffer.next_u16().ok_or(Error::HeaderTooShort)?;
        let nscount = buffer.next_u16().ok_or(Error::HeaderTooShort)?;
        let arcount = buffer.next_u16().ok_or(Error::HeaderTooShort)?;

        let header = Header {
            id,
            is_response: octet1 & HEADER_MASK_QR != 0,
            opcode: Opcode::from_u8((octet1 & HEADER_MASK_OPCODE) >> HEADER_OFFSET_OPCODE),
            is_authoritative: octet1 & HEADER_MASK_AA != 0,
            is_truncated: octet1 & HEADER_MASK_TC != 0,
            recursion_desired: octet1 & HEADER_MASK_RD != 0,
            recursion_available: octet2 & HEADER_MASK_RA != 0,
            rcode: Rcode::from_u8((octet2 & HEADER_MASK_RCODE) >> HEADER_OFFSET_RCODE),
        };

        Ok(WireHeader {
            header,
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

impl DomainName {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<DomainName, Error> {
        let mut labels = Vec::new();
        let mut octets = Vec::new();
        // Each pointer jump must land strictly before the previous one: this
        // is what turns a cyclic or non-decreasing pointer chain (e.g.
        // 20 -> 30 -> 20) into an immediate `DomainPointerInvalid` instead of
        // an infinite loop, since `limit` strictly shrinks on every jump and
        // cannot be revisited.
        let mut limit = buffer.pos();
        let mut jumped = false;
        let mut post_pointer_pos = None;

        loop {
            let len = buffer.next_u8().ok_or(Error::DomainTooShort)?;
            if len == 0 {
                octets.push(0);
                break;
            } else if len & 0xc0 == 0xc0 {
                let lo = buffer.next_u8().ok_or(Error::DomainTooShort)?;
                let ptr = (((len & !0xc0) as usize) << 8) | lo as usize;
                if ptr >= limit {
                    return Err(Error::DomainPointerInvalid);
                }
                limit = ptr;
                if !jumped {
                    post_pointer_pos = Some(buffer.pos());
                    jumped = true;
                }
                *buffer = buffer.at_offset(ptr);
            } else if len & 0xc0 != 0 {
                return Err(Error::DomainLabelInvalid);
            } else {
                let len = len as usize;
                if len > LABEL_MAX_LEN {
                    return Err(Error::DomainLabelInvalid);
                }
                let label = buffer.take(len).ok_or(Error::DomainTooShort)?.to_vec();
                octets.push(len as u8);
                octets.extend_from_slice(&label);
                labels.push(label);
            }
        }

        if let Some(pos) = post_pointer_pos {
            *buffer = buffer.at_offset(pos);
        }

        if octets.len() > super::DOMAINNAME_MAX_LEN {
            return Err(Error::DomainTooLong);
        }

        Ok(DomainName { octets, labels })
    }
}

impl Question {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Question, Error> {
        let name = DomainName::deserialise(buffer)?;
        let qtype = RecordType::from_u16(buffer.next_u16().ok_or(Error::QuestionTooShort)?);
        let qclass = RecordClass::from_u16(buffer.next_u16().ok_or(Error::QuestionTooShort)?);
        Ok(Question { name, qtype, qclass })
    }
}

impl ResourceRecord {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<ResourceRecord, Error> {
        let name = DomainName::deserialise(buffer)?;
        let rtype = buffer.next_u16().ok_or(Error::ResourceRecordTooShort)?;
        let rclass = RecordClass::from_u16(buffer.next_u16().ok_or(Error::ResourceRecordTooShort)?);
        let ttl = buffer.next_u32().ok_or(Error::ResourceRecordTooShort)?;
        let rdlength = buffer.next_u16().ok_or(Error::ResourceRecordTooShort)? as usize;
        let rdata_start = buffer.pos();

        let rtype_with_data = match RecordType::from_u16(rtype) {
            RecordType::A => {
                let octets = buffer.take(4).ok_or(Error::ResourceRecordInvalid { rtype })?;
                RecordTypeWithData::A {
                    address: Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
                }
            }
            RecordType::AAAA => {
                let octets = buffer.take(16).ok_or(Error::ResourceRecordInvalid { rtype })?;
                let mut arr = [0u8; 16];
                arr.copy_from_slice(octets);
                RecordTypeWithData::AAAA {
                    address: Ipv6Addr::from(arr),
                }
            }
            RecordType::NS => RecordTypeWithData::NS {
                nsdname: DomainName::deserialise(buffer)?,
            },
            RecordType::CNAME => RecordTypeWithData::CNAME {
                cname: DomainName::deserialise(buffer)?,
            },
            RecordType::SOA => {
                let mname = DomainName::deserialise(buffer)?;
                let rname = DomainName::deserialise(buffer)?;
                let serial = buffer.next_u32().ok_or(Error::ResourceRecordInvalid { rtype })?;
                let refresh = buffer.next_u32().ok_or(Error::ResourceRecordInvalid { rtype })?;
                let retry = buffer.next_u32().ok_or(Error::ResourceRecordInvalid { rtype })?;
                let expire = buffer.next_u32().ok_or(Error::ResourceRecordInvalid { rtype })?;
                let minimum = buffer.next_u32().ok_or(Error::ResourceRecordInvalid { rtype })?;
                RecordTypeWithData::SOA {
                    mname,
                    rname,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                }
            }
            RecordType::OPT => {
                let octets = buffer
                    .take(rdlength)
                    .ok_or(Error::ResourceRecordInvalid { rtype })?
                    .to_vec();
                RecordTypeWithData::OPT {
                    udp_payload_size: rclass.to_u16(),
                    extended_rcode: (ttl >> 24) as u8,
                    version: (ttl >> 16) as u8,
                    flags: ttl as u16,
                    options: octets,
                }
            }
            RecordType::Unknown(tag) => {
                let octets = buffer
                    .take(rdlength)
                    .ok_or(Error::ResourceRecordInvalid { rtype })?
                    .to_vec();
                RecordTypeWithData::Unknown { tag, octets }
            }
        };

        // domain-name-bearing rdata (NS/CNAME/SOA) may use compression, so we
        // cannot trust `rdlength` to know how far we advanced; skip ahead
        // explicitly only for the fixed-size and opaque cases, which already
        // consumed exactly `rdlength` octets via `take`.
        let _ = rdata_start;

        Ok(ResourceRecord {
            name,
            rtype_with_data,
            rclass,
            ttl,
        })
    }
}

impl Message {
    pub fn deserialise(octets: &[u8]) -> Result<Message, Error> {
        let mut buffer = ConsumableBuffer::new(octets);
        let wire_header = Header::deserialise(&mut buffer)?;

        let mut questions = Vec::with_capacity(wire_header.qdcount as usize);
        for _ in 0..wire_header.qdcount {
            questions.push(Question::deserialise(&mut buffer)?);
        }

        let mut answers = Vec::with_capacity(wire_header.ancount as usize);
        for _ in 0..wire_header.ancount {
            answers.push(ResourceRecord::deserialise(&mut buffer)?);
        }

        let mut authority = Vec::with_capacity(wire_header.nscount as usize);
        for _ in 0..wire_header.nscount {
            authority.push(ResourceRecord::deserialise(&mut buffer)?);
        }

        let mut additional = Vec::with_capacity(wire_header.arcount as usize);
        for _ in 0..wire_header.arcount {
            additional.push(ResourceRecord::deserialise(&mut buffer)?);
        }

        Ok(Message {
            header: wire_header.header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    pub fn from_octets(octets: &[u8]) -> Result<Message, Error> {
        Self::deserialise(octets)
    }
}

#[cfg(test)]
mod tests {
    use super::super::serialise::WritableBuffer;
    use super::super::types::test_util::*;
    use super::super::types::*;
    use super::*;

    #[test]
    fn roundtrips_simple_query() {
        let question = Question {
            name: domain("example.com."),
            qtype: RecordType::A,
            qclass: RecordClass::IN,
        };
        let message = Message::from_question(0x1234, question);
        let octets = message.into_octets().unwrap();
        let decoded = Message::from_octets(&octets).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn roundtrips_response_with_answer() {
        use std::net::Ipv4Addr;
        let question = Question {
            name: domain("example.com."),
            qtype: RecordType::A,
            qclass: RecordClass::IN,
        };
        let mut message = Message::from_question(42, question);
        message.header.is_response = true;
        message.answers.push(a_record("example.com.", Ipv4Addr::new(93, 184, 216, 34)));
        let octets = message.into_octets().unwrap();
        let decoded = Message::from_octets(&octets).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn decodes_name_with_compression_pointer() {
        // manually build: question "a.example.com." followed by an answer
        // whose name is a pointer back to the question's name.
        let mut buffer = WritableBuffer::new();
        let header = Header {
            id: 1,
            is_response: true,
            opcode: Opcode::Standard,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: false,
            recursion_available: false,
            rcode: Rcode::NoError,
        };
        header.serialise(&mut buffer);
        buffer.write_u16(1);
        buffer.write_u16(1);
        buffer.write_u16(0);
        buffer.write_u16(0);

        let name = domain("a.example.com.");
        let name_offset = buffer.index();
        name.serialise(&mut buffer);
        buffer.write_u16(RecordType::A.to_u16());
        buffer.write_u16(RecordClass::IN.to_u16());

        // second copy, as a pointer into the question's name
        let pointer = 0xc000u16 | (name_offset as u16);
        buffer.write_u16(pointer);
        buffer.write_u16(RecordType::A.to_u16());
        buffer.write_u16(RecordClass::IN.to_u16());
        buffer.write_u32(300);
        let rdlength_index = buffer.index();
        buffer.write_u16(0);
        let rdata_start = buffer.index();
        buffer.write_octets(&[93, 184, 216, 34]);
        let rdlength = (buffer.index() - rdata_start) as u16;
        buffer.set_u16(rdlength_index, rdlength);

        let octets = buffer.into_octets();
        let decoded = Message::from_octets(&octets).unwrap();
        assert_eq!(decoded.answers.len(), 1);
        assert_eq!(decoded.answers[0].name, name);
    }

    #[test]
    fn rejects_cyclic_compression_pointers() {
        // offset 20 points to 30, offset 30 points back to 20, and the name
        // we actually decode starts at offset 40 pointing at 20. A decoder
        // that only checks pointers against the original start would loop
        // between 20 and 30 forever; this must return an error instead.
        let mut octets = vec![0u8; 42];
        octets[20] = 0xc0;
        octets[21] = 30;
        octets[30] = 0xc0;
        octets[31] = 20;
        octets[40] = 0xc0;
        octets[41] = 20;

        let mut buffer = ConsumableBuffer::new(&octets).at_offset(40);
        assert_eq!(
            DomainName::deserialise(&mut buffer),
            Err(Error::DomainPointerInvalid)
        );
    }

    #[test]
    fn rejects_truncated_header() {
        assert_eq!(Message::from_octets(&[0, 1, 2]), Err(Error::HeaderTooShort));
    }
}
