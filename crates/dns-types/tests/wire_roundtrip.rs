use std::net::{Ipv4Addr, Ipv6Addr};

use dns_types::protocol::types::test_util::{a_record, aaaa_record, cname_record, domain};
use dns_types::protocol::types::{Message, Question, RecordClass, RecordType};

#[test]
fn query_roundtrips_through_the_wire() {
    let question = Question {
        name: domain("example.com."),
        qtype: RecordType::A,
        qclass: RecordClass::IN,
    };
    let message = Message::from_question(0xabcd, question).with_edns(4096);

    let octets = message.into_octets().expect("serialises");
    let decoded = Message::from_octets(&octets).expect("deserialises");

    assert_eq!(message, decoded);
}

#[test]
fn response_with_mixed_sections_roundtrips() {
    let question = Question {
        name: domain("www.example.com."),
        qtype: RecordType::A,
        qclass: RecordClass::IN,
    };
    let mut message = Message::from_question(7, question);
    message.header.is_response = true;
    message.answers.push(cname_record("www.example.com.", "edge.example.com."));
    message
        .answers
        .push(a_record("edge.example.com.", Ipv4Addr::new(93, 184, 216, 34)));
    message
        .additional
        .push(aaaa_record("edge.example.com.", Ipv6Addr::LOCALHOST));

    let octets = message.into_octets().expect("serialises");
    let decoded = Message::from_octets(&octets).expect("deserialises");

    assert_eq!(message, decoded);
}

#[test]
fn malformed_octets_do_not_panic() {
    for len in 0..16 {
        let junk = vec![0xffu8; len];
        let _ = Message::from_octets(&junk);
    }
}
