use serde::Serialize;

use dns_types::protocol::types::{DomainName, Message, RecordType, ResourceRecord};

/// A group of records sharing `(name, rdtype, ttl)` from one response
/// section, in the order they were first seen — mirroring how a resolver
/// library groups a flat wire record list into per-name-and-type sets before
/// handing them to application code.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct RRSet {
    pub name: String,
    pub rdtype: String,
    pub ttl: u32,
    pub records: Vec<RRSetRecord>,
}

#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct RRSetRecord {
    pub value: String,
}

/// Groups a flat resource-record list (as it appears in one message section)
/// into RRSets, preserving first-occurrence order of `(name, rdtype)`.
pub fn group_into_rrsets(rrs: &[ResourceRecord]) -> Vec<RRSet> {
    let mut order: Vec<(DomainName, RecordType)> = Vec::new();
    let mut grouped: std::collections::HashMap<(DomainName, RecordType), RRSet> =
        std::collections::HashMap::new();

    for rr in rrs {
        let rtype = rr.rtype_with_data.rtype();
        let group_key = (rr.name.clone(), rtype);
        let entry = grouped.entry(group_key.clone()).or_insert_with(|| {
            order.push(group_key.clone());
            RRSet {
                name: rr.name.to_dotted_string(),
                rdtype: rtype.as_str().to_string(),
                ttl: rr.ttl,
                records: Vec::new(),
            }
        });
        entry.records.push(RRSetRecord {
            value: rr.rtype_with_data.to_text(),
        });
    }

    order
        .into_iter()
        .map(|key| grouped.remove(&key).expect("every order entry was inserted"))
        .collect()
}

/// From a list of already-grouped RRSets, extract the A/AAAA addresses in
/// order. Splits each record value on whitespace and takes the first token,
/// matching the defensive textual parse of the system this was distilled
/// from (our own text representations never contain whitespace, so this is
/// effectively an identity operation here).
pub fn extract_final_ips(rrsets: &[RRSet]) -> Vec<String> {
    let mut ips = Vec::new();
    for rrset in rrsets {
        if rrset.rdtype != "A" && rrset.rdtype != "AAAA" {
            continue;
        }
        for record in &rrset.records {
            if let Some(first) = record.value.split_whitespace().next() {
                ips.push(first.to_string());
            }
        }
    }
    ips
}

#[derive(Debug, Clone, Serialize)]
pub struct HopQuestion {
    pub name: String,
    #[serde(rename = "type")]
    pub qtype: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hop {
    pub step: u32,
    pub server: String,
    pub role: &'static str,
    pub question: HopQuestion,
    pub answer: Vec<RRSet>,
    pub authority: Vec<RRSet>,
    pub additional: Vec<RRSet>,
    pub rtt_ms: Option<f64>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Hop {
    pub fn from_response(
        step: u32,
        server: String,
        question_name: &DomainName,
        rtype: RecordType,
        response: &Message,
        rtt_ms: f64,
    ) -> Hop {
        Hop {
            step,
            server,
            role: "ns",
            question: HopQuestion {
                name: question_name.to_dotted_string(),
                qtype: rtype.as_str().to_string(),
            },
            answer: group_into_rrsets(&response.answers),
            authority: group_into_rrsets(&response.authority),
            additional: group_into_rrsets(&response.additional),
            rtt_ms: Some(rtt_ms),
            cached: false,
            error: None,
        }
    }

    pub fn error(
        step: u32,
        server: String,
        question_name: &DomainName,
        rtype: RecordType,
        error: String,
    ) -> Hop {
        Hop {
            step,
            server,
            role: "ns",
            question: HopQuestion {
                name: question_name.to_dotted_string(),
                qtype: rtype.as_str().to_string(),
            },
            answer: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            rtt_ms: None,
            cached: false,
            error: Some(error),
        }
    }

    pub fn cache_hit(question_name: &DomainName, rtype: RecordType, answer: Vec<RRSet>) -> Hop {
        Hop {
            step: 1,
            server: "cache".to_string(),
            role: "cache",
            question: HopQuestion {
                name: question_name.to_dotted_string(),
                qtype: rtype.as_str().to_string(),
            },
            answer,
            authority: Vec::new(),
            additional: Vec::new(),
            rtt_ms: Some(0.0),
            cached: true,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Query {
    pub name: String,
    #[serde(rename = "type")]
    pub qtype: String,
    pub cache: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub final_ips: Option<Vec<String>>,
    pub total_ms: f64,
    pub hops: usize,
    pub cache_saved_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub query: Query,
    pub summary: Summary,
    pub trace: Vec<Hop>,
    pub cname_chain: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_types::protocol::types::test_util::{a_record, cname_record, domain};
    use std::net::Ipv4Addr;

    #[test]
    fn groups_same_name_and_type_into_one_rrset() {
        let rrs = vec![
            a_record("example.com.", Ipv4Addr::new(1, 1, 1, 1)),
            a_record("example.com.", Ipv4Addr::new(2, 2, 2, 2)),
        ];
        let rrsets = group_into_rrsets(&rrs);
        assert_eq!(rrsets.len(), 1);
        assert_eq!(rrsets[0].records.len(), 2);
    }

    #[test]
    fn preserves_first_occurrence_order_across_types() {
        let rrs = vec![
            cname_record("www.example.com.", "edge.example.com."),
            a_record("edge.example.com.", Ipv4Addr::new(3, 3, 3, 3)),
        ];
        let rrsets = group_into_rrsets(&rrs);
        assert_eq!(rrsets[0].rdtype, "CNAME");
        assert_eq!(rrsets[1].rdtype, "A");
    }

    #[test]
    fn extract_final_ips_only_takes_address_records() {
        let rrs = vec![
            cname_record("www.example.com.", "edge.example.com."),
            a_record("edge.example.com.", Ipv4Addr::new(3, 3, 3, 3)),
        ];
        let rrsets = group_into_rrsets(&rrs);
        assert_eq!(extract_final_ips(&rrsets), vec!["3.3.3.3".to_string()]);
    }

    #[test]
    fn cache_hit_hop_matches_invariant_3() {
        let hop = Hop::cache_hit(&domain("example.com."), RecordType::A, Vec::new());
        assert_eq!(hop.server, "cache");
        assert_eq!(hop.role, "cache");
        assert_eq!(hop.rtt_ms, Some(0.0));
        assert!(hop.cached);
    }
}
