use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use async_recursion::async_recursion;

use dns_types::protocol::types::{
    DomainName, Message, Question, Rcode, RecordClass, RecordType, RecordTypeWithData,
};

use crate::cache::{CacheKey, SharedCache};
use crate::net::exchange;
use crate::roots::random_root;
use crate::trace::{extract_final_ips, Hop, Query, ResolveResult, RRSet, Summary};
use crate::{error::ValidationError, NS_FALLBACK_RECURSION_BUDGET, STEP_CAP};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub timeout_secs: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            timeout_secs: crate::DEFAULT_TIMEOUT_SECS,
        }
    }
}

struct WalkOutcome {
    trace: Vec<Hop>,
    final_rrsets: Vec<RRSet>,
    cname_chain: Vec<String>,
}

/// Resolves `(name, rtype, use_cache)` against the live DNS system, walking
/// the delegation hierarchy from a random root nameserver. Validation
/// failures (an unsupported record type, or a name that doesn't parse) are
/// the only error category: dead ends, NXDOMAIN, and transport failures are
/// all folded into a normal, successfully-returned `ResolveResult`.
pub async fn resolve(
    cache: &SharedCache,
    config: &ResolverConfig,
    name: &str,
    rtype: &str,
    use_cache: bool,
) -> Result<ResolveResult, ValidationError> {
    let rtype: RecordType = rtype.parse()?;
    let name = DomainName::from_dotted_string(name)?.to_lowercase();
    let key = CacheKey::new(&name, rtype);

    if use_cache {
        if let Some(entry) = cache.get(&key) {
            tracing::debug!(name = %name, rtype = %rtype, "resolution served from cache");
            let final_ips = if entry.final_ips.is_empty() {
                None
            } else {
                Some(entry.final_ips)
            };
            return Ok(ResolveResult {
                query: Query {
                    name: name.to_dotted_string(),
                    qtype: rtype.as_str().to_string(),
                    cache: "on",
                },
                summary: Summary {
                    final_ips,
                    total_ms: 0.0,
                    hops: 1,
                    cache_saved_ms: entry.ms,
                },
                trace: vec![Hop::cache_hit(&name, rtype, entry.answer)],
                cname_chain: entry.cname_chain,
            });
        }
    }

    let started = Instant::now();
    let outcome = walk(cache, config, &name, rtype, NS_FALLBACK_RECURSION_BUDGET).await;
    let total_ms = round_to_2dp(started.elapsed().as_secs_f64() * 1000.0);

    let final_ips = extract_final_ips(&outcome.final_rrsets);

    if use_cache && !outcome.final_rrsets.is_empty() {
        if let Some(min_ttl) = outcome.final_rrsets.iter().map(|rrset| rrset.ttl).min() {
            cache.set(
                key,
                outcome.final_rrsets.clone(),
                final_ips.clone(),
                outcome.cname_chain.clone(),
                total_ms,
                f64::from(min_ttl),
            );
        }
    }

    Ok(ResolveResult {
        query: Query {
            name: name.to_dotted_string(),
            qtype: rtype.as_str().to_string(),
            cache: if use_cache { "on" } else { "off" },
        },
        summary: Summary {
            final_ips: if final_ips.is_empty() {
                None
            } else {
                Some(final_ips)
            },
            total_ms,
            hops: outcome.trace.len(),
            cache_saved_ms: 0.0,
        },
        trace: outcome.trace,
        cname_chain: outcome.cname_chain,
    })
}

/// The iterative walk itself: one random root, a step cap, referral and
/// CNAME following, transport-failure fallback through `ns_ips`. Used both
/// for the caller's own query and, recursively with a shrinking
/// `ns_fallback_budget`, to resolve a referral's NS hostnames when a
/// response carries no glue for them.
#[async_recursion]
async fn walk(
    cache: &SharedCache,
    config: &ResolverConfig,
    start_name: &DomainName,
    rtype: RecordType,
    ns_fallback_budget: u32,
) -> WalkOutcome {
    let mut current = start_name.clone();
    let mut ns_ips = vec![random_root()];
    let mut trace = Vec::new();
    let mut cname_chain = Vec::new();
    let mut final_rrsets = Vec::new();
    let mut step_count = 0u32;

    'walk: loop {
        if step_count >= STEP_CAP {
            break 'walk;
        }

        let server = ns_ips[0];
        let question = Question {
            name: current.clone(),
            qtype: rtype,
            qclass: RecordClass::IN,
        };

        match exchange(server, question, config.timeout_secs).await {
            Ok((response, rtt_ms)) => {
                step_count += 1;
                let hop = Hop::from_response(step_count, server.ip().to_string(), &current, rtype, &response, rtt_ms);
                tracing::trace!(server = %server, step = step_count, rcode = ?response.header.rcode, "received response");
                let hop_answer = hop.answer.clone();
                trace.push(hop);

                if response.header.rcode == Rcode::NameError {
                    break 'walk;
                }

                if !response.answers.is_empty() {
                    match classify_answer(rtype, &response.answers, &hop_answer) {
                        AnswerClassification::Terminal => {
                            final_rrsets = hop_answer;
                            break 'walk;
                        }
                        AnswerClassification::Cname(target) => {
                            cname_chain.push(target.to_dotted_string_no_trailing_dot());
                            current = target;
                            ns_ips = vec![random_root()];
                            continue 'walk;
                        }
                        AnswerClassification::FallThrough => {
                            // deliberately falls through to referral handling
                            // using this same response's authority/additional
                            // sections
                        }
                    }
                }

                let next = collect_referral_ips(cache, config, &response, ns_fallback_budget).await;
                if next.is_empty() {
                    break 'walk;
                }
                ns_ips = next;
            }
            Err(err) => {
                if ns_ips.len() > 1 {
                    ns_ips.remove(0);
                    continue 'walk;
                }
                step_count += 1;
                tracing::warn!(server = %server, error = %err, "transport error contacting nameserver");
                trace.push(Hop::error(step_count, server.ip().to_string(), &current, rtype, err.to_string()));
                ns_ips = vec![random_root()];
            }
        }
    }

    WalkOutcome {
        trace,
        final_rrsets,
        cname_chain,
    }
}

/// Builds the next `ns_ips` candidate list from a referral response: glue
/// from `additional` where present, otherwise a bounded sub-resolution of
/// the NS hostname, preserving authority-NS order and deduplicating by IP.
#[async_recursion]
async fn collect_referral_ips(
    cache: &SharedCache,
    config: &ResolverConfig,
    response: &Message,
    ns_fallback_budget: u32,
) -> Vec<SocketAddr> {
    let ns_hosts: Vec<DomainName> = response
        .authority
        .iter()
        .filter_map(|rr| match &rr.rtype_with_data {
            RecordTypeWithData::NS { nsdname } => Some(nsdname.clone()),
            _ => None,
        })
        .collect();

    let mut collected: Vec<IpAddr> = Vec::new();

    for host in &ns_hosts {
        let glue: Vec<IpAddr> = response
            .additional
            .iter()
            .filter(|rr| rr.name.to_lowercase() == host.to_lowercase())
            .filter_map(|rr| match &rr.rtype_with_data {
                RecordTypeWithData::A { address } => Some(IpAddr::V4(*address)),
                RecordTypeWithData::AAAA { address } => Some(IpAddr::V6(*address)),
                _ => None,
            })
            .collect();

        if !glue.is_empty() {
            collected.extend(glue);
        } else {
            collected.extend(resolve_ips_for_host(cache, config, host, ns_fallback_budget).await);
        }
    }

    let mut seen = HashSet::new();
    collected.retain(|ip| seen.insert(*ip));

    collected
        .into_iter()
        .map(|ip| SocketAddr::new(ip, 53))
        .collect()
}

/// Resolves one NS hostname's own A and AAAA records through a bounded
/// sub-walk, swallowing any failure (category 4 of the error taxonomy): a
/// host that can't be resolved simply contributes no IPs.
#[async_recursion]
async fn resolve_ips_for_host(
    cache: &SharedCache,
    config: &ResolverConfig,
    host: &DomainName,
    ns_fallback_budget: u32,
) -> Vec<IpAddr> {
    if ns_fallback_budget == 0 {
        tracing::debug!(host = %host, "ns-host fallback budget exhausted, swallowing");
        return Vec::new();
    }

    let mut ips = Vec::new();
    for sub_rtype in [RecordType::A, RecordType::AAAA] {
        let outcome = walk(cache, config, host, sub_rtype, ns_fallback_budget - 1).await;
        for value in extract_final_ips(&outcome.final_rrsets) {
            if let Ok(ip) = value.parse::<IpAddr>() {
                ips.push(ip);
            } else {
                tracing::debug!(host = %host, value, "ns-host fallback produced an unparseable address");
            }
        }
    }
    ips
}

fn round_to_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

enum AnswerClassification {
    Terminal,
    Cname(DomainName),
    FallThrough,
}

/// Classifies a non-empty answer section per the "terminal wins" precedence:
/// a record of the requested type beats a `CNAME` even if both appear in the
/// same answer section, and only when neither is present does the caller
/// fall through to referral handling.
fn classify_answer(
    rtype: RecordType,
    answers: &[dns_types::protocol::types::ResourceRecord],
    hop_answer: &[RRSet],
) -> AnswerClassification {
    if hop_answer.iter().any(|rrset| rrset.rdtype == rtype.as_str()) {
        return AnswerClassification::Terminal;
    }

    let first_cname = answers.iter().find_map(|rr| match &rr.rtype_with_data {
        RecordTypeWithData::CNAME { cname } => Some(cname.clone()),
        _ => None,
    });
    match first_cname {
        Some(target) => AnswerClassification::Cname(target),
        None => AnswerClassification::FallThrough,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_types::protocol::types::test_util::{a_record, cname_record, domain};
    use std::net::Ipv4Addr;

    #[test]
    fn unsupported_record_type_is_rejected_before_any_io() {
        let rtype_result: Result<RecordType, _> = "MX".parse();
        assert!(rtype_result.is_err());
    }

    #[test]
    fn round_to_2dp_keeps_two_decimal_places() {
        assert_eq!(round_to_2dp(3.14159), 3.14);
    }

    #[test]
    fn terminal_record_wins_over_cname_in_same_answer() {
        let answers = vec![
            cname_record("www.example.com.", "edge.example.com."),
            a_record("www.example.com.", Ipv4Addr::new(9, 9, 9, 9)),
        ];
        let hop_answer = crate::trace::group_into_rrsets(&answers);
        match classify_answer(RecordType::A, &answers, &hop_answer) {
            AnswerClassification::Terminal => {}
            _ => panic!("expected terminal-wins precedence"),
        }
    }

    #[test]
    fn cname_followed_when_no_terminal_record_present() {
        let answers = vec![cname_record("www.example.com.", "edge.example.com.")];
        let hop_answer = crate::trace::group_into_rrsets(&answers);
        match classify_answer(RecordType::A, &answers, &hop_answer) {
            AnswerClassification::Cname(target) => {
                assert_eq!(target, domain("edge.example.com."));
            }
            _ => panic!("expected to follow the cname"),
        }
    }

    #[test]
    fn falls_through_when_neither_terminal_nor_cname_present() {
        use dns_types::protocol::types::test_util::ns_record;
        let answers = vec![ns_record("example.com.", "ns1.example.com.")];
        let hop_answer = crate::trace::group_into_rrsets(&answers);
        match classify_answer(RecordType::A, &answers, &hop_answer) {
            AnswerClassification::FallThrough => {}
            _ => panic!("expected fall-through to referral handling"),
        }
    }
}
