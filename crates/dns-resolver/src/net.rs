use std::net::SocketAddr;
use std::time::{Duration, Instant};

use dns_types::protocol::deserialise;
use dns_types::protocol::serialise;
use dns_types::protocol::types::Message;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// EDNS(0) UDP payload size advertised on every outbound query.
const EDNS_UDP_PAYLOAD_SIZE: u16 = 4096;

#[derive(Debug)]
pub enum TransportError {
    Serialise(serialise::Error),
    Io(std::io::Error),
    Timeout,
    Deserialise(deserialise::Error),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TransportError::Serialise(err) => write!(f, "could not serialise query: {err}"),
            TransportError::Io(err) => write!(f, "{err}"),
            TransportError::Timeout => write!(f, "timed out"),
            TransportError::Deserialise(err) => write!(f, "could not parse response: {err}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Sends one iterative (recursion-desired cleared) query for `(name, rtype)`
/// to `server` over UDP and waits for a single response, bounded by
/// `timeout_secs`. Returns the parsed response and the measured round-trip
/// time in milliseconds, rounded to two decimal places.
pub async fn exchange(
    server: SocketAddr,
    question: dns_types::protocol::types::Question,
    timeout_secs: f64,
) -> Result<(Message, f64), TransportError> {
    let request = Message::from_question(rand::thread_rng().gen(), question)
        .with_edns(EDNS_UDP_PAYLOAD_SIZE);
    let request_octets = request.into_octets().map_err(TransportError::Serialise)?;

    let started = Instant::now();
    let result = timeout(
        Duration::from_secs_f64(timeout_secs),
        exchange_notimeout(server, &request_octets),
    )
    .await;
    let elapsed_ms = round_to_2dp(started.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(Ok(response)) => Ok((response, elapsed_ms)),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(TransportError::Timeout),
    }
}

async fn exchange_notimeout(
    server: SocketAddr,
    request_octets: &[u8],
) -> Result<Message, TransportError> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(TransportError::Io)?;
    socket.connect(server).await.map_err(TransportError::Io)?;
    socket
        .send(request_octets)
        .await
        .map_err(TransportError::Io)?;

    let mut buf = vec![0u8; 4096];
    let len = socket.recv(&mut buf).await.map_err(TransportError::Io)?;

    Message::from_octets(&buf[..len]).map_err(TransportError::Deserialise)
}

fn round_to_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimal_places() {
        assert_eq!(round_to_2dp(1.23456), 1.23);
        assert_eq!(round_to_2dp(0.0), 0.0);
    }
}
