//! UDP exchange with a fixed per-attempt timeout and a bounded number of attempts.
//!
//! Every attempt binds its own socket and drops it when the attempt ends, so a
//! late reply to a timed-out attempt can never be read by the next one. The
//! same packet (and therefore the same transaction id) is resent on every
//! attempt and the timeout is never scaled between attempts.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::{encode_query, DnsError, Message, RecordType};

// http://www.dnsflagday.net/2020/
const MAX_DATAGRAM: usize = 1232;

pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub server: SocketAddrV4,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl TransportConfig {
    pub fn new(server: Ipv4Addr) -> Self {
        Self {
            server: SocketAddrV4::new(server, DEFAULT_PORT),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// A reply and how it was obtained.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub response: Bytes,
    pub attempts: u32,
    /// Time between sending the successful attempt and receiving its reply.
    pub elapsed: Duration,
}

impl Exchange {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

enum State {
    Idle,
    Awaiting {
        socket: UdpSocket,
        started: Instant,
        deadline: Instant,
    },
    Succeeded(Exchange),
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct Transport {
    config: TransportConfig,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Encodes, sends and decodes a single query.
    pub async fn lookup(
        &self,
        name: &str,
        type_: RecordType,
    ) -> Result<(Message, Exchange), DnsError> {
        let packet = encode_query(name, type_)?;
        let id = query_id(&packet)?;

        let exchange = self.send(&packet).await?;
        let message = Message::decode_response(&exchange.response, id)?;

        Ok((message, exchange))
    }

    /// Sends `packet` until a reply carrying the same transaction id arrives
    /// or `max_retries` attempts have timed out.
    #[instrument(level = "debug", skip_all, fields(server = %self.config.server))]
    pub async fn send(&self, packet: &[u8]) -> Result<Exchange, DnsError> {
        let id = query_id(packet)?;
        let timeout = self.config.timeout;
        Instant::now()
            .checked_add(timeout)
            .ok_or(DnsError::InvalidTimeout(timeout))?;

        let max = self.config.max_retries;
        let mut attempts = 0;
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle if attempts >= max => State::Exhausted,
                State::Idle => {
                    attempts += 1;
                    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
                    socket.send_to(packet, self.config.server).await?;
                    debug!(attempt = attempts, id, "query sent");

                    let started = Instant::now();
                    let deadline = started
                        .checked_add(timeout)
                        .ok_or(DnsError::InvalidTimeout(timeout))?;
                    State::Awaiting {
                        socket,
                        started,
                        deadline,
                    }
                }
                State::Awaiting {
                    socket,
                    started,
                    deadline,
                } => match self.await_reply(&socket, id, deadline).await? {
                    Some(response) => State::Succeeded(Exchange {
                        response,
                        attempts,
                        elapsed: started.elapsed(),
                    }),
                    None => {
                        warn!(
                            attempt = attempts,
                            max_retries = max,
                            ?timeout,
                            "attempt timed out"
                        );
                        State::Idle
                    }
                },
                State::Succeeded(exchange) => {
                    info!(
                        attempts = exchange.attempts,
                        elapsed = ?exchange.elapsed,
                        "response received"
                    );
                    return Ok(exchange);
                }
                State::Exhausted => return Err(DnsError::TimeoutExceeded { attempts }),
            };
        }
    }

    /// Waits for a datagram from the server carrying `id`. Anything else is
    /// discarded and waiting resumes against the same deadline.
    async fn await_reply(
        &self,
        socket: &UdpSocket,
        id: u16,
        deadline: Instant,
    ) -> Result<Option<Bytes>, DnsError> {
        let server = SocketAddr::V4(self.config.server);
        let mut buf = [0; MAX_DATAGRAM];

        loop {
            let (len, from) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => return Ok(None),
            };

            if from != server {
                debug!(%from, "discarding datagram from unexpected peer");
                continue;
            }

            match buf[..len] {
                [hi, lo, ..] if u16::from_be_bytes([hi, lo]) == id => {
                    return Ok(Some(Bytes::copy_from_slice(&buf[..len])));
                }
                [hi, lo, ..] => {
                    debug!(
                        expected = id,
                        actual = u16::from_be_bytes([hi, lo]),
                        "discarding datagram with stale transaction id"
                    );
                }
                _ => debug!(len, "discarding runt datagram"),
            }
        }
    }
}

fn query_id(packet: &[u8]) -> Result<u16, DnsError> {
    match packet {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(DnsError::malformed(0, "query shorter than its id")),
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    async fn peer() -> (UdpSocket, SocketAddrV4) {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let SocketAddr::V4(addr) = socket.local_addr().unwrap() else {
            unreachable!()
        };
        (socket, addr)
    }

    fn transport(server: SocketAddrV4, max_retries: u32) -> Transport {
        Transport::new(TransportConfig {
            server,
            timeout: TIMEOUT,
            max_retries,
        })
    }

    fn with_id(packet: &[u8], id: u16) -> Vec<u8> {
        let mut ret = packet.to_vec();
        ret[..2].copy_from_slice(&id.to_be_bytes());
        ret
    }

    #[tokio::test]
    async fn silent_server_exhausts_every_attempt() {
        let (server, addr) = peer().await;
        let packet = encode_query("example.com", RecordType::A).unwrap();

        let started = std::time::Instant::now();
        let err = transport(addr, 3).send(&packet).await.unwrap_err();

        assert!(matches!(err, DnsError::TimeoutExceeded { attempts: 3 }));
        assert!(started.elapsed() >= TIMEOUT * 3);

        let mut buf = [0; MAX_DATAGRAM];
        for _ in 0..3 {
            let len = timeout(TIMEOUT, server.recv(&mut buf)).await.unwrap().unwrap();
            assert_eq!(&buf[..len], &packet[..]);
        }
        assert!(timeout(TIMEOUT, server.recv(&mut buf)).await.is_err());
    }

    #[tokio::test]
    async fn zero_retries_never_sends() {
        let (server, addr) = peer().await;
        let packet = encode_query("example.com", RecordType::A).unwrap();

        let err = transport(addr, 0).send(&packet).await.unwrap_err();

        assert!(matches!(err, DnsError::TimeoutExceeded { attempts: 0 }));
        let mut buf = [0; MAX_DATAGRAM];
        assert!(timeout(TIMEOUT, server.recv(&mut buf)).await.is_err());
    }

    #[tokio::test]
    async fn stale_id_is_skipped_within_same_attempt() {
        let (server, addr) = peer().await;
        let packet = encode_query("example.com", RecordType::A).unwrap();
        let id = query_id(&packet).unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0; MAX_DATAGRAM];
            let (len, from) = server.recv_from(&mut buf).await.unwrap();
            let query = &buf[..len];
            server
                .send_to(&with_id(query, id.wrapping_add(1)), from)
                .await
                .unwrap();
            server.send_to(query, from).await.unwrap();
        });

        let exchange = transport(addr, 3).send(&packet).await.unwrap();
        responder.await.unwrap();

        assert_eq!(exchange.attempts, 1);
        assert_eq!(exchange.retries(), 0);
        assert_eq!(&exchange.response[..], &packet[..]);
        assert!(exchange.elapsed < TIMEOUT);
    }

    #[tokio::test]
    async fn retry_resends_identical_packet() {
        let (server, addr) = peer().await;
        let packet = encode_query("example.com", RecordType::Ns).unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0; MAX_DATAGRAM];
            let (len, _) = server.recv_from(&mut buf).await.unwrap();
            let first = buf[..len].to_vec();

            let (len, from) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], &first[..]);
            server.send_to(&buf[..len], from).await.unwrap();
        });

        let exchange = transport(addr, 3).send(&packet).await.unwrap();
        responder.await.unwrap();

        assert_eq!(exchange.attempts, 2);
        assert_eq!(exchange.retries(), 1);
    }

    #[tokio::test]
    async fn reply_from_other_peer_is_ignored() {
        let (server, addr) = peer().await;
        let (impostor, _) = peer().await;
        let packet = encode_query("example.com", RecordType::A).unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0; MAX_DATAGRAM];
            let (len, from) = server.recv_from(&mut buf).await.unwrap();
            let query = buf[..len].to_vec();

            let mut forged = query.clone();
            forged.push(0xff);
            impostor.send_to(&forged, from).await.unwrap();
            server.send_to(&query, from).await.unwrap();
        });

        let exchange = transport(addr, 3).send(&packet).await.unwrap();
        responder.await.unwrap();

        assert_eq!(exchange.attempts, 1);
        assert_eq!(&exchange.response[..], &packet[..]);
    }

    #[tokio::test]
    async fn oversized_timeout_is_rejected_before_sending() {
        let (server, addr) = peer().await;
        let packet = encode_query("example.com", RecordType::A).unwrap();

        for too_long in [Duration::MAX, Duration::from_secs(10u64.pow(19))] {
            let transport = Transport::new(TransportConfig {
                server: addr,
                timeout: too_long,
                max_retries: 3,
            });

            let err = transport.send(&packet).await.unwrap_err();
            assert!(matches!(err, DnsError::InvalidTimeout(t) if t == too_long));
        }

        let mut buf = [0; MAX_DATAGRAM];
        assert!(timeout(TIMEOUT, server.recv(&mut buf)).await.is_err());
    }

    #[tokio::test]
    async fn short_packet_is_rejected_without_io() {
        let (_server, addr) = peer().await;
        let err = transport(addr, 3).send(&[0x01]).await.unwrap_err();
        assert!(matches!(err, DnsError::Malformed { .. }));
    }
}
