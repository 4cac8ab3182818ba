//! UDP transport to a room server
//!
//! Every datagram carries one bincode-encoded [`Packet`]. Joining is a
//! request/response exchange on the connected socket; after that a background
//! task keeps reading datagrams and forwards the room traffic to the [`UdpRoom`].

use crate::error::TransportError;
use crate::session::ABNORMAL_CLOSE;
use crate::transport::{Connector, Room, RoomEvent, Transport};
use async_trait::async_trait;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Intent, JoinOptions, Packet};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

const RECV_BUFFER_SIZE: usize = 8192;
const EVENT_QUEUE_SIZE: usize = 256;
const MAX_STALE_READS: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

impl UdpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for UdpConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let server_addr: SocketAddr = endpoint
            .parse()
            .map_err(|_| TransportError::InvalidEndpoint(endpoint.to_string()))?;

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(server_addr).await?;
        info!("UDP socket {} bound for {}", socket.local_addr()?, server_addr);

        Ok(Box::new(UdpTransport {
            socket: Arc::new(socket),
        }))
    }
}

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

async fn send_packet(socket: &UdpSocket, packet: &Packet) -> Result<(), TransportError> {
    let data = serialize(packet)?;
    socket.send(&data).await?;
    Ok(())
}

#[async_trait]
impl Transport for UdpTransport {
    async fn join_or_create(
        &mut self,
        room_name: &str,
        options: JoinOptions,
    ) -> Result<Box<dyn Room>, TransportError> {
        drain_stale(&self.socket);

        let request = Packet::JoinOrCreate {
            room_name: room_name.to_string(),
            options,
        };
        send_packet(&self.socket, &request).await?;

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let session_id = loop {
            let len = self.socket.recv(&mut buffer).await?;
            match deserialize::<Packet>(&buffer[..len]) {
                Ok(Packet::JoinAccepted { session_id }) => break session_id,
                Ok(Packet::JoinRejected { reason }) => {
                    return Err(TransportError::Rejected(reason));
                }
                Ok(_) => debug!("Ignoring packet received before join completed"),
                Err(e) => warn!("Dropping malformed packet: {}", e),
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let receiver = spawn_room_receiver(Arc::clone(&self.socket), tx);

        Ok(Box::new(UdpRoom {
            socket: Arc::clone(&self.socket),
            session_id,
            events: rx,
            receiver,
        }))
    }
}

/// Discards datagrams already queued on the socket, such as a join answer
/// that arrived after an earlier attempt gave up waiting.
fn drain_stale(socket: &UdpSocket) {
    let mut buffer = [0u8; RECV_BUFFER_SIZE];
    let mut dropped = 0;
    for _ in 0..MAX_STALE_READS {
        match socket.try_recv(&mut buffer) {
            Ok(_) => dropped += 1,
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => debug!("Ignoring pending socket error: {}", e),
        }
    }
    if dropped > 0 {
        debug!("Dropped {} stale packets before joining", dropped);
    }
}

/// Reads datagrams until the server says goodbye or the room side drops its
/// receiver. Receive errors are logged and reading goes on.
fn spawn_room_receiver(socket: Arc<UdpSocket>, tx: mpsc::Sender<RoomEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        loop {
            let len = match socket.recv(&mut buffer).await {
                Ok(len) => len,
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    continue;
                }
            };

            let event = match deserialize::<Packet>(&buffer[..len]) {
                Ok(Packet::RoomState(snapshot)) => RoomEvent::State(snapshot),
                Ok(Packet::Message(message)) => RoomEvent::Message(message),
                Ok(Packet::Left { code }) => RoomEvent::Left(code),
                Ok(_) => {
                    debug!("Ignoring unexpected packet in room");
                    continue;
                }
                Err(e) => {
                    warn!("Dropping malformed packet: {}", e);
                    continue;
                }
            };

            let last = matches!(event, RoomEvent::Left(_));
            if tx.send(event).await.is_err() || last {
                break;
            }
        }
    })
}

pub struct UdpRoom {
    socket: Arc<UdpSocket>,
    session_id: String,
    events: mpsc::Receiver<RoomEvent>,
    receiver: JoinHandle<()>,
}

#[async_trait]
impl Room for UdpRoom {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn send(&mut self, intent: &Intent) -> Result<(), TransportError> {
        let data = serialize(&Packet::Intent(intent.clone()))?;
        self.socket.try_send(&data)?;
        Ok(())
    }

    fn try_recv(&mut self) -> Option<RoomEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            // The receiver task is gone without a goodbye from the server.
            Err(TryRecvError::Disconnected) => Some(RoomEvent::Left(ABNORMAL_CLOSE)),
        }
    }

    async fn recv(&mut self) -> Option<RoomEvent> {
        self.events.recv().await
    }

    async fn leave(&mut self) -> Result<(), TransportError> {
        let result = send_packet(&self.socket, &Packet::Leave).await;
        self.receiver.abort();
        self.events.close();
        result
    }
}

impl Drop for UdpRoom {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}
