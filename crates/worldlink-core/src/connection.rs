//! Connection lifecycle and outbound path
//!
//! A [`Connection`] owns the socket for one server session. The read half
//! goes to a [`FrameReader`] task that feeds the handoff queue; the write
//! half goes to a writer task that owns the send-direction cipher and
//! receives work over a channel. Encryption switch-on travels through that
//! same channel, so frames queued before the switch always leave with plain
//! headers no matter when the writer gets around to them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::crypt::{CipherPair, HeaderCipher};
use crate::error::{Result, WorldlinkError};
use crate::packet::{InPacket, OutPacket};
use crate::queue::BatchQueue;
use crate::reader::FrameReader;
use crate::types::{SessionKey, TrafficCounters};

enum OutboundCommand {
    Frame(OutPacket),
    EnableEncryption(HeaderCipher),
}

/// Cloneable handle onto a connection's outbound channel.
///
/// Handlers and scheduled actions hold one of these instead of the
/// [`Connection`] itself, which stays with whoever will eventually dispose it.
#[derive(Clone)]
pub struct PacketSender {
    outbound: mpsc::UnboundedSender<OutboundCommand>,
    recv_cipher: Arc<Mutex<HeaderCipher>>,
}

impl PacketSender {
    /// Queue a frame for the writer task.
    pub fn send(&self, packet: OutPacket) -> Result<()> {
        self.outbound
            .send(OutboundCommand::Frame(packet))
            .map_err(|_| WorldlinkError::ConnectionClosed)
    }

    /// Derive both header streams from the session key and switch them on.
    ///
    /// The receive side activates immediately; the server will not encrypt
    /// anything before its answer to the frame that prompted this call. The
    /// send side activates in queue order behind any frames already waiting.
    pub fn enable_encryption(&self, session_key: &SessionKey) -> Result<()> {
        let pair = CipherPair::from_session_key(session_key)?;
        *self
            .recv_cipher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = pair.recv;
        self.outbound
            .send(OutboundCommand::EnableEncryption(pair.send))
            .map_err(|_| WorldlinkError::ConnectionClosed)?;
        debug!("Header encryption enabled");
        Ok(())
    }
}

/// One live server connection and its two I/O tasks.
pub struct Connection {
    outbound: mpsc::UnboundedSender<OutboundCommand>,
    recv_cipher: Arc<Mutex<HeaderCipher>>,
    queue: Arc<BatchQueue<InPacket>>,
    counters: Arc<TrafficCounters>,
    shutdown: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl Connection {
    /// Open a TCP connection and start both I/O tasks.
    pub async fn connect(address: &str) -> Result<Self> {
        info!("Connecting to {}", address);
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self::spawn(read_half, write_half))
    }

    /// Start the I/O tasks over an already-established stream pair.
    pub fn spawn<R, W>(read_half: R, write_half: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let recv_cipher = Arc::new(Mutex::new(HeaderCipher::inactive()));
        let queue = Arc::new(BatchQueue::new());
        let counters = Arc::new(TrafficCounters::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let (outbound, commands) = mpsc::unbounded_channel();

        let reader = FrameReader::new(
            read_half,
            Arc::clone(&recv_cipher),
            Arc::clone(&counters),
            Arc::clone(&shutdown),
        );
        let reader_task = tokio::spawn(reader.run(Arc::clone(&queue)));
        let writer_task = tokio::spawn(write_loop(
            write_half,
            commands,
            Arc::clone(&counters),
            Arc::clone(&shutdown),
        ));

        Self {
            outbound,
            recv_cipher,
            queue,
            counters,
            shutdown,
            reader_task,
            writer_task,
        }
    }

    /// Queue a frame for the writer task.
    pub fn send(&self, packet: OutPacket) -> Result<()> {
        self.outbound
            .send(OutboundCommand::Frame(packet))
            .map_err(|_| WorldlinkError::ConnectionClosed)
    }

    /// A cloneable sending handle detached from the connection's lifetime.
    pub fn sender(&self) -> PacketSender {
        PacketSender {
            outbound: self.outbound.clone(),
            recv_cipher: Arc::clone(&self.recv_cipher),
        }
    }

    /// Derive both header streams from the session key and switch them on.
    pub fn enable_encryption(&self, session_key: &SessionKey) -> Result<()> {
        self.sender().enable_encryption(session_key)
    }

    /// Frames decoded by the reader, waiting for the session loop.
    pub fn queue(&self) -> Arc<BatchQueue<InPacket>> {
        Arc::clone(&self.queue)
    }

    pub fn counters(&self) -> Arc<TrafficCounters> {
        Arc::clone(&self.counters)
    }

    /// True once the reader task has ended, whether by peer close or error.
    pub fn is_closed(&self) -> bool {
        self.reader_task.is_finished()
    }

    /// Tear the connection down and wait for both tasks to end.
    pub async fn dispose(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.reader_task.abort();
        self.writer_task.abort();
        let _ = self.reader_task.await;
        let _ = self.writer_task.await;
        debug!("Connection disposed");
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut stream: W,
    mut commands: mpsc::UnboundedReceiver<OutboundCommand>,
    counters: Arc<TrafficCounters>,
    shutdown: Arc<AtomicBool>,
) {
    let mut cipher = HeaderCipher::inactive();
    while let Some(command) = commands.recv().await {
        match command {
            OutboundCommand::EnableEncryption(active) => cipher = active,
            OutboundCommand::Frame(packet) => {
                let opcode = packet.opcode();
                let frame = match packet.finalize(&mut cipher) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!("Could not encode {}: {}", opcode, err);
                        continue;
                    }
                };
                if let Err(err) = stream.write_all(&frame).await {
                    if !shutdown.load(Ordering::Relaxed) {
                        warn!("Send of {} failed: {}", opcode, err);
                    }
                    break;
                }
                if let Err(err) = stream.flush().await {
                    if !shutdown.load(Ordering::Relaxed) {
                        warn!("Flush after {} failed: {}", opcode, err);
                    }
                    break;
                }
                counters.add_sent(frame.len() as u64);
                trace!("Sent {} ({} bytes)", opcode, frame.len());
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes;
    use crate::types::OpCode;
    use std::str::FromStr;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::time::timeout;

    const SESSION_KEY_HEX: &str =
        "DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF";

    fn ping(sequence: u32) -> OutPacket {
        let mut packet = OutPacket::new(opcodes::CMSG_PING);
        packet.write_u32(sequence);
        packet.write_u32(0);
        packet
    }

    async fn read_exactly(stream: &mut (impl AsyncRead + Unpin), len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        timeout(Duration::from_secs(1), stream.read_exact(&mut bytes))
            .await
            .expect("read timed out")
            .expect("read failed");
        bytes
    }

    #[tokio::test]
    async fn send_produces_a_framed_packet() {
        let (client, mut server) = tokio::io::duplex(256);
        let (read_half, write_half) = tokio::io::split(client);
        let connection = Connection::spawn(read_half, write_half);

        connection.send(ping(7)).unwrap();

        let frame = read_exactly(&mut server, 14).await;
        // Size 12 big-endian, command 0x01DC as 32-bit little-endian.
        assert_eq!(&frame[..6], &[0x00, 0x0C, 0xDC, 0x01, 0x00, 0x00]);
        assert_eq!(&frame[6..10], &[0x07, 0x00, 0x00, 0x00]);
        assert_eq!(connection.counters().sent(), 14);
        connection.dispose().await;
    }

    #[tokio::test]
    async fn frames_queued_before_activation_stay_plain() {
        let key = SessionKey::from_str(SESSION_KEY_HEX).unwrap();
        let (client, mut server) = tokio::io::duplex(256);
        let (read_half, write_half) = tokio::io::split(client);
        let connection = Connection::spawn(read_half, write_half);

        connection.send(ping(1)).unwrap();
        connection.enable_encryption(&key).unwrap();
        connection.send(ping(2)).unwrap();

        let plain = read_exactly(&mut server, 14).await;
        assert_eq!(&plain[..6], &[0x00, 0x0C, 0xDC, 0x01, 0x00, 0x00]);

        let mut sealed = read_exactly(&mut server, 14).await;
        assert_ne!(&sealed[..6], &[0x00, 0x0C, 0xDC, 0x01, 0x00, 0x00]);

        // The server's receive stream runs the same keystream as our send
        // side and must recover the exact header.
        let mut server_side = CipherPair::from_session_key(&key).unwrap();
        server_side.send.apply(&mut sealed[..6]);
        assert_eq!(&sealed[..6], &[0x00, 0x0C, 0xDC, 0x01, 0x00, 0x00]);
        assert_eq!(&sealed[6..10], &[0x02, 0x00, 0x00, 0x00]);

        connection.dispose().await;
    }

    #[tokio::test]
    async fn inbound_frames_land_in_the_queue() {
        let (client, server) = tokio::io::duplex(256);
        let (read_half, write_half) = tokio::io::split(client);
        let connection = Connection::spawn(read_half, write_half);
        let queue = connection.queue();

        let (server_read, mut server_write) = tokio::io::split(server);
        let mut bytes = crate::header::ServerHeader {
            opcode: OpCode::new(0x01EC),
            payload_len: 8,
        }
        .encode()
        .unwrap();
        bytes.extend_from_slice(&[0u8; 8]);
        server_write.write_all(&bytes).await.unwrap();

        timeout(Duration::from_secs(1), async {
            while queue.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("frame never arrived");

        let packets = queue.drain_all();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].opcode(), OpCode::new(0x01EC));

        connection.dispose().await;
        drop(server_read);
    }

    #[tokio::test]
    async fn peer_close_marks_the_connection_closed() {
        let (client, server) = tokio::io::duplex(64);
        let (read_half, write_half) = tokio::io::split(client);
        let connection = Connection::spawn(read_half, write_half);

        drop(server);
        timeout(Duration::from_secs(1), async {
            while !connection.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("close never observed");

        connection.dispose().await;
    }
}
