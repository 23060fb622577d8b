// Stateful byte-to-packet reassembler.
//
// A `Framer` is single-producer (whoever calls `feed`) and single-consumer
// (whoever drains `packets()`). It owns a preallocated buffer sized to
// `PACKET_MAX_SIZE` and a write index `idx`; `feed` appends newly read bytes,
// then repeatedly pulls complete packets out of the front of the buffer,
// compacting it left after each one.
//
// Packets are delivered on a bounded channel (capacity 10) so a caller that
// reads the socket and a caller that drains packets can be different threads
// without a reader blocking on a slow consumer for more than a few packets.
// A fatal decode error (version or length mismatch) is delivered once on a
// single-slot error channel and ends the framer's useful life — the caller
// must tear down the connection.

use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::error::RelayError;
use crate::packet::{Packet, PACKET_HEADER_SIZE, PACKET_MAX_SIZE};

const PACKET_CHANNEL_CAPACITY: usize = 10;
const SCRATCH_WINDOW: usize = 256;

pub struct Framer {
    buf: Vec<u8>,
    idx: usize,
    packet_tx: SyncSender<Packet>,
    error_tx: SyncSender<RelayError>,
}

impl Framer {
    /// Create a framer along with the receivers for its packet and error
    /// channels. The framer itself is fed bytes via `feed`.
    pub fn new() -> (Self, Receiver<Packet>, Receiver<RelayError>) {
        let (packet_tx, packet_rx) = mpsc::sync_channel(PACKET_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::sync_channel(1);
        (
            Self {
                buf: vec![0u8; PACKET_MAX_SIZE],
                idx: 0,
                packet_tx,
                error_tx,
            },
            packet_rx,
            error_rx,
        )
    }

    /// Append freshly read bytes and pull out every complete packet now
    /// available, publishing each to the packet channel. Returns `Ok(())`
    /// unless a fatal decode error occurred, in which case the error is also
    /// published to the error channel and the framer should not be fed again.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), RelayError> {
        self.append(data);
        loop {
            match self.pull() {
                Ok(Some(packet)) => {
                    // A full channel means the consumer has fallen far behind;
                    // block briefly rather than silently dropping a packet.
                    if let Err(TrySendError::Full(packet)) = self.packet_tx.try_send(packet) {
                        let _ = self.packet_tx.send(packet);
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    let _ = self.error_tx.try_send(e.clone());
                    return Err(e);
                }
            }
        }
    }

    fn append(&mut self, data: &[u8]) {
        let available = self.buf.len() - self.idx;
        let n = available.min(data.len());
        self.buf[self.idx..self.idx + n].copy_from_slice(&data[..n]);
        if n < data.len() {
            self.buf.extend_from_slice(&data[n..]);
        }
        self.idx += data.len();
    }

    fn pull(&mut self) -> Result<Option<Packet>, RelayError> {
        if self.idx < PACKET_HEADER_SIZE {
            return Ok(None);
        }
        if self.buf[0] != crate::packet::VERSION {
            return Err(RelayError::VersionMismatch);
        }
        let declared_len = Packet::declared_payload_len(&self.buf[..PACKET_HEADER_SIZE])
            .expect("idx >= PACKET_HEADER_SIZE guarantees a full header is present");
        let full_len = usize::from(declared_len) + PACKET_HEADER_SIZE;
        if full_len >= PACKET_MAX_SIZE {
            return Err(RelayError::PacketLengthMismatch);
        }
        if full_len > self.idx {
            return Ok(None);
        }
        let packet = Packet::decode(&self.buf[..full_len])?;
        self.buf.copy_within(full_len..self.idx, 0);
        self.idx -= full_len;
        Ok(Some(packet))
    }

    /// Drive this framer to completion from a blocking `Read`, publishing
    /// packets and at most one fatal error, then returning. Used by callers
    /// that want a dedicated reader thread; connections that combine reading
    /// and dispatch on one thread call `feed` directly instead.
    pub fn drive<R: io::Read>(mut self, mut reader: R) {
        let mut scratch = [0u8; SCRATCH_WINDOW];
        loop {
            match reader.read(&mut scratch) {
                Ok(0) => return,
                Ok(n) => {
                    if self.feed(&scratch[..n]).is_err() {
                        return;
                    }
                }
                Err(_) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PacketType;
    use crate::types::Encoding;

    fn encode(payload: &[u8]) -> Vec<u8> {
        Packet::construct(Encoding::String, PacketType(0), payload)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn partial_header_emits_nothing() {
        let (mut framer, packets, errors) = Framer::new();
        framer.feed(&[0x01, 0x82]).unwrap();
        assert!(packets.try_recv().is_err());
        assert!(errors.try_recv().is_err());
    }

    #[test]
    fn single_packet_with_empty_payload() {
        let (mut framer, packets, _errors) = Framer::new();
        framer.feed(&encode(b"")).unwrap();
        let packet = packets.try_recv().unwrap();
        assert_eq!(packet.payload(), b"");
    }

    #[test]
    fn single_packet_with_payload() {
        let (mut framer, packets, _errors) = Framer::new();
        framer.feed(&encode(b"Hello")).unwrap();
        let packet = packets.try_recv().unwrap();
        assert_eq!(packet.payload(), b"Hello");
    }

    #[test]
    fn two_packets_rechunked_arbitrarily() {
        let wire = [encode(b"Hello"), encode(b"Hello")].concat();
        let (mut framer, packets, _errors) = Framer::new();
        for chunk in [&wire[0..3], &wire[3..7], &wire[7..]] {
            framer.feed(chunk).unwrap();
        }
        assert_eq!(packets.try_recv().unwrap().payload(), b"Hello");
        assert_eq!(packets.try_recv().unwrap().payload(), b"Hello");
        assert!(packets.try_recv().is_err());
    }

    #[test]
    fn sequence_of_packets_yielded_in_order() {
        let wire: Vec<u8> = [b"first".as_slice(), b"second", b"third"]
            .iter()
            .flat_map(|p| encode(p))
            .collect();
        let (mut framer, packets, _errors) = Framer::new();
        framer.feed(&wire).unwrap();
        assert_eq!(packets.try_recv().unwrap().payload(), b"first");
        assert_eq!(packets.try_recv().unwrap().payload(), b"second");
        assert_eq!(packets.try_recv().unwrap().payload(), b"third");
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let mut wire = encode(b"x");
        wire[0] = 2;
        let (mut framer, _packets, errors) = Framer::new();
        let err = framer.feed(&wire).unwrap_err();
        assert_eq!(err, RelayError::VersionMismatch);
        assert_eq!(errors.try_recv().unwrap(), RelayError::VersionMismatch);
    }

    #[test]
    fn oversize_length_is_fatal() {
        let mut header = vec![crate::packet::VERSION, 0, 0, 0];
        let oversize_len = (PACKET_MAX_SIZE - PACKET_HEADER_SIZE) as u16;
        header[2..4].copy_from_slice(&oversize_len.to_be_bytes());
        let (mut framer, _packets, _errors) = Framer::new();
        let err = framer.feed(&header).unwrap_err();
        assert_eq!(err, RelayError::PacketLengthMismatch);
    }

    #[test]
    fn growth_past_preallocated_size_on_pathological_small_reads() {
        let wire = encode(&vec![7u8; 500]);
        let (mut framer, packets, _errors) = Framer::new();
        for byte in &wire {
            framer.feed(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(packets.try_recv().unwrap().payload(), vec![7u8; 500]);
    }
}
