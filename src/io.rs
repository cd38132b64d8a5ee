use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::canvas::{LayerAddress, PixelEdit};
use crate::components::history::{BatchKind, BatchPayload, ChangeBatch, CollabSink};
use crate::error::{Result, SurfaceError};

/// Magic header of an edit packet
const PACKET_MAGIC: &str = "PSE1";

/// Wire form of one local per-pixel batch, sent to collaboration peers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditPacket {
    magic: String,
    pub kind: BatchKind,
    pub label: String,
    pub address: LayerAddress,
    pub edits: Vec<PixelEdit>,
}

impl EditPacket {
    pub fn new(kind: BatchKind, label: String, address: LayerAddress, edits: Vec<PixelEdit>) -> Self {
        Self {
            magic: PACKET_MAGIC.to_string(),
            kind,
            label,
            address,
            edits,
        }
    }

    /// Packet for a per-pixel batch. Snapshot batches are not sent to peers.
    pub fn from_batch(batch: &ChangeBatch) -> Option<Self> {
        match &batch.payload {
            BatchPayload::Edits { target, edits } => {
                Some(Self::new(batch.kind, batch.label.clone(), target.address, edits.clone()))
            }
            BatchPayload::Layer(_) | BatchPayload::Canvas(_) => None,
        }
    }

    fn check(self) -> Result<Self> {
        if self.magic != PACKET_MAGIC {
            return Err(SurfaceError::InvalidPacket(format!("unknown magic {:?}", self.magic)));
        }
        if let Some(edit) = self.edits.iter().find(|e| e.old_color == e.new_color) {
            return Err(SurfaceError::InvalidPacket(format!(
                "no-op edit at ({}, {})",
                edit.x, edit.y
            )));
        }
        Ok(self)
    }
}

pub fn encode_packet(packet: &EditPacket) -> Result<Vec<u8>> {
    Ok(bincode::serialize(packet)?)
}

pub fn decode_packet(bytes: &[u8]) -> Result<EditPacket> {
    let packet: EditPacket = bincode::deserialize(bytes)?;
    packet.check()
}

/// Stream a packet to a peer connection.
pub fn write_packet<W: Write>(writer: W, packet: &EditPacket) -> Result<()> {
    bincode::serialize_into(writer, packet)?;
    Ok(())
}

pub fn read_packet<R: Read>(reader: R) -> Result<EditPacket> {
    let packet: EditPacket = bincode::deserialize_from(reader)?;
    packet.check()
}

/// Collaboration sink that encodes every local batch and hands the bytes to
/// the host's transport.
pub struct PacketSink<F: FnMut(Vec<u8>)> {
    send: F,
}

impl<F: FnMut(Vec<u8>)> PacketSink<F> {
    pub fn new(send: F) -> Self {
        Self { send }
    }
}

impl<F: FnMut(Vec<u8>)> CollabSink for PacketSink<F> {
    fn broadcast(&mut self, batch: &ChangeBatch) {
        let Some(packet) = EditPacket::from_batch(batch) else { return };
        match encode_packet(&packet) {
            Ok(bytes) => (self.send)(bytes),
            Err(e) => log::warn!("Dropping edit packet for {}: {}", batch.label, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelColor;
    use pretty_assertions::assert_eq;

    fn packet() -> EditPacket {
        EditPacket::new(
            BatchKind::Draw,
            "Pencil".into(),
            LayerAddress::new(0, 1),
            vec![
                PixelEdit {
                    x: 3,
                    y: 4,
                    old_color: PixelColor::Transparent,
                    new_color: PixelColor::rgb(255, 0, 0),
                },
                PixelEdit {
                    x: 5,
                    y: 4,
                    old_color: PixelColor::Rgba([1, 2, 3, 4]),
                    new_color: PixelColor::Transparent,
                },
            ],
        )
    }

    #[test]
    fn packet_survives_the_wire() {
        let bytes = encode_packet(&packet()).unwrap();
        assert_eq!(decode_packet(&bytes).unwrap(), packet());

        let mut stream = Vec::new();
        write_packet(&mut stream, &packet()).unwrap();
        assert_eq!(read_packet(stream.as_slice()).unwrap(), packet());
    }

    #[test]
    fn rejects_foreign_and_truncated_packets() {
        let mut foreign = packet();
        foreign.magic = "XXXX".into();
        let bytes = encode_packet(&foreign).unwrap();
        assert!(matches!(decode_packet(&bytes), Err(SurfaceError::InvalidPacket(_))));

        let bytes = encode_packet(&packet()).unwrap();
        assert!(matches!(decode_packet(&bytes[..bytes.len() - 3]), Err(SurfaceError::Packet(_))));
    }

    #[test]
    fn rejects_no_op_edits() {
        let mut bad = packet();
        bad.edits[0].new_color = PixelColor::Transparent;
        let bytes = encode_packet(&bad).unwrap();
        assert!(matches!(decode_packet(&bytes), Err(SurfaceError::InvalidPacket(_))));
    }
}
