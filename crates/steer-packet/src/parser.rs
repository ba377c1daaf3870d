use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};
use nom_derive::*;
use serde::{Deserialize, Serialize};

use super::util::TlvEmitter;
use super::{MacAddr, SteerParseError, SteerParseResult, SteerTlvType};

/// Steering frame discriminator.
pub const STEER_MAGIC: u8 = 0x30;
/// Protocol version spoken by this implementation. Frames from newer
/// revisions are dropped.
pub const STEER_VERSION: u8 = 0x01;
/// Fixed frame header: magic, version, total length, serial number.
pub const STEER_HDR_LEN: usize = 6;
/// Upper bound on a single emitted frame.
pub const STEER_FRAME_MAX: usize = 1024;
/// Score sentinel: no data, or the sender lost the client.
pub const SCORE_LOST: u16 = 0xFFFF;

/// One steering frame: fixed header followed by TLVs. The total length
/// field covers the entire frame minus the first two octets and is
/// computed on emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerPacket {
    pub version: u8,
    pub serial_number: u16,
    pub tlvs: Vec<SteerTlv>,
}

impl SteerPacket {
    pub fn from(serial_number: u16, tlvs: Vec<SteerTlv>) -> SteerPacket {
        SteerPacket {
            version: STEER_VERSION,
            serial_number,
            tlvs,
        }
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        buf.put_u8(STEER_MAGIC);
        buf.put_u8(self.version);
        buf.put_u16(0);
        buf.put_u16(self.serial_number);
        for tlv in &self.tlvs {
            tlv.tlv_emit(buf);
        }
        // Total length covers the frame minus the first two octets.
        let total_length = (buf.len() - 2) as u16;
        BigEndian::write_u16(&mut buf[2..4], total_length);
    }
}

/// Parse one steering frame. Header-level violations drop the whole
/// frame; a malformed TLV tail drops only the TLVs from that point on.
pub fn parse(input: &[u8]) -> Result<SteerPacket, SteerParseError> {
    if input.len() < STEER_HDR_LEN {
        return Err(SteerParseError::header_truncated(input.len()));
    }
    let magic = input[0];
    if magic != STEER_MAGIC {
        return Err(SteerParseError::invalid_magic(magic));
    }
    let version = input[1];
    if version > STEER_VERSION {
        return Err(SteerParseError::unsupported_version(version, STEER_VERSION));
    }
    let total_length = BigEndian::read_u16(&input[2..4]) as usize;
    let serial_number = BigEndian::read_u16(&input[4..6]);

    let frame_len = total_length + 2;
    if frame_len < STEER_HDR_LEN {
        return Err(SteerParseError::FrameUnderflow {
            declared: frame_len,
        });
    }
    if frame_len > input.len() {
        return Err(SteerParseError::frame_truncated(frame_len, input.len()));
    }

    let tlvs = SteerTlv::parse_tlvs(&input[STEER_HDR_LEN..frame_len]);

    Ok(SteerPacket {
        version,
        serial_number,
        tlvs,
    })
}

#[derive(NomBE)]
pub struct SteerTypeLen {
    pub typ: SteerTlvType,
    pub len: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SteerTlv {
    Score(SteerTlvScore),
    CloseClient(SteerTlvCloseClient),
    ClosedClient(SteerTlvClosedClient),
    Unknown(SteerTlvUnknown),
}

impl SteerTlv {
    pub fn parse_tlv(input: &[u8]) -> SteerParseResult<(&[u8], Self)> {
        let (input, tl) = SteerTypeLen::parse_be(input)?;
        if input.len() < tl.len as usize {
            return Err(SteerParseError::tlv_truncated(tl.len as usize, input.len()));
        }
        if let Some(min) = tl.typ.min_len() {
            if tl.len < min {
                return Err(SteerParseError::invalid_tlv_length(tl.typ, min, tl.len));
            }
        }
        let (tlv, input) = input.split_at(tl.len as usize);
        let val = match tl.typ {
            SteerTlvType::Score => SteerTlvScore::parse_be(tlv)?.1.into(),
            SteerTlvType::CloseClient => SteerTlvCloseClient::parse_be(tlv)?.1.into(),
            SteerTlvType::ClosedClient => SteerTlvClosedClient::parse_be(tlv)?.1.into(),
            SteerTlvType::Unknown(_) => SteerTlvUnknown {
                typ: tl.typ,
                len: tl.len,
                values: tlv.to_vec(),
            }
            .into(),
        };
        Ok((input, val))
    }

    /// Parse TLVs until the region is exhausted. Unknown types are kept
    /// as Unknown entries; a truncated or under-length TLV ends parsing
    /// and the TLVs before it are returned.
    pub fn parse_tlvs(mut input: &[u8]) -> Vec<Self> {
        let mut tlvs = Vec::new();
        while !input.is_empty() {
            match Self::parse_tlv(input) {
                Ok((rest, tlv)) => {
                    tlvs.push(tlv);
                    input = rest;
                }
                Err(_) => break,
            }
        }
        tlvs
    }
}

impl TlvEmitter for SteerTlv {
    fn typ(&self) -> u8 {
        use SteerTlv::*;
        match self {
            Score(v) => v.typ(),
            CloseClient(v) => v.typ(),
            ClosedClient(v) => v.typ(),
            Unknown(v) => v.typ(),
        }
    }

    fn len(&self) -> u8 {
        use SteerTlv::*;
        match self {
            Score(v) => v.len(),
            CloseClient(v) => v.len(),
            ClosedClient(v) => v.len(),
            Unknown(v) => v.len(),
        }
    }

    fn emit(&self, buf: &mut BytesMut) {
        use SteerTlv::*;
        match self {
            Score(v) => v.emit(buf),
            CloseClient(v) => v.emit(buf),
            ClosedClient(v) => v.emit(buf),
            Unknown(v) => v.emit(buf),
        }
    }
}

/// SCORE: the sender's current signal score for a client, flooded
/// periodically while the client is associated there. Smaller is
/// better; SCORE_LOST means the sender lost track of the client.
#[derive(Debug, Default, NomBE, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerTlvScore {
    pub client: MacAddr,
    pub bssid: MacAddr,
    pub score: u16,
    pub assoc_msecs: u32,
}

impl TlvEmitter for SteerTlvScore {
    fn typ(&self) -> u8 {
        SteerTlvType::Score.into()
    }

    fn len(&self) -> u8 {
        18
    }

    fn emit(&self, buf: &mut BytesMut) {
        buf.put(&self.client.octets()[..]);
        buf.put(&self.bssid.octets()[..]);
        buf.put_u16(self.score);
        buf.put_u32(self.assoc_msecs);
    }
}

impl From<SteerTlvScore> for SteerTlv {
    fn from(tlv: SteerTlvScore) -> Self {
        SteerTlv::Score(tlv)
    }
}

/// CLOSE_CLIENT: ask the target BSS to blacklist the client so it moves
/// to the sender. The sender's channel rides along for BSS-Transition
/// hints.
#[derive(Debug, Default, NomBE, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerTlvCloseClient {
    pub client: MacAddr,
    pub bssid: MacAddr,
    pub target: MacAddr,
    pub channel: u8,
}

impl TlvEmitter for SteerTlvCloseClient {
    fn typ(&self) -> u8 {
        SteerTlvType::CloseClient.into()
    }

    fn len(&self) -> u8 {
        19
    }

    fn emit(&self, buf: &mut BytesMut) {
        buf.put(&self.client.octets()[..]);
        buf.put(&self.bssid.octets()[..]);
        buf.put(&self.target.octets()[..]);
        buf.put_u8(self.channel);
    }
}

impl From<SteerTlvCloseClient> for SteerTlv {
    fn from(tlv: SteerTlvCloseClient) -> Self {
        SteerTlv::CloseClient(tlv)
    }
}

/// CLOSED_CLIENT: acknowledgement that the sender has blacklisted the
/// client.
#[derive(Debug, Default, NomBE, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerTlvClosedClient {
    pub client: MacAddr,
    pub bssid: MacAddr,
}

impl TlvEmitter for SteerTlvClosedClient {
    fn typ(&self) -> u8 {
        SteerTlvType::ClosedClient.into()
    }

    fn len(&self) -> u8 {
        12
    }

    fn emit(&self, buf: &mut BytesMut) {
        buf.put(&self.client.octets()[..]);
        buf.put(&self.bssid.octets()[..]);
    }
}

impl From<SteerTlvClosedClient> for SteerTlv {
    fn from(tlv: SteerTlvClosedClient) -> Self {
        SteerTlv::ClosedClient(tlv)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerTlvUnknown {
    pub typ: SteerTlvType,
    pub len: u8,
    pub values: Vec<u8>,
}

impl TlvEmitter for SteerTlvUnknown {
    fn typ(&self) -> u8 {
        self.typ.into()
    }

    fn len(&self) -> u8 {
        self.len
    }

    fn emit(&self, buf: &mut BytesMut) {
        buf.put(&self.values[..]);
    }
}

impl From<SteerTlvUnknown> for SteerTlv {
    fn from(tlv: SteerTlvUnknown) -> Self {
        SteerTlv::Unknown(tlv)
    }
}
