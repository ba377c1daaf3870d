use nom::IResult;
use nom::number::complete::be_u8;
use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SteerTlvType {
    #[default]
    Score = 0,
    CloseClient = 1,
    ClosedClient = 2,
    Unknown(u8),
}

impl SteerTlvType {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, typ) = be_u8(input)?;
        let tlv_type: Self = typ.into();
        Ok((input, tlv_type))
    }

    /// Fixed payload size a TLV of this type must at least carry.
    pub fn min_len(&self) -> Option<u8> {
        use SteerTlvType::*;
        match self {
            Score => Some(18),
            CloseClient => Some(19),
            ClosedClient => Some(12),
            Unknown(_) => None,
        }
    }
}

impl From<SteerTlvType> for u8 {
    fn from(typ: SteerTlvType) -> Self {
        use SteerTlvType::*;
        match typ {
            Score => 0,
            CloseClient => 1,
            ClosedClient => 2,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for SteerTlvType {
    fn from(typ: u8) -> Self {
        use SteerTlvType::*;
        match typ {
            0 => Score,
            1 => CloseClient,
            2 => ClosedClient,
            v => Unknown(v),
        }
    }
}
