use std::fmt::{Display, Formatter, Result};

use super::*;

impl Display for SteerPacket {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "Steering frame: version {} serial 0x{:04x}",
            self.version, self.serial_number
        )?;
        for tlv in &self.tlvs {
            write!(f, "\n  {}", tlv)?;
        }
        Ok(())
    }
}

impl Display for SteerTlv {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        use SteerTlv::*;
        match self {
            Score(v) => write!(f, "{}", v),
            CloseClient(v) => write!(f, "{}", v),
            ClosedClient(v) => write!(f, "{}", v),
            Unknown(v) => write!(f, "{}", v),
        }
    }
}

impl Display for SteerTlvScore {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "SCORE client {} from {} score 0x{:04x} assoc {}ms",
            self.client, self.bssid, self.score, self.assoc_msecs
        )
    }
}

impl Display for SteerTlvCloseClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "CLOSE_CLIENT client {} from {} target {} channel {}",
            self.client, self.bssid, self.target, self.channel
        )
    }
}

impl Display for SteerTlvClosedClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "CLOSED_CLIENT client {} by {}",
            self.client, self.bssid
        )
    }
}

impl Display for SteerTlvUnknown {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "UNKNOWN type {} len {} [{}]",
            u8::from(self.typ),
            self.len,
            hex::encode(&self.values)
        )
    }
}
