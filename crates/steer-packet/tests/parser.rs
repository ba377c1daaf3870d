use bytes::BytesMut;
use hex_literal::hex;
use steer_packet::*;

fn mac(s: &str) -> MacAddr {
    s.parse().unwrap()
}

fn score_tlv() -> SteerTlvScore {
    SteerTlvScore {
        client: mac("aa:bb:cc:dd:ee:ff"),
        bssid: mac("11:22:33:44:55:66"),
        score: 0x00A5,
        assoc_msecs: 0x0003_0D40,
    }
}

#[test]
fn test_score_emit_vector() {
    let packet = SteerPacket::from(0x0001, vec![score_tlv().into()]);
    let mut buf = BytesMut::new();
    packet.emit(&mut buf);

    // Header: magic, version, total length (frame minus first two
    // octets), serial number.
    assert_eq!(&buf[0..6], &hex!("30 01 0018 0001"));
    // SCORE TLV.
    assert_eq!(
        &buf[6..],
        &hex!("00 12 aa bb cc dd ee ff 11 22 33 44 55 66 00 a5 00 03 0d 40")
    );
}

#[test]
fn test_score_round_trip() {
    let packet = SteerPacket::from(0x1234, vec![score_tlv().into()]);
    let mut buf = BytesMut::new();
    packet.emit(&mut buf);

    let parsed = parse(&buf).unwrap();
    assert_eq!(parsed, packet);

    // Re-emitted bytes are identical.
    let mut buf2 = BytesMut::new();
    parsed.emit(&mut buf2);
    assert_eq!(buf, buf2);
}

#[test]
fn test_multi_tlv_round_trip() {
    let close = SteerTlvCloseClient {
        client: mac("aa:bb:cc:dd:ee:ff"),
        bssid: mac("11:22:33:44:55:66"),
        target: mac("02:00:00:00:00:01"),
        channel: 36,
    };
    let closed = SteerTlvClosedClient {
        client: mac("aa:bb:cc:dd:ee:ff"),
        bssid: mac("11:22:33:44:55:66"),
    };
    let packet = SteerPacket::from(7, vec![score_tlv().into(), close.into(), closed.into()]);
    let mut buf = BytesMut::new();
    packet.emit(&mut buf);

    let parsed = parse(&buf).unwrap();
    assert_eq!(parsed, packet);
    assert_eq!(parsed.tlvs.len(), 3);
}

#[test]
fn test_empty_frame_accepted() {
    // Header only: total length 4 covers version + lengths + serial.
    let buf = hex!("30 01 0004 0042");
    let packet = parse(&buf).unwrap();
    assert_eq!(packet.serial_number, 0x42);
    assert!(packet.tlvs.is_empty());
}

#[test]
fn test_eight_byte_frame_unknown_tlv() {
    // Header plus a zero-length TLV of unknown type: accepted, the TLV
    // is kept as Unknown with no payload.
    let buf = hex!("30 01 0006 0001 77 00");
    let packet = parse(&buf).unwrap();
    assert_eq!(packet.tlvs.len(), 1);
    match &packet.tlvs[0] {
        SteerTlv::Unknown(tlv) => {
            assert_eq!(u8::from(tlv.typ), 0x77);
            assert!(tlv.values.is_empty());
        }
        tlv => panic!("unexpected TLV {:?}", tlv),
    }
}

#[test]
fn test_eight_byte_frame_underflowed_score() {
    // A zero-length TLV of a known type underflows its minimum and is
    // dropped; the frame itself is still accepted.
    let buf = hex!("30 01 0006 0001 00 00");
    let packet = parse(&buf).unwrap();
    assert!(packet.tlvs.is_empty());
}

#[test]
fn test_unknown_tlv_in_middle() {
    let mut buf = BytesMut::new();
    let unknown = SteerTlvUnknown {
        typ: 0x99.into(),
        len: 3,
        values: vec![1, 2, 3],
    };
    let closed = SteerTlvClosedClient {
        client: mac("aa:bb:cc:dd:ee:ff"),
        bssid: mac("11:22:33:44:55:66"),
    };
    let packet = SteerPacket::from(
        9,
        vec![score_tlv().into(), unknown.into(), closed.clone().into()],
    );
    packet.emit(&mut buf);

    let parsed = parse(&buf).unwrap();
    assert_eq!(parsed.tlvs.len(), 3);
    assert_eq!(parsed.tlvs[0], score_tlv().into());
    assert!(matches!(parsed.tlvs[1], SteerTlv::Unknown(_)));
    assert_eq!(parsed.tlvs[2], closed.into());
}

#[test]
fn test_underflowed_tlv_drops_tail() {
    let mut buf = BytesMut::new();
    let packet = SteerPacket::from(3, vec![score_tlv().into()]);
    packet.emit(&mut buf);

    // Append a CLOSED_CLIENT TLV claiming only 4 payload octets, then a
    // valid SCORE. The undersized TLV ends TLV parsing.
    buf.extend_from_slice(&hex!("02 04 aa bb cc dd"));
    let mut tail = BytesMut::new();
    SteerTlv::from(score_tlv()).tlv_emit(&mut tail);
    buf.extend_from_slice(&tail);
    let total = (buf.len() - 2) as u16;
    buf[2..4].copy_from_slice(&total.to_be_bytes());

    let parsed = parse(&buf).unwrap();
    assert_eq!(parsed.tlvs.len(), 1);
    assert_eq!(parsed.tlvs[0], score_tlv().into());
}

#[test]
fn test_parse_tlv_reports_underflow() {
    // CLOSED_CLIENT claiming 4 payload octets, 12 is the minimum.
    let err = SteerTlv::parse_tlv(&hex!("02 04 aa bb cc dd")).unwrap_err();
    assert_eq!(
        err,
        SteerParseError::invalid_tlv_length(SteerTlvType::ClosedClient, 12, 4)
    );
}

#[test]
fn test_parse_tlv_reports_truncation() {
    // SCORE declaring 18 payload octets with only 2 present.
    let err = SteerTlv::parse_tlv(&hex!("00 12 aa bb")).unwrap_err();
    assert_eq!(err, SteerParseError::tlv_truncated(18, 2));
}

#[test]
fn test_truncated_tlv_drops_tail() {
    // SCORE TLV declaring 18 octets with only 4 present.
    let buf = hex!("30 01 000a 0001 00 12 aa bb cc dd");
    let packet = parse(&buf).unwrap();
    assert!(packet.tlvs.is_empty());
}

#[test]
fn test_declared_length_beyond_buffer() {
    let buf = hex!("30 01 00ff 0001");
    assert_eq!(
        parse(&buf),
        Err(SteerParseError::frame_truncated(0x101, 6))
    );
}

#[test]
fn test_higher_version_dropped() {
    let buf = hex!("30 02 0004 0001");
    assert_eq!(
        parse(&buf),
        Err(SteerParseError::unsupported_version(2, 1))
    );
}

#[test]
fn test_bad_magic_dropped() {
    let buf = hex!("31 01 0004 0001");
    assert_eq!(parse(&buf), Err(SteerParseError::invalid_magic(0x31)));
}

#[test]
fn test_short_header_dropped() {
    let buf = hex!("30 01 00");
    assert_eq!(parse(&buf), Err(SteerParseError::header_truncated(3)));
}

#[test]
fn test_ethernet_padding_ignored() {
    // Trailing zeros past the declared length, as Ethernet minimum-size
    // padding produces, are not parsed as TLVs.
    let mut buf = BytesMut::new();
    let packet = SteerPacket::from(5, vec![score_tlv().into()]);
    packet.emit(&mut buf);
    buf.extend_from_slice(&[0u8; 34]);

    let parsed = parse(&buf).unwrap();
    assert_eq!(parsed.tlvs.len(), 1);
    assert_eq!(parsed.tlvs[0], score_tlv().into());
}

#[test]
fn test_score_lost_sentinel() {
    let mut tlv = score_tlv();
    tlv.score = SCORE_LOST;
    let packet = SteerPacket::from(1, vec![tlv.clone().into()]);
    let mut buf = BytesMut::new();
    packet.emit(&mut buf);

    let parsed = parse(&buf).unwrap();
    match &parsed.tlvs[0] {
        SteerTlv::Score(parsed) => assert_eq!(parsed.score, SCORE_LOST),
        tlv => panic!("unexpected TLV {:?}", tlv),
    }
}
