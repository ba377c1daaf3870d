use std::time::{Duration, Instant};

use steer_packet::{
    MacAddr, SCORE_LOST, SteerPacket, SteerTlv, SteerTlvCloseClient, SteerTlvClosedClient,
    SteerTlvScore,
};

use crate::{steering_debug, steering_packet_trace};

use super::client::{ClientEntry, Clients};
use super::fsm::{FsmEvent, FsmState, steering_fsm};
use super::inst::{PacketMessage, SteeringTop};

/// Demultiplex a received frame to the per-TLV handlers.
pub fn process_packet(
    top: &mut SteeringTop,
    clients: &mut Clients,
    packet: SteerPacket,
    from: MacAddr,
) {
    for tlv in packet.tlvs {
        match tlv {
            SteerTlv::Score(tlv) => {
                top.stats.rx.score += 1;
                steering_packet_trace!(top.tracing, Score, Recv, "{} from {}", tlv, from);
                score_recv(top, clients, tlv);
            }
            SteerTlv::CloseClient(tlv) => {
                top.stats.rx.close += 1;
                steering_packet_trace!(top.tracing, Close, Recv, "{} from {}", tlv, from);
                close_recv(top, clients, tlv);
            }
            SteerTlv::ClosedClient(tlv) => {
                top.stats.rx.closed += 1;
                steering_packet_trace!(top.tracing, Closed, Recv, "{} from {}", tlv, from);
                closed_recv(top, clients, tlv);
            }
            SteerTlv::Unknown(tlv) => {
                top.stats.rx.unknown += 1;
                steering_debug!("unknown TLV {} from {}", tlv, from);
            }
        }
    }
}

/// A peer advertised its score for a client. Arbitrate who owns the
/// client, then compare scores.
pub fn score_recv(top: &mut SteeringTop, clients: &mut Clients, tlv: SteerTlvScore) {
    let ent = clients.ensure(tlv.client);
    let now = Instant::now();

    // Estimate, on the local clock, when the sender last saw the client
    // associate. Underflow means an association predating our clock
    // epoch; such a claim only wins when no owner is known at all.
    let adjusted = now.checked_sub(Duration::from_millis(u64::from(tlv.assoc_msecs)));

    if tlv.bssid != ent.remote_bssid {
        let newer = match (adjusted, ent.remote_time) {
            (Some(adjusted), Some(remote)) => adjusted > remote,
            (Some(_), None) => true,
            (None, None) => true,
            (None, Some(_)) => false,
        };
        if newer {
            ent.remote_bssid = tlv.bssid;
            ent.remote_time = adjusted;
            // The client associated elsewhere more recently than
            // anything we knew: if we still hold it, it roamed away.
            if ent.state == FsmState::Associated {
                steering_fsm(top, ent, FsmEvent::Disassociated);
            }
        }
    }

    let event = if tlv.score == SCORE_LOST {
        FsmEvent::PeerLostClient
    } else if ent.local_score < tlv.score {
        FsmEvent::PeerIsWorse
    } else {
        FsmEvent::PeerNotWorse
    };
    steering_fsm(top, ent, event);
}

/// A peer asks some BSS to blacklist a client. Only honored when the
/// target is us.
pub fn close_recv(top: &mut SteeringTop, clients: &mut Clients, tlv: SteerTlvCloseClient) {
    if tlv.target != top.config.bssid {
        return;
    }
    let Some(ent) = clients.get_mut(&tlv.client) else {
        steering_debug!("CLOSE_CLIENT for unknown client {}", tlv.client);
        return;
    };
    ent.close_bssid = tlv.bssid;
    ent.remote_channel = tlv.channel;
    steering_fsm(top, ent, FsmEvent::CloseClient);
}

/// A peer confirms it blacklisted a client we asked about.
pub fn closed_recv(top: &mut SteeringTop, clients: &mut Clients, tlv: SteerTlvClosedClient) {
    let Some(ent) = clients.get_mut(&tlv.client) else {
        return;
    };
    steering_fsm(top, ent, FsmEvent::ClosedClient);
}

fn frame_sn_next(top: &mut SteeringTop) -> u16 {
    let sn = *top.frame_sn;
    *top.frame_sn = top.frame_sn.wrapping_add(1);
    sn
}

/// Unicast one frame. Nothing is ever sent to our own address.
pub fn frame_send(top: &mut SteeringTop, tlvs: Vec<SteerTlv>, dst: MacAddr) {
    if dst == top.config.own_addr() {
        return;
    }
    let packet = SteerPacket::from(frame_sn_next(top), tlvs);
    let _ = top.ptx.send(PacketMessage::Send(packet, dst));
}

/// Unicast-flood one frame to every configured peer except ourselves.
pub fn frame_flood(top: &mut SteeringTop, tlvs: Vec<SteerTlv>) {
    let packet = SteerPacket::from(frame_sn_next(top), tlvs);
    let own_addr = top.config.own_addr();
    for peer in top.config.peers() {
        if *peer == own_addr {
            continue;
        }
        let _ = top.ptx.send(PacketMessage::Send(packet.clone(), *peer));
    }
}

/// Flood our SCORE for a client to the mobility domain. A lost score is
/// never advertised.
pub fn score_flood(top: &mut SteeringTop, ent: &ClientEntry) {
    if ent.local_score == SCORE_LOST {
        return;
    }
    let assoc_msecs = ent
        .association_time
        .map_or(0, |t| u32::try_from(t.elapsed().as_millis()).unwrap_or(u32::MAX));
    let tlv = SteerTlvScore {
        client: ent.mac,
        bssid: top.config.bssid,
        score: ent.local_score,
        assoc_msecs,
    };
    steering_packet_trace!(top.tracing, Score, Send, "{}", tlv);
    top.stats.tx.score += 1;
    frame_flood(top, vec![tlv.into()]);
}

/// Ask the current owner to release the client.
pub fn close_flood(top: &mut SteeringTop, ent: &ClientEntry) {
    let tlv = SteerTlvCloseClient {
        client: ent.mac,
        bssid: top.config.bssid,
        target: ent.remote_bssid,
        channel: top.config.channel,
    };
    steering_packet_trace!(top.tracing, Close, Send, "{}", tlv);
    top.stats.tx.close += 1;
    frame_flood(top, vec![tlv.into()]);
}

/// Acknowledge a close request towards the BSS that asked for it.
pub fn closed_send(top: &mut SteeringTop, ent: &ClientEntry) {
    let tlv = SteerTlvClosedClient {
        client: ent.mac,
        bssid: top.config.bssid,
    };
    steering_packet_trace!(top.tracing, Closed, Send, "{}", tlv);
    top.stats.tx.closed += 1;
    frame_send(top, vec![tlv.into()], ent.close_bssid);
}
