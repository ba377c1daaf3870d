use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use socket2::Socket;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use steer_packet::{MacAddr, SCORE_LOST, SteerPacket};

use crate::{steering_event_trace, steering_info};

use super::client::{Clients, StaHandle, score_from_rssi};
use super::config::SteeringConfig;
use super::fsm::{FsmEvent, FsmState, steering_fsm, steering_probe_loss_timer};
use super::network::{read_packet, write_packet};
use super::packet::{process_packet, score_flood};
use super::show::{DisplayRequest, ShowChannel};
use super::socket::steering_socket;
use super::task::Task;
use super::tracing::SteeringTracing;

/// Events feeding the steering context. Driver callbacks, parsed
/// frames and timer expiries all arrive here and are processed one at a
/// time.
#[derive(Debug)]
pub enum Message {
    Recv(SteerPacket, MacAddr),
    Associate(MacAddr, i32, StaHandle),
    Disassociate(MacAddr),
    Probe(MacAddr, MacAddr, i32),
    FloodTimerExpire(MacAddr),
    StateTimeoutExpire(MacAddr),
    ProbeLossExpire(MacAddr),
}

/// Outbound frames to the transport writer.
#[derive(Debug)]
pub enum PacketMessage {
    Send(SteerPacket, MacAddr),
}

/// Actuator requests towards the Wi-Fi driver glue.
#[derive(Debug, PartialEq)]
pub enum DriverMessage {
    BlacklistAdd(MacAddr),
    BlacklistRemove(MacAddr),
    Disassociate(MacAddr),
    BssTransition {
        sta: MacAddr,
        target: MacAddr,
        channel: u8,
    },
}

#[derive(Debug, Default, Serialize)]
pub struct DirStats {
    pub score: u64,
    pub close: u64,
    pub closed: u64,
    pub unknown: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub rx: DirStats,
    pub tx: DirStats,
}

/// One steering context, bound to the local BSS.
pub struct Steering {
    pub tx: UnboundedSender<Message>,
    pub rx: UnboundedReceiver<Message>,
    pub ptx: UnboundedSender<PacketMessage>,
    /// Taken by the transport writer at init.
    pub prx: Option<UnboundedReceiver<PacketMessage>>,
    pub dtx: UnboundedSender<DriverMessage>,
    pub config: SteeringConfig,
    pub tracing: SteeringTracing,
    pub clients: Clients,
    /// Serial number of the next emitted frame. Wraps freely.
    pub frame_sn: u16,
    pub stats: Stats,
    pub show: ShowChannel,
    pub sock: Option<Arc<AsyncFd<Socket>>>,
    pub read_task: Option<Task<()>>,
    pub write_task: Option<Task<()>>,
}

/// Split borrow of the context handed to the FSM and packet handlers,
/// leaving the client registry separately borrowable.
pub struct SteeringTop<'a> {
    pub tx: &'a UnboundedSender<Message>,
    pub ptx: &'a UnboundedSender<PacketMessage>,
    pub dtx: &'a UnboundedSender<DriverMessage>,
    pub config: &'a SteeringConfig,
    pub tracing: &'a SteeringTracing,
    pub frame_sn: &'a mut u16,
    pub stats: &'a mut Stats,
}

impl Steering {
    pub fn new(config: SteeringConfig, dtx: UnboundedSender<DriverMessage>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ptx, prx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            ptx,
            prx: Some(prx),
            dtx,
            config,
            tracing: SteeringTracing::default(),
            clients: Clients::default(),
            frame_sn: 0,
            stats: Stats::default(),
            show: ShowChannel::new(),
            sock: None,
            read_task: None,
            write_task: None,
        }
    }

    /// Open the L2 transport and start the I/O tasks. With mode off or
    /// an empty mobility domain the context comes up inert.
    pub fn init(&mut self) -> anyhow::Result<()> {
        if !self.config.enabled() {
            steering_info!(
                "steering inert: mode {} with {} peers",
                self.config.mode(),
                self.config.peers().len()
            );
            return Ok(());
        }

        let ifindex = nix::net::if_::if_nametoindex(self.config.bridge.as_str())
            .with_context(|| format!("interface {} not found", self.config.bridge))?;

        let sock = Arc::new(AsyncFd::new(steering_socket(ifindex)?)?);
        self.sock = Some(sock.clone());

        let tx = self.tx.clone();
        let rsock = sock.clone();
        self.read_task = Some(Task::spawn(async move {
            read_packet(rsock, tx).await;
        }));

        let prx = self.prx.take().context("transport already started")?;
        self.write_task = Some(Task::spawn(async move {
            write_packet(sock, prx, ifindex).await;
        }));

        steering_info!(
            "steering up on {} bssid {} mode {}",
            self.config.bridge,
            self.config.bssid,
            self.config.mode()
        );
        Ok(())
    }

    /// Stop the I/O tasks, close the socket and release every client
    /// entry. Timers are cancelled by dropping their handles with the
    /// entries.
    pub fn deinit(&mut self) {
        self.clients.clear();
        self.read_task = None;
        self.write_task = None;
        self.sock = None;
    }

    pub fn top(&mut self) -> (SteeringTop<'_>, &mut Clients) {
        let top = SteeringTop {
            tx: &self.tx,
            ptx: &self.ptx,
            dtx: &self.dtx,
            config: &self.config,
            tracing: &self.tracing,
            frame_sn: &mut self.frame_sn,
            stats: &mut self.stats,
        };
        (top, &mut self.clients)
    }

    pub fn process_msg(&mut self, msg: Message) {
        if !self.config.enabled() {
            return;
        }
        match msg {
            Message::Recv(packet, from) => {
                let (mut top, clients) = self.top();
                process_packet(&mut top, clients, packet, from);
            }
            Message::Associate(mac, rssi, sta) => self.assoc_recv(mac, rssi, sta),
            Message::Disassociate(mac) => self.disassoc_recv(mac),
            Message::Probe(mac, target, rssi) => self.probe_recv(mac, target, rssi),
            Message::FloodTimerExpire(mac) => {
                let (mut top, clients) = self.top();
                let Some(ent) = clients.get_mut(&mac) else {
                    return;
                };
                if ent.state != FsmState::Associated {
                    return;
                }
                score_flood(&mut top, ent);
            }
            Message::StateTimeoutExpire(mac) => {
                let (mut top, clients) = self.top();
                let Some(ent) = clients.get_mut(&mac) else {
                    return;
                };
                ent.timer.state_timeout = None;
                steering_fsm(&mut top, ent, FsmEvent::Timeout);
            }
            Message::ProbeLossExpire(mac) => self.probe_loss_expire(mac),
        }
    }

    pub async fn event_loop(&mut self) {
        loop {
            tokio::select! {
                Some(msg) = self.rx.recv() => {
                    self.process_msg(msg);
                }
                Some(msg) = self.show.rx.recv() => {
                    self.process_show_msg(msg).await;
                }
            }
        }
    }

    async fn process_show_msg(&self, msg: DisplayRequest) {
        let output = if msg.detail {
            super::show::show_detail(self, msg.json)
        } else {
            super::show::show(self, msg.json)
        };
        let _ = msg.resp.send(output).await;
    }

    /// Driver reported a new local association.
    fn assoc_recv(&mut self, mac: MacAddr, rssi: i32, sta: StaHandle) {
        steering_event_trace!(self.tracing, "associate {} rssi {}", mac, rssi);
        let (mut top, clients) = self.top();
        let ent = clients.ensure(mac);
        ent.association_time = Some(Instant::now());
        ent.local_score = score_from_rssi(rssi);
        ent.remote_bssid = MacAddr::default();
        ent.remote_time = None;
        ent.sta = Some(sta);
        ent.timer.probe_loss = None;
        steering_fsm(&mut top, ent, FsmEvent::Associated);
        score_flood(&mut top, ent);
    }

    /// Driver reported the client left the local BSS.
    fn disassoc_recv(&mut self, mac: MacAddr) {
        steering_event_trace!(self.tracing, "disassociate {}", mac);
        let (mut top, clients) = self.top();
        let Some(ent) = clients.get_mut(&mac) else {
            return;
        };
        steering_fsm(&mut top, ent, FsmEvent::Disassociated);
        ent.sta = None;
        ent.association_time = None;
        ent.remote_bssid = MacAddr::default();
        ent.remote_time = None;
        if ent.timer.probe_loss.is_none() {
            ent.timer.probe_loss = Some(steering_probe_loss_timer(&top, mac));
        }
    }

    /// Probe request seen by the driver. Entries appear for probes
    /// directed at us; probes to other BSSIDs only refresh known
    /// clients.
    fn probe_recv(&mut self, mac: MacAddr, target: MacAddr, rssi: i32) {
        let (mut top, clients) = self.top();
        if clients.get(&mac).is_none() && target != top.config.bssid {
            return;
        }
        let ent = clients.ensure(mac);
        let score = score_from_rssi(rssi);
        let changed = score != ent.local_score;
        ent.local_score = score;

        if ent.state == FsmState::Associated {
            if changed {
                score_flood(&mut top, ent);
            }
            return;
        }

        match &ent.timer.probe_loss {
            Some(timer) => timer.refresh(),
            None => ent.timer.probe_loss = Some(steering_probe_loss_timer(&top, mac)),
        }
    }

    /// No probe for a while: the local score is gone. Entries nobody
    /// claims any more are reaped.
    fn probe_loss_expire(&mut self, mac: MacAddr) {
        let (_top, clients) = self.top();
        let Some(ent) = clients.get_mut(&mac) else {
            return;
        };
        if ent.is_associated() {
            return;
        }
        ent.local_score = SCORE_LOST;
        ent.timer.probe_loss = None;
        if ent.state == FsmState::Idle && ent.remote_bssid.is_zero() {
            clients.remove(&mac);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::unbounded_channel;

    use steer_packet::{SteerTlvCloseClient, SteerTlvClosedClient, SteerTlvScore};

    use super::*;
    use crate::steering::config::SteeringMode;

    fn mac(last: u8) -> MacAddr {
        MacAddr::from([0x02, 0, 0, 0, 0, last])
    }

    fn config(bssid: MacAddr, mode: SteeringMode, peers: Vec<MacAddr>) -> SteeringConfig {
        SteeringConfig {
            bridge: "br-test".into(),
            bssid,
            own_addr: None,
            channel: 1,
            net_steering_mode: mode,
            mobility_domain: peers,
        }
    }

    struct Node {
        steering: Steering,
        prx: UnboundedReceiver<PacketMessage>,
        drx: UnboundedReceiver<DriverMessage>,
    }

    fn node(last: u8, mode: SteeringMode, peers: Vec<MacAddr>) -> Node {
        let (dtx, drx) = unbounded_channel();
        let mut steering = Steering::new(config(mac(last), mode, peers), dtx);
        let prx = steering.prx.take().unwrap();
        Node { steering, prx, drx }
    }

    fn sta() -> StaHandle {
        StaHandle {
            aid: 1,
            bss_transition: false,
        }
    }

    fn state(node: &Node, client: MacAddr) -> FsmState {
        node.steering.clients.get(&client).unwrap().state
    }

    /// Move every queued frame from one node onto the other's event
    /// input, as the wire would.
    fn deliver(from: &mut Node, to: &mut Node) {
        let src = from.steering.config.bssid;
        while let Ok(PacketMessage::Send(packet, dst)) = from.prx.try_recv() {
            assert_ne!(dst, src, "frame addressed to the sender itself");
            if dst == to.steering.config.bssid {
                to.steering.process_msg(Message::Recv(packet, src));
            }
        }
    }

    fn recv_score(node: &mut Node, from: MacAddr, client: MacAddr, score: u16, assoc_msecs: u32) {
        let tlv = SteerTlvScore {
            client,
            bssid: from,
            score,
            assoc_msecs,
        };
        node.steering
            .process_msg(Message::Recv(SteerPacket::from(1, vec![tlv.into()]), from));
    }

    #[tokio::test]
    async fn test_roam_handoff() {
        let peers = vec![mac(0xA), mac(0xB)];
        let mut a = node(0xA, SteeringMode::Force, peers.clone());
        let mut b = node(0xB, SteeringMode::Force, peers.clone());
        let k = mac(0x01);

        // K associates to A at -40; A floods its score.
        a.steering.process_msg(Message::Associate(k, -40, sta()));
        assert_eq!(state(&a, k), FsmState::Associated);

        // B has recently heard K probe at -30.
        b.steering.process_msg(Message::Probe(k, mac(0xB), -30));

        // A's SCORE reaches B: B is better and contends for the client.
        deliver(&mut a, &mut b);
        assert_eq!(state(&b, k), FsmState::Confirming);

        // B's CLOSE reaches A: A blacklists and kicks the client.
        deliver(&mut b, &mut a);
        assert_eq!(state(&a, k), FsmState::Rejecting);
        assert_eq!(a.drx.try_recv().unwrap(), DriverMessage::BlacklistAdd(k));
        assert_eq!(a.drx.try_recv().unwrap(), DriverMessage::Disassociate(k));

        // K leaves A; A acknowledges with CLOSED and holds the reject.
        a.steering.process_msg(Message::Disassociate(k));
        assert_eq!(state(&a, k), FsmState::Rejected);

        deliver(&mut a, &mut b);
        assert_eq!(state(&b, k), FsmState::Associating);

        // K associates to B.
        b.steering.process_msg(Message::Associate(k, -30, sta()));
        assert_eq!(state(&b, k), FsmState::Associated);
    }

    #[tokio::test]
    async fn test_peer_not_worse_rejects() {
        let mut a = node(0xA, SteeringMode::Force, vec![mac(0xA), mac(0xB)]);
        let k = mac(0x01);

        // A heard K probe weakly; B floods a better score.
        a.steering.process_msg(Message::Probe(k, mac(0xA), -40));
        recv_score(&mut a, mac(0xB), k, 30, 1000);

        assert_eq!(state(&a, k), FsmState::Rejected);
        assert_eq!(a.drx.try_recv().unwrap(), DriverMessage::BlacklistAdd(k));
        let ent = a.steering.clients.get(&k).unwrap();
        assert!(ent.timer.state_timeout.is_some());
        assert_eq!(ent.remote_bssid, mac(0xB));

        // State timeout: blacklist lifted, the client may try us again.
        a.steering.process_msg(Message::StateTimeoutExpire(k));
        assert_eq!(state(&a, k), FsmState::Associating);
        assert_eq!(a.drx.try_recv().unwrap(), DriverMessage::BlacklistRemove(k));
        assert!(a.steering.clients.get(&k).unwrap().timer.state_timeout.is_none());
    }

    #[tokio::test]
    async fn test_probe_loss_reaps_unclaimed_entry() {
        let mut a = node(0xA, SteeringMode::Force, vec![mac(0xA), mac(0xB)]);
        let k = mac(0x01);

        a.steering.process_msg(Message::Probe(k, mac(0xA), -50));
        assert!(a.steering.clients.get(&k).is_some());

        a.steering.process_msg(Message::ProbeLossExpire(k));
        assert!(a.steering.clients.get(&k).is_none());
    }

    #[tokio::test]
    async fn test_probe_loss_clears_score_of_claimed_entry() {
        let mut a = node(0xA, SteeringMode::Force, vec![mac(0xA), mac(0xB)]);
        let k = mac(0x01);

        // Probe then a worse peer score: A contends, B owns the client.
        a.steering.process_msg(Message::Probe(k, mac(0xA), -50));
        recv_score(&mut a, mac(0xB), k, 60, 1000);
        assert_eq!(state(&a, k), FsmState::Confirming);
        while a.prx.try_recv().is_ok() {}

        a.steering.process_msg(Message::ProbeLossExpire(k));
        let ent = a.steering.clients.get(&k).unwrap();
        assert_eq!(ent.local_score, SCORE_LOST);

        // With the score lost, nothing is flooded for this client.
        let (mut top, clients) = a.steering.top();
        let ent = clients.get(&k).unwrap();
        score_flood(&mut top, ent);
        assert!(a.prx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_competing_closes() {
        let peers = vec![mac(0xA), mac(0xB), mac(0xC)];
        let mut a = node(0xA, SteeringMode::Force, peers);
        let k = mac(0x01);

        // A lost the client to B earlier: Rejected, B owns it.
        a.steering.process_msg(Message::Probe(k, mac(0xA), -40));
        recv_score(&mut a, mac(0xB), k, 30, 10);
        assert_eq!(state(&a, k), FsmState::Rejected);
        assert_eq!(a.drx.try_recv().unwrap(), DriverMessage::BlacklistAdd(k));
        while a.prx.try_recv().is_ok() {}

        // C claims it lost the client. The claim is older than B's, so
        // B stays the owner and A contends with a CLOSE towards B.
        recv_score(&mut a, mac(0xC), k, SCORE_LOST, 60_000);
        assert_eq!(state(&a, k), FsmState::Confirming);
        assert_eq!(a.drx.try_recv().unwrap(), DriverMessage::BlacklistRemove(k));
        assert_eq!(a.steering.clients.get(&k).unwrap().remote_bssid, mac(0xB));

        // B degrades below us: a fresh CLOSE goes out again.
        recv_score(&mut a, mac(0xB), k, 50, 10);
        assert_eq!(state(&a, k), FsmState::Confirming);

        let mut closes_to_b = 0;
        while let Ok(PacketMessage::Send(packet, dst)) = a.prx.try_recv() {
            if dst == mac(0xB) {
                closes_to_b += packet
                    .tlvs
                    .iter()
                    .filter(|tlv| matches!(tlv, steer_packet::SteerTlv::CloseClient(_)))
                    .count();
            }
        }
        assert_eq!(closes_to_b, 2);

        // Any CLOSED moves us on to Associating.
        let closed = SteerTlvClosedClient {
            client: k,
            bssid: mac(0xB),
        };
        a.steering.process_msg(Message::Recv(
            SteerPacket::from(2, vec![closed.into()]),
            mac(0xB),
        ));
        assert_eq!(state(&a, k), FsmState::Associating);
    }

    #[tokio::test]
    async fn test_suggest_mode_bss_transition() {
        let mut a = node(0xA, SteeringMode::Suggest, vec![mac(0xA), mac(0xB)]);
        let k = mac(0x01);

        a.steering.process_msg(Message::Associate(
            k,
            -40,
            StaHandle {
                aid: 1,
                bss_transition: true,
            },
        ));

        let close = SteerTlvCloseClient {
            client: k,
            bssid: mac(0xB),
            target: mac(0xA),
            channel: 40,
        };
        a.steering
            .process_msg(Message::Recv(SteerPacket::from(1, vec![close.into()]), mac(0xB)));

        assert_eq!(state(&a, k), FsmState::Rejecting);
        // No blacklist in suggest mode; a polite BSS-Transition request
        // towards the asking BSS instead of a deauth.
        assert_eq!(
            a.drx.try_recv().unwrap(),
            DriverMessage::BssTransition {
                sta: k,
                target: mac(0xB),
                channel: 40,
            }
        );
        assert!(a.drx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_for_other_target_ignored() {
        let mut a = node(0xA, SteeringMode::Force, vec![mac(0xA), mac(0xB)]);
        let k = mac(0x01);

        a.steering.process_msg(Message::Associate(k, -40, sta()));
        let close = SteerTlvCloseClient {
            client: k,
            bssid: mac(0xB),
            target: mac(0xC),
            channel: 1,
        };
        a.steering
            .process_msg(Message::Recv(SteerPacket::from(1, vec![close.into()]), mac(0xB)));
        assert_eq!(state(&a, k), FsmState::Associated);
    }

    #[tokio::test]
    async fn test_flood_excludes_own_address() {
        let mut a = node(0xA, SteeringMode::Force, vec![mac(0xA), mac(0xB), mac(0xC)]);
        a.steering.process_msg(Message::Associate(mac(0x01), -40, sta()));

        let mut dsts = vec![];
        while let Ok(PacketMessage::Send(_, dst)) = a.prx.try_recv() {
            dsts.push(dst);
        }
        assert_eq!(dsts, vec![mac(0xB), mac(0xC)]);
    }

    #[tokio::test]
    async fn test_off_mode_inert() {
        let mut a = node(0xA, SteeringMode::Off, vec![mac(0xA), mac(0xB)]);
        a.steering.process_msg(Message::Associate(mac(0x01), -40, sta()));
        assert!(a.steering.clients.is_empty());
        assert!(a.prx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_roam_away_detected_from_newer_score() {
        let mut a = node(0xA, SteeringMode::Force, vec![mac(0xA), mac(0xB)]);
        let k = mac(0x01);

        a.steering.process_msg(Message::Associate(k, -40, sta()));
        while a.prx.try_recv().is_ok() {}

        // B reports a fresher association: the client roamed away while
        // we still held it. We fall out of Associated and, with our
        // stale score, stay out of the client's way.
        recv_score(&mut a, mac(0xB), k, 35, 5);
        let ent = a.steering.clients.get(&k).unwrap();
        assert_eq!(ent.remote_bssid, mac(0xB));
        assert_ne!(ent.state, FsmState::Associated);
        assert!(ent.timer.flood.is_none());
    }
}
