use strum_macros::{Display, EnumString};

use steer_packet::{MacAddr, SCORE_LOST};

use crate::steering_fsm_trace;

use super::client::ClientEntry;
use super::config::{PROBE_LOSS_TIMEOUT, SCORE_FLOOD_INTERVAL, STATE_TIMEOUT, SteeringMode};
use super::inst::{DriverMessage, Message, SteeringTop};
use super::packet::{close_flood, closed_send};
use super::task::{Timer, TimerType};

/// Per-client steering state.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Display, EnumString)]
pub enum FsmState {
    #[default]
    #[strum(serialize = "Idle")]
    Idle,
    #[strum(serialize = "Confirming")]
    Confirming,
    #[strum(serialize = "Associating")]
    Associating,
    #[strum(serialize = "Associated")]
    Associated,
    #[strum(serialize = "Rejecting")]
    Rejecting,
    #[strum(serialize = "Rejected")]
    Rejected,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Display, EnumString)]
pub enum FsmEvent {
    Associated,
    Disassociated,
    PeerIsWorse,
    PeerNotWorse,
    PeerLostClient,
    CloseClient,
    ClosedClient,
    Timeout,
}

pub type FsmFunc = fn(&mut SteeringTop, &mut ClientEntry) -> Option<FsmState>;

impl FsmState {
    /// Transition table: the action to run and the state to enter.
    /// Blank cells ignore the event.
    pub fn fsm(&self, ev: FsmEvent) -> (FsmFunc, Option<Self>) {
        use FsmEvent::*;
        use FsmState::{
            Associated as StAssociated, Associating, Confirming, Idle, Rejected, Rejecting,
        };

        match self {
            Idle => match ev {
                Associated => (steering_fsm_assoc, Some(StAssociated)),
                Disassociated => (steering_fsm_ignore, None),
                PeerIsWorse => (steering_fsm_close_send, Some(Confirming)),
                PeerNotWorse => (steering_fsm_reject, Some(Rejected)),
                PeerLostClient => (steering_fsm_ignore, Some(Associating)),
                CloseClient => (steering_fsm_close_reject, Some(Rejected)),
                ClosedClient => (steering_fsm_ignore, None),
                Timeout => (steering_fsm_ignore, None),
            },
            Confirming => match ev {
                Associated => (steering_fsm_assoc, Some(StAssociated)),
                Disassociated => (steering_fsm_ignore, None),
                PeerIsWorse => (steering_fsm_close_send, Some(Confirming)),
                // Once committed to closing the client elsewhere, a late
                // PeerNotWorse must not blacklist us.
                PeerNotWorse => (steering_fsm_ignore, None),
                PeerLostClient => (steering_fsm_ignore, None),
                CloseClient => (steering_fsm_ignore, None),
                ClosedClient => (steering_fsm_ignore, Some(Associating)),
                Timeout => (steering_fsm_ignore, Some(Idle)),
            },
            Associating => match ev {
                Associated => (steering_fsm_assoc, Some(StAssociated)),
                Disassociated => (steering_fsm_ignore, Some(Idle)),
                PeerIsWorse => (steering_fsm_close_send, Some(Associating)),
                PeerNotWorse => (steering_fsm_ignore, None),
                PeerLostClient => (steering_fsm_ignore, None),
                CloseClient => (steering_fsm_closed_reject, Some(Rejected)),
                ClosedClient => (steering_fsm_ignore, None),
                Timeout => (steering_fsm_ignore, None),
            },
            StAssociated => match ev {
                Associated => (steering_fsm_ignore, None),
                Disassociated => (steering_fsm_assoc_lost, Some(Idle)),
                PeerIsWorse => (steering_fsm_close_send, Some(StAssociated)),
                PeerNotWorse => (steering_fsm_ignore, None),
                PeerLostClient => (steering_fsm_ignore, None),
                CloseClient => (steering_fsm_kick, Some(Rejecting)),
                ClosedClient => (steering_fsm_ignore, None),
                // The flood timer reschedules itself.
                Timeout => (steering_fsm_ignore, None),
            },
            Rejecting => match ev {
                Associated => (steering_fsm_ignore, None),
                Disassociated => (steering_fsm_closed_send, Some(Rejected)),
                PeerIsWorse => (steering_fsm_recover_close, Some(Confirming)),
                PeerNotWorse => (steering_fsm_ignore, None),
                PeerLostClient => (steering_fsm_recover, Some(Confirming)),
                CloseClient => (steering_fsm_ignore, Some(Rejecting)),
                ClosedClient => (steering_fsm_ignore, None),
                Timeout => (steering_fsm_recover, Some(Associating)),
            },
            Rejected => match ev {
                Associated => (steering_fsm_ignore, None),
                Disassociated => (steering_fsm_ignore, None),
                PeerIsWorse => (steering_fsm_recover_close, Some(Confirming)),
                PeerNotWorse => (steering_fsm_ignore, None),
                PeerLostClient => (steering_fsm_recover_close, Some(Confirming)),
                CloseClient => (steering_fsm_close_retry, Some(Rejected)),
                ClosedClient => (steering_fsm_ignore, None),
                Timeout => (steering_fsm_recover, Some(Associating)),
            },
        }
    }
}

pub fn steering_fsm_ignore(_top: &mut SteeringTop, _ent: &mut ClientEntry) -> Option<FsmState> {
    None
}

/// Start the periodic score flood.
pub fn steering_fsm_assoc(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    ent.timer.flood = Some(steering_flood_timer(top, ent.mac));
    None
}

/// Ask the owning BSS to release the client.
pub fn steering_fsm_close_send(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    close_flood(top, ent);
    None
}

/// A peer holds the client with a better signal: keep it off this BSS.
pub fn steering_fsm_reject(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    blacklist_add(top, ent);
    ent.timer.state_timeout = Some(steering_state_timer(top, ent.mac));
    None
}

pub fn steering_fsm_close_reject(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    close_flood(top, ent);
    blacklist_add(top, ent);
    ent.timer.state_timeout = Some(steering_state_timer(top, ent.mac));
    None
}

/// Acknowledge the close request and keep the client off this BSS.
pub fn steering_fsm_closed_reject(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    closed_send(top, ent);
    blacklist_add(top, ent);
    ent.timer.state_timeout = Some(steering_state_timer(top, ent.mac));
    None
}

/// The client left. Peers learn it from the lost score.
pub fn steering_fsm_assoc_lost(_top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    ent.local_score = SCORE_LOST;
    ent.timer.flood = None;
    None
}

/// A peer asked us to hand over an associated client: blacklist and
/// push it out, politely when possible.
pub fn steering_fsm_kick(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    blacklist_add(top, ent);

    let bss_tm = ent.sta.as_ref().is_some_and(|sta| sta.bss_transition);
    if top.config.mode() == SteeringMode::Suggest || bss_tm {
        let _ = top.dtx.send(DriverMessage::BssTransition {
            sta: ent.mac,
            target: ent.close_bssid,
            channel: ent.remote_channel,
        });
    } else {
        let _ = top.dtx.send(DriverMessage::Disassociate(ent.mac));
    }

    ent.timer.state_timeout = Some(steering_state_timer(top, ent.mac));
    ent.timer.flood = None;
    None
}

/// The kicked client is gone: confirm to the requester.
pub fn steering_fsm_closed_send(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    closed_send(top, ent);
    ent.timer.state_timeout = Some(steering_state_timer(top, ent.mac));
    None
}

/// The owner turned worse or lost the client: lift the blacklist and
/// contend for it again.
pub fn steering_fsm_recover_close(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    blacklist_remove(top, ent);
    close_flood(top, ent);
    ent.timer.state_timeout = None;
    None
}

pub fn steering_fsm_recover(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    blacklist_remove(top, ent);
    ent.timer.state_timeout = None;
    None
}

pub fn steering_fsm_close_retry(top: &mut SteeringTop, ent: &mut ClientEntry) -> Option<FsmState> {
    close_flood(top, ent);
    None
}

fn blacklist_add(top: &mut SteeringTop, ent: &ClientEntry) {
    if top.config.mode() != SteeringMode::Force {
        return;
    }
    let _ = top.dtx.send(DriverMessage::BlacklistAdd(ent.mac));
}

fn blacklist_remove(top: &mut SteeringTop, ent: &ClientEntry) {
    if top.config.mode() != SteeringMode::Force {
        return;
    }
    let _ = top.dtx.send(DriverMessage::BlacklistRemove(ent.mac));
}

fn steering_fsm_change_state(ent: &mut ClientEntry, state: FsmState) {
    ent.prev = ent.state;
    ent.state = state;
}

/// Reconcile the per-client timers with the state so the arming
/// invariants hold after every transition: flood while Associated,
/// state timeout while Rejecting/Rejected, probe loss while not locally
/// associated.
pub fn steering_fsm_timer_set(top: &mut SteeringTop, ent: &mut ClientEntry) {
    use FsmState::*;

    match ent.state {
        Associated => {
            if ent.timer.flood.is_none() {
                ent.timer.flood = Some(steering_flood_timer(top, ent.mac));
            }
        }
        _ => ent.timer.flood = None,
    }

    if !matches!(ent.state, Rejecting | Rejected) {
        ent.timer.state_timeout = None;
    }

    match ent.sta {
        Some(_) => ent.timer.probe_loss = None,
        None => {
            if ent.timer.probe_loss.is_none() {
                ent.timer.probe_loss = Some(steering_probe_loss_timer(top, ent.mac));
            }
        }
    }
}

/// Drive one event through the per-client state machine. The transition
/// action runs before the state is updated, so effects it produces are
/// attributed to the old state.
pub fn steering_fsm(top: &mut SteeringTop, ent: &mut ClientEntry, event: FsmEvent) {
    let (fsm_func, fsm_next_state) = ent.state.fsm(event);

    let next_state = fsm_func(top, ent).or(fsm_next_state);

    if let Some(new_state) = next_state {
        steering_fsm_trace!(
            top.tracing,
            false,
            "client {} {} on {} -> {}",
            ent.mac,
            ent.state,
            event,
            new_state
        );
        if new_state != ent.state {
            steering_fsm_change_state(ent, new_state);
        }
    }

    steering_fsm_timer_set(top, ent);
}

pub fn steering_flood_timer(top: &SteeringTop, mac: MacAddr) -> Timer {
    let tx = top.tx.clone();
    Timer::new(SCORE_FLOOD_INTERVAL, TimerType::Infinite, move || {
        let tx = tx.clone();
        async move {
            tx.send(Message::FloodTimerExpire(mac)).unwrap();
        }
    })
}

pub fn steering_state_timer(top: &SteeringTop, mac: MacAddr) -> Timer {
    let tx = top.tx.clone();
    Timer::once(STATE_TIMEOUT, move || {
        let tx = tx.clone();
        async move {
            tx.send(Message::StateTimeoutExpire(mac)).unwrap();
        }
    })
}

pub fn steering_probe_loss_timer(top: &SteeringTop, mac: MacAddr) -> Timer {
    let tx = top.tx.clone();
    Timer::once(PROBE_LOSS_TIMEOUT, move || {
        let tx = tx.clone();
        async move {
            tx.send(Message::ProbeLossExpire(mac)).unwrap();
        }
    })
}
