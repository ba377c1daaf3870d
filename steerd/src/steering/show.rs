use std::fmt::Write;

use serde::Serialize;
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender};

use steer_packet::MacAddr;

use super::Steering;

/// Request for operational state, answered with rendered text or JSON.
pub struct DisplayRequest {
    pub detail: bool,
    pub json: bool,
    pub resp: Sender<String>,
}

pub struct ShowChannel {
    pub tx: UnboundedSender<DisplayRequest>,
    pub rx: UnboundedReceiver<DisplayRequest>,
}

impl ShowChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

#[derive(Serialize)]
struct ClientBrief {
    client: String,
    state: String,
    score: u16,
    owner: String,
    timeout: u64,
}

#[derive(Serialize)]
struct ClientDetail {
    client: String,
    state: String,
    score: u16,
    owner: String,
    close_bssid: String,
    close_channel: u8,
    associated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    assoc_secs: Option<u64>,
    timeout: u64,
}

fn show_mac(mac: MacAddr) -> String {
    if mac.is_zero() {
        "none".to_string()
    } else {
        mac.to_string()
    }
}

pub fn show(top: &Steering, json: bool) -> String {
    let mut clients: Vec<ClientBrief> = vec![];

    for (_, ent) in top.clients.iter() {
        let timeout = ent
            .timer
            .state_timeout
            .as_ref()
            .map_or(0, |timer| timer.rem_sec());
        clients.push(ClientBrief {
            client: ent.mac.to_string(),
            state: ent.state.to_string(),
            score: ent.local_score,
            owner: show_mac(ent.remote_bssid),
            timeout,
        });
    }

    if json {
        return serde_json::to_string(&clients).unwrap();
    }

    let mut buf = String::with_capacity(64 + clients.len() * 80);
    buf.push_str("Client             State        Score   Owner              Timeout\n");
    for ent in &clients {
        writeln!(
            buf,
            "{:<19}{:<13}{:<8}{:<19}{}",
            ent.client, ent.state, ent.score, ent.owner, ent.timeout,
        )
        .unwrap();
    }

    buf
}

pub fn show_detail(top: &Steering, json: bool) -> String {
    let mut clients: Vec<ClientDetail> = vec![];

    for (_, ent) in top.clients.iter() {
        let timeout = ent
            .timer
            .state_timeout
            .as_ref()
            .map_or(0, |timer| timer.rem_sec());
        clients.push(ClientDetail {
            client: ent.mac.to_string(),
            state: ent.state.to_string(),
            score: ent.local_score,
            owner: show_mac(ent.remote_bssid),
            close_bssid: show_mac(ent.close_bssid),
            close_channel: ent.remote_channel,
            associated: ent.is_associated(),
            assoc_secs: ent.association_time.map(|t| t.elapsed().as_secs()),
            timeout,
        });
    }

    if json {
        return serde_json::to_string_pretty(&clients).unwrap();
    }

    let mut buf = String::with_capacity(512);
    for ent in &clients {
        writeln!(buf, " {}", ent.client).unwrap();
        writeln!(
            buf,
            "    State: {}, Score: {}, Owner: {}",
            ent.state, ent.score, ent.owner
        )
        .unwrap();
        writeln!(
            buf,
            "    Close BSS: {} (channel {})",
            ent.close_bssid, ent.close_channel
        )
        .unwrap();
        if let Some(secs) = ent.assoc_secs {
            writeln!(buf, "    Associated for {}s", secs).unwrap();
        }
        if ent.timeout > 0 {
            writeln!(buf, "    State timeout in {}s", ent.timeout).unwrap();
        }
        writeln!(buf).unwrap();
    }

    writeln!(
        buf,
        "Rx: {} score, {} close, {} closed, {} unknown",
        top.stats.rx.score, top.stats.rx.close, top.stats.rx.closed, top.stats.rx.unknown
    )
    .unwrap();
    writeln!(
        buf,
        "Tx: {} score, {} close, {} closed",
        top.stats.tx.score, top.stats.tx.close, top.stats.tx.closed
    )
    .unwrap();

    buf
}
