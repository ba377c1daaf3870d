pub mod inst;
pub use inst::{DriverMessage, Message, PacketMessage, Steering};

pub mod client;
pub use client::{ClientEntry, Clients, StaHandle};

pub mod fsm;
pub use fsm::{FsmEvent, FsmState};

pub mod packet;

pub mod network;

pub mod socket;

pub mod config;

pub mod show;

pub mod task;

pub mod tracing;
