/// Steering-specific conditional tracing configuration. Fine-grained
/// switches for packet, event and FSM traces on top of the global
/// tracing subscriber.
#[derive(Debug, Clone, Default)]
pub struct SteeringTracing {
    /// Enable all steering tracing
    pub all: bool,
    /// Packet tracing configuration
    pub packet: PacketTracing,
    /// Event tracing configuration
    pub event: EventConfig,
    /// FSM tracing configuration
    pub fsm: FsmConfig,
}

/// Packet tracing configuration
#[derive(Debug, Clone, Default)]
pub struct PacketTracing {
    pub score: PacketConfig,
    pub close: PacketConfig,
    pub closed: PacketConfig,
    pub all: bool,
}

/// Individual packet kind configuration
#[derive(Debug, Clone, Default)]
pub struct PacketConfig {
    pub enabled: bool,
    pub direction: PacketDirection,
}

/// Packet kinds carried by the steering protocol
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketKind {
    Score,
    Close,
    Closed,
}

/// Packet direction filter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PacketDirection {
    Send,
    Recv,
    #[default]
    Both,
}

/// Event tracing configuration
#[derive(Debug, Clone, Default)]
pub struct EventConfig {
    pub enabled: bool,
}

/// FSM tracing configuration
#[derive(Debug, Clone, Default)]
pub struct FsmConfig {
    pub enabled: bool,
    pub detail: bool,
}

impl SteeringTracing {
    pub fn should_trace_packet(&self, kind: PacketKind, direction: PacketDirection) -> bool {
        if self.all || self.packet.all {
            return true;
        }
        let config = match kind {
            PacketKind::Score => &self.packet.score,
            PacketKind::Close => &self.packet.close,
            PacketKind::Closed => &self.packet.closed,
        };
        config.enabled
            && (config.direction == PacketDirection::Both || config.direction == direction)
    }

    pub fn should_trace_event(&self) -> bool {
        self.all || self.event.enabled
    }

    pub fn should_trace_fsm(&self, detail: bool) -> bool {
        if self.all {
            return true;
        }
        self.fsm.enabled && (!detail || self.fsm.detail)
    }
}

/// Log an info-level message with proto="steering" field
#[macro_export]
macro_rules! steering_info {
    ($($arg:tt)*) => {
        tracing::info!(proto = "steering", $($arg)*)
    };
}

/// Log a warning-level message with proto="steering" field
#[macro_export]
macro_rules! steering_warn {
    ($($arg:tt)*) => {
        tracing::warn!(proto = "steering", $($arg)*)
    };
}

/// Log an error-level message with proto="steering" field
#[macro_export]
macro_rules! steering_error {
    ($($arg:tt)*) => {
        tracing::error!(proto = "steering", $($arg)*)
    };
}

/// Log a debug-level message with proto="steering" field
#[macro_export]
macro_rules! steering_debug {
    ($($arg:tt)*) => {
        tracing::debug!(proto = "steering", $($arg)*)
    };
}

/// Log a trace-level message with proto="steering" field
#[macro_export]
macro_rules! steering_trace {
    ($($arg:tt)*) => {
        tracing::trace!(proto = "steering", $($arg)*)
    };
}

/// Conditional packet tracing macro
#[macro_export]
macro_rules! steering_packet_trace {
    ($tracing:expr, $kind:ident, $direction:ident, $($arg:tt)*) => {
        if $tracing.should_trace_packet(
            $crate::steering::tracing::PacketKind::$kind,
            $crate::steering::tracing::PacketDirection::$direction,
        ) {
            tracing::info!(
                proto = "steering",
                category = "packet",
                packet_kind = stringify!($kind),
                direction = stringify!($direction),
                $($arg)*
            )
        }
    };
}

/// Conditional event tracing macro
#[macro_export]
macro_rules! steering_event_trace {
    ($tracing:expr, $($arg:tt)*) => {
        if $tracing.should_trace_event() {
            tracing::info!(
                proto = "steering",
                category = "event",
                $($arg)*
            )
        }
    };
}

/// Conditional FSM tracing macro
#[macro_export]
macro_rules! steering_fsm_trace {
    ($tracing:expr, $detail:expr, $($arg:tt)*) => {
        if $tracing.should_trace_fsm($detail) {
            tracing::info!(
                proto = "steering",
                category = "fsm",
                detail = $detail,
                $($arg)*
            )
        }
    };
}
