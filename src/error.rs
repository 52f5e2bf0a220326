use thiserror::Error as ThisError;

/// Failures of the messaging session (MQTT over TLS).
#[derive(ThisError, Debug)]
pub enum ChannelError {
    #[error("MQTT session is not connected")]
    NotConnected,

    #[error("MQTT connection failed: {0}")]
    Connection(String),

    #[error("MQTT broker refused the session: {0}")]
    Refused(String),

    #[error("timed out waiting for MQTT connection acknowledgement")]
    ConnectTimeout,

    #[error("MQTT request queue rejected {operation} on {topic}: {reason}")]
    Request {
        operation: &'static str,
        topic: String,
        reason: String,
    },
}

/// Failures of the network link under the messaging session.
#[derive(ThisError, Debug)]
pub enum LinkError {
    #[error("network interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("no operational network interface with an address")]
    Down,

    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] nix::Error),
}

/// Failures of the physical servo and contact drivers.
#[derive(ThisError, Debug)]
pub enum DriverError {
    #[error("unexpected pin value '{0}'")]
    InvalidPinValue(String),

    #[error("servo angle {0} outside calibrated range 0..=180")]
    AngleOutOfRange(u16),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Startup failures of an endpoint process.
///
/// Once the tick loop runs nothing is surfaced through this type; every
/// steady-state failure is logged and retried in place.
#[derive(ThisError, Debug)]
pub enum EndpointError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read TLS material from {path}: {source}")]
    TlsMaterial {
        path: String,
        source: std::io::Error,
    },

    #[error("driver initialization failed: {0}")]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("unreadable shadow document: {0}")]
    Shadow(#[from] crate::shadow::DecodeError),

    #[error(transparent)]
    InstanceLock(#[from] crate::instance_lock::InstanceLockError),
}

pub type Result<T> = std::result::Result<T, EndpointError>;
