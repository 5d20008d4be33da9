//! RealFlight is an RC flight simulator that exposes a SOAP interface, RealFlight Link,
//! through which an external program can replace the transmitter and fly the loaded aircraft.
//!
//! RealFlightLink is a control link for that interface. It allows developers to:
//!
//! * Take control of the simulated aircraft away from its built-in controller.
//! * Translate motion intents (velocities and yaw rate) into the 12 normalized RC channels
//!   the simulator expects.
//! * Exchange the channel vector for the aircraft state on every cycle.
//! * Decode that state into a [TelemetryRecord] and append it to a telemetry log.
//!
//! The entry point is [ControlLink]. A motion-sequencing layer (take off, move a distance,
//! land) is expected to sit on top of it and drive it from a single thread.
//!
//! ```no_run
//! use realflight_link::{ControlLink, LinkError, MotionIntent};
//!
//! fn main() -> Result<(), LinkError> {
//!     let mut link = ControlLink::new()?;
//!     link.connect()?;
//!
//!     let telemetry = link.set_motion(&MotionIntent::forward(1.0))?;
//!     println!("altitude above ground: {} m", telemetry.altitude_agl);
//!
//!     link.disconnect()?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

pub mod channels;
pub mod configuration;
pub mod decoders;
pub(crate) mod encoders;
pub mod link;
pub(crate) mod soap_client;
pub(crate) mod statistics;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
pub(crate) mod tests;

pub use channels::{
    CHANNEL_COUNT, ChannelVector, ConversionScales, MotionIntent, NEUTRAL_CHANNELS,
    STARTUP_CHANNELS, convert,
};
pub use configuration::{CommanderDefaults, Configuration};
pub use decoders::{
    AircraftState, decode_aircraft_state, decode_channel_values, decode_telemetry,
    extract_element,
};
pub use link::{ConnectionState, ControlLink, LinkOperation};
pub use statistics::Statistics;
pub use telemetry::{
    CsvTelemetrySink, IdlePredicate, MemoryTelemetrySink, TelemetryRecord, TelemetrySink,
};
pub use transport::{SoapTransport, Transport};

pub(crate) use soap_client::SoapResponse;
pub(crate) use statistics::StatisticsEngine;

/// Default address of the RealFlight Link SOAP server.
pub const DEFAULT_SIMULATOR_HOST: &str = "127.0.0.1:18083";

/// Errors raised while talking to the simulator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket level failure: refused connection, reset, read or write timeout.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No connection to the simulator could be obtained in time.
    #[error("simulator unavailable after {waited:?}: {reason}")]
    Unavailable { waited: Duration, reason: String },

    /// The HTTP response could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The simulator answered with a non-success status.
    #[error("SOAP fault (status {status}): {message}")]
    SoapFault { status: u32, message: String },
}

/// Errors returned by [ControlLink] and its building blocks.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The request/response exchange with the simulator failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The simulator response did not contain the expected telemetry.
    #[error("failed to decode {field}: {reason}")]
    Decode { field: String, reason: String },

    /// The operation is not permitted in the current connection state. No request was sent.
    #[error("{operation:?} is not permitted while {state:?}")]
    InvalidState {
        operation: LinkOperation,
        state: ConnectionState,
    },

    /// The telemetry sink could not append a record.
    #[error("telemetry log error: {0}")]
    TelemetryLog(std::io::Error),

    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LinkError {
    pub(crate) fn decode(field: &str, reason: impl Into<String>) -> Self {
        LinkError::Decode {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Extracts the fault detail from a failed SOAP response.
pub(crate) fn decode_fault(response: &SoapResponse) -> TransportError {
    TransportError::SoapFault {
        status: response.status_code,
        message: response.fault_message(),
    }
}
