//! The control link: connection lifecycle, the current channel vector and the
//! exchange cycle.

use std::time::Instant;

use log::{debug, error, info};

use crate::channels::{
    ChannelVector, ConversionScales, MotionIntent, NEUTRAL_CHANNELS, STARTUP_CHANNELS, convert,
};
use crate::decoders::decode_telemetry;
use crate::telemetry::{CsvTelemetrySink, IdlePredicate, TelemetryRecord, TelemetrySink};
use crate::transport::{SoapTransport, Transport};
use crate::{Configuration, LinkError, Statistics};

/// Where the link stands with respect to the simulator's controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// The simulator's own controller flies the aircraft. Initial and final state.
    Disconnected,
    /// The link has taken over and drives the exchange cycle.
    Enabled,
    /// Control is being handed back. Always resolves to `Disconnected`.
    Releasing,
}

/// Operations that depend on the connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOperation {
    Connect,
    SetMotion,
    Poll,
    Reset,
    Disconnect,
}

impl ConnectionState {
    /// Whether `operation` may start in this state.
    ///
    /// Defined for every pair; a `false` means the operation is rejected locally
    /// without any request reaching the simulator.
    pub fn permits(self, operation: LinkOperation) -> bool {
        use ConnectionState::*;
        use LinkOperation::*;

        match (self, operation) {
            (Disconnected, Connect | Reset) => true,
            (Disconnected, SetMotion | Poll | Disconnect) => false,
            (Enabled, SetMotion | Poll | Reset | Disconnect) => true,
            (Enabled, Connect) => false,
            (Releasing, _) => false,
        }
    }
}

/// Drives a RealFlight aircraft from motion intents.
///
/// # Overview
///
/// A [ControlLink] owns the connection state, the channel vector currently sent to the
/// simulator and the most recent telemetry. Every [set_motion](Self::set_motion) or
/// [poll](Self::poll) is one blocking exchange: the channel vector goes out, the aircraft
/// state comes back, is decoded into a [TelemetryRecord] and, unless the channel vector
/// is idle, appended to the telemetry sink.
///
/// The link does no internal locking. Drive it from a single thread, or wrap it in a
/// mutex when a timer and an operator share it.
///
/// ```no_run
/// use std::{thread, time::Duration};
/// use realflight_link::{ControlLink, LinkError, MotionIntent};
///
/// fn main() -> Result<(), LinkError> {
///     let mut link = ControlLink::new()?;
///     link.connect()?;
///
///     // climb for two seconds at 10 Hz
///     for _ in 0..20 {
///         link.set_motion(&MotionIntent::vertical(1.0))?;
///         thread::sleep(Duration::from_millis(100));
///     }
///
///     link.set_motion(&MotionIntent::hover())?;
///     link.disconnect()?;
///     Ok(())
/// }
/// ```
///
/// # Failures
///
/// Transport and decode failures are returned to the caller and never retried. A failed
/// `connect` leaves the link `Disconnected`; a failed `set_motion` keeps the previous
/// channel vector and telemetry. If the sink cannot append a record the cycle itself has
/// already been committed and [LinkError::TelemetryLog] is returned.
pub struct ControlLink {
    transport: Box<dyn Transport>,
    scales: ConversionScales,
    clear_log_on_reset: bool,
    state: ConnectionState,
    channels: ChannelVector,
    telemetry: Option<TelemetryRecord>,
    origin: Instant,
    sink: Option<Box<dyn TelemetrySink>>,
    idle: IdlePredicate,
}

impl ControlLink {
    /// Creates a link to a simulator on the local machine using the default
    /// [Configuration]. Telemetry is appended to `telemetry.log` in the working directory.
    ///
    /// # Errors
    ///
    /// Fails if the telemetry log cannot be opened or the connection pool cannot be
    /// started. The simulator does not have to be running yet.
    pub fn new() -> Result<Self, LinkError> {
        Self::with_configuration(&Configuration::default())
    }

    /// Creates a link from `configuration`, opening its telemetry log if one is set.
    ///
    /// ```no_run
    /// use realflight_link::{Configuration, ControlLink};
    ///
    /// fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = Configuration::from_file("realflight.toml")?;
    ///     let mut link = ControlLink::with_configuration(&config)?;
    ///     link.connect()?;
    ///     Ok(())
    /// }
    /// ```
    pub fn with_configuration(configuration: &Configuration) -> Result<Self, LinkError> {
        let transport = SoapTransport::new(configuration)?;
        let link = Self::with_transport(transport, configuration);

        match &configuration.telemetry_log {
            Some(path) => {
                let sink = CsvTelemetrySink::create(path, configuration.truncate_log_on_start)
                    .map_err(LinkError::TelemetryLog)?;
                info!("Recording telemetry to {}", path.display());
                Ok(link.with_sink(sink))
            }
            None => Ok(link),
        }
    }

    /// Creates a link over any [Transport]. No telemetry sink is attached; the
    /// `telemetry_log` setting of `configuration` is ignored.
    pub fn with_transport(
        transport: impl Transport + 'static,
        configuration: &Configuration,
    ) -> Self {
        ControlLink {
            transport: Box::new(transport),
            scales: configuration.scales,
            clear_log_on_reset: configuration.truncate_log_on_start,
            state: ConnectionState::Disconnected,
            channels: NEUTRAL_CHANNELS,
            telemetry: None,
            origin: Instant::now(),
            sink: None,
            idle: IdlePredicate::default(),
        }
    }

    /// Sends accepted records to `sink`, replacing any previous sink.
    pub fn with_sink(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Replaces the rule deciding which channel vectors are too idle to log.
    pub fn with_idle_predicate(mut self, idle: IdlePredicate) -> Self {
        self.idle = idle;
        self
    }

    /// Takes control of the aircraft.
    ///
    /// Sends the takeover request, resets the aircraft and primes telemetry with one
    /// exchange of the startup vector. Only when all three succeed does the link become
    /// [Enabled](ConnectionState::Enabled). If the reset or the exchange fails after a
    /// successful takeover, control is handed back before the error is returned, so a
    /// later `connect` starts from scratch.
    pub fn connect(&mut self) -> Result<TelemetryRecord, LinkError> {
        self.check(LinkOperation::Connect)?;

        self.transport.enable()?;
        debug!("Controller injected, resetting aircraft");

        let (origin, record) = match self.restart() {
            Ok(primed) => primed,
            Err(e) => {
                if let Err(release) = self.transport.disable() {
                    error!("Failed to release controller after aborted connect: {}", release);
                }
                return Err(e);
            }
        };

        self.state = ConnectionState::Enabled;
        info!("Connected to simulator, aircraft status {}", record.status);
        self.commit(STARTUP_CHANNELS, origin, record)
    }

    /// Converts `intent` to a channel vector and runs one exchange cycle with it.
    ///
    /// Returns the decoded telemetry. Only valid while [Enabled](ConnectionState::Enabled);
    /// otherwise [LinkError::InvalidState] is returned and nothing is sent.
    pub fn set_motion(&mut self, intent: &MotionIntent) -> Result<TelemetryRecord, LinkError> {
        self.check(LinkOperation::SetMotion)?;
        let channels = convert(intent, &self.scales);
        self.cycle(channels)
    }

    /// Runs one exchange cycle with the current channel vector.
    pub fn poll(&mut self) -> Result<TelemetryRecord, LinkError> {
        self.check(LinkOperation::Poll)?;
        self.cycle(self.channels)
    }

    /// Resets the aircraft and restarts the telemetry clock.
    ///
    /// The channel vector returns to the startup vector and one exchange primes the
    /// telemetry, whose timestamp is then close to zero. The connection state is
    /// unchanged.
    ///
    /// When the link clears its log on reset, the sink is cleared after the new
    /// channels, clock and telemetry are in place, so the log starts empty and a
    /// failed clear still leaves the reset committed.
    pub fn reset(&mut self) -> Result<TelemetryRecord, LinkError> {
        self.check(LinkOperation::Reset)?;

        let (origin, record) = self.restart()?;
        let committed = self.commit(STARTUP_CHANNELS, origin, record);
        if self.clear_log_on_reset
            && let Some(sink) = self.sink.as_mut()
        {
            sink.clear().map_err(|e| {
                error!("Failed to clear telemetry log: {}", e);
                LinkError::TelemetryLog(e)
            })?;
        }
        committed
    }

    /// Hands control back to the simulator's original controller.
    ///
    /// The link ends up [Disconnected](ConnectionState::Disconnected) with a neutral
    /// channel vector even when the request fails; the failure is still returned, since
    /// the simulator may not have complied.
    pub fn disconnect(&mut self) -> Result<(), LinkError> {
        self.check(LinkOperation::Disconnect)?;

        self.state = ConnectionState::Releasing;
        let result = self.transport.disable();
        self.state = ConnectionState::Disconnected;
        self.channels = NEUTRAL_CHANNELS;

        match result {
            Ok(_) => {
                info!("Restored the original controller");
                Ok(())
            }
            Err(e) => {
                error!("Restoring the original controller failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// The most recent telemetry, `None` before the first successful exchange.
    pub fn current_telemetry(&self) -> Option<&TelemetryRecord> {
        self.telemetry.as_ref()
    }

    /// The channel vector sent on the next exchange.
    pub fn current_channels(&self) -> ChannelVector {
        self.channels
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Request counters of the underlying transport.
    pub fn statistics(&self) -> Statistics {
        self.transport.statistics()
    }

    fn check(&self, operation: LinkOperation) -> Result<(), LinkError> {
        if self.state.permits(operation) {
            Ok(())
        } else {
            Err(LinkError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Resets the aircraft and exchanges the startup vector. Nothing is committed.
    fn restart(&self) -> Result<(Instant, TelemetryRecord), LinkError> {
        self.transport.reset()?;
        let origin = Instant::now();
        info!("Aircraft reset");

        let body = self.transport.exchange(&STARTUP_CHANNELS)?;
        let record = decode_telemetry(&body, origin.elapsed())?;
        Ok((origin, record))
    }

    fn cycle(&mut self, channels: ChannelVector) -> Result<TelemetryRecord, LinkError> {
        let body = self.transport.exchange(&channels)?;
        let record = decode_telemetry(&body, self.origin.elapsed())?;
        self.commit(channels, self.origin, record)
    }

    /// Stores the outcome of a successful exchange and forwards it to the sink.
    fn commit(
        &mut self,
        channels: ChannelVector,
        origin: Instant,
        record: TelemetryRecord,
    ) -> Result<TelemetryRecord, LinkError> {
        self.channels = channels;
        self.origin = origin;
        self.telemetry = Some(record.clone());

        if self.idle.is_idle(&channels) {
            debug!("Idle channels, t={} not logged", record.timestamp);
        } else if let Some(sink) = self.sink.as_mut() {
            sink.record(&record).map_err(|e| {
                error!("Failed to append telemetry: {}", e);
                LinkError::TelemetryLog(e)
            })?;
        }

        Ok(record)
    }
}

impl Drop for ControlLink {
    fn drop(&mut self) {
        if self.state == ConnectionState::Enabled {
            info!("Releasing the aircraft before shutdown");
            if let Err(e) = self.transport.disable() {
                error!("Failed to restore the original controller: {}", e);
            }
        }
    }
}
