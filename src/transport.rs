//! The single point of network I/O for the control link.
//!
//! A [Transport] issues exactly one request per call and never retries. [SoapTransport]
//! speaks RealFlight Link over TCP; other implementations can be plugged into
//! [ControlLink::with_transport](crate::ControlLink::with_transport).

use std::sync::Arc;

use log::error;

#[cfg(test)]
use crate::soap_client::stub::StubSoapClient;
use crate::encoders::encode_channel_vector;
use crate::soap_client::SoapClient;
use crate::soap_client::tcp::TcpSoapClient;
use crate::{
    ChannelVector, Configuration, SoapResponse, Statistics, StatisticsEngine, TransportError,
};

const EMPTY_BODY: &str = "";

/// SOAP actions understood by RealFlight Link.
pub(crate) mod action {
    pub const TAKEOVER: &str = "InjectUAVControllerInterface";
    pub const RESET: &str = "ResetAircraft";
    pub const RESTORE: &str = "RestoreOriginalControllerDevice";
    pub const EXCHANGE: &str = "ExchangeData";
}

/// Request/response operations against the simulator.
///
/// Every method performs one blocking round trip and returns the raw response body.
/// Implementations must not retry; the caller decides what a failure means.
pub trait Transport: Send {
    /// Takes control of the aircraft away from the simulator's own controller.
    fn enable(&self) -> Result<String, TransportError>;

    /// Puts the aircraft back at its starting position.
    fn reset(&self) -> Result<String, TransportError>;

    /// Hands control back to the original controller device.
    fn disable(&self) -> Result<String, TransportError>;

    /// Sends `channels` and returns the response carrying the aircraft state.
    fn exchange(&self, channels: &ChannelVector) -> Result<String, TransportError>;

    /// Request counters, if the implementation keeps any.
    fn statistics(&self) -> Statistics {
        Statistics::default()
    }
}

/// RealFlight Link over HTTP/1.1, one TCP connection per request.
///
/// ```no_run
/// use realflight_link::{Configuration, NEUTRAL_CHANNELS, SoapTransport, Transport};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = SoapTransport::new(&Configuration::default())?;
///     transport.enable()?;
///     let body = transport.exchange(&NEUTRAL_CHANNELS)?;
///     println!("{} bytes of aircraft state", body.len());
///     transport.disable()?;
///     Ok(())
/// }
/// ```
pub struct SoapTransport {
    statistics: Arc<StatisticsEngine>,
    soap_client: Box<dyn SoapClient>,
}

impl SoapTransport {
    /// Creates a transport for the simulator named in `configuration`.
    ///
    /// # Errors
    ///
    /// Fails when `simulator_host` does not resolve or the connection pool thread
    /// cannot be started. An unreachable simulator is not an error here; the pool
    /// keeps retrying in the background.
    pub fn new(configuration: &Configuration) -> Result<Self, TransportError> {
        let statistics = Arc::new(StatisticsEngine::new());
        let soap_client = TcpSoapClient::new(configuration, statistics.clone())?;

        Ok(SoapTransport {
            statistics,
            soap_client: Box::new(soap_client),
        })
    }

    #[cfg(test)]
    pub(crate) fn stub(mut soap_client: StubSoapClient) -> Self {
        let statistics = Arc::new(StatisticsEngine::new());
        soap_client.statistics = Some(statistics.clone());

        SoapTransport {
            statistics,
            soap_client: Box::new(soap_client),
        }
    }

    #[cfg(test)]
    pub(crate) fn requests(&self) -> Vec<String> {
        self.soap_client.requests()
    }

    fn call(&self, action: &str, body: &str) -> Result<String, TransportError> {
        let response = self.soap_client.send_action(action, body).inspect_err(|e| {
            error!("{} failed: {}", action, e);
        })?;
        into_body(action, response)
    }
}

fn into_body(action: &str, response: SoapResponse) -> Result<String, TransportError> {
    if response.is_success() {
        Ok(response.body)
    } else {
        let fault = crate::decode_fault(&response);
        error!("{} rejected by simulator: {}", action, fault);
        Err(fault)
    }
}

impl Transport for SoapTransport {
    fn enable(&self) -> Result<String, TransportError> {
        self.call(action::TAKEOVER, EMPTY_BODY)
    }

    fn reset(&self) -> Result<String, TransportError> {
        self.call(action::RESET, EMPTY_BODY)
    }

    fn disable(&self) -> Result<String, TransportError> {
        self.call(action::RESTORE, EMPTY_BODY)
    }

    fn exchange(&self, channels: &ChannelVector) -> Result<String, TransportError> {
        let body = self.call(action::EXCHANGE, &encode_channel_vector(channels))?;
        self.statistics.increment_exchange_count();
        Ok(body)
    }

    fn statistics(&self) -> Statistics {
        self.statistics.snapshot()
    }
}
