//! Provides an implementation of a SOAP client that uses the TCP protocol.

use std::{
    io::{BufRead, BufReader, Read, Write},
    net::TcpStream,
    sync::Arc,
};

use log::debug;

use super::pool::ConnectionPool;
use super::xml::{
    body_length, build_http_request, create_response, parse_content_length, parse_status_line,
};
use super::{SoapClient, SoapResponse, encode_envelope};
use crate::configuration::Configuration;
use crate::{StatisticsEngine, TransportError};

/// Implementation of a SOAP client for RealFlight Link that uses the TCP protocol.
pub(crate) struct TcpSoapClient {
    /// Statistics engine for tracking performance
    statistics: Arc<StatisticsEngine>,
    /// Connection pool for managing TCP connections
    connection_pool: ConnectionPool,
    configuration: Configuration,
}

impl SoapClient for TcpSoapClient {
    /// Sends a SOAP action to the simulator and returns the response.
    ///
    /// # Arguments
    /// * `action` - The SOAP action to send.
    /// * `body`   - The body of the SOAP request.
    fn send_action(&self, action: &str, body: &str) -> Result<SoapResponse, TransportError> {
        let result = self.round_trip(action, body);
        if result.is_err() {
            self.statistics.increment_error_count();
        }
        result
    }
}

impl TcpSoapClient {
    /// Creates a new TCP SOAP client.
    pub fn new(
        configuration: &Configuration,
        statistics: Arc<StatisticsEngine>,
    ) -> Result<Self, TransportError> {
        let connection_pool = ConnectionPool::new(configuration, statistics.clone())?;
        Ok(TcpSoapClient {
            statistics,
            connection_pool,
            configuration: configuration.clone(),
        })
    }

    fn round_trip(&self, action: &str, body: &str) -> Result<SoapResponse, TransportError> {
        let envelope = encode_envelope(action, body);
        let mut stream = self.connection_pool.get_connection()?;
        stream.set_read_timeout(Some(self.configuration.request_timeout))?;
        stream.set_write_timeout(Some(self.configuration.request_timeout))?;

        debug!("Sending {} to {}", action, self.configuration.simulator_host);
        self.send_request(&mut stream, action, &envelope)?;
        self.statistics.increment_request_count();

        self.read_response(&mut BufReader::new(stream))
    }

    /// Sends a request to the simulator.
    fn send_request(
        &self,
        stream: &mut TcpStream,
        action: &str,
        envelope: &str,
    ) -> Result<(), TransportError> {
        let request = build_http_request(action, envelope);
        stream.write_all(request.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    /// Reads the raw response from the simulator.
    fn read_response(
        &self,
        stream: &mut BufReader<TcpStream>,
    ) -> Result<SoapResponse, TransportError> {
        let mut status_line = String::new();
        stream.read_line(&mut status_line)?;
        let status_code = parse_status_line(&status_line)?;

        // Read headers
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            if stream.read_line(&mut line)? == 0 {
                return Err(TransportError::MalformedResponse(
                    "Connection closed while reading headers".into(),
                ));
            }
            if line == "\r\n" {
                break; // End of headers
            }
            if let Some(length) = parse_content_length(&line) {
                content_length = Some(length);
            }
        }

        // Content-Length is checked before anything is allocated for the body.
        let length = body_length(content_length)?;
        let mut body = Vec::with_capacity(length);
        stream.by_ref().take(length as u64).read_to_end(&mut body)?;
        if body.len() < length {
            return Err(TransportError::MalformedResponse(format!(
                "Connection closed after {} of {} body bytes",
                body.len(),
                length
            )));
        }

        Ok(create_response(status_code, body))
    }
}
