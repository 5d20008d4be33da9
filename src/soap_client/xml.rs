//! Pure functions for SOAP/HTTP request building and response parsing.
//! This module does no I/O.

use std::fmt::Write;

use super::SoapResponse;
use crate::TransportError;

/// Size of header for request body
const HEADER_LEN: usize = 120;

/// Largest response body accepted from the simulator. ExchangeData replies are a few KiB.
pub(crate) const MAX_RESPONSE_LEN: usize = 1024 * 1024;

/// Encode a SOAP envelope for RealFlight
pub(crate) fn encode_envelope(action: &str, body: &str) -> String {
    let mut envelope = String::with_capacity(200 + body.len());

    envelope.push_str("<?xml version='1.0' encoding='UTF-8'?>");
    envelope.push_str("<soap:Envelope xmlns:soap='http://schemas.xmlsoap.org/soap/envelope/' xmlns:xsd='http://www.w3.org/2001/XMLSchema' xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance'>");
    envelope.push_str("<soap:Body>");
    let _ = write!(envelope, "<{}>{}</{}>", action, body, action);
    envelope.push_str("</soap:Body>");
    envelope.push_str("</soap:Envelope>");

    envelope
}

/// Build an HTTP request string for a SOAP action
pub(crate) fn build_http_request(action: &str, envelope: &str) -> String {
    let mut request = String::with_capacity(HEADER_LEN + envelope.len() + action.len());

    request.push_str("POST / HTTP/1.1\r\n");
    let _ = write!(request, "Soapaction: '{}'\r\n", action);
    let _ = write!(request, "Content-Length: {}\r\n", envelope.len());
    request.push_str("Content-Type: text/xml;charset=utf-8\r\n");
    request.push_str("\r\n");
    request.push_str(envelope);

    request
}

/// Parse HTTP status line and extract status code
pub(crate) fn parse_status_line(status_line: &str) -> Result<u32, TransportError> {
    if status_line.is_empty() {
        return Err(TransportError::MalformedResponse(
            "Empty response from simulator".into(),
        ));
    }

    status_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| {
            TransportError::MalformedResponse(
                "Malformed HTTP status line: missing status code".into(),
            )
        })?
        .parse()
        .map_err(|e| TransportError::MalformedResponse(format!("Invalid HTTP status code: {}", e)))
}

/// Extract Content-Length from a header line if present
pub(crate) fn parse_content_length(line: &str) -> Option<usize> {
    if line.to_lowercase().starts_with("content-length:") {
        line.split_whitespace()
            .nth(1)
            .and_then(|s| s.trim().parse().ok())
    } else {
        None
    }
}

/// Validates the Content-Length of a response before its body is read.
pub(crate) fn body_length(content_length: Option<usize>) -> Result<usize, TransportError> {
    match content_length {
        None => Err(TransportError::MalformedResponse(
            "Missing Content-Length header".into(),
        )),
        Some(length) if length > MAX_RESPONSE_LEN => Err(TransportError::MalformedResponse(
            format!(
                "Content-Length {} exceeds the {} byte limit",
                length, MAX_RESPONSE_LEN
            ),
        )),
        Some(length) => Ok(length),
    }
}

/// Create a SoapResponse from parsed components
pub(crate) fn create_response(status_code: u32, body: Vec<u8>) -> SoapResponse {
    SoapResponse {
        status_code,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}
