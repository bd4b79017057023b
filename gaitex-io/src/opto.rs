use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Client for the OptoGait measurement service: a TCP listener speaking
/// STX/ETX-framed ASCII commands with XML response documents.
///
/// The service brackets gait-pass measurements; its failures never reach the
/// trial state machine. Every call reports a `VendorError` to the host and
/// nothing else retries automatically.

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 31967;

const RESPONSE_BUFFER: usize = 1024;
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("not connected to the measurement service")]
    NotConnected,
    #[error("measurement service i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("no answer from the measurement service")]
    EmptyResponse,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("measurement service rejected the request: {0}")]
    Rejected(String),
}

/// Test configuration serialized into the `I` (initialize) command.
#[derive(Debug, Clone)]
pub struct MeasurementRequest {
    pub patient_id: String,
    pub test_name: String,
}

impl MeasurementRequest {
    pub fn to_xml(&self) -> String {
        format!(
            "<TestConfiguration><PatientID>{}</PatientID><TestName>{}</TestName></TestConfiguration>",
            self.patient_id, self.test_name
        )
    }
}

#[derive(Debug)]
pub struct OptoApiClient {
    addr: String,
    stream: Option<TcpStream>,
}

impl OptoApiClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            stream: None,
        }
    }

    pub fn connect(&mut self) -> Result<(), VendorError> {
        info!(addr = %self.addr, "connecting to measurement service");
        let stream = TcpStream::connect(&self.addr)?;
        stream.set_read_timeout(Some(RESPONSE_TIMEOUT))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        info!(addr = %self.addr, "measurement service connected");
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            info!(addr = %self.addr, "measurement service connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// `K`: asks the service whether its hardware link to the bars is up.
    pub fn check_connection(&mut self) -> Result<bool, VendorError> {
        let answer = self.request("K")?;
        match element_value(&answer, "HwConnection") {
            Some("OK") => Ok(true),
            Some(other) => {
                warn!(status = other, "hardware connection check failed");
                Ok(false)
            }
            None => Err(VendorError::MalformedResponse(answer)),
        }
    }

    /// `I<xml>`: initializes a measurement for the upcoming gait pass.
    pub fn init_measurement(&mut self, request: &MeasurementRequest) -> Result<(), VendorError> {
        let answer = self.request(&format!("I{}", request.to_xml()))?;
        Self::check_status(&answer)
    }

    /// `E`: ends the running test; returns the result document for marker
    /// conversion.
    pub fn end_test(&mut self) -> Result<String, VendorError> {
        let answer = self.request("E")?;
        Self::check_status(&answer)?;
        Ok(answer)
    }

    /// `C`: cancels the running test, discarding its data.
    pub fn cancel_test(&mut self) -> Result<(), VendorError> {
        let answer = self.request("C")?;
        Self::check_status(&answer)
    }

    fn check_status(answer: &str) -> Result<(), VendorError> {
        if let Some(message) = element_value(answer, "ErrorMessage") {
            if !message.is_empty() {
                return Err(VendorError::Rejected(message.to_string()));
            }
        }
        match element_value(answer, "Status") {
            Some("Error") => Err(VendorError::Rejected(answer.to_string())),
            Some(_) => Ok(()),
            None => Err(VendorError::MalformedResponse(answer.to_string())),
        }
    }

    fn request(&mut self, command: &str) -> Result<String, VendorError> {
        let stream = self.stream.as_mut().ok_or(VendorError::NotConnected)?;

        debug!(command, "sending measurement service request");
        let mut framed = Vec::with_capacity(command.len() + 2);
        framed.push(STX);
        framed.extend_from_slice(command.as_bytes());
        framed.push(ETX);
        stream.write_all(&framed)?;

        let mut buf = [0u8; RESPONSE_BUFFER];
        let read = stream.read(&mut buf)?;
        if read == 0 {
            return Err(VendorError::EmptyResponse);
        }

        let answer = strip_frame(&buf[..read]);
        let answer = String::from_utf8_lossy(answer).into_owned();
        debug!(%answer, "measurement service answered");
        Ok(answer)
    }
}

impl Drop for OptoApiClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Removes STX/ETX framing bytes and surrounding whitespace.
fn strip_frame(raw: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = raw.len();
    while start < end && (raw[start] == STX || raw[start].is_ascii_whitespace()) {
        start += 1;
    }
    while end > start && (raw[end - 1] == ETX || raw[end - 1].is_ascii_whitespace()) {
        end -= 1;
    }
    &raw[start..end]
}

/// Returns the text of the named child element of the response document.
///
/// The vendor responses are flat documents with a handful of known element
/// names; this is a narrow scanner, not a general XML parser.
pub fn element_value<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    child_elements(xml)
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
}

/// Flattens a response document into a `Name:Value;` marker string.
pub fn xml_to_marker(xml: &str) -> String {
    let mut marker = String::new();
    for (name, value) in child_elements(xml) {
        marker.push_str(name);
        marker.push(':');
        marker.push_str(value);
        marker.push(';');
    }
    marker
}

/// Child `(name, value)` pairs inside the document's root element.
fn child_elements(xml: &str) -> Vec<(&str, &str)> {
    let inner = inner_document(xml).unwrap_or(xml);
    let mut pairs = Vec::new();
    let mut rest = inner;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        if after.starts_with('/') {
            // Stray closing tag; skip past it.
            match after.find('>') {
                Some(gt) => rest = &after[gt + 1..],
                None => break,
            }
            continue;
        }
        let Some(gt) = after.find('>') else { break };
        let tag = &after[..gt];
        if let Some(name) = tag.strip_suffix('/') {
            pairs.push((name.trim(), ""));
            rest = &after[gt + 1..];
            continue;
        }
        let name = tag.split_whitespace().next().unwrap_or(tag);
        let body = &after[gt + 1..];
        let close = format!("</{name}>");
        let Some(close_at) = body.find(&close) else {
            break;
        };
        pairs.push((name, &body[..close_at]));
        rest = &body[close_at + close.len()..];
    }

    pairs
}

/// Content between the opening and closing tags of the root element.
fn inner_document(xml: &str) -> Option<&str> {
    let open = xml.find('<')?;
    let after = &xml[open + 1..];
    if after.starts_with('?') {
        // Skip an XML declaration if present.
        let decl_end = after.find('>')?;
        return inner_document(&after[decl_end + 1..]);
    }
    let gt = after.find('>')?;
    let name = after[..gt].split_whitespace().next()?;
    let body = &after[gt + 1..];
    let close = format!("</{name}>");
    let close_at = body.rfind(&close)?;
    Some(&body[..close_at])
}
