use gaitex_core::EventSink;
use std::io::Write;
use std::net::TcpStream;
use tracing::{info, warn};

/// Marker sink that logs every marker under the `markers` target.
/// The default for dry runs without a streaming bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn write(&mut self, text: &str) {
        info!(target: "markers", "{text}");
    }
}

/// Line-oriented TCP marker sink (LSL bridge surrogate).
///
/// Delivery is fire-and-forget: a broken connection degrades the sink to
/// log-only output and never stalls the tick that produced the marker.
#[derive(Debug)]
pub struct TcpEventSink {
    stream: Option<TcpStream>,
    peer: String,
}

impl TcpEventSink {
    pub fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        info!(peer = addr, "marker sink connected");
        Ok(Self {
            stream: Some(stream),
            peer: addr.to_string(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl EventSink for TcpEventSink {
    fn write(&mut self, text: &str) {
        if let Some(stream) = self.stream.as_mut() {
            if let Err(err) = writeln!(stream, "{text}") {
                warn!(peer = %self.peer, %err, "marker sink unreachable, degrading to log only");
                self.stream = None;
            }
        }
        info!(target: "markers", "{text}");
    }
}
