use gaitex_core::ActuatorSink;
use std::io::Write;
use std::net::TcpStream;
use tracing::{debug, info, warn};

/// Actuator sink that only logs the commands it would send.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActuatorSink;

impl ActuatorSink for LogActuatorSink {
    fn send(&mut self, command: &str) {
        debug!(target: "actuator", "{command}");
    }
}

/// Push channel to the stimulus box (Raspberry Pi LED/audio driver).
///
/// Commands are newline-terminated lines; nothing is read back. A send
/// failure is logged and the trial keeps its timing: the protocol's
/// validity depends on timing continuity, not on actuator confirmation.
#[derive(Debug)]
pub struct TcpActuatorSink {
    stream: Option<TcpStream>,
    peer: String,
}

impl TcpActuatorSink {
    pub fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        info!(peer = addr, "actuator connected");
        Ok(Self {
            stream: Some(stream),
            peer: addr.to_string(),
        })
    }
}

impl ActuatorSink for TcpActuatorSink {
    fn send(&mut self, command: &str) {
        let Some(stream) = self.stream.as_mut() else {
            warn!(peer = %self.peer, %command, "actuator offline, stimulus command dropped");
            return;
        };
        if let Err(err) = writeln!(stream, "{command}") {
            warn!(peer = %self.peer, %err, "actuator send failed, dropping connection");
            self.stream = None;
        }
    }
}
