//! Host ports: where outbound messages go
//!
//! The runtime never talks to a host directly. Implement [`HostPort`] for the
//! channel your host listens on (a worker `postMessage`, a pipe, a socket).

use crate::error::Result;
use crate::protocol::Outbound;
use std::io::Write;

/// Outbound side of the message protocol
pub trait HostPort {
    /// Deliver one message to the host
    fn post(&mut self, message: Outbound) -> Result<()>;
}

/// Port that keeps every message it receives
#[derive(Debug, Default)]
pub struct RecordingPort {
    messages: Vec<Outbound>,
}

impl RecordingPort {
    /// Create an empty port
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far
    pub fn messages(&self) -> &[Outbound] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Outbound> {
        self.messages.last()
    }

    /// Take and clear the received messages
    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.messages)
    }
}

impl HostPort for RecordingPort {
    fn post(&mut self, message: Outbound) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}

/// Port writing one JSON document per line
#[derive(Debug)]
pub struct JsonLinesPort<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesPort<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Get the underlying writer back
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> HostPort for JsonLinesPort<W> {
    fn post(&mut self, message: Outbound) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Mutation;

    fn commit(path: usize) -> Outbound {
        Outbound::Commit {
            mutations: vec![Mutation::Delete {
                parent_path: vec![],
                child_path: vec![path],
            }],
            completed_transition_id: None,
        }
    }

    #[test]
    fn test_recording_port() {
        let mut port = RecordingPort::new();
        port.post(commit(0)).unwrap();
        port.post(commit(1)).unwrap();
        assert_eq!(port.messages().len(), 2);
        assert_eq!(port.last(), Some(&commit(1)));
        assert_eq!(port.drain().len(), 2);
        assert!(port.messages().is_empty());
    }

    #[test]
    fn test_json_lines_port() {
        let mut port = JsonLinesPort::new(Vec::new());
        port.post(commit(0)).unwrap();
        port.post(commit(1)).unwrap();
        let out = String::from_utf8(port.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("{\"type\":\"COMMIT\""));
        assert!(lines[1].contains("\"childPath\":[1]"));
    }
}
