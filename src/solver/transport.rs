//! Line-oriented transports to a running solver: a spawned child process or
//! a WebSocket connection, plus an in-process mock for tests. All three
//! speak the same event shape so [`crate::solver::session`] never needs to
//! know which one it is driving.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::{OptalcpError, Result};

/// One line received from the solver, or a transport-level event.
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete JSON line from the solver.
    Message(String),
    /// A complete line of diagnostic text (child stderr, not protocol JSON).
    Warning(String),
    /// The transport closed normally; no more events will follow.
    Closed,
    /// The transport failed; `Closed` still follows.
    Error(OptalcpError),
}

/// A live transport: send lines out, receive [`TransportEvent`]s in. Closing
/// is done by dropping the handle or calling [`Transport::close`]; readers
/// already in flight still deliver their buffered events.
pub struct Transport {
    outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl Transport {
    /// Enqueue a line to send. A no-op once the transport has closed.
    pub fn send_line(&self, line: String) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        // The receiving task may have already dropped; that's a close race,
        // not a caller error.
        let _ = self.outbound.send(line);
        Ok(())
    }

    /// Signal that no more lines will be sent. Does not wait for in-flight
    /// events; the solver still emits its own `Closed`/`Error` once its side
    /// of the pipe actually shuts down.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// A cloned handle to the outbound sender, for out-of-band commands
    /// (`stop`, `sendSolution`) issued while the main event loop is awaiting
    /// the next inbound event.
    pub(crate) fn outbound_for_session(&self) -> mpsc::UnboundedSender<String> {
        self.outbound.clone()
    }

    /// Spawn `command` with `args`, speaking newline-delimited JSON over
    /// stdio. Stderr lines are forwarded as [`TransportEvent::Warning`].
    pub fn spawn_process(command: &str, args: &[String]) -> Result<Transport> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(OptalcpError::SpawnFailed)?;

        let mut stdin = child.stdin.take().expect("stdin requested as piped");
        let stdout = child.stdout.take().expect("stdout requested as piped");
        let stderr = child.stderr.take().expect("stderr requested as piped");

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
                // A solver that exited early closes its stdin pipe; writing
                // to it then fails with a broken-pipe error, which is not
                // distinct from any other shutdown and is reported via the
                // process-exit path instead.
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let stdout_tx = inbound_tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let _ = stdout_tx.send(TransportEvent::Message(line));
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = stdout_tx.send(TransportEvent::Error(OptalcpError::Io(err)));
                        break;
                    }
                }
            }
        });

        let stderr_tx = inbound_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = stderr_tx.send(TransportEvent::Warning(line));
            }
        });

        tokio::spawn(async move {
            let _ = stdout_task.await;
            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    let _ = inbound_tx.send(TransportEvent::Error(OptalcpError::ProcessExitedWithError(status)));
                }
                Err(err) => {
                    let _ = inbound_tx.send(TransportEvent::Error(OptalcpError::Io(err)));
                }
            }
            let _ = inbound_tx.send(TransportEvent::Closed);
        });

        Ok(Transport { outbound: outbound_tx, inbound: inbound_rx, closed })
    }

    /// Connect to a `ws://`/`wss://` solver endpoint. Inbound text frames
    /// are buffered and split on newlines so a line spanning multiple frames
    /// (or multiple lines in one frame) still yields complete messages.
    pub async fn connect_websocket(url: &str) -> Result<Transport> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, mut source) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let closed = Arc::new(AtomicBool::new(false));

        // Lines queued before the connection finished opening are already
        // sitting in `outbound_rx`'s buffer; this task just drains them.
        tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if sink.send(WsMessage::Text(line)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            let mut buffer = String::new();
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        buffer.push_str(&text);
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].to_string();
                            buffer.drain(..=pos);
                            if !line.is_empty() {
                                let _ = inbound_tx.send(TransportEvent::Message(line));
                            }
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        if let Some(CloseFrame { code, reason }) = frame {
                            if u16::from(code) != 1000 {
                                let _ = inbound_tx.send(TransportEvent::Error(OptalcpError::WebSocketClosed(
                                    u16::from(code),
                                    reason.to_string(),
                                )));
                            }
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // A single transport error is treated as closing the
                        // connection; the solver does not retry mid-session.
                        let _ = inbound_tx.send(TransportEvent::Error(OptalcpError::WebSocket(err)));
                        break;
                    }
                }
            }
            if !buffer.trim().is_empty() {
                let _ = inbound_tx.send(TransportEvent::Message(buffer));
            }
            let _ = inbound_tx.send(TransportEvent::Closed);
        });

        Ok(Transport { outbound: outbound_tx, inbound: inbound_rx, closed })
    }

    /// An in-process transport backed by channels, for driving a session
    /// against a scripted fake solver in tests.
    pub fn mock_pair() -> (Transport, MockSolver) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Transport { outbound: outbound_tx, inbound: inbound_rx, closed };
        let mock = MockSolver { sent: outbound_rx, replies: inbound_tx };
        (transport, mock)
    }
}

/// The other end of [`Transport::mock_pair`]: lines the client sent, and a
/// sender to script the fake solver's replies.
pub struct MockSolver {
    pub sent: mpsc::UnboundedReceiver<String>,
    pub replies: mpsc::UnboundedSender<TransportEvent>,
}

impl MockSolver {
    pub fn reply_line(&self, line: impl Into<String>) {
        let _ = self.replies.send(TransportEvent::Message(line.into()));
    }

    pub fn close(&self) {
        let _ = self.replies.send(TransportEvent::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_round_trips_a_line() {
        let (transport, mut mock) = Transport::mock_pair();
        transport.send_line(r#"{"msg":"handshake"}"#.to_string()).unwrap();
        let sent = mock.sent.recv().await.unwrap();
        assert_eq!(sent, r#"{"msg":"handshake"}"#);

        mock.reply_line(r#"{"msg":"ack"}"#);
        let mut transport = transport;
        match transport.inbound.recv().await {
            Some(TransportEvent::Message(line)) => assert_eq!(line, r#"{"msg":"ack"}"#),
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_transport_closes() {
        let (mut transport, mock) = Transport::mock_pair();
        mock.close();
        match transport.inbound.recv().await {
            Some(TransportEvent::Closed) => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_after_close_is_a_no_op() {
        let (transport, mut mock) = Transport::mock_pair();
        transport.close();
        transport.send_line("ignored".to_string()).unwrap();
        assert!(mock.sent.try_recv().is_err());
    }
}
