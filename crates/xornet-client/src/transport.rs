//! Socket transports.
//!
//! A [`Connector`] opens one transport per session generation. The
//! transport reports back on a shared event channel, every event tagged
//! with the generation it belongs to, so the driver can drop whatever a
//! superseded transport still manages to say.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use xornet_core::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    Frame(String),
    Closed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub generation: Generation,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(generation: Generation, kind: TransportEventKind) -> Self {
        TransportEvent { generation, kind }
    }
}

pub type TransportEventTx = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventRx = mpsc::UnboundedReceiver<TransportEvent>;

/// The driver's grip on one open transport. Dropping it aborts the
/// transport task.
#[derive(Debug)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl TransportHandle {
    pub fn new(outbound: mpsc::UnboundedSender<String>, task: Option<JoinHandle<()>>) -> Self {
        TransportHandle { outbound, task }
    }

    /// Queue a text frame. `false` if the transport is gone.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub trait Connector: Send + Sync + 'static {
    /// Start connecting to `url` for `generation`. Must not block; the
    /// outcome is reported through `events`.
    fn open(&self, url: &str, generation: Generation, events: TransportEventTx) -> TransportHandle;
}

/// WebSocket connector on `tokio-tungstenite`.
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str, generation: Generation, events: TransportEventTx) -> TransportHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(url.to_string(), generation, events, outbound_rx));
        TransportHandle::new(outbound_tx, Some(task))
    }
}

async fn run_socket(
    url: String,
    generation: Generation,
    events: TransportEventTx,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let report = |kind| events.send(TransportEvent::new(generation, kind)).is_ok();

    info!("Session {} connecting to {}", generation, url);
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            error!("Session {} failed to connect: {}", generation, e);
            report(TransportEventKind::Closed(e.to_string()));
            return;
        }
    };

    if !report(TransportEventKind::Opened) {
        return;
    }

    let (mut sink, mut stream) = ws.split();

    let reason = loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !report(TransportEventKind::Frame(text)) {
                        break "driver gone".to_string();
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if !report(TransportEventKind::Frame(text)) {
                            break "driver gone".to_string();
                        }
                    }
                    Err(_) => warn!("Session {} dropped a non UTF-8 binary frame", generation),
                },
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => format!("closed by server ({}): {}", frame.code, frame.reason),
                        None => "closed by server".to_string(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Session {} socket error: {}", generation, e);
                    break e.to_string();
                }
                None => break "stream ended".to_string(),
            },
            Some(text) = outbound.recv() => {
                debug!("Session {} -> {}", generation, text);
                if let Err(e) = sink.send(Message::Text(text)).await {
                    error!("Session {} send failed: {}", generation, e);
                    break e.to_string();
                }
            }
        }
    };

    report(TransportEventKind::Closed(reason));
}
