//! One-way named-event channel from the client to its host shell
//! (window controls, rich presence). The client only ever emits.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

/// Emitted on logout so the host drops any rich-presence activity.
pub const CLEAR_PRESENCE: &str = "clearPresence";

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeEvent {
    pub name: String,
    pub data: Option<Value>,
}

pub trait UiBridge: Send + Sync {
    fn emit(&self, name: &str, data: Option<Value>);
}

/// No host shell attached: just log.
#[derive(Debug, Default)]
pub struct LogBridge;

impl UiBridge for LogBridge {
    fn emit(&self, name: &str, data: Option<Value>) {
        info!(event = name, data = ?data, "Host event");
    }
}

/// Forwards events to whoever holds the receiving end.
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl ChannelBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelBridge { tx }, rx)
    }
}

impl UiBridge for ChannelBridge {
    fn emit(&self, name: &str, data: Option<Value>) {
        let _ = self.tx.send(BridgeEvent {
            name: name.to_string(),
            data,
        });
    }
}
