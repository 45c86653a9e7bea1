// crates/xornet-client/tests/common/mod.rs

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use xornet_client::{
    Connector, MemoryTokenHolder, SyncDriver, SyncHandle, SyncSettings, TokenHolder,
    TransportEvent, TransportEventKind, TransportEventTx, TransportHandle,
};
use xornet_core::{Generation, Machine, SharedStore};

/// Server side of one in-memory transport.
pub struct FakeSocket {
    pub generation: Generation,
    events: TransportEventTx,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl FakeSocket {
    pub fn open(&self) {
        self.push(TransportEventKind::Opened);
    }

    pub fn frame(&self, text: &str) {
        self.push(TransportEventKind::Frame(text.to_string()));
    }

    pub fn close(&self, reason: &str) {
        self.push(TransportEventKind::Closed(reason.to_string()));
    }

    /// Frames the client sent so far, parsed as JSON.
    pub fn sent(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            frames.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
        frames
    }

    fn push(&self, kind: TransportEventKind) {
        let _ = self.events.send(TransportEvent::new(self.generation, kind));
    }
}

pub struct FakeConnector {
    sockets: mpsc::UnboundedSender<FakeSocket>,
    opened: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeSocket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = FakeConnector {
            sockets: tx,
            opened: AtomicUsize::new(0),
        };
        (Arc::new(connector), rx)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn open(&self, _url: &str, generation: Generation, events: TransportEventTx) -> TransportHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.opened.fetch_add(1, Ordering::SeqCst);
        let _ = self.sockets.send(FakeSocket {
            generation,
            events,
            outbound: rx,
        });
        TransportHandle::new(tx, None)
    }
}

pub fn settings() -> SyncSettings {
    SyncSettings {
        url: "ws://xornet.test/client".to_string(),
        watchdog_interval: Duration::from_millis(5000),
        heartbeat_timeout: Duration::from_millis(5000),
        drain_interval: Duration::from_millis(1000),
    }
}

/// Let spawned tasks run without moving the (paused) clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub struct Harness {
    pub handle: SyncHandle,
    pub machines: SharedStore<Machine>,
    pub connector: Arc<FakeConnector>,
    pub sockets: mpsc::UnboundedReceiver<FakeSocket>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(token: Option<&str>) -> Harness {
        Harness::start_with(token, |_| {})
    }

    pub fn start_with<F>(token: Option<&str>, configure: F) -> Harness
    where
        F: FnOnce(&mut SyncDriver),
    {
        let (connector, sockets) = FakeConnector::new();
        let machines = SharedStore::new();
        let token: Arc<dyn TokenHolder> = Arc::new(MemoryTokenHolder::new(token));

        let (mut driver, handle) =
            SyncDriver::new(settings(), connector.clone(), token, machines.clone());
        configure(&mut driver);
        let task = driver.spawn();

        Harness {
            handle,
            machines,
            connector,
            sockets,
            task,
        }
    }

    /// The transport most recently opened by the driver.
    pub async fn next_socket(&mut self) -> FakeSocket {
        settle().await;
        self.sockets.try_recv().expect("driver did not open a transport")
    }

    /// Open the transport and answer with a heartbeat: session is Live.
    pub async fn go_live(&mut self) -> FakeSocket {
        self.handle.connect();
        let socket = self.next_socket().await;
        socket.open();
        socket.frame(r#"{"e":"heartbeat"}"#);
        settle().await;
        socket
    }
}
