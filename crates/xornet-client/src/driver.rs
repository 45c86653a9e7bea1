//! Sync driver.
//!
//! The one task that turns socket traffic into store updates:
//!
//! ```text
//!   SyncHandle ── SyncCommand ──┐
//!                               ▼
//!   Connector ── TransportEvent ──► SyncDriver ──► SharedStore<Machine>
//!                               ▲        │
//!            watchdog / drain ──┘        └──► watch<SyncStatus>
//! ```
//!
//! It owns the session state machine, the liveness watchdog, the
//! inbound buffer, the event dispatch and the current transport. Nothing
//! else writes socket-originated state, so ordering is simply the order
//! of this loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use xornet_core::{
    BufferedEvent, ConnectionState, EventDispatch, EventKind, Generation, InboundBuffer, Kinded,
    Machine, MachineDynamicData, SessionManager, SharedStore, Watchdog, WatchdogVerdict,
};
use xornet_protocol::{ClientEvent, ProtocolError, ServerEvent};

use crate::config::ClientConfig;
use crate::token::TokenHolder;
use crate::transport::{
    Connector, TransportEvent, TransportEventKind, TransportEventRx, TransportEventTx,
    TransportHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// Start syncing (idempotent).
    Connect,
    /// Stop syncing and forget all machine state.
    Logout,
    /// Stop the driver task.
    Shutdown,
}

/// Snapshot published after every loop iteration that changed something.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub state: ConnectionState,
    pub generation: Generation,
    pub last_heartbeat: Option<Instant>,
    pub buffered: usize,
    /// Watchdog-triggered reconnects since the sync was started.
    pub reconnects: u64,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub url: String,
    pub watchdog_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub drain_interval: Duration,
}

impl SyncSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        SyncSettings {
            url: config.socket_url(),
            watchdog_interval: config.watchdog_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
            drain_interval: config.drain_interval(),
        }
    }
}

/// What event handlers get to touch.
#[derive(Debug)]
pub struct SyncState {
    pub watchdog: Watchdog,
    pub buffer: InboundBuffer<MachineDynamicData>,
}

/// Cloneable front end of a running [`SyncDriver`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    pub fn connect(&self) {
        self.command(SyncCommand::Connect);
    }

    pub fn logout(&self) {
        self.command(SyncCommand::Logout);
    }

    pub fn shutdown(&self) {
        self.command(SyncCommand::Shutdown);
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    fn command(&self, command: SyncCommand) {
        if self.commands.send(command).is_err() {
            debug!("Sync driver already stopped, dropping {:?}", command);
        }
    }
}

pub struct SyncDriver {
    settings: SyncSettings,
    connector: Arc<dyn Connector>,
    token: Arc<dyn TokenHolder>,
    machines: SharedStore<Machine>,

    session: SessionManager,
    state: SyncState,
    dispatch: EventDispatch<SyncState, ServerEvent>,
    transport: Option<TransportHandle>,
    reconnects: u64,

    // Only present while the sync is started.
    watchdog_timer: Option<Interval>,
    drain_timer: Option<Interval>,

    commands: mpsc::UnboundedReceiver<SyncCommand>,
    events_tx: TransportEventTx,
    events_rx: TransportEventRx,
    status: watch::Sender<SyncStatus>,
}

impl SyncDriver {
    pub fn new(
        settings: SyncSettings,
        connector: Arc<dyn Connector>,
        token: Arc<dyn TokenHolder>,
        machines: SharedStore<Machine>,
    ) -> (SyncDriver, SyncHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());

        let mut dispatch: EventDispatch<SyncState, ServerEvent> = EventDispatch::new();
        dispatch.on(EventKind::Heartbeat, |state: &mut SyncState, _event: &ServerEvent| {
            state.watchdog.record_heartbeat(Instant::now());
        });
        dispatch.on(EventKind::MachineData, |state: &mut SyncState, event: &ServerEvent| {
            if let ServerEvent::MachineData(update) = event {
                state.buffer.push(update.uuid.clone(), update.data.clone());
            }
        });

        let driver = SyncDriver {
            state: SyncState {
                watchdog: Watchdog::new(settings.heartbeat_timeout),
                buffer: InboundBuffer::new(),
            },
            settings,
            connector,
            token,
            machines,
            session: SessionManager::new(),
            dispatch,
            transport: None,
            reconnects: 0,
            watchdog_timer: None,
            drain_timer: None,
            commands: commands_rx,
            events_tx,
            events_rx,
            status: status_tx,
        };
        let handle = SyncHandle {
            commands: commands_tx,
            status: status_rx,
        };
        (driver, handle)
    }

    /// Register an extra handler. Built-in handlers (watchdog, buffer)
    /// always run first.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&mut SyncState, &ServerEvent) + Send + 'static,
    {
        self.dispatch.on(kind, handler);
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Sync driver started for {}", self.settings.url);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SyncCommand::Connect) => self.start(),
                    Some(SyncCommand::Logout) => self.stop(true),
                    Some(SyncCommand::Shutdown) | None => {
                        self.stop(false);
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_transport_event(event),
                _ = tick(self.watchdog_timer.as_mut()) => self.poll_watchdog(),
                _ = tick(self.drain_timer.as_mut()) => self.drain(),
            }
            self.publish_status();
        }

        self.publish_status();
        info!("Sync driver stopped");
    }

    fn start(&mut self) {
        if self.watchdog_timer.is_none() {
            let now = Instant::now();
            self.watchdog_timer = Some(timer(now, self.settings.watchdog_interval));
            self.drain_timer = Some(timer(now, self.settings.drain_interval));
            self.state.watchdog.arm(now);
            self.reconnects = 0;
        }
        self.open_session();
    }

    fn stop(&mut self, forget: bool) {
        if let Some(abandoned) = self.session.supersede() {
            debug!("Session {} dropped on stop", abandoned);
        }
        self.transport = None;
        self.watchdog_timer = None;
        self.drain_timer = None;
        self.state.watchdog.disarm();
        self.state.buffer.clear();

        if forget {
            self.machines.clear();
            info!("Sync stopped, machine state cleared");
        }
    }

    fn open_session(&mut self) {
        let Some(generation) = self.session.connect() else {
            return;
        };
        // Drop any leftover handle before the new transport exists.
        self.transport = None;
        self.transport = Some(self.connector.open(
            &self.settings.url,
            generation,
            self.events_tx.clone(),
        ));
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        let TransportEvent { generation, kind } = event;

        if !self.session.is_current(generation) {
            debug!("Ignoring {:?} from stale session {}", kind, generation);
            return;
        }

        match kind {
            TransportEventKind::Opened => {
                if self.session.on_open(generation) {
                    self.send_login();
                }
            }
            TransportEventKind::Frame(text) => self.handle_frame(generation, &text),
            TransportEventKind::Closed(reason) => {
                if self.session.on_closed(generation) {
                    warn!("Session {} lost: {}", generation, reason);
                    self.transport = None;
                }
            }
        }
    }

    fn send_login(&mut self) {
        let Some(auth_token) = self.token.get() else {
            warn!("No auth token stored, login frame not sent");
            return;
        };

        let text = match (ClientEvent::Login { auth_token }).encode() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode login frame: {}", e);
                return;
            }
        };

        match &self.transport {
            Some(transport) if transport.send(text) => info!("Login frame sent"),
            _ => warn!("Transport gone before login frame could be sent"),
        }
    }

    fn handle_frame(&mut self, generation: Generation, text: &str) {
        let event = match ServerEvent::decode(text) {
            Ok(event) => event,
            Err(ProtocolError::UnknownEvent(name)) => {
                self.session.on_frame(generation);
                debug!("Ignoring unknown event {:?}", name);
                return;
            }
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        if self.session.on_frame(generation) {
            debug!("Session {} <- {}", generation, event.kind());
            self.dispatch.emit(&mut self.state, &event);
        }
    }

    fn poll_watchdog(&mut self) {
        if self.state.watchdog.poll(Instant::now()) != WatchdogVerdict::Expired {
            return;
        }

        self.reconnects += 1;
        info!("Reconnecting (attempt {})", self.reconnects);
        self.session.supersede();
        self.transport = None;
        self.state.watchdog.record_attempt(Instant::now());
        self.open_session();
    }

    fn drain(&mut self) {
        let machines = &self.machines;
        let applied = self
            .state
            .buffer
            .drain_cycle(|event| apply_machine_update(machines, event));
        if applied > 0 {
            debug!("Drain applied {} update(s)", applied);
        }
    }

    fn publish_status(&self) {
        let next = SyncStatus {
            state: self.session.state(),
            generation: self.session.generation(),
            last_heartbeat: self.state.watchdog.last_heartbeat(),
            buffered: self.state.buffer.len(),
            reconnects: self.reconnects,
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

fn timer(now: Instant, period: Duration) -> Interval {
    // `interval_at` panics on a zero period.
    let period = period.max(Duration::from_millis(1));
    let mut interval = interval_at(now + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Replace the machine's telemetry snapshot, creating a placeholder for
/// machines we have not seen yet.
fn apply_machine_update(machines: &SharedStore<Machine>, event: BufferedEvent<MachineDynamicData>) {
    let mut store = machines.write();
    let mut machine = store
        .get(&event.entity_id)
        .cloned()
        .unwrap_or_else(|| Machine::placeholder(event.entity_id.clone()));
    machine.apply_dynamic(event.payload, Utc::now());
    store.set(machine);
}
