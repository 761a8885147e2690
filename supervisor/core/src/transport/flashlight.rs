//! Flashlight Transport
//!
//! Client-only pluggable transport that runs the standalone flashlight
//! executable. Server mode is not supported.
//!
//! # State Machine
//!
//! ```text
//!            start_client                 ready
//! Stopped ────────────────► Starting ─────────────► Running
//!    ▲                         │                       │
//!    │        failure          │                       │ stop_client
//!    ├─────────────────────────┘                       ▼
//!    └──────────────────────────────────────────── Stopping
//! ```
//!
//! `stop_client` is valid from every state and always ends in `Stopped`.
//! Transitions are serialized by an async mutex held for the whole start or
//! stop, so a shared `Flashlight` never double-spawns or double-kills.
//!
//! A process that exits on its own is noticed by a per-launch exit watcher,
//! which empties the client slot and publishes `Stopped`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use crate::invocation;
use crate::probe::{EphemeralPortAllocator, LivenessProber, PortAllocator};
use crate::readiness::ReadinessGate;
use crate::resolver::{
    find_executable, ExecutableLocator, HostInfo, InstallTreeLocator,
    FLASHLIGHT_EXECUTABLE_NAMES,
};
use crate::supervisor::{ProcessHandle, ProcessSupervisor};

use super::config::FlashlightConfig;
use super::traits::{PluggableTransport, TransportError};

/// Lifecycle state of the transport client
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    /// No process
    #[default]
    Stopped,
    /// Process launched, waiting for it to accept connections
    Starting,
    /// Process accepting connections
    Running,
    /// Process being terminated
    Stopping,
}

/// The one client session a transport may own
#[derive(Default)]
struct ClientSlot {
    handle: Option<ProcessHandle>,
    addr: Option<SocketAddr>,
    /// Bumped on every launch so a stale exit watcher leaves a newer process alone
    generation: u64,
}

/// Publishes `Stopped` if a start is dropped before it finishes
///
/// The half-started process is already gone by then: dropping its handle
/// destroys it.
struct CancelGuard<'a> {
    state: Option<&'a watch::Sender<TransportState>>,
}

impl<'a> CancelGuard<'a> {
    fn new(state: &'a watch::Sender<TransportState>) -> Self {
        Self { state: Some(state) }
    }

    fn disarm(mut self) {
        self.state = None;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            tracing::warn!("Flashlight start cancelled");
            state.send_replace(TransportState::Stopped);
        }
    }
}

/// Flashlight pluggable transport
pub struct Flashlight {
    config: FlashlightConfig,
    /// Resolved once at construction
    base_path: PathBuf,
    ports: Arc<dyn PortAllocator>,
    readiness: ReadinessGate,
    supervisor: ProcessSupervisor,
    client: Arc<Mutex<ClientSlot>>,
    state: Arc<watch::Sender<TransportState>>,
}

impl Flashlight {
    /// Create a transport for the running host
    ///
    /// The installation directory is resolved from `config.install_root`
    /// here, once; the executable itself is looked up on each start.
    pub fn new(config: FlashlightConfig) -> Self {
        let locator = InstallTreeLocator::new(config.install_root.clone());
        Self::with_locator(config, &locator, &HostInfo::current())
    }

    /// Create a transport using a custom locator and host description
    pub fn with_locator(
        config: FlashlightConfig,
        locator: &dyn ExecutableLocator,
        host: &HostInfo,
    ) -> Self {
        let base_path = locator.search_path(host);
        tracing::debug!(path = ?base_path, "Flashlight base path");

        let readiness = ReadinessGate::new(config.poll_interval());
        let supervisor = ProcessSupervisor::new(config.stop_grace());
        let (state, _) = watch::channel(TransportState::Stopped);

        Self {
            config,
            base_path,
            ports: Arc::new(EphemeralPortAllocator),
            readiness,
            supervisor,
            client: Arc::new(Mutex::new(ClientSlot::default())),
            state: Arc::new(state),
        }
    }

    /// Replace the port allocator
    #[must_use]
    pub fn with_port_allocator(mut self, ports: Arc<dyn PortAllocator>) -> Self {
        self.ports = ports;
        self
    }

    /// Replace the liveness prober used by the readiness gate
    #[must_use]
    pub fn with_prober(mut self, prober: Arc<dyn LivenessProber>) -> Self {
        self.readiness = ReadinessGate::with_prober(prober, self.config.poll_interval());
        self
    }

    /// Directory searched for the executable
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Current lifecycle state
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle state changes
    pub fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.state.subscribe()
    }

    /// Address of the running client, if any
    pub async fn client_addr(&self) -> Option<SocketAddr> {
        self.client.lock().await.addr
    }

    /// Process id of the client process, if one exists
    pub async fn pid(&self) -> Option<u32> {
        self.client
            .lock()
            .await
            .handle
            .as_ref()
            .and_then(ProcessHandle::pid)
    }

    fn set_state(&self, state: TransportState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "Flashlight state transition");
        }
    }

    /// Hand a launched process to the slot and watch it for an unexpected exit
    fn occupy(&self, slot: &mut ClientSlot, handle: ProcessHandle, addr: SocketAddr) {
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let mut exit = handle.subscribe();
        let client = Arc::downgrade(&self.client);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            if exit.wait_for(|s| !s.is_running()).await.is_err() {
                return;
            }
            // Gone means the transport itself was dropped
            let Some(client) = client.upgrade() else {
                return;
            };

            let mut slot = client.lock().await;
            if slot.generation != generation {
                return;
            }
            let Some(handle) = slot.handle.take() else {
                return;
            };

            tracing::warn!(
                pid = ?handle.pid(),
                exit = ?handle.state(),
                "Flashlight process exited unexpectedly"
            );
            slot.addr = None;
            state.send_replace(TransportState::Stopped);
        });

        slot.handle = Some(handle);
        slot.addr = Some(addr);
    }

    /// Resolve, allocate, spawn and wait; leaves the slot filled on success
    async fn launch(
        &self,
        slot: &mut ClientSlot,
        bind_hint: SocketAddr,
    ) -> Result<SocketAddr, TransportError> {
        let executable = find_executable(&self.base_path, &FLASHLIGHT_EXECUTABLE_NAMES)?;

        let port = self
            .ports
            .allocate(bind_hint.ip())
            .await
            .map_err(TransportError::PortAllocation)?;
        let addr = SocketAddr::new(bind_hint.ip(), port);

        let invocation = invocation::build(&self.config, executable, addr, &self.config.extra_args);
        let mut handle = self.supervisor.start(&invocation)?;

        let timeout = self.config.readiness_timeout();
        let ready = tokio::select! {
            ready = self.readiness.wait_until_ready(addr, timeout) => ready,
            exit = handle.wait() => {
                tracing::warn!(
                    addr = %addr,
                    exit = ?exit,
                    "Flashlight exited before accepting connections"
                );
                false
            }
        };

        if !ready {
            if !handle.is_running() {
                return Err(TransportError::ReadinessTimeout { addr, timeout });
            }
            if self.config.stop_on_readiness_timeout {
                tracing::warn!(addr = %addr, "Flashlight never became ready, stopping it");
                self.supervisor.stop(&mut handle).await;
            } else {
                tracing::warn!(
                    addr = %addr,
                    pid = ?handle.pid(),
                    "Flashlight never became ready, leaving it running"
                );
                self.occupy(slot, handle, addr);
            }
            return Err(TransportError::ReadinessTimeout { addr, timeout });
        }

        self.occupy(slot, handle, addr);
        Ok(addr)
    }
}

#[async_trait]
impl PluggableTransport for Flashlight {
    fn name(&self) -> &'static str {
        "flashlight"
    }

    async fn start_client(&self, bind_hint: SocketAddr) -> Result<SocketAddr, TransportError> {
        let mut slot = self.client.lock().await;

        if let Some(handle) = slot.handle.as_ref() {
            if handle.is_running() {
                let addr = slot.addr.unwrap_or(bind_hint);
                tracing::warn!(addr = %addr, "Flashlight client already running");
                return Err(TransportError::AlreadyRunning(addr));
            }
            tracing::info!(pid = ?handle.pid(), "Clearing exited flashlight process");
            slot.handle = None;
            slot.addr = None;
        }

        tracing::info!("Starting flashlight client");
        self.set_state(TransportState::Starting);

        let cancelled = CancelGuard::new(&self.state);
        let result = self.launch(&mut slot, bind_hint).await;
        cancelled.disarm();

        match result {
            Ok(addr) => {
                tracing::info!(addr = %addr, "Flashlight client ready");
                self.set_state(TransportState::Running);
                Ok(addr)
            }
            Err(e) => {
                // A process left running after a readiness timeout keeps us in Starting
                if slot.handle.is_none() {
                    self.set_state(TransportState::Stopped);
                }
                Err(e)
            }
        }
    }

    async fn stop_client(&self) {
        let mut slot = self.client.lock().await;

        let Some(mut handle) = slot.handle.take() else {
            tracing::debug!("No flashlight client to stop");
            self.set_state(TransportState::Stopped);
            return;
        };

        tracing::info!(
            path = ?handle.program(),
            pid = ?handle.pid(),
            "Stopping flashlight client"
        );
        self.set_state(TransportState::Stopping);
        self.supervisor.stop(&mut handle).await;
        slot.addr = None;
        self.set_state(TransportState::Stopped);
    }

    async fn start_server(
        &self,
        _port: u16,
        _give_mode_addr: SocketAddr,
    ) -> Result<(), TransportError> {
        Err(TransportError::UnsupportedMode(
            "flashlight does not support server mode".into(),
        ))
    }

    async fn stop_server(&self) {}

    fn supplies_encryption(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for Flashlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flashlight")
            .field("base_path", &self.base_path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
