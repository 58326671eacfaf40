use std::sync::mpsc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::error::ConsoleError;
use crate::model::Decoded;
use crate::model::Snapshot;
use crate::model::World;
use crate::playback::PlaybackCommand;

pub const FLOORPLAN_ENDPOINT: &str = "/floorplan.json";
pub const SNAPSHOT_ENDPOINT: &str = "/dotbots.json";

/// Read side of the simulation backend.
pub trait SimulationBackend: Send {
    fn fetch_world(&self) -> Result<World, ConsoleError>;

    fn fetch_snapshot(&self) -> Result<Decoded<Snapshot>, ConsoleError>;
}

/// Write side: one-shot operator commands. Implementations must not block the caller on the network.
pub trait CommandSink {
    fn dispatch(&self, command: PlaybackCommand);
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConsoleError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::blocking::Client, base_url: &str) -> Self {
        Self { client, base_url: normalize_base_url(base_url) }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn get_json(&self, endpoint: &'static str) -> Result<Value, ConsoleError> {
        let response = self.client.get(self.url(endpoint)).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::BackendStatus { endpoint, status: status.as_u16() });
        }
        Ok(response.json::<Value>()?)
    }

    /// Post a command and wait for the backend's answer.
    pub fn post_command(&self, command: &PlaybackCommand) -> Result<(), ConsoleError> {
        let endpoint = command.endpoint();
        let mut request = self.client.post(self.url(endpoint));
        if let Some(body) = command.body() {
            request = request.json(&body);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::BackendStatus { endpoint, status: status.as_u16() });
        }
        Ok(())
    }
}

impl SimulationBackend for HttpBackend {
    fn fetch_world(&self) -> Result<World, ConsoleError> {
        World::from_value(self.get_json(FLOORPLAN_ENDPOINT)?)
    }

    fn fetch_snapshot(&self) -> Result<Decoded<Snapshot>, ConsoleError> {
        Snapshot::decode(&self.get_json(SNAPSHOT_ENDPOINT)?)
    }
}

/// Strip trailing slashes and default to plain http when no scheme is given.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") }
}

type RejectionHandler = Box<dyn Fn(PlaybackCommand, ConsoleError) + Send>;

/// Fire-and-forget command sender backed by a worker thread.
///
/// Commands are posted in the order they were dispatched. The worker exits once the sink is dropped.
pub struct HttpCommandSink {
    tx: mpsc::Sender<PlaybackCommand>,
}

impl HttpCommandSink {
    pub fn spawn(backend: HttpBackend, on_rejected: impl Fn(PlaybackCommand, ConsoleError) + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        let on_rejected: RejectionHandler = Box::new(on_rejected);
        let _join_handle = std::thread::spawn(move || command_thread(backend, rx, on_rejected));
        Self { tx }
    }
}

impl CommandSink for HttpCommandSink {
    fn dispatch(&self, command: PlaybackCommand) {
        if self.tx.send(command).is_err() {
            warn!(endpoint = command.endpoint(), "command worker is gone, dropping command");
        }
    }
}

fn command_thread(backend: HttpBackend, rx: mpsc::Receiver<PlaybackCommand>, on_rejected: RejectionHandler) {
    debug!(base_url = backend.base_url(), "starting command thread");
    while let Ok(command) = rx.recv() {
        match backend.post_command(&command) {
            Ok(()) => debug!(endpoint = command.endpoint(), ?command, "command accepted"),
            Err(e) => {
                warn!(endpoint = command.endpoint(), error = %e, "command rejected");
                on_rejected(command, e);
            }
        }
    }
    debug!("command thread exiting");
}
