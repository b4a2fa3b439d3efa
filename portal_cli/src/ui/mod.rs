pub mod cli;
pub mod menu;
pub mod session;
pub mod terminal;

use std::time::Duration;

use portal_core::connections::ssh::PtySettings;
use portal_core::{AppConfig, ProfileStore, Relay, SshConnector};

/// Everything the front end needs, built once from the static config.
pub struct App {
    pub store: ProfileStore,
    pub connector: SshConnector,
    pub relay: Relay,
    pub pty: PtySettings,
    pub countdown: Duration,
}

impl App {
    pub fn new(store: ProfileStore, config: &AppConfig) -> Self {
        Self {
            store,
            connector: SshConnector::new(config.connect_settings()),
            relay: Relay::new(config.drain_policy()),
            pty: config.ssh.pty.clone(),
            countdown: config.countdown(),
        }
    }
}
