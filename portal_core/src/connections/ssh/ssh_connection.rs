use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use ssh2::{Channel, ErrorCode, Session};

use super::host_keys::HostKeyPolicy;
use super::key_file::{load_key_file, KeyFile};
use crate::connections::{drain_until_idle, ConnectionError, DrainPolicy, ShellChannel};
use crate::storage::{parse_ipv4, ConnectionProfile, KeyKind};

// libssh2 error codes that mean "the server said no".
const LIBSSH2_ERROR_FILE: i32 = -16;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;
const LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED: i32 = -19;

const CLOSE_TIMEOUT_MS: u32 = 2_000;

/// Terminal requested for the remote shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PtySettings {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
}

impl Default for PtySettings {
    fn default() -> Self {
        Self {
            term: "xterm".into(),
            cols: 80,
            rows: 24,
        }
    }
}

/// Transport settings shared by every profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSettings {
    pub port: u16,
    /// `None` leaves TCP connect and handshake to the OS/libssh2 defaults.
    pub connect_timeout: Option<Duration>,
    pub host_keys: HostKeyPolicy,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: None,
            host_keys: HostKeyPolicy::default(),
        }
    }
}

/// Turns profiles into authenticated sessions.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    settings: ConnectSettings,
}

impl SshConnector {
    pub fn new(settings: ConnectSettings) -> Self {
        Self { settings }
    }

    pub fn connect(&self, profile: &ConnectionProfile) -> Result<SshSession, ConnectionError> {
        self.connect_to(
            &profile.address,
            &profile.username,
            &profile.credential,
            profile.key_kind,
        )
    }

    /// Like [`connect`](Self::connect), but logs the failure and hands back
    /// `None` instead of an error.
    pub fn connect_or_report(&self, name: &str, profile: &ConnectionProfile) -> Option<SshSession> {
        match self.connect(profile) {
            Ok(session) => Some(session),
            Err(e) => {
                error!("Connecting to '{}' failed: {}", name, e);
                None
            }
        }
    }

    /// Opens TCP, handshakes, checks the host key and authenticates.
    ///
    /// For key kinds the key file is located and checked first, so a bad
    /// path fails without any network traffic.
    pub fn connect_to(
        &self,
        address: &str,
        username: &str,
        credential: &str,
        key_kind: KeyKind,
    ) -> Result<SshSession, ConnectionError> {
        let key = if key_kind.uses_key_file() {
            Some(load_key_file(credential, key_kind)?)
        } else {
            None
        };

        let ip = parse_ipv4(address).ok_or_else(|| {
            ConnectionError::TransportError(format!("'{address}' is not an IPv4 address"))
        })?;
        let addr = SocketAddr::from((ip, self.settings.port));
        info!("Connecting to SSH server at {} as {}", addr, username);

        let tcp = match self.settings.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|e| ConnectionError::TransportError(format!("TCP connect to {addr}: {e}")))?;

        let mut session = Session::new()?;
        if let Some(timeout) = self.settings.connect_timeout {
            session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }
        session.set_tcp_stream(tcp);
        session.handshake()?;
        debug!("Handshake with {} done", addr);

        self.settings
            .host_keys
            .verify(&session, address, self.settings.port)?;
        authenticate(&session, username, credential, key.as_ref())?;
        session.set_timeout(0);

        info!("SSH connection to {} established", addr);
        Ok(SshSession {
            session,
            peer: addr.to_string(),
        })
    }
}

fn authenticate(
    session: &Session,
    username: &str,
    credential: &str,
    key: Option<&KeyFile>,
) -> Result<(), ConnectionError> {
    let result = match key {
        None => session.userauth_password(username, credential),
        Some(key) => session.userauth_pubkey_file(username, None, &key.path, None),
    };

    result.map_err(|e| match (e.code(), key) {
        (ErrorCode::Session(LIBSSH2_ERROR_FILE), Some(key)) => ConnectionError::InvalidKeyFile {
            path: key.path.clone(),
            kind: key.kind,
        },
        (
            ErrorCode::Session(
                LIBSSH2_ERROR_AUTHENTICATION_FAILED | LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED,
            ),
            _,
        ) => ConnectionError::AuthenticationFailed {
            username: username.to_string(),
        },
        _ => ConnectionError::from(e),
    })?;

    if !session.authenticated() {
        return Err(ConnectionError::AuthenticationFailed {
            username: username.to_string(),
        });
    }
    Ok(())
}

/// An authenticated session with no shell yet.
pub struct SshSession {
    session: Session,
    peer: String,
}

impl SshSession {
    /// Requests a pty and a shell. The session moves into the returned
    /// [`SshShell`], which owns its teardown from then on.
    pub fn open_shell(self, pty: &PtySettings) -> Result<SshShell, ConnectionError> {
        let channel = match self.start_shell(pty) {
            Ok(channel) => channel,
            Err(e) => {
                let _ = self.session.disconnect(None, "Shell request failed", None);
                return Err(e);
            }
        };
        self.session.set_blocking(false);
        info!("Shell open on {}", self.peer);

        Ok(SshShell {
            session: self.session,
            channel,
            peer: self.peer,
            closed: false,
        })
    }

    fn start_shell(&self, pty: &PtySettings) -> Result<Channel, ConnectionError> {
        let shell_error = |e: ssh2::Error| ConnectionError::Channel(format!("cannot open shell: {e}"));
        let mut channel = self.session.channel_session().map_err(shell_error)?;
        channel
            .request_pty(&pty.term, None, Some((pty.cols, pty.rows, 0, 0)))
            .map_err(shell_error)?;
        channel.shell().map_err(shell_error)?;
        Ok(channel)
    }
}

/// A running remote shell. Closes channel and session on [`close`](ShellChannel::close)
/// or, failing that, on drop.
pub struct SshShell {
    session: Session,
    channel: Channel,
    peer: String,
    closed: bool,
}

impl ShellChannel for SshShell {
    fn send(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        self.session.set_blocking(true);
        let result = self
            .channel
            .write_all(data)
            .and_then(|()| self.channel.flush());
        self.session.set_blocking(false);
        result.map_err(|e| ConnectionError::Channel(format!("write to {}: {}", self.peer, e)))
    }

    fn read_until_idle(&mut self, policy: DrainPolicy) -> Result<Vec<u8>, ConnectionError> {
        let output = drain_until_idle(&mut self.channel, Channel::eof, policy)
            .map_err(|e| ConnectionError::Channel(format!("read from {}: {}", self.peer, e)))?;
        debug!("Drained {} bytes from {}", output.len(), self.peer);
        Ok(output)
    }

    fn remote_closed(&self) -> bool {
        self.channel.eof()
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.session.set_blocking(true);
        self.session.set_timeout(CLOSE_TIMEOUT_MS);
        let channel_result = self
            .channel
            .close()
            .and_then(|()| self.channel.wait_close());
        let session_result = self.session.disconnect(None, "Connection closed", None);
        info!("Closed SSH session to {}", self.peer);

        channel_result?;
        session_result?;
        Ok(())
    }
}

impl Drop for SshShell {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("Error while closing {} on drop: {}", self.peer, e);
        }
    }
}
