// tests/hw_ssh.rs
//! Talks to a real sshd. Point it at a disposable account:
//!
//! ```sh
//! PORTAL_TEST_HOST=127.0.0.1 PORTAL_TEST_USER=tester PORTAL_TEST_PASSWORD=secret \
//!     cargo test -p portal_core --features hw-tests --test hw_ssh
//! ```
#![cfg(feature = "hw-tests")]

use std::env;
use std::io;

use log::LevelFilter;
use portal_core::connections::ssh::{PtySettings, SshConnector};
use portal_core::connections::ConnectionError;
use portal_core::core::{LineSource, LocalInput, Relay, RelayOutcome};
use portal_core::storage::KeyKind;

struct Target {
    host: String,
    user: String,
    password: String,
}

fn target() -> Target {
    //   Logs will appear only when you run with `-- --nocapture`
    //   or when the test fails.
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let var = |name: &str| env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));
    Target {
        host: var("PORTAL_TEST_HOST"),
        user: var("PORTAL_TEST_USER"),
        password: var("PORTAL_TEST_PASSWORD"),
    }
}

struct Lines(Vec<&'static str>);

impl LineSource for Lines {
    fn next_line(&mut self) -> io::Result<LocalInput> {
        if self.0.is_empty() {
            return Ok(LocalInput::Closed);
        }
        Ok(LocalInput::Line(self.0.remove(0).to_string()))
    }
}

#[test]
fn wrong_password_is_an_authentication_failure() {
    let t = target();
    let result = SshConnector::default().connect_to(
        &t.host,
        &t.user,
        "definitely-not-the-password",
        KeyKind::Password,
    );
    assert!(
        matches!(result, Err(ConnectionError::AuthenticationFailed { .. })),
        "got {:?}",
        result.err()
    );
}

#[test]
fn interactive_shell_echoes_commands() -> anyhow::Result<()> {
    let t = target();
    let session = SshConnector::default().connect_to(&t.host, &t.user, &t.password, KeyKind::Password)?;
    let mut shell = session.open_shell(&PtySettings::default())?;

    let mut screen = Vec::new();
    let outcome = Relay::default().run(
        &mut shell,
        &mut Lines(vec!["echo portal-$((40+2))", "exit"]),
        &mut screen,
    )?;

    assert_eq!(outcome, RelayOutcome::Quit);
    assert!(String::from_utf8_lossy(&screen).contains("portal-42"));
    Ok(())
}
