use std::io;
use std::thread;
use std::time::Duration;

use log::info;
use portal_core::connections::ConnectionError;
use portal_core::{ConnectionProfile, RelayOutcome};

use super::menu::section_header;
use super::terminal::RawTerminalInput;
use super::App;

/// "Connecting to 10.0.0.5 as deploy in: 3 seconds... 2 seconds... 1 seconds..."
pub fn countdown(app: &App, profile: &ConnectionProfile) {
    let secs = app.countdown.as_secs();
    if secs == 0 {
        return;
    }
    println!(
        "Connecting to {} as {} in:",
        profile.address, profile.username
    );
    for i in (1..=secs).rev() {
        println!("{i} seconds...");
        thread::sleep(Duration::from_secs(1));
    }
}

/// Connects, relays an interactive shell until the user leaves, and tears
/// everything down. Connection failures are reported, not returned.
pub fn run_session(app: &App, name: &str, profile: &ConnectionProfile) {
    let Some(session) = app.connector.connect_or_report(name, profile) else {
        println!("Failed to connect to {name}.");
        return;
    };
    println!("Connected to {name} successfully.");

    let mut shell = match session.open_shell(&app.pty) {
        Ok(shell) => shell,
        Err(e) => {
            println!("{e}");
            println!("Connection closed.");
            return;
        }
    };

    print!("{}", section_header("Interactive SSH Session"));
    println!("Type your commands below.");

    // raw mode ends with this block, before the closing messages
    let result = {
        match RawTerminalInput::new() {
            Ok(mut input) => app.relay.run(&mut shell, &mut input, &mut io::stdout()),
            Err(e) => Err(ConnectionError::Io(e)),
        }
    };
    // closes the shell if the relay never got to run
    drop(shell);

    match result {
        Ok(RelayOutcome::Interrupted) => println!("Closing connection."),
        Ok(RelayOutcome::RemoteClosed) => println!("Remote host ended the session."),
        Ok(outcome) => info!("Session with '{}' ended: {:?}", name, outcome),
        Err(e) => println!("Session error: {e}"),
    }
    println!("Connection closed.");
}
