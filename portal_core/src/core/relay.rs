use std::io::{self, Write};

use log::{debug, info};

use crate::connections::{ConnectionError, DrainPolicy, ShellChannel};

/// One unit of local input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalInput {
    /// A line without its terminator.
    Line(String),
    /// The user pressed the interrupt key.
    Interrupt,
    /// Local input is exhausted (EOF).
    Closed,
}

/// Where the relay gets the user's lines from (raw-mode terminal, script, ...).
pub trait LineSource {
    fn next_line(&mut self) -> io::Result<LocalInput>;
}

/// Why streaming ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// `exit` or `quit` was typed.
    Quit,
    Interrupted,
    InputClosed,
    RemoteClosed,
}

/// `exit` and `quit` in any case end the session locally and are never
/// sent to the remote shell.
pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// The read-local / send-remote / drain loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relay {
    drain: DrainPolicy,
}

impl Relay {
    pub fn new(drain: DrainPolicy) -> Self {
        Self { drain }
    }

    /// Streams until the user quits, interrupts or runs out of input, or the
    /// remote hangs up. The channel is closed afterwards on every path,
    /// including errors; a streaming error takes precedence over a close error.
    pub fn run<C, I, W>(
        &self,
        channel: &mut C,
        input: &mut I,
        output: &mut W,
    ) -> Result<RelayOutcome, ConnectionError>
    where
        C: ShellChannel + ?Sized,
        I: LineSource + ?Sized,
        W: Write + ?Sized,
    {
        let streamed = self.stream(channel, input, output);
        let closed = channel.close();

        match &streamed {
            Ok(outcome) => info!("Relay ended: {:?}", outcome),
            Err(e) => info!("Relay aborted: {}", e),
        }
        let outcome = streamed?;
        closed?;
        Ok(outcome)
    }

    fn stream<C, I, W>(
        &self,
        channel: &mut C,
        input: &mut I,
        output: &mut W,
    ) -> Result<RelayOutcome, ConnectionError>
    where
        C: ShellChannel + ?Sized,
        I: LineSource + ?Sized,
        W: Write + ?Sized,
    {
        // an empty line makes the shell print its banner and prompt
        channel.send(b"\n")?;
        self.drain_into(channel, output)?;

        loop {
            if channel.remote_closed() {
                return Ok(RelayOutcome::RemoteClosed);
            }

            let line = match input.next_line()? {
                LocalInput::Line(line) => line,
                LocalInput::Interrupt => return Ok(RelayOutcome::Interrupted),
                LocalInput::Closed => return Ok(RelayOutcome::InputClosed),
            };
            if is_exit_command(&line) {
                return Ok(RelayOutcome::Quit);
            }

            let mut command = line.into_bytes();
            command.push(b'\n');
            debug!("Sending {} bytes", command.len());
            channel.send(&command)?;
            self.drain_into(channel, output)?;
        }
    }

    /// Output goes out verbatim, including the remote echo of the command.
    fn drain_into<C, W>(&self, channel: &mut C, output: &mut W) -> Result<(), ConnectionError>
    where
        C: ShellChannel + ?Sized,
        W: Write + ?Sized,
    {
        let chunk = channel.read_until_idle(self.drain)?;
        if !chunk.is_empty() {
            output.write_all(&chunk)?;
            output.flush()?;
        }
        Ok(())
    }
}
