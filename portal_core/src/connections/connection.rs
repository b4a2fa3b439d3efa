use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};

use super::errors::ConnectionError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// When to stop polling a shell for output.
///
/// Interactive output has no framing, so "done" is a guess: the drain ends
/// once nothing has arrived for `settle`, or after `max_wait` in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPolicy {
    pub settle: Duration,
    pub max_wait: Duration,
}

impl Default for DrainPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(250),
            max_wait: Duration::from_secs(5),
        }
    }
}

impl DrainPolicy {
    /// Reproduces a plain "sleep, then take what is there" drain.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            settle: delay,
            max_wait: delay,
        }
    }
}

/// A trait representing an open interactive shell (SSH channel, test fake, ...).
pub trait ShellChannel {
    /// Sends `data` to the remote side, flushing it.
    fn send(&mut self, data: &[u8]) -> Result<(), ConnectionError>;

    /// Collects output until the channel goes idle as described by `policy`.
    /// Returns an empty vector when nothing arrived.
    fn read_until_idle(&mut self, policy: DrainPolicy) -> Result<Vec<u8>, ConnectionError>;

    /// `true` once the remote end has hung up (e.g. the user typed `logout`).
    fn remote_closed(&self) -> bool {
        false
    }

    /// Releases the channel and whatever session sits underneath it.
    /// Calling it more than once is harmless.
    fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Reads a non-blocking `reader` until it goes idle under `policy` or
/// `at_eof` reports the remote side is done.
///
/// `max_wait` is checked after every read, so a source that never stops
/// producing still ends the drain on time.
pub fn drain_until_idle<R, F>(reader: &mut R, at_eof: F, policy: DrainPolicy) -> io::Result<Vec<u8>>
where
    R: Read + ?Sized,
    F: Fn(&R) -> bool,
{
    let started = Instant::now();
    let mut last_data = started;
    let mut output = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let got_data = match reader.read(&mut buf) {
            Ok(0) if at_eof(&*reader) => break,
            Ok(0) => false,
            Ok(n) => {
                output.extend_from_slice(&buf[..n]);
                last_data = Instant::now();
                true
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                false
            }
            Err(e) => return Err(e),
        };

        let now = Instant::now();
        if now - started >= policy.max_wait {
            break;
        }
        if got_data {
            continue;
        }
        if now - last_data >= policy.settle {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(output)
}
