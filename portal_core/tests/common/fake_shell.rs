//! A deterministic **in‑process stand‑in** for an interactive remote shell
//! plus a scripted keyboard.
//!
//! *  `FakeShell` hands out canned output chunks, one per drain, and records
//!    everything the relay sent and how often it was closed.
//! *  `ScriptedInput` replays a fixed list of `LocalInput`s and reports
//!    `Closed` once they run out.
//!
//! Together they let tests drive `Relay::run` without a socket or a tty.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;

use portal_core::connections::{ConnectionError, DrainPolicy, ShellChannel};
use portal_core::core::{LineSource, LocalInput};

#[derive(Default)]
pub struct FakeShell {
    /// Returned by successive `read_until_idle` calls; empty once used up.
    pub replies: VecDeque<Vec<u8>>,
    /// Every chunk the relay sent, in order.
    pub sent: Vec<Vec<u8>>,
    pub close_calls: usize,
    /// Policies the relay drained with.
    pub drains: Vec<DrainPolicy>,
    /// Fail the send with this index (0 = the initial empty line).
    pub fail_send_at: Option<usize>,
    /// Report the remote as gone once this many sends happened.
    pub hang_up_after: Option<usize>,
}

impl FakeShell {
    pub fn with_replies<I, B>(replies: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self {
            replies: replies.into_iter().map(|r| r.as_ref().to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }
}

impl ShellChannel for FakeShell {
    fn send(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        if self.fail_send_at == Some(self.sent.len()) {
            return Err(ConnectionError::Channel("broken pipe".into()));
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn read_until_idle(&mut self, policy: DrainPolicy) -> Result<Vec<u8>, ConnectionError> {
        self.drains.push(policy);
        Ok(self.replies.pop_front().unwrap_or_default())
    }

    fn remote_closed(&self) -> bool {
        self.hang_up_after
            .is_some_and(|sends| self.sent.len() >= sends)
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        self.close_calls += 1;
        Ok(())
    }
}

pub struct ScriptedInput {
    script: VecDeque<LocalInput>,
}

impl ScriptedInput {
    pub fn lines(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| LocalInput::Line(l.to_string())))
    }

    pub fn new(script: impl IntoIterator<Item = LocalInput>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl LineSource for ScriptedInput {
    fn next_line(&mut self) -> io::Result<LocalInput> {
        Ok(self.script.pop_front().unwrap_or(LocalInput::Closed))
    }
}
