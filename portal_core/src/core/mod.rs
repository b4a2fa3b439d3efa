pub mod relay;

pub use relay::{is_exit_command, LineSource, LocalInput, Relay, RelayOutcome};
