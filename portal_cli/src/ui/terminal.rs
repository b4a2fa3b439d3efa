use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use portal_core::core::{LineSource, LocalInput};

/// Keeps the terminal in raw mode for as long as it lives.
/// crossterm internally remembers the previous mode and restores it.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Line input for the relay, read key by key in raw mode so Ctrl+C arrives
/// as a key instead of killing the process.
///
/// Typed characters are echoed locally; Backspace edits, Enter submits,
/// Ctrl+C interrupts and Ctrl+D on an empty line ends input.
pub struct RawTerminalInput {
    _raw: RawModeGuard,
    echo: io::Stdout,
}

impl RawTerminalInput {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            _raw: RawModeGuard::enable()?,
            echo: io::stdout(),
        })
    }

    fn echo(&mut self, text: &str) -> io::Result<()> {
        self.echo.write_all(text.as_bytes())?;
        self.echo.flush()
    }
}

impl LineSource for RawTerminalInput {
    fn next_line(&mut self) -> io::Result<LocalInput> {
        let mut line = String::new();
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match classify(&key, line.is_empty()) {
                Keystroke::Interrupt => {
                    self.echo("^C\r\n")?;
                    return Ok(LocalInput::Interrupt);
                }
                Keystroke::EndOfInput => {
                    self.echo("\r\n")?;
                    return Ok(LocalInput::Closed);
                }
                Keystroke::Submit => {
                    self.echo("\r\n")?;
                    return Ok(LocalInput::Line(line));
                }
                Keystroke::Erase => {
                    if line.pop().is_some() {
                        self.echo("\x08 \x08")?;
                    }
                }
                Keystroke::Char(c) => {
                    line.push(c);
                    let mut buf = [0u8; 4];
                    self.echo(c.encode_utf8(&mut buf))?;
                }
                Keystroke::Ignored => {}
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Keystroke {
    Interrupt,
    EndOfInput,
    Submit,
    Erase,
    Char(char),
    Ignored,
}

fn classify(key: &KeyEvent, line_empty: bool) -> Keystroke {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Keystroke::Interrupt,
        KeyCode::Char('d') if ctrl && line_empty => Keystroke::EndOfInput,
        KeyCode::Char(_) if ctrl => Keystroke::Ignored,
        KeyCode::Char(c) => Keystroke::Char(c),
        KeyCode::Enter => Keystroke::Submit,
        KeyCode::Backspace => Keystroke::Erase,
        KeyCode::Tab => Keystroke::Char('\t'),
        _ => Keystroke::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_interrupts_regardless_of_line() {
        let ctrl_c = key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(classify(&ctrl_c, true), Keystroke::Interrupt);
        assert_eq!(classify(&ctrl_c, false), Keystroke::Interrupt);
    }

    #[test]
    fn ctrl_d_only_ends_input_on_an_empty_line() {
        let ctrl_d = key(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(classify(&ctrl_d, true), Keystroke::EndOfInput);
        assert_eq!(classify(&ctrl_d, false), Keystroke::Ignored);
    }

    #[test]
    fn printable_keys_are_typed() {
        assert_eq!(
            classify(&key(KeyCode::Char('L'), KeyModifiers::SHIFT), false),
            Keystroke::Char('L')
        );
        assert_eq!(classify(&key(KeyCode::Enter, KeyModifiers::NONE), false), Keystroke::Submit);
        assert_eq!(classify(&key(KeyCode::Up, KeyModifiers::NONE), false), Keystroke::Ignored);
    }
}
