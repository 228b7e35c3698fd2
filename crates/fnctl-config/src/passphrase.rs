use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use fnctl_core::{FnError, PassphraseSource, Result};
use std::io::{BufRead, IsTerminal, Write};

/// Passphrase Source that asks on the terminal.
///
/// The prompt goes to stderr and input is not echoed. When stdin is not a
/// terminal a single line is read instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPassphraseSource;

impl PassphraseSource for TerminalPassphraseSource {
    fn challenge(&self, id: &str, prompt: &str) -> Result<String> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} ", prompt)?;
        stderr.flush()?;

        let secret = if std::io::stdin().is_terminal() {
            read_hidden()?
        } else {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        };
        writeln!(stderr)?;

        if secret.is_empty() {
            return Err(FnError::Key(format!("no pass phrase entered for '{}'", id)));
        }
        Ok(secret)
    }
}

/// Leaves raw mode on drop
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_hidden() -> Result<String> {
    let _raw = RawMode::enable()?;
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(FnError::Cancelled);
                }
                KeyCode::Esc => return Err(FnError::Cancelled),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}
