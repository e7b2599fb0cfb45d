use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Single-keypress confirmation port. Abstract so the transaction can be
/// driven in tests without a terminal.
pub trait Prompter {
    /// Presents `question` and returns one of `allowed` (lowercase). Enter
    /// maps to `default`; other keys are ignored until an allowed one
    /// arrives.
    fn ask(&mut self, question: &str, allowed: &[char], default: char) -> io::Result<char>;
}

/// Reads one key from the real terminal in raw mode, restoring the terminal
/// state on every exit path.
pub struct TerminalPrompter;

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, question: &str, allowed: &[char], default: char) -> io::Result<char> {
        print!("{}", question);
        io::stdout().flush()?;

        let key = {
            let _guard = RawModeGuard::enable()?;

            loop {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    return Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "interrupted at confirmation prompt",
                    ));
                }

                match key.code {
                    KeyCode::Enter => break default,
                    KeyCode::Char(c) => {
                        let lowered = c.to_ascii_lowercase();
                        if allowed.contains(&lowered) {
                            break lowered;
                        }
                    }
                    _ => {}
                }
            }
        };

        // Echo the choice; raw mode suppressed the terminal's own echo.
        println!("{}", key);

        Ok(key)
    }
}
