use super::Clipboard;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;

/// Sets the clipboard through the terminal emulator using the OSC 52 escape
/// sequence.
pub struct TerminalClipboard {
    out: Mutex<Box<dyn Write + Send>>,
    require_tty: bool,
}

impl TerminalClipboard {
    /// Writes to stderr, which must be a terminal.
    pub fn stderr() -> Self {
        Self {
            out: Mutex::new(Box::new(std::io::stderr())),
            require_tty: true,
        }
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(writer),
            require_tty: false,
        }
    }
}

pub fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{}\x07", encoded)
}

#[async_trait]
impl Clipboard for TerminalClipboard {
    fn name(&self) -> &'static str {
        "terminal"
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        if self.require_tty && !std::io::stderr().is_terminal() {
            return Err(Error::Clipboard("stderr is not a terminal".to_string()));
        }

        let mut out = self
            .out
            .lock()
            .map_err(|_| Error::Clipboard("terminal writer poisoned".to_string()))?;
        out.write_all(osc52_sequence(text).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_osc52_sequence() {
        assert_eq!(osc52_sequence("x^2"), "\x1b]52;c;eF4y\x07");
    }

    #[tokio::test]
    async fn test_writes_sequence_to_writer() {
        let buffer = SharedBuffer::default();
        let clipboard = TerminalClipboard::with_writer(Box::new(buffer.clone()));

        clipboard.write_text("x^2").await.unwrap();

        let written = buffer.0.lock().unwrap().clone();
        assert_eq!(String::from_utf8(written).unwrap(), osc52_sequence("x^2"));
    }
}
