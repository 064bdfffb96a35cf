//! Minimal ADC message builder.
//!
//! Only what the hub core emits itself: a four-letter command followed by
//! space-separated, escaped arguments, terminated by a newline.

use bytes::Bytes;

/// Hub-to-client quit notification.
pub const CMD_IQUI: &str = "IQUI";

/// Broadcast user information.
pub const CMD_BINF: &str = "BINF";

/// Tells receivers to drop any direct connection to the quitting session.
pub const QUI_FLAG_DISCONNECT: &str = "DI1";

/// A protocol message under construction.
#[derive(Debug, Clone)]
pub struct AdcMessage {
    line: String,
}

impl AdcMessage {
    pub fn new(command: &str) -> Self {
        debug_assert_eq!(command.len(), 4, "ADC commands are four characters");
        let mut line = String::with_capacity(32);
        line.push_str(command);
        Self { line }
    }

    /// Append one argument, escaping ADC separators.
    pub fn add_argument(&mut self, arg: &str) -> &mut Self {
        self.line.push(' ');
        for c in arg.chars() {
            match c {
                ' ' => self.line.push_str("\\s"),
                '\n' => self.line.push_str("\\n"),
                '\\' => self.line.push_str("\\\\"),
                _ => self.line.push(c),
            }
        }
        self
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// Finish the message. The returned buffer is cheap to clone per recipient.
    pub fn into_bytes(mut self) -> Bytes {
        self.line.push('\n');
        Bytes::from(self.line)
    }
}
