//! Line-oriented console on top of a raw-mode terminal.
//!
//! All keyboard input arrives as `char`s on one channel, fed by a reader
//! thread.  The control loop waits on it with a timeout.  Prompts read from the
//! same channel, so a prompt and the loop can never race for a keystroke.

use std::io::Write;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::debug;
use tui_input::{Input, InputRequest};

pub const KEY_ENTER: char = '\n';
pub const KEY_BACKSPACE: char = '\x7f';
pub const KEY_ESC: char = '\x1b';
pub const KEY_INTERRUPT: char = '\x03';

/// Output side.  In raw mode the terminal no longer turns `\n` into `\r\n`,
/// so `msg` does it.
pub struct Console {
    out: Box<dyn Write + Send>,
    raw: bool,
}

impl Console {
    pub fn new(out: Box<dyn Write + Send>, raw: bool) -> Self {
        Self { out, raw }
    }

    pub fn stdout(raw: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), raw)
    }

    /// Print and flush.  A broken stdout is not worth tearing the session down for.
    pub fn msg(&mut self, text: &str) {
        let result = if self.raw && text.contains('\n') {
            self.out.write_all(text.replace('\n', "\r\n").as_bytes())
        } else {
            self.out.write_all(text.as_bytes())
        };
        if let Err(e) = result.and_then(|_| self.out.flush()) {
            debug!("console write failed: {}", e);
        }
    }
}

/// Input side.
pub struct Keys {
    rx: mpsc::Receiver<char>,
}

impl Keys {
    pub fn from_channel(rx: mpsc::Receiver<char>) -> Self {
        Self { rx }
    }

    /// Start a thread that forwards terminal key presses.  It exits once the
    /// receiving side is dropped.
    pub fn spawn_terminal_reader() -> Self {
        let (tx, rx) = mpsc::channel::<char>(64);
        std::thread::spawn(move || {
            while !tx.is_closed() {
                match event::poll(Duration::from_millis(200)) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        debug!("key reader: poll failed: {}", e);
                        break;
                    }
                }
                let key = match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("key reader: read failed: {}", e);
                        break;
                    }
                };
                let ch = match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        KEY_INTERRUPT
                    }
                    KeyCode::Char(c) => c,
                    KeyCode::Enter => KEY_ENTER,
                    KeyCode::Backspace => KEY_BACKSPACE,
                    KeyCode::Esc => KEY_ESC,
                    _ => continue,
                };
                if tx.blocking_send(ch).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Next key, waiting as long as it takes.  `None` once input is closed.
    pub async fn next(&mut self) -> Option<char> {
        self.rx.recv().await
    }
}

/// Console plus keyboard: everything a prompt needs.
pub struct Term {
    pub console: Console,
    pub keys: Keys,
}

impl Term {
    pub fn new(console: Console, keys: Keys) -> Self {
        Self { console, keys }
    }

    pub fn msg(&mut self, text: &str) {
        self.console.msg(text);
    }

    /// Single keystroke, e.g. for `[yn]` questions.
    pub async fn read_key(&mut self) -> Option<char> {
        self.keys.next().await
    }

    /// Read one line of text.  Esc or Ctrl-C abort with `None`; so does
    /// closed input.  With `echo` off nothing typed is shown.
    pub async fn read_line(&mut self, prompt: &str, echo: bool) -> Option<String> {
        self.msg(prompt);
        let mut input = Input::default();
        loop {
            let ch = match self.keys.next().await {
                Some(ch) => ch,
                None => {
                    self.msg("\n");
                    return None;
                }
            };
            match ch {
                KEY_ENTER | '\r' => {
                    self.msg("\n");
                    return Some(input.value().to_string());
                }
                KEY_ESC | KEY_INTERRUPT => {
                    self.msg("\n");
                    return None;
                }
                KEY_BACKSPACE | '\x08' => {
                    if input.handle(InputRequest::DeletePrevChar).is_some() && echo {
                        self.msg("\x08 \x08");
                    }
                }
                c if !c.is_control() => {
                    input.handle(InputRequest::InsertChar(c));
                    if echo {
                        let mut buf = [0u8; 4];
                        self.msg(c.encode_utf8(&mut buf));
                    }
                }
                _ => {}
            }
        }
    }

    /// Read a non-negative integer.  Empty or non-numeric input yields `None`.
    pub async fn read_index(&mut self, prompt: &str) -> Option<usize> {
        let line = self.read_line(prompt, true).await?;
        parse_index(&line)
    }
}

pub fn parse_index(line: &str) -> Option<usize> {
    if line.is_empty() || !line.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    line.parse().ok()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer that keeps everything printed, for assertions.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// A `Term` whose keys come from the returned sender and whose output lands
    /// in the returned buffer.
    pub fn scripted_term() -> (Term, mpsc::Sender<char>, SharedBuf) {
        let (tx, rx) = mpsc::channel(256);
        let buf = SharedBuf::default();
        let term = Term::new(
            Console::new(Box::new(buf.clone()), false),
            Keys::from_channel(rx),
        );
        (term, tx, buf)
    }

    pub async fn type_str(tx: &mpsc::Sender<char>, text: &str) {
        for ch in text.chars() {
            tx.send(ch).await.unwrap();
        }
    }
}
