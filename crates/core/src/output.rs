//! Scoped output capture.
//!
//! Engines write their side-channel output (notices, replies) to an
//! [`OutputChannel`]. While a session operation is in flight it opens a
//! capture with [`OutputChannel::capture`]; everything written until the
//! guard is finished or dropped lands in a private buffer instead of the
//! default sink. Dropping the guard on an error path still pops the buffer,
//! so the previous destination is always restored.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct ChannelState {
    /// Active capture buffers tagged with their capture id, innermost last.
    captures: Vec<(u64, String)>,
    /// Id handed to the next capture.
    next_id: u64,
    /// Where output goes when nothing is capturing.
    sink: Box<dyn Write + Send>,
}

/// A cloneable handle to one output destination with a capture stack.
#[derive(Clone)]
pub struct OutputChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl OutputChannel {
    /// Create a channel writing uncaptured output to `sink`.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                captures: Vec::new(),
                next_id: 0,
                sink: Box::new(sink),
            })),
        }
    }

    /// Channel over the process stdout.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Channel that discards uncaptured output.
    pub fn discard() -> Self {
        Self::new(std::io::sink())
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `text` to the innermost capture, or to the sink.
    pub fn write(&self, text: &str) {
        let mut state = self.lock();
        if let Some((_, buffer)) = state.captures.last_mut() {
            buffer.push_str(text);
            return;
        }
        if let Err(e) = state.sink.write_all(text.as_bytes()).and_then(|_| state.sink.flush()) {
            tracing::debug!(error = %e, "Output sink rejected write");
        }
    }

    /// Write `text` followed by a newline.
    pub fn writeln(&self, text: &str) {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write(&line);
    }

    /// Start capturing. Output is private until the guard finishes or drops.
    pub fn capture(&self) -> CaptureGuard {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.captures.push((id, String::new()));
        CaptureGuard {
            channel: self.clone(),
            id,
            done: false,
        }
    }

    /// Number of active captures.
    pub fn depth(&self) -> usize {
        self.lock().captures.len()
    }
}

impl std::fmt::Debug for OutputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputChannel")
            .field("depth", &self.depth())
            .finish()
    }
}

/// An active capture. Finishing returns the captured text.
pub struct CaptureGuard {
    channel: OutputChannel,
    id: u64,
    done: bool,
}

impl CaptureGuard {
    /// Text captured so far, without ending the capture.
    pub fn contents(&self) -> String {
        let state = self.channel.lock();
        state
            .captures
            .iter()
            .find(|(id, _)| *id == self.id)
            .map(|(_, buffer)| buffer.clone())
            .unwrap_or_default()
    }

    /// End the capture and return everything written into it.
    ///
    /// Captures opened after this one and still alive are closed too.
    pub fn finish(mut self) -> String {
        self.done = true;
        self.pop()
    }

    fn pop(&self) -> String {
        let mut state = self.channel.lock();
        // Already closed by an enclosing capture that finished first.
        let Some(at) = state.captures.iter().position(|(id, _)| *id == self.id) else {
            return String::new();
        };
        let (_, captured) = state.captures.swap_remove(at);
        state.captures.truncate(at);
        captured
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if !self.done {
            self.pop();
        }
    }
}
