//! [`ResponseStream`]: the single-consumption fragment stream returned by a chat session.
//!
//! The stream is a scoped guard over one pending turn. Exactly one release happens per stream:
//! draining it to the end commits the turn, [`ResponseStream::rewind`] withdraws it and
//! [`ResponseStream::discard`] stops early. A turn whose reply is blank is withdrawn rather than
//! committed, since the API refuses empty model parts in later requests. Dropping an unreleased
//! stream rewinds the turn and logs an error.

use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, error};

use crate::error::GenerationError;
use crate::types::Fragment;

/// Fragment items as produced by the backend.
pub type FragmentStream = BoxStream<'static, Result<Fragment, GenerationError>>;

/// The session-side half of a turn that has been submitted but not yet settled.
pub trait PendingTurn: Send {
    /// Records the model's reply and makes the turn part of the context.
    fn commit(self: Box<Self>, reply: String);
    /// Withdraws the user turn as if it had never been sent.
    fn rewind(self: Box<Self>);
}

/// How a stream was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Open,
    Drained,
    Discarded,
    Rewound,
}

pub struct ResponseStream {
    inner: FragmentStream,
    turn: Option<Box<dyn PendingTurn>>,
    text: String,
    release: Release,
}

impl ResponseStream {
    pub fn new(inner: FragmentStream, turn: Box<dyn PendingTurn>) -> Self {
        Self {
            inner,
            turn: Some(turn),
            text: String::new(),
            release: Release::Open,
        }
    }

    /// Builds a stream from a fixed list of items. Useful for sessions that already hold the whole
    /// answer, and for tests.
    pub fn from_items(
        items: Vec<Result<Fragment, GenerationError>>,
        turn: Box<dyn PendingTurn>,
    ) -> Self {
        Self::new(futures::stream::iter(items).boxed(), turn)
    }

    /// Next fragment. Returns `None` once exhausted, committing the accumulated text as the reply
    /// (or withdrawing the turn when no text arrived). Errors are yielded as items; the stream stays
    /// open and the caller decides how to release it.
    pub async fn next(&mut self) -> Option<Result<Fragment, GenerationError>> {
        if self.release != Release::Open {
            return None;
        }
        match self.inner.next().await {
            Some(Ok(fragment)) => {
                if let Some(t) = &fragment.text {
                    self.text.push_str(t);
                }
                Some(Ok(fragment))
            }
            Some(Err(e)) => Some(Err(e)),
            None => {
                self.settle();
                self.release = Release::Drained;
                debug!("response stream drained");
                None
            }
        }
    }

    /// Stops consuming. Partial text, if any, is kept as the reply; otherwise the turn is withdrawn.
    pub fn discard(mut self) {
        self.settle();
        self.release = Release::Discarded;
    }

    /// Commits the text received so far, or withdraws the turn if it is blank.
    fn settle(&mut self) {
        let Some(turn) = self.turn.take() else {
            return;
        };
        if self.text.trim().is_empty() {
            debug!("blank reply; withdrawing turn");
            turn.rewind();
        } else {
            turn.commit(std::mem::take(&mut self.text));
        }
    }

    /// Withdraws the turn from the session.
    pub fn rewind(mut self) {
        if let Some(turn) = self.turn.take() {
            turn.rewind();
        }
        self.release = Release::Rewound;
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn release(&self) -> Release {
        self.release
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            error!("response stream dropped without being drained, rewound or discarded; rewinding turn");
            turn.rewind();
        }
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("release", &self.release)
            .field("text_len", &self.text.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Outcome {
        Committed(String),
        Rewound,
    }

    struct RecordingTurn(Arc<Mutex<Vec<Outcome>>>);

    impl PendingTurn for RecordingTurn {
        fn commit(self: Box<Self>, reply: String) {
            self.0.lock().unwrap().push(Outcome::Committed(reply));
        }
        fn rewind(self: Box<Self>) {
            self.0.lock().unwrap().push(Outcome::Rewound);
        }
    }

    fn stream(items: Vec<Result<Fragment, GenerationError>>) -> (ResponseStream, Arc<Mutex<Vec<Outcome>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let s = ResponseStream::from_items(items, Box::new(RecordingTurn(log.clone())));
        (s, log)
    }

    /// **Test: Draining commits the concatenated text exactly once.**
    #[tokio::test]
    async fn test_drain_commits_once() {
        let (mut s, log) = stream(vec![
            Ok(Fragment::text("Hel")),
            Ok(Fragment::empty()),
            Ok(Fragment::text("lo")),
        ]);
        while let Some(item) = s.next().await {
            item.unwrap();
        }
        assert!(s.next().await.is_none());
        assert_eq!(s.release(), Release::Drained);
        drop(s);
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Committed("Hello".to_string())]);
    }

    /// **Test: Draining a stream that produced no text withdraws the turn instead of committing "".**
    #[tokio::test]
    async fn test_drain_without_text_rewinds() {
        let (mut s, log) = stream(vec![Ok(Fragment::empty())]);
        while s.next().await.is_some() {}
        assert_eq!(s.release(), Release::Drained);
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Rewound]);

        let (mut s, log) = stream(vec![Ok(Fragment::text("\n")), Ok(Fragment::text("  "))]);
        while s.next().await.is_some() {}
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Rewound]);
    }

    /// **Test: Rewind after an error withdraws the turn; no commit.**
    #[tokio::test]
    async fn test_rewind_after_error() {
        let (mut s, log) = stream(vec![
            Ok(Fragment::text("The answer is")),
            Err(GenerationError::Halted("Safety".to_string())),
            Ok(Fragment::text(" 42")),
        ]);
        assert!(s.next().await.unwrap().is_ok());
        assert!(s.next().await.unwrap().is_err());
        s.rewind();
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Rewound]);
    }

    /// **Test: Discard keeps partial text as the reply; with no text it withdraws the turn.**
    #[tokio::test]
    async fn test_discard() {
        let (mut s, log) = stream(vec![Ok(Fragment::text("part")), Ok(Fragment::text("ial"))]);
        s.next().await;
        s.discard();
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Committed("part".to_string())]);

        let (s, log) = stream(vec![Ok(Fragment::text("x"))]);
        s.discard();
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Rewound]);
    }

    /// **Test: Dropping an unreleased stream rewinds the turn.**
    #[tokio::test]
    async fn test_drop_unreleased_rewinds() {
        let (mut s, log) = stream(vec![Ok(Fragment::text("a")), Ok(Fragment::text("b"))]);
        s.next().await;
        drop(s);
        assert_eq!(*log.lock().unwrap(), vec![Outcome::Rewound]);
    }
}
