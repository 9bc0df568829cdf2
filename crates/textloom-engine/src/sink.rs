//! Token stream sinks: where the reconstructed events go.
//!
//! The engine emits events strictly in final document order; a sink decides
//! what to do with them. [`TextTokenStream`] concatenates literally, which
//! is all a byte-faithful round-trip needs. [`RecordingTokenStream`] keeps
//! the event sequence for assertions.

use textloom_syntax::ElemId;

pub trait TokenStream {
    /// A token carrying semantic content, tagged with the grammar element
    /// that produced it when one exists.
    fn write_semantic(&mut self, elem: Option<ElemId>, text: &str);

    /// Whitespace or comment text.
    fn write_hidden(&mut self, elem: Option<ElemId>, text: &str);

    fn flush(&mut self) {}
}

/// Concatenates every event into a string.
#[derive(Debug, Default)]
pub struct TextTokenStream {
    out: String,
}

impl TextTokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_text(self) -> String {
        self.out
    }

    pub fn text(&self) -> &str {
        &self.out
    }
}

impl TokenStream for TextTokenStream {
    fn write_semantic(&mut self, _elem: Option<ElemId>, text: &str) {
        self.out.push_str(text);
    }

    fn write_hidden(&mut self, _elem: Option<ElemId>, text: &str) {
        self.out.push_str(text);
    }
}

/// One recorded sink event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    Semantic(String),
    Hidden(String),
}

/// Records the full event sequence, for tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingTokenStream {
    pub events: Vec<TokenEvent>,
    pub flushed: bool,
}

impl RecordingTokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// The concatenated text of all events.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .map(|e| match e {
                TokenEvent::Semantic(t) | TokenEvent::Hidden(t) => t.as_str(),
            })
            .collect()
    }
}

impl TokenStream for RecordingTokenStream {
    fn write_semantic(&mut self, _elem: Option<ElemId>, text: &str) {
        self.events.push(TokenEvent::Semantic(text.to_string()));
    }

    fn write_hidden(&mut self, _elem: Option<ElemId>, text: &str) {
        self.events.push(TokenEvent::Hidden(text.to_string()));
    }

    fn flush(&mut self) {
        self.flushed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_stream_concatenates_in_order() {
        let mut s = TextTokenStream::new();
        s.write_semantic(None, "1");
        s.write_hidden(None, " ");
        s.write_semantic(None, "foo");
        assert_eq!(s.into_text(), "1 foo");
    }

    #[test]
    fn recording_stream_keeps_event_kinds() {
        let mut s = RecordingTokenStream::new();
        s.write_semantic(None, "a");
        s.write_hidden(None, "\n");
        s.flush();
        assert_eq!(
            s.events,
            vec![
                TokenEvent::Semantic("a".into()),
                TokenEvent::Hidden("\n".into())
            ]
        );
        assert!(s.flushed);
        assert_eq!(s.text(), "a\n");
    }
}
