//! The response half of the wire protocol: what an instruction expects and receives.

/// One line of a response.
///
/// `Debug` lines (conventionally lines prefixed with `#` on the wire) are
/// diagnostic: they must be shown to the user but never participate in
/// pass/fail comparison. `Normal` lines are compared case-insensitively.
#[derive(Debug, Clone)]
pub enum ResponseMessage {
    Normal(String),
    Debug(String),
}

impl ResponseMessage {
    pub fn text(&self) -> &str {
        match self {
            Self::Normal(s) | Self::Debug(s) => s,
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Self::Debug(_))
    }
}

impl PartialEq for ResponseMessage {
    /// Case-insensitive, whitespace-trimmed comparison of the payload.
    /// A `Normal` and a `Debug` message with equal text are NOT equal: the
    /// variant is part of identity, only the rendered text is case-folded.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Normal(a), Self::Normal(b)) | (Self::Debug(a), Self::Debug(b)) => {
                a.trim().eq_ignore_ascii_case(b.trim())
            }
            _ => false,
        }
    }
}

impl Eq for ResponseMessage {}

/// An ordered sequence of response messages, either the expected contract of
/// an instruction or what it actually received.
#[derive(Debug, Clone, Default)]
pub struct Response {
    messages: Vec<ResponseMessage>,
}

impl Response {
    pub fn new(messages: Vec<ResponseMessage>) -> Self {
        Self { messages }
    }

    pub fn empty() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn single_normal(line: impl Into<String>) -> Self {
        Self {
            messages: vec![ResponseMessage::Normal(line.into())],
        }
    }

    /// Build a response from raw multi-line text, splitting on `\n` and
    /// routing any line beginning with `#` to `Debug`.
    pub fn from_raw_text(text: &str) -> Self {
        let messages = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                if line.trim_start().starts_with('#') {
                    ResponseMessage::Debug(line.to_string())
                } else {
                    ResponseMessage::Normal(line.to_string())
                }
            })
            .collect();
        Self { messages }
    }

    pub fn all(&self) -> &[ResponseMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ResponseMessage> {
        self.messages
    }

    pub fn normal_messages(&self) -> impl Iterator<Item = &ResponseMessage> {
        self.messages.iter().filter(|m| !m.is_debug())
    }

    pub fn debug_messages(&self) -> impl Iterator<Item = &ResponseMessage> {
        self.messages.iter().filter(|m| m.is_debug())
    }

    pub fn push(&mut self, message: ResponseMessage) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Remove the first `Normal` message, leaving any leading `Debug`
    /// messages untouched. Used by `RuntimeSql`'s `remove_header` flag.
    pub fn remove_first_normal(&mut self) {
        if let Some(pos) = self.messages.iter().position(|m| !m.is_debug()) {
            self.messages.remove(pos);
        }
    }

    /// Stable reorder used by `Sort`: `Debug` messages keep their original
    /// relative order and come first; `Normal` messages are sorted by
    /// upper-case lexicographic key and come after.
    pub fn sorted(&self) -> Self {
        let mut debugs: Vec<ResponseMessage> = self
            .messages
            .iter()
            .filter(|m| m.is_debug())
            .cloned()
            .collect();
        let mut normals: Vec<ResponseMessage> = self
            .messages
            .iter()
            .filter(|m| !m.is_debug())
            .cloned()
            .collect();
        normals.sort_by_key(|m| m.text().to_uppercase());
        debugs.append(&mut normals);
        Self { messages: debugs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_is_case_insensitive_and_idempotent() {
        let resp = Response::new(vec![
            ResponseMessage::Normal("banana".to_string()),
            ResponseMessage::Normal("Apple".to_string()),
            ResponseMessage::Normal("cherry".to_string()),
        ]);
        let once = resp.sorted();
        let texts: Vec<&str> = once.normal_messages().map(ResponseMessage::text).collect();
        assert_eq!(texts, vec!["Apple", "banana", "cherry"]);

        let twice = once.sorted();
        let texts_twice: Vec<&str> = twice.normal_messages().map(ResponseMessage::text).collect();
        assert_eq!(texts, texts_twice);
    }

    #[test]
    fn sorted_keeps_debug_lines_first_in_original_order() {
        let resp = Response::new(vec![
            ResponseMessage::Normal("b".to_string()),
            ResponseMessage::Debug("#note2".to_string()),
            ResponseMessage::Normal("a".to_string()),
            ResponseMessage::Debug("#note1".to_string()),
        ]);
        let sorted = resp.sorted();
        let all: Vec<(&str, bool)> = sorted.all().iter().map(|m| (m.text(), m.is_debug())).collect();
        assert_eq!(
            all,
            vec![("#note2", true), ("#note1", true), ("a", false), ("b", false)]
        );
    }

    #[test]
    fn normal_message_equality_is_case_and_whitespace_insensitive() {
        assert_eq!(
            ResponseMessage::Normal("  Foo  ".to_string()),
            ResponseMessage::Normal("foo".to_string())
        );
        assert_ne!(
            ResponseMessage::Normal("foo".to_string()),
            ResponseMessage::Debug("foo".to_string())
        );
    }
}
