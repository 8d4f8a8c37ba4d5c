//! Event-stream line classification

/// Prefix of a payload-bearing event-stream line
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends OpenAI-compatible streams
pub const DONE_PAYLOAD: &str = "[DONE]";

/// One decoded line of a streamed response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFrame<'a> {
    /// Trimmed payload following `data: `
    Data(&'a str),
    /// `data: [DONE]`
    Terminator,
    /// Blank keep-alives, comments, `event:` and `id:` fields
    Ignorable,
}

impl<'a> StreamFrame<'a> {
    pub fn classify(line: &'a str) -> Self {
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return StreamFrame::Ignorable;
        };
        let payload = rest.trim();
        if payload == DONE_PAYLOAD {
            StreamFrame::Terminator
        } else if payload.is_empty() {
            StreamFrame::Ignorable
        } else {
            StreamFrame::Data(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_data() {
        assert_eq!(
            StreamFrame::classify(r#"data: {"a":1}"#),
            StreamFrame::Data(r#"{"a":1}"#)
        );
        assert_eq!(
            StreamFrame::classify("data:   {\"a\":1}  \r"),
            StreamFrame::Data("{\"a\":1}")
        );
    }

    #[test]
    fn test_classify_terminator() {
        assert_eq!(StreamFrame::classify("data: [DONE]"), StreamFrame::Terminator);
        assert_eq!(StreamFrame::classify("data: [DONE]  "), StreamFrame::Terminator);
    }

    #[test]
    fn test_classify_ignorable() {
        for line in ["", ": keep-alive", "event: message", "id: 7", "data:{\"a\":1}", "data: ", " data: x"] {
            assert_eq!(StreamFrame::classify(line), StreamFrame::Ignorable, "line {:?}", line);
        }
    }
}
