use serde::Deserialize;

/// Top-level shape of a Telegram `result.json` chat export. Only the fields
/// this tool consumes are listed; everything else is ignored by serde.
#[derive(Debug, Deserialize)]
pub(super) struct RawExport {
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawMessage {
    #[serde(default)]
    pub(super) id: Option<i64>,
    #[serde(default, rename = "type")]
    pub(super) kind: Option<String>,
    #[serde(default)]
    pub(super) date: Option<String>,
    #[serde(default)]
    pub(super) date_unixtime: Option<String>,
    #[serde(default)]
    pub(super) from: Option<String>,
    #[serde(default)]
    pub(super) reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub(super) text: RawText,
    #[serde(default)]
    pub(super) reactions: Vec<RawReaction>,
    #[serde(default)]
    pub(super) photo: Option<String>,
    #[serde(default)]
    pub(super) file: Option<String>,
    #[serde(default)]
    pub(super) media_type: Option<String>,
}

/// A message body is either a plain string or a list of typed spans
/// (bold, link, mention, ...). Exports mix both freely, sometimes within
/// one message.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawText {
    Plain(String),
    Spans(Vec<RawTextSpan>),
}

impl Default for RawText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawTextSpan {
    Plain(String),
    Typed {
        #[serde(default)]
        text: String,
    },
}

impl RawText {
    /// Flatten either representation into plain display text.
    pub(super) fn flatten(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Spans(spans) => {
                let mut flat = String::new();
                for span in spans {
                    match span {
                        RawTextSpan::Plain(text) => flat.push_str(text),
                        RawTextSpan::Typed { text } => flat.push_str(text),
                    }
                }
                flat
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawReaction {
    // Custom-emoji reactions carry a document id instead of an emoji glyph.
    #[serde(default)]
    pub(super) emoji: Option<String>,
    #[serde(default)]
    pub(super) count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_plain_string_text() {
        let text: RawText = serde_json::from_str(r#""just a string""#).unwrap();
        assert_eq!(text.flatten(), "just a string");
    }

    #[test]
    fn flattens_mixed_span_list() {
        let text: RawText = serde_json::from_str(
            r#"["see ", {"type": "bold", "text": "this"}, {"type": "link", "text": "https://example.org"}]"#,
        )
        .unwrap();
        assert_eq!(text.flatten(), "see thishttps://example.org");
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let message: RawMessage = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(message.id, Some(7));
        assert!(message.reply_to_message_id.is_none());
        assert!(message.reactions.is_empty());
        assert_eq!(message.text.flatten(), "");
    }
}
