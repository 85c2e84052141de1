use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Canonical per-person key derived from a display name.
///
/// Several raw display names may collapse onto one key (see `relay-users`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IdentityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an extracted document's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Txt,
}

/// What a turn carries besides its text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPayload {
    TextOnly,
    /// Already size-bounded JPEG bytes.
    WithImage { image: Vec<u8> },
    /// Raw extracted text, before control-character cleaning.
    WithExtractedDocument { kind: DocumentKind, text: String },
}

/// One message unit in a conversation history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TurnRecord", into = "TurnRecord")]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub payload: TurnPayload,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            payload: TurnPayload::TextOnly,
        }
    }

    pub fn user(text: impl Into<String>, payload: TurnPayload) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            payload,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            payload: TurnPayload::TextOnly,
        }
    }
}

/// On-disk shape of a turn: `role`, `content`, plus at most one side field.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TurnRecord {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pdf_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    txt_text: Option<String>,
}

impl From<Turn> for TurnRecord {
    fn from(turn: Turn) -> Self {
        let mut record = TurnRecord {
            role: turn.role,
            content: turn.text,
            image_base64: None,
            pdf_text: None,
            txt_text: None,
        };
        match turn.payload {
            TurnPayload::TextOnly => {}
            TurnPayload::WithImage { image } => {
                record.image_base64 =
                    Some(base64::engine::general_purpose::STANDARD.encode(image));
            }
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text,
            } => record.pdf_text = Some(text),
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                text,
            } => record.txt_text = Some(text),
        }
        record
    }
}

impl TryFrom<TurnRecord> for Turn {
    type Error = String;

    // A hand-edited record with several side fields keeps the first of
    // image, pdf, txt.
    fn try_from(record: TurnRecord) -> Result<Self, Self::Error> {
        let payload = if let Some(b64) = record.image_base64 {
            let image = base64::engine::general_purpose::STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| format!("invalid image_base64: {e}"))?;
            TurnPayload::WithImage { image }
        } else if let Some(text) = record.pdf_text {
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text,
            }
        } else if let Some(text) = record.txt_text {
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                text,
            }
        } else {
            TurnPayload::TextOnly
        };

        Ok(Turn {
            role: record.role,
            text: record.content,
            payload,
        })
    }
}

/// Ordered, append-only turns for one identity.
///
/// The first turn is the persona `system` turn written at first contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// Start a history with the persona turn for `key`.
    pub fn for_identity(key: &IdentityKey) -> Self {
        Self {
            turns: vec![Turn::system(persona_for(key))],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

/// Persona text for the system turn of `key`'s history.
pub fn persona_for(key: &IdentityKey) -> String {
    format!(
        "You are {key}'s personal AI assistant. This user's name is {key}; \
         remember previous conversations and file contents."
    )
}

/// A typed unit inside one outbound model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image { bytes: Vec<u8>, mime_type: String },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(t) => Some(t),
            ContentPart::Image { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_turn_serializes_without_side_fields() {
        let json = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn image_turn_uses_base64_side_field() {
        let turn = Turn::user(
            "look",
            TurnPayload::WithImage {
                image: vec![0xff, 0xd8, 0xff],
            },
        );
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["image_base64"], "/9j/");
        assert!(json.get("pdf_text").is_none());

        let back: Turn = serde_json::from_value(json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn document_kinds_map_to_their_own_fields() {
        let pdf = Turn::user(
            "",
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text: "page one".into(),
            },
        );
        let txt = Turn::user(
            "",
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                text: "plain".into(),
            },
        );
        assert_eq!(serde_json::to_value(&pdf).unwrap()["pdf_text"], "page one");
        assert_eq!(serde_json::to_value(&txt).unwrap()["txt_text"], "plain");
    }

    #[test]
    fn legacy_record_without_content_loads() {
        let turn: Turn = serde_json::from_str(r#"{"role":"user","txt_text":"x"}"#).unwrap();
        assert_eq!(turn.text, "");
        assert!(matches!(
            turn.payload,
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Txt,
                ..
            }
        ));
    }

    #[test]
    fn bad_base64_is_a_parse_error() {
        let result: Result<Turn, _> =
            serde_json::from_str(r#"{"role":"user","content":"","image_base64":"@@@"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn history_starts_with_persona() {
        let key = IdentityKey::from("Kim");
        let history = History::for_identity(&key);
        assert_eq!(history.len(), 1);
        assert_eq!(history.turns()[0].role, Role::System);
        assert!(history.turns()[0].text.contains("Kim"));
    }

    #[test]
    fn non_ascii_is_not_escaped() {
        let turn = Turn::user("안녕하세요", TurnPayload::TextOnly);
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("안녕하세요"));
    }
}
