//! Conversation and attachment types shared by every aiscope crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a chat turn, in the provider's role vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    /// The human asking for the analysis
    User,

    /// A previous answer produced by the model
    Model,
}

impl Role {
    /// Translate a caller-side role label.
    ///
    /// Only `user` maps to [`Role::User`]; every other label (`assistant`,
    /// `model`, `bot`, ...) is treated as a model turn.
    pub fn from_label(label: &str) -> Self {
        if label == "user" {
            Role::User
        } else {
            Role::Model
        }
    }

    /// Wire label expected by the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl From<String> for Role {
    fn from(label: String) -> Self {
        Role::from_label(&label)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of conversation history.
///
/// History order is significant and is replayed verbatim to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a model turn.
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }

    /// Create a turn from a caller-supplied role label.
    pub fn from_label(label: &str, content: impl Into<String>) -> Self {
        Self {
            role: Role::from_label(label),
            content: content.into(),
        }
    }
}

/// Processing state of an uploaded file on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Uploaded, still being processed
    Pending,

    /// Processed and usable as an attachment
    Ready,

    /// Processing failed, never usable
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileState::Pending => write!(f, "pending"),
            FileState::Ready => write!(f, "ready"),
            FileState::Failed => write!(f, "failed"),
        }
    }
}

/// Handle to provider-side processed content, produced by an upload.
///
/// The core only reads these; creation and state polling belong to the
/// upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Provider resource name (e.g. `files/abc123`)
    pub name: String,

    /// URI the provider accepts inside a request part
    pub uri: String,

    /// MIME type of the uploaded content
    pub mime_type: String,

    /// Human-readable name, if one was given at upload time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    pub state: FileState,
}

impl FileReference {
    pub fn is_ready(&self) -> bool {
        self.state == FileState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_translation() {
        assert_eq!(Role::from_label("user"), Role::User);
        assert_eq!(Role::from_label("assistant"), Role::Model);
        assert_eq!(Role::from_label("model"), Role::Model);
        assert_eq!(Role::from_label("User"), Role::Model);
        assert_eq!(Role::from_label(""), Role::Model);
    }

    #[test]
    fn test_chat_turn_deserializes_free_form_roles() {
        let turns: Vec<ChatTurn> = serde_json::from_str(
            r#"[{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]"#,
        )
        .unwrap();

        assert_eq!(turns[0], ChatTurn::user("hi"));
        assert_eq!(turns[1], ChatTurn::model("hello"));
    }

    #[test]
    fn test_chat_turn_serializes_provider_labels() {
        let json = serde_json::to_value(ChatTurn::from_label("bot", "x")).unwrap();
        assert_eq!(json["role"], "model");
    }

    #[test]
    fn test_file_reference_readiness() {
        let mut file = FileReference {
            name: "files/abc".to_string(),
            uri: "https://example.test/files/abc".to_string(),
            mime_type: "text/plain".to_string(),
            display_name: None,
            state: FileState::Pending,
        };
        assert!(!file.is_ready());

        file.state = FileState::Ready;
        assert!(file.is_ready());
    }
}
