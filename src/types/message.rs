use serde::{Deserialize, Serialize};

/// Role of the author of a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// One message of a conversation.
///
/// Messages are immutable once created; a conversation is an ordered `Vec<Message>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The role of the message.
    pub role: Role,

    /// The text of the message.
    pub content: String,
}

impl Message {
    /// Create a new `Message` with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user `Message`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_serializes_to_wire_shape() {
        let message = Message::user("Hello!");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({"role": "user", "content": "Hello!"})
        );
    }

    #[test]
    fn assistant_role_round_trips() {
        let message: Message =
            serde_json::from_value(json!({"role": "assistant", "content": "Hi"})).unwrap();
        assert_eq!(message, Message::assistant("Hi"));
    }

    #[test]
    fn from_str_is_user() {
        let message: Message = "question".into();
        assert_eq!(message.role, Role::User);
    }
}
