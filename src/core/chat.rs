//! Chat session and transcript shapes.
//!
//! Pure data declarations shared between the UI and the API layer; no
//! behavior lives here. Serialized names keep the camelCase format used by
//! the persisted session blobs.

use serde::{Deserialize, Serialize};

use crate::api::models::{ConversationRequest, RequestMessage};

/// The request that produced a chat entry, kept so the entry can be
/// regenerated or continued later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ConversationRequest>,
}

/// One rendered message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub date_time: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_num: Option<u32>,
    /// True for user-authored entries, false/absent for assistant output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inversion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_options: Option<ConversationRequest>,
    pub request_options: RequestOptions,
}

/// Summary line for the conversation list sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub title: String,
    pub is_edit: bool,
    pub uuid: u64,
}

/// Per-session overrides of the chat options; every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One conversation: its entries plus the option overrides it was started
/// with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub uuid: u64,
    pub data: Vec<ChatEntry>,
    #[serde(default)]
    pub opt: ChatOptionsPatch,
}

/// Everything the chat pane needs: the active session id, the sidebar
/// summaries, and the sessions themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    pub active: Option<u64>,
    #[serde(default)]
    pub history: Vec<History>,
    #[serde(default)]
    pub chat: Vec<ChatSession>,
}

impl ChatEntry {
    pub fn to_request_message(&self) -> RequestMessage {
        RequestMessage {
            role: if self.inversion.unwrap_or(false) {
                "user".to_string()
            } else {
                "assistant".to_string()
            },
            content: self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, inversion: bool) -> ChatEntry {
        ChatEntry {
            date_time: "2026-08-29 10:00:00".into(),
            text: text.into(),
            token_num: None,
            inversion: Some(inversion),
            error: None,
            loading: None,
            conversation_options: None,
            request_options: RequestOptions {
                prompt: text.into(),
                options: None,
            },
        }
    }

    #[test]
    fn chat_state_serializes_with_camel_case_keys() {
        let state = ChatState {
            active: Some(42),
            history: vec![History {
                title: "First chat".into(),
                is_edit: false,
                uuid: 42,
            }],
            chat: vec![ChatSession {
                uuid: 42,
                data: vec![entry("hello", true)],
                opt: ChatOptionsPatch::default(),
            }],
        };

        let value = serde_json::to_value(&state).expect("serialize chat state");
        assert_eq!(value["history"][0]["isEdit"], false);
        assert_eq!(value["chat"][0]["data"][0]["dateTime"], "2026-08-29 10:00:00");
        assert_eq!(value["chat"][0]["data"][0]["requestOptions"]["prompt"], "hello");
    }

    #[test]
    fn inversion_determines_request_role() {
        assert_eq!(entry("q", true).to_request_message().role, "user");
        assert_eq!(entry("a", false).to_request_message().role, "assistant");
    }

    #[test]
    fn session_tolerates_missing_option_overrides() {
        let session: ChatSession =
            serde_json::from_str(r#"{"uuid":1,"data":[]}"#).expect("deserialize session");
        assert_eq!(session.opt, ChatOptionsPatch::default());
    }
}
