use serde::{Deserialize, Serialize};

/// Credential variant selecting the API-key backend entry point.
pub const ACCESS_TYPE_API_KEY: &str = "0";
/// Credential variant selecting the access-token backend entry point.
pub const ACCESS_TYPE_ACCESS_TOKEN: &str = "1";

/// One message in the request transcript sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestMessage {
    pub role: String,
    pub content: String,
}

/// Provider and sampling configuration attached to one request.
///
/// Field names follow the camelCase wire format the backend expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    pub api_key: String,
    pub access_token: String,
    pub access_type: String,
    pub proxy: Option<String>,
    pub model: String,
    pub system_message: String,
    pub temperature: f32,
}

/// Identifiers that continue an existing provider-side conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
}

/// Combined per-request configuration: chat options plus conversation
/// continuation, flattened into a single wire object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequestOptions {
    #[serde(flatten)]
    pub chat: ChatOptions,
    #[serde(flatten)]
    pub conversation: ConversationRequest,
}

impl ChatRequestOptions {
    pub fn new(chat: ChatOptions) -> Self {
        Self {
            chat,
            conversation: ConversationRequest::default(),
        }
    }

    pub fn with_conversation(mut self, conversation: ConversationRequest) -> Self {
        self.conversation = conversation;
        self
    }
}

/// The payload handed to a backend entry point: the correlation id, the
/// request transcript, and the combined options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInvocation {
    pub id: u32,
    pub messages: Vec<RequestMessage>,
    pub option: ChatRequestOptions,
}

/// One streamed update for an in-flight request, tagged with its correlation
/// id. Field names follow the snake_case format of the progress channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressPayload {
    pub id: u32,
    pub detail: String,
    pub finish_reason: String,
    pub role: String,
    pub conversation_id: Option<String>,
    pub parent_message_id: Option<String>,
}
