//! Default user state.
//!
//! Every persisted field has a default here; the per-field functions double
//! as serde defaults so a partial or outdated blob deserializes with the
//! missing fields filled in rather than failing.

use crate::api::models::ACCESS_TYPE_API_KEY;
use crate::core::config::data::{UserConfig, UserInfo, UserState};

/// Version written into freshly persisted state; see
/// [`store::migrate`](crate::core::config::store::migrate).
pub const STATE_VERSION: u32 = 1;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PROXY: &str = "socks5://127.0.0.1:7890";
pub const DEFAULT_MAX_TOKEN_NUM: u32 = 4096;

pub const DEFAULT_HOSTS: [&str; 2] = [
    "https://bypass.duti.tech/api/conversation",
    "https://api.openai.com/v1/chat/completions",
];

/// The fixed model catalog offered in the settings UI; not derived from
/// configuration.
pub const MODEL_CATALOG: [&str; 6] = [
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-0301",
    "gpt-4",
    "gpt-4-0314",
    "gpt-4-32k",
    "gpt-4-32k-0314",
];

pub(crate) fn default_avatar() -> String {
    String::new()
}

pub(crate) fn default_name() -> Option<String> {
    Some("Tom".to_string())
}

pub(crate) fn default_model_name() -> String {
    DEFAULT_MODEL.to_string()
}

pub(crate) fn default_access_type() -> String {
    ACCESS_TYPE_API_KEY.to_string()
}

// Default credentials come from the environment at construction time so a
// packaged build can ship without any baked-in secret.
pub(crate) fn default_api_key() -> String {
    std::env::var("OPENAI_API_KEY").unwrap_or_default()
}

pub(crate) fn default_access_token() -> String {
    std::env::var("OPENAI_ACCESS_TOKEN").unwrap_or_default()
}

pub(crate) fn default_proxy() -> Option<String> {
    Some(DEFAULT_PROXY.to_string())
}

pub(crate) fn default_host() -> String {
    DEFAULT_HOSTS[0].to_string()
}

pub(crate) fn default_max_token_num() -> u32 {
    DEFAULT_MAX_TOKEN_NUM
}

pub(crate) fn default_host_list() -> Vec<String> {
    DEFAULT_HOSTS.iter().map(|host| host.to_string()).collect()
}

pub fn default_user_info() -> UserInfo {
    UserInfo {
        avatar: default_avatar(),
        name: default_name(),
    }
}

pub fn default_user_config() -> UserConfig {
    UserConfig {
        model_name: default_model_name(),
        access_type: default_access_type(),
        api_key: default_api_key(),
        access_token: default_access_token(),
        proxy: default_proxy(),
        host: default_host(),
        max_token_num: default_max_token_num(),
        api_key_list: Vec::new(),
        access_token_list: Vec::new(),
        host_list: default_host_list(),
    }
}

/// A complete default state, the base every persisted blob is merged over.
pub fn default_setting() -> UserState {
    UserState {
        version: STATE_VERSION,
        user_info: default_user_info(),
        user_config: default_user_config(),
    }
}

/// The fixed catalog of supported model names.
pub fn all_models() -> &'static [&'static str] {
    &MODEL_CATALOG
}
