//! Persisted user-state shapes.
//!
//! The whole aggregate is stored as one JSON blob; serde field defaults point
//! at [`defaults`](super::defaults) so fields absent from an older blob fall
//! back to their default instead of failing deserialization. Field names keep
//! the camelCase format of the blob.

use serde::{Deserialize, Serialize};

use crate::core::config::defaults;

/// Display identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default = "defaults::default_avatar")]
    pub avatar: String,
    #[serde(default = "defaults::default_name")]
    pub name: Option<String>,
}

/// Provider selection and network parameters.
///
/// Both credential lists are retained regardless of which `access_type` is
/// active, so switching variants does not lose previously entered values.
/// Lists preserve insertion order and enforce no uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default = "defaults::default_model_name")]
    pub model_name: String,
    /// `"0"` = API key, `"1"` = access token.
    #[serde(default = "defaults::default_access_type")]
    pub access_type: String,
    #[serde(default = "defaults::default_api_key")]
    pub api_key: String,
    #[serde(default = "defaults::default_access_token")]
    pub access_token: String,
    #[serde(default = "defaults::default_proxy")]
    pub proxy: Option<String>,
    #[serde(default = "defaults::default_host")]
    pub host: String,
    #[serde(default = "defaults::default_max_token_num")]
    pub max_token_num: u32,
    #[serde(default)]
    pub api_key_list: Vec<String>,
    #[serde(default)]
    pub access_token_list: Vec<String>,
    #[serde(default = "defaults::default_host_list")]
    pub host_list: Vec<String>,
}

/// The sole unit persisted to storage: identity plus configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "defaults::default_user_info")]
    pub user_info: UserInfo,
    #[serde(default = "defaults::default_user_config")]
    pub user_config: UserConfig,
}

impl Default for UserInfo {
    fn default() -> Self {
        defaults::default_user_info()
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        defaults::default_user_config()
    }
}

impl Default for UserState {
    fn default() -> Self {
        defaults::default_setting()
    }
}

/// Shallow-merge patch for [`UserInfo`]. `name` is itself nullable, hence the
/// nested `Option`.
#[derive(Debug, Clone, Default)]
pub struct UserInfoPatch {
    pub avatar: Option<String>,
    pub name: Option<Option<String>>,
}

impl UserInfo {
    pub fn apply(&mut self, patch: UserInfoPatch) {
        if let Some(avatar) = patch.avatar {
            self.avatar = avatar;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
    }
}
