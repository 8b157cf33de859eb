//! Settings store.
//!
//! Single source of truth for user identity and provider configuration. Every
//! read goes through in-memory state; every mutation persists the whole state
//! back to storage before returning. Initialization overlays the persisted
//! blob (possibly absent, partial, or from an older version) onto a complete
//! default state.

use serde_json::Value;

use crate::core::config::data::{UserConfig, UserInfo, UserInfoPatch, UserState};
use crate::core::config::defaults::{self, STATE_VERSION};
use crate::core::config::io::{Storage, StorageError};

/// Fixed key the user-state blob is stored under.
pub const STORAGE_KEY: &str = "user-state";

/// Upgrade a raw persisted blob to the current state version.
///
/// Runs before deserialization so structural changes are handled explicitly;
/// fields that are merely missing are filled in afterwards by the serde
/// defaults on [`UserState`].
///
/// - v0 (unversioned) blobs predate the candidate host list: seed `hostList`
///   from the active `host` if present.
pub fn migrate(mut raw: Value) -> Value {
    let version = raw.get("version").and_then(Value::as_u64).unwrap_or(0);
    if version < 1 {
        if let Some(config) = raw.get_mut("userConfig").and_then(Value::as_object_mut) {
            if !config.contains_key("hostList") {
                if let Some(host) = config.get("host").and_then(Value::as_str) {
                    let host = host.to_string();
                    config.insert("hostList".to_string(), Value::Array(vec![Value::String(host)]));
                }
            }
        }
    }
    if let Some(object) = raw.as_object_mut() {
        object.insert("version".to_string(), Value::from(STATE_VERSION));
    }
    raw
}

/// Load the user state: persisted blob migrated and merged over defaults.
///
/// An absent, partial, or unreadable blob is never an error; whatever cannot
/// be recovered falls back to the default value.
pub fn get_local_state(storage: &Storage) -> UserState {
    let raw = match storage.get::<Value>(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return defaults::default_setting(),
        Err(err) => {
            tracing::warn!(error = %err, "could not read persisted user state, using defaults");
            return defaults::default_setting();
        }
    };
    match serde_json::from_value(migrate(raw)) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(error = %err, "persisted user state malformed, using defaults");
            defaults::default_setting()
        }
    }
}

/// Persist the full user state under the fixed key.
pub fn set_local_state(storage: &Storage, state: &UserState) -> Result<(), StorageError> {
    storage.set(STORAGE_KEY, state)
}

/// Owns the user state and mediates every mutation through
/// persist-after-mutate.
pub struct UserStore {
    state: UserState,
    storage: Storage,
}

impl UserStore {
    pub fn load(storage: Storage) -> Self {
        let state = get_local_state(&storage);
        Self { state, storage }
    }

    pub fn state(&self) -> &UserState {
        &self.state
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.state.user_info
    }

    pub fn user_config(&self) -> &UserConfig {
        &self.state.user_config
    }

    /// Shallow-merge `patch` into the identity fields.
    pub fn update_user_info(&mut self, patch: UserInfoPatch) -> Result<(), StorageError> {
        self.state.user_info.apply(patch);
        self.record_state()
    }

    pub fn reset_user_info(&mut self) -> Result<(), StorageError> {
        self.state.user_info = defaults::default_user_info();
        self.record_state()
    }

    pub fn add_api_key(&mut self, api_key: impl Into<String>) -> Result<(), StorageError> {
        self.state.user_config.api_key_list.push(api_key.into());
        self.record_state()
    }

    /// Remove every occurrence of `api_key` from the list.
    pub fn delete_api_key(&mut self, api_key: &str) -> Result<(), StorageError> {
        self.state.user_config.api_key_list.retain(|item| item != api_key);
        self.record_state()
    }

    pub fn add_access_token(&mut self, access_token: impl Into<String>) -> Result<(), StorageError> {
        self.state
            .user_config
            .access_token_list
            .push(access_token.into());
        self.record_state()
    }

    /// Remove every occurrence of `access_token` from the list.
    pub fn delete_access_token(&mut self, access_token: &str) -> Result<(), StorageError> {
        self.state
            .user_config
            .access_token_list
            .retain(|item| item != access_token);
        self.record_state()
    }

    pub fn add_host(&mut self, host: impl Into<String>) -> Result<(), StorageError> {
        self.state.user_config.host_list.push(host.into());
        self.record_state()
    }

    /// Remove every occurrence of `host` from the candidate list.
    pub fn delete_host(&mut self, host: &str) -> Result<(), StorageError> {
        self.state.user_config.host_list.retain(|item| item != host);
        self.record_state()
    }

    /// Restore the candidate host list to the built-in default.
    pub fn reset_host(&mut self) -> Result<(), StorageError> {
        self.state.user_config.host_list = defaults::default_host_list();
        self.record_state()
    }

    /// The fixed catalog of supported model names.
    pub fn all_models() -> &'static [&'static str] {
        defaults::all_models()
    }

    fn record_state(&self) -> Result<(), StorageError> {
        set_local_state(&self.storage, &self.state)
    }
}
