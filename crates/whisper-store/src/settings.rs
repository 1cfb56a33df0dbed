//! Privacy, app-lock and notification preferences.
//!
//! Every record is versioned. Fields added after a record was written are
//! filled from the struct default on load, so an old record never fails to
//! parse just because it predates a field.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use whisper_shared::constants::KDF_CONTEXT_PIN_HASH;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::store::ConversationStore;

pub const SETTINGS_VERSION: u32 = 1;

const PIN_MIN_LEN: usize = 4;
const PIN_MAX_LEN: usize = 12;

// Records written before versioning carry no `version` field.
fn unversioned() -> u32 {
    0
}

pub(crate) trait SettingsRecord: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;

    fn version_mut(&mut self) -> &mut u32;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettings {
    #[serde(default = "unversioned")]
    pub version: u32,
    pub read_receipts: bool,
    pub typing_indicators: bool,
    pub show_online_status: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            read_receipts: true,
            typing_indicators: true,
            show_online_status: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppLockSettings {
    #[serde(default = "unversioned")]
    pub version: u32,
    pub enabled: bool,
    /// Hex BLAKE3 keyed hash of the PIN, never the PIN itself.
    pub pin_hash: Option<String>,
    pub biometrics_enabled: bool,
    /// Seconds in background before the lock engages; 0 locks immediately.
    pub lock_timeout_secs: u64,
}

impl Default for AppLockSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            enabled: false,
            pin_hash: None,
            biometrics_enabled: false,
            lock_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default = "unversioned")]
    pub version: u32,
    pub enabled: bool,
    pub sound: bool,
    pub show_preview: bool,
    pub message_requests: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            enabled: true,
            sound: true,
            show_preview: true,
            message_requests: true,
        }
    }
}

impl SettingsRecord for PrivacySettings {
    const KEY: &'static str = keys::PRIVACY_SETTINGS;

    fn version_mut(&mut self) -> &mut u32 {
        &mut self.version
    }
}

impl SettingsRecord for AppLockSettings {
    const KEY: &'static str = keys::APP_LOCK_SETTINGS;

    fn version_mut(&mut self) -> &mut u32 {
        &mut self.version
    }
}

impl SettingsRecord for NotificationSettings {
    const KEY: &'static str = keys::NOTIFICATION_SETTINGS;

    fn version_mut(&mut self) -> &mut u32 {
        &mut self.version
    }
}

fn hash_pin(pin: &str) -> blake3::Hash {
    blake3::Hash::from(blake3::derive_key(KDF_CONTEXT_PIN_HASH, pin.as_bytes()))
}

fn validate_pin(pin: &str) -> Result<()> {
    let len_ok = (PIN_MIN_LEN..=PIN_MAX_LEN).contains(&pin.len());
    if !len_ok || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StoreError::Validation(format!(
            "PIN must be {PIN_MIN_LEN}-{PIN_MAX_LEN} digits"
        )));
    }
    Ok(())
}

impl ConversationStore {
    /// Read a record and bump an old version in memory. The flag says
    /// whether the stored copy is now stale.
    async fn read_settings<T: SettingsRecord>(&self) -> Result<(T, bool)> {
        let mut settings: T = self.read_record(T::KEY).await?;
        let version = settings.version_mut();
        if *version >= SETTINGS_VERSION {
            return Ok((settings, false));
        }
        tracing::debug!(key = T::KEY, from = *version, "upgrading settings record");
        *version = SETTINGS_VERSION;
        Ok((settings, true))
    }

    async fn load_settings<T: SettingsRecord>(&self) -> Result<T> {
        let (settings, upgraded) = self.read_settings::<T>().await?;
        if upgraded {
            if let Err(e) = self.save_settings(&settings).await {
                tracing::warn!(key = T::KEY, error = %e, "upgraded settings not persisted");
            }
        }
        Ok(settings)
    }

    async fn save_settings<T: SettingsRecord>(&self, settings: &T) -> Result<()> {
        let _guard = self.locks.lock(T::KEY).await;
        self.write_record(T::KEY, settings).await
    }

    pub async fn get_privacy_settings(&self) -> Result<PrivacySettings> {
        self.load_settings().await
    }

    pub async fn save_privacy_settings(&self, settings: &PrivacySettings) -> Result<()> {
        self.save_settings(settings).await
    }

    pub async fn get_app_lock_settings(&self) -> Result<AppLockSettings> {
        self.load_settings().await
    }

    pub async fn save_app_lock_settings(&self, settings: &AppLockSettings) -> Result<()> {
        self.save_settings(settings).await
    }

    pub async fn get_notification_settings(&self) -> Result<NotificationSettings> {
        self.load_settings().await
    }

    pub async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<()> {
        self.save_settings(settings).await
    }

    /// Set the app-lock PIN and enable the lock, or clear both with `None`.
    pub async fn set_app_lock_pin(&self, pin: Option<&str>) -> Result<AppLockSettings> {
        let _guard = self.locks.lock(keys::APP_LOCK_SETTINGS).await;
        let (mut settings, _) = self.read_settings::<AppLockSettings>().await?;

        match pin {
            Some(pin) => {
                validate_pin(pin)?;
                settings.pin_hash = Some(hash_pin(pin).to_hex().to_string());
                settings.enabled = true;
            }
            None => {
                settings.pin_hash = None;
                settings.enabled = false;
                settings.biometrics_enabled = false;
            }
        }

        self.write_record(keys::APP_LOCK_SETTINGS, &settings).await?;
        tracing::info!(enabled = settings.enabled, "app lock PIN updated");
        Ok(settings)
    }

    /// `Ok(())` when `pin` matches the stored hash, `InvalidPin` otherwise
    /// (including when no PIN is set).
    pub async fn verify_app_lock_pin(&self, pin: &str) -> Result<()> {
        let settings: AppLockSettings = self.load_settings().await?;
        let stored = settings
            .pin_hash
            .as_deref()
            .and_then(|h| blake3::Hash::from_hex(h).ok())
            .ok_or(StoreError::InvalidPin)?;

        // blake3::Hash equality is constant-time
        if stored == hash_pin(pin) {
            Ok(())
        } else {
            tracing::warn!("app lock PIN mismatch");
            Err(StoreError::InvalidPin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SecureStorage;
    use crate::store::tests::memory_store;

    #[tokio::test]
    async fn defaults_when_absent() {
        let (_, store) = memory_store();
        assert_eq!(store.get_privacy_settings().await.unwrap(), PrivacySettings::default());
        assert_eq!(store.get_app_lock_settings().await.unwrap(), AppLockSettings::default());
        let notifications = store.get_notification_settings().await.unwrap();
        assert!(notifications.enabled && notifications.sound && notifications.message_requests);
    }

    #[tokio::test]
    async fn missing_fields_take_defaults() {
        let (backend, store) = memory_store();
        backend
            .set(keys::PRIVACY_SETTINGS, r#"{"readReceipts":false}"#)
            .await
            .unwrap();

        let privacy = store.get_privacy_settings().await.unwrap();
        assert!(!privacy.read_receipts);
        assert!(privacy.typing_indicators);
        assert!(privacy.show_online_status);
        assert_eq!(privacy.version, SETTINGS_VERSION);
    }

    #[tokio::test]
    async fn unversioned_record_is_upgraded() {
        let (backend, store) = memory_store();
        backend
            .set(keys::APP_LOCK_SETTINGS, r#"{"enabled":true,"lockTimeoutSecs":60}"#)
            .await
            .unwrap();

        let app_lock = store.get_app_lock_settings().await.unwrap();
        assert_eq!(app_lock.version, SETTINGS_VERSION);
        assert!(app_lock.enabled);
        assert_eq!(app_lock.lock_timeout_secs, 60);

        let raw = backend.get(keys::APP_LOCK_SETTINGS).await.unwrap().unwrap();
        let rewritten: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(rewritten["version"], SETTINGS_VERSION);
        assert_eq!(rewritten["lockTimeoutSecs"], 60);
    }

    #[tokio::test]
    async fn corrupt_settings_read_as_default() {
        let (backend, store) = memory_store();
        backend.set(keys::NOTIFICATION_SETTINGS, "nope").await.unwrap();
        assert_eq!(
            store.get_notification_settings().await.unwrap(),
            NotificationSettings::default()
        );
    }

    #[tokio::test]
    async fn save_and_reload() {
        let (_, store) = memory_store();
        let mut privacy = PrivacySettings::default();
        privacy.read_receipts = false;
        store.save_privacy_settings(&privacy).await.unwrap();
        assert_eq!(store.get_privacy_settings().await.unwrap(), privacy);
    }

    #[tokio::test]
    async fn pin_set_verify_clear() {
        let (backend, store) = memory_store();
        assert!(matches!(store.verify_app_lock_pin("1234").await, Err(StoreError::InvalidPin)));

        let settings = store.set_app_lock_pin(Some("1234")).await.unwrap();
        assert!(settings.enabled);
        let raw = backend.get(keys::APP_LOCK_SETTINGS).await.unwrap().unwrap();
        assert!(!raw.contains("1234"));

        store.verify_app_lock_pin("1234").await.unwrap();
        assert!(matches!(store.verify_app_lock_pin("4321").await, Err(StoreError::InvalidPin)));

        let settings = store.set_app_lock_pin(None).await.unwrap();
        assert!(!settings.enabled);
        assert!(settings.pin_hash.is_none());
    }

    #[tokio::test]
    async fn pin_format_enforced() {
        let (_, store) = memory_store();
        assert!(matches!(store.set_app_lock_pin(Some("12")).await, Err(StoreError::Validation(_))));
        assert!(matches!(store.set_app_lock_pin(Some("12ab")).await, Err(StoreError::Validation(_))));
    }
}
