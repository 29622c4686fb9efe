use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use gpui::*;
use gpui_component::{Theme, ThemeMode, ThemeRegistry};
use medassist_backend::{BackendConfig, DEFAULT_BASE_URL};
use medassist_session::{DEFAULT_SPEECH_LOCALE, RecognizerSettings};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "medassist";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "MEDASSIST_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_speech_locale")]
    pub speech_locale: String,
    #[serde(
        default = "default_theme_mode",
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub theme_name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            speech_locale: default_speech_locale(),
            theme_mode: default_theme_mode(),
            theme_name: String::new(),
        }
    }
}

impl AppSettings {
    pub fn normalized(mut self) -> Self {
        self.backend_url = non_blank_or(&self.backend_url, default_backend_url);
        self.speech_locale = non_blank_or(&self.speech_locale, default_speech_locale);
        self.theme_name = self.theme_name.trim().to_string();
        self
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(self.backend_url.clone())
    }

    pub fn recognizer_settings(&self) -> RecognizerSettings {
        RecognizerSettings::for_locale(self.speech_locale.clone())
    }

    pub fn apply_theme(&self, window: Option<&mut Window>, cx: &mut App) {
        if let Some(theme_config) = ThemeRegistry::global(cx)
            .themes()
            .get(&SharedString::from(self.theme_name.clone()))
            .cloned()
        {
            let mode = theme_config.mode;
            let theme = Theme::global_mut(cx);
            if mode.is_dark() {
                theme.dark_theme = theme_config;
            } else {
                theme.light_theme = theme_config;
            }
            Theme::change(mode, window, cx);
            return;
        }

        Theme::change(self.theme_mode, window, cx);
    }
}

/// Settings loaded from `settings.json` with `MEDASSIST_*` environment overrides.
pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".medassist"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    /// Writes the current settings out when no file exists yet, so there is
    /// something on disk to edit.
    pub fn ensure_file(&self) -> Result<(), SettingsError> {
        if self.config_path.exists() {
            return Ok(());
        }

        self.update(self.settings().as_ref().clone())
    }

    fn load_from(path: &Path) -> AppSettings {
        if !path.exists() {
            tracing::info!(path = ?path, "settings file not found, using defaults");
        }

        let figment = Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX));

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(path = ?path, %error, "failed to parse settings, using defaults");
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = ?self.config_path, "saved settings");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn non_blank_or(value: &str, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_backend_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_speech_locale() -> String {
    DEFAULT_SPEECH_LOCALE.to_string()
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Light
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("dark") {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[::core::prelude::v1::test]
    fn normalization_restores_blank_fields() {
        let settings = AppSettings {
            backend_url: "   ".to_string(),
            speech_locale: String::new(),
            theme_mode: ThemeMode::Dark,
            theme_name: "  Ayu Dark ".to_string(),
        }
        .normalized();

        assert_eq!(settings.backend_url, DEFAULT_BASE_URL);
        assert_eq!(settings.speech_locale, "en-US");
        assert_eq!(settings.theme_name, "Ayu Dark");
        assert_eq!(settings.theme_mode, ThemeMode::Dark);
    }

    #[::core::prelude::v1::test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let store = SettingsStore::new(jail.directory().join("settings.json"));
            assert_eq!(store.settings().as_ref(), &AppSettings::default());
            assert_eq!(
                store.settings().backend_config().url_for(medassist_backend::Endpoint::Chat),
                "http://127.0.0.1:8000/chat/"
            );
            Ok(())
        });
    }

    #[::core::prelude::v1::test]
    fn file_values_are_merged_over_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{ "backend_url": " http://10.0.0.5:9000/ ", "theme_mode": "DARK" }"#,
            )?;

            let store = SettingsStore::new(jail.directory().join("settings.json"));
            let settings = store.settings();
            assert_eq!(settings.backend_url, "http://10.0.0.5:9000/");
            assert_eq!(settings.speech_locale, "en-US");
            assert_eq!(settings.theme_mode, ThemeMode::Dark);
            Ok(())
        });
    }

    #[::core::prelude::v1::test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", r#"{ "speech_locale": "de-DE" }"#)?;
            jail.set_env("MEDASSIST_SPEECH_LOCALE", "fr-FR");

            let store = SettingsStore::new(jail.directory().join("settings.json"));
            assert_eq!(store.settings().recognizer_settings().locale, "fr-FR");
            Ok(())
        });
    }

    #[::core::prelude::v1::test]
    fn invalid_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", "{ not json")?;

            let store = SettingsStore::new(jail.directory().join("settings.json"));
            assert_eq!(store.settings().as_ref(), &AppSettings::default());
            Ok(())
        });
    }

    #[::core::prelude::v1::test]
    fn update_persists_normalized_settings() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join("settings.json");
            let store = SettingsStore::new(path.clone());

            store
                .update(AppSettings {
                    backend_url: "http://localhost:8080".to_string(),
                    speech_locale: " ".to_string(),
                    ..AppSettings::default()
                })
                .expect("settings should persist");

            assert_eq!(store.settings().speech_locale, "en-US");
            assert!(!path.with_extension("json.tmp").exists());

            let reloaded = SettingsStore::new(path);
            assert_eq!(reloaded.settings().backend_url, "http://localhost:8080");
            Ok(())
        });
    }

    #[::core::prelude::v1::test]
    fn ensure_file_writes_defaults_once() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("settings.json");
            let store = SettingsStore::new(path.clone());

            store.ensure_file().expect("defaults should be written");
            assert!(path.exists());

            std::fs::write(&path, r#"{ "backend_url": "http://kept" }"#)
                .expect("fixture should be writable");
            store.ensure_file().expect("existing file is left alone");
            assert_eq!(
                SettingsStore::new(path).settings().backend_url,
                "http://kept"
            );
            Ok(())
        });
    }
}
