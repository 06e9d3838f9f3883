use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterType {
    #[default]
    Words,
    Characters,
}

impl CounterType {
    /// Status bar text, e.g. "12 words".
    pub fn label(self, words: usize, characters: usize) -> String {
        match self {
            CounterType::Words => format!("{words} words"),
            CounterType::Characters => format!("{characters} characters"),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            CounterType::Words => CounterType::Characters,
            CounterType::Characters => CounterType::Words,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorStyle {
    #[default]
    Seamless,
    Page,
}

/// Whether replies may still be added once a thread's text is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanReplies {
    #[default]
    Allow,
    Reject,
}

/// Editor preferences. Keys missing from the file take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub show_counter: bool,
    pub counter: CounterType,
    pub show_table_of_contents: bool,
    pub editor_style: EditorStyle,
    pub show_collapsible_sections: bool,
    pub show_comments: bool,
    pub show_save_status: bool,
    pub autosave_delay_ms: u64,
    pub always_show_collapse_toggle: bool,
    pub orphan_replies: OrphanReplies,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            show_counter: false,
            counter: CounterType::Words,
            show_table_of_contents: false,
            editor_style: EditorStyle::Seamless,
            show_collapsible_sections: false,
            show_comments: true,
            show_save_status: true,
            autosave_delay_ms: 1000,
            always_show_collapse_toggle: false,
            orphan_replies: OrphanReplies::Allow,
        }
    }
}

impl Settings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub storage_path: PathBuf,
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn new(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            settings: Settings::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.storage_path =
            Self::expand_path(&config.storage_path).unwrap_or(config.storage_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/words-and-words");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Where documents live when no config file exists.
    pub fn default_storage_path() -> PathBuf {
        let data_dir = shellexpand::tilde("~/.local/share/words-and-words");
        PathBuf::from(data_dir.as_ref())
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/words-and-words/config.toml"));
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load_from_path(temp_dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::new(PathBuf::from("/tmp/documents"));
        config.settings.counter = CounterType::Characters;
        config.settings.orphan_replies = OrphanReplies::Reject;

        config.save_to_path(&config_path).unwrap();
        let loaded = Config::load_from_path(&config_path).unwrap().unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_settings_take_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "storage_path = \"/data\"\n\n[settings]\nshowCounter = true\ntheme = \"dark\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).unwrap().unwrap();
        assert!(config.settings.show_counter);
        assert_eq!(config.settings.theme, Theme::Dark);
        assert!(config.settings.show_comments);
        assert_eq!(config.settings.autosave_delay(), Duration::from_millis(1000));
        assert_eq!(config.settings.editor_style, EditorStyle::Seamless);
    }

    #[test]
    fn test_settings_section_is_optional() {
        let config: Config = toml::from_str("storage_path = \"/data\"").unwrap();
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "storage_path = ").unwrap();

        let result = Config::load_from_path(&config_path);
        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("WORDS_TEST_DIR", "/test/env/path");
        }

        let expanded = Config::expand_path(Path::new("$WORDS_TEST_DIR/docs")).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/docs"));

        unsafe {
            env::remove_var("WORDS_TEST_DIR");
        }
    }

    #[test]
    fn test_counter_label() {
        assert_eq!(CounterType::Words.label(3, 15), "3 words");
        assert_eq!(CounterType::Words.toggled().label(3, 15), "15 characters");
    }
}
