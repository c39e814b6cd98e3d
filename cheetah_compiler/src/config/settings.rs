//! Per-compilation settings.
//!
//! Keys use the camelCase spelling template authors write inside
//! `#compiler-settings` blocks. The key set is closed: the defaults define
//! every accepted name and anything else is rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod keys {
    pub const USE_NAME_MAPPER: &str = "useNameMapper";
    pub const USE_AUTOCALLING: &str = "useAutocalling";
    pub const USE_DOTTED_NOTATION: &str = "useDottedNotation";
    pub const USE_LEGACY_IMPORT_MODE: &str = "useLegacyImportMode";
    pub const MAIN_METHOD_NAME: &str = "mainMethodName";
    pub const MAIN_METHOD_NAME_FOR_SUBCLASSES: &str = "mainMethodNameForSubclasses";
    pub const CHEETAH_VAR_START_TOKEN: &str = "cheetahVarStartToken";
    pub const COMMENT_START_TOKEN: &str = "commentStartToken";
    pub const DIRECTIVE_START_TOKEN: &str = "directiveStartToken";
    pub const DIRECTIVE_END_TOKEN: &str = "directiveEndToken";
    pub const GETTEXT_TOKENS: &str = "gettextTokens";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("UnexpectedSettingName: {0}")]
    UnexpectedSettingName(String),

    #[error("Malformed settings line (expected `name = value`): {0}")]
    MalformedLine(String),
}

impl SettingsError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            SettingsError::UnexpectedSettingName(_) => {
                crate::logging::codes::settings::UNEXPECTED_SETTING_NAME
            }
            SettingsError::MalformedLine(_) => crate::logging::codes::settings::MALFORMED_SETTINGS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    None,
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl SettingValue {
    /// Convert a raw settings-block value: `none`, `true` and `false` are
    /// recognised case-insensitively, everything else stays text.
    pub fn from_config_value(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "none" => SettingValue::None,
            "true" => SettingValue::Bool(true),
            "false" => SettingValue::Bool(false),
            _ => SettingValue::Text(raw.to_string()),
        }
    }

    /// Truthiness as template authors expect it: empty text and empty
    /// lists are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingValue::None => false,
            SettingValue::Bool(b) => *b,
            SettingValue::Text(s) => !s.is_empty(),
            SettingValue::List(items) => !items.is_empty(),
        }
    }

    pub fn as_list(&self) -> Vec<String> {
        match self {
            SettingValue::List(items) => items.clone(),
            SettingValue::Text(s) => s
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            SettingValue::None | SettingValue::Bool(_) => Vec::new(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::None => write!(f, "None"),
            SettingValue::Bool(true) => write!(f, "True"),
            SettingValue::Bool(false) => write!(f, "False"),
            SettingValue::Text(s) => write!(f, "{}", s),
            SettingValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerSettings {
    values: BTreeMap<String, SettingValue>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        let defaults: [(&str, SettingValue); 11] = [
            (keys::USE_NAME_MAPPER, true.into()),
            (keys::USE_AUTOCALLING, false.into()),
            (keys::USE_DOTTED_NOTATION, false.into()),
            (keys::USE_LEGACY_IMPORT_MODE, true.into()),
            (keys::MAIN_METHOD_NAME, "respond".into()),
            (keys::MAIN_METHOD_NAME_FOR_SUBCLASSES, "writeBody".into()),
            (keys::CHEETAH_VAR_START_TOKEN, "$".into()),
            (keys::COMMENT_START_TOKEN, "##".into()),
            (keys::DIRECTIVE_START_TOKEN, "#".into()),
            (keys::DIRECTIVE_END_TOKEN, "#".into()),
            (
                keys::GETTEXT_TOKENS,
                SettingValue::List(
                    ["_", "gettext", "ngettext", "pgettext", "npgettext"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                ),
            ),
        ];

        Self {
            values: defaults
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        }
    }
}

impl CompilerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: SettingValue) -> Result<(), SettingsError> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(SettingsError::UnexpectedSettingName(name.to_string())),
        }
    }

    /// Selective merge; stops at the first unknown name.
    pub fn update<I, K>(&mut self, values: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (K, SettingValue)>,
        K: AsRef<str>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Apply the body of a `#compiler-settings` block: one `name = value`
    /// pair per non-blank line.
    pub fn update_from_config_str(&mut self, config: &str) -> Result<(), SettingsError> {
        let mut parsed = Vec::new();
        for line in config.trim().lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once('=')
                .ok_or_else(|| SettingsError::MalformedLine(line.trim().to_string()))?;
            parsed.push((
                name.trim().to_string(),
                SettingValue::from_config_value(value.trim()),
            ));
        }
        self.update(parsed)
    }

    fn flag(&self, name: &str) -> bool {
        self.values.get(name).map(SettingValue::is_truthy).unwrap_or(false)
    }

    fn text(&self, name: &str) -> String {
        self.values.get(name).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn use_name_mapper(&self) -> bool {
        self.flag(keys::USE_NAME_MAPPER)
    }

    pub fn use_autocalling(&self) -> bool {
        self.flag(keys::USE_AUTOCALLING)
    }

    pub fn use_dotted_notation(&self) -> bool {
        self.flag(keys::USE_DOTTED_NOTATION)
    }

    pub fn use_legacy_import_mode(&self) -> bool {
        self.flag(keys::USE_LEGACY_IMPORT_MODE)
    }

    pub fn main_method_name(&self) -> String {
        self.text(keys::MAIN_METHOD_NAME)
    }

    pub fn main_method_name_for_subclasses(&self) -> String {
        self.text(keys::MAIN_METHOD_NAME_FOR_SUBCLASSES)
    }

    pub fn cheetah_var_start_token(&self) -> String {
        self.text(keys::CHEETAH_VAR_START_TOKEN)
    }

    pub fn comment_start_token(&self) -> String {
        self.text(keys::COMMENT_START_TOKEN)
    }

    pub fn directive_start_token(&self) -> String {
        self.text(keys::DIRECTIVE_START_TOKEN)
    }

    pub fn directive_end_token(&self) -> String {
        self.text(keys::DIRECTIVE_END_TOKEN)
    }

    pub fn gettext_tokens(&self) -> Vec<String> {
        self.values
            .get(keys::GETTEXT_TOKENS)
            .map(SettingValue::as_list)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let settings = CompilerSettings::default();
        assert!(settings.use_name_mapper());
        assert!(!settings.use_autocalling());
        assert!(!settings.use_dotted_notation());
        assert!(settings.use_legacy_import_mode());
        assert_eq!(settings.main_method_name(), "respond");
        assert_eq!(settings.main_method_name_for_subclasses(), "writeBody");
        assert_eq!(settings.comment_start_token(), "##");
        assert_eq!(settings.gettext_tokens().len(), 5);
    }

    #[test]
    fn test_unknown_setting_is_rejected() {
        let mut settings = CompilerSettings::default();
        assert_matches!(
            settings.set("not_a_real_setting", true.into()),
            Err(SettingsError::UnexpectedSettingName(name)) if name == "not_a_real_setting"
        );
    }

    #[test]
    fn test_config_str_converts_values() {
        let mut settings = CompilerSettings::default();
        settings
            .update_from_config_str("\nuseAutocalling = TRUE\nuseLegacyImportMode=false\nmainMethodName = render\n")
            .unwrap();
        assert!(settings.use_autocalling());
        assert!(!settings.use_legacy_import_mode());
        assert_eq!(settings.main_method_name(), "render");
    }

    #[test]
    fn test_config_str_none_is_falsy() {
        let mut settings = CompilerSettings::default();
        settings.update_from_config_str("useNameMapper = None").unwrap();
        assert_eq!(settings.get(keys::USE_NAME_MAPPER), Some(&SettingValue::None));
        assert!(!settings.use_name_mapper());
    }

    #[test]
    fn test_config_str_requires_assignment() {
        let mut settings = CompilerSettings::default();
        assert_matches!(
            settings.update_from_config_str("useNameMapper"),
            Err(SettingsError::MalformedLine(_))
        );
    }

    #[test]
    fn test_gettext_tokens_from_text() {
        let mut settings = CompilerSettings::default();
        settings
            .update_from_config_str("gettextTokens = _, tr")
            .unwrap();
        assert_eq!(settings.gettext_tokens(), vec!["_".to_string(), "tr".to_string()]);
    }
}
