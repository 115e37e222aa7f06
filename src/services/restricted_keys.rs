//! 考试期间禁用的按键组合

use phf::phf_set;
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::models::KeyChord;

/// 默认禁用的按键组合（`KeyChord` 的规范写法）
static DEFAULT_RESTRICTED: phf::Set<&'static str> = phf_set! {
    "F12",
    "PRINTSCREEN",
    "META",
    "Alt+TAB",
    "Ctrl+C",
    "Ctrl+V",
    "Ctrl+X",
    "Ctrl+A",
    "Ctrl+P",
    "Ctrl+S",
    "Ctrl+U",
    "Ctrl+Shift+I",
    "Ctrl+Shift+J",
    "Ctrl+Shift+C",
    "Meta+C",
    "Meta+V",
    "Meta+X",
    "Meta+A",
    "Meta+P",
    "Meta+S",
    "Meta+U",
    "Alt+Meta+I",
    "Alt+Meta+J",
    "Alt+Meta+C",
};

/// 禁用按键集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedKeys {
    chords: HashSet<String>,
}

impl RestrictedKeys {
    /// 解析逗号分隔的按键列表，例如 `Ctrl+Shift+I, F12`
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        let chords = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<KeyChord>().map(|c| c.to_string()))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { chords })
    }

    pub fn is_restricted(&self, chord: &KeyChord) -> bool {
        self.chords.contains(&chord.to_string())
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

impl Default for RestrictedKeys {
    fn default() -> Self {
        Self {
            chords: DEFAULT_RESTRICTED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_devtools_and_clipboard() {
        let keys = RestrictedKeys::default();
        assert!(keys.is_restricted(&KeyChord::with_modifiers("i", true, false, true, false)));
        assert!(keys.is_restricted(&KeyChord::with_modifiers("c", true, false, false, false)));
        assert!(keys.is_restricted(&KeyChord::plain("F12")));
        assert!(keys.is_restricted(&KeyChord::with_modifiers("Tab", false, true, false, false)));
        assert!(!keys.is_restricted(&KeyChord::plain("a")));
        assert!(!keys.is_restricted(&KeyChord::plain("Tab")));
    }

    #[test]
    fn defaults_cover_mac_command_shortcuts() {
        let keys = RestrictedKeys::default();
        for key in ["c", "v", "x"] {
            assert!(keys.is_restricted(&KeyChord::with_modifiers(key, false, false, false, true)));
        }
        assert!(keys.is_restricted(&"Cmd+Option+I".parse().unwrap()));
        assert!(!keys.is_restricted(&KeyChord::with_modifiers("z", false, false, false, true)));
    }

    #[test]
    fn every_default_is_in_canonical_form() {
        for chord in DEFAULT_RESTRICTED.iter() {
            let parsed: KeyChord = chord.parse().unwrap();
            assert_eq!(&parsed.to_string(), chord);
        }
    }

    #[test]
    fn parses_custom_list() {
        let keys = RestrictedKeys::parse_list("shift+ctrl+k, f5 ,").unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.is_restricted(&KeyChord::with_modifiers("K", true, false, true, false)));
        assert!(RestrictedKeys::parse_list("Ctrl+").is_err());
    }
}
