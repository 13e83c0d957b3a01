//! Target language tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Language of the textbook being extracted.
///
/// Selects whether the Devanagari script normalizer runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (`en`)
    #[default]
    English,
    /// Hindi (`hi`), written in Devanagari
    Hindi,
}

impl Language {
    /// Two-letter tag used on the command line and in file names.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    /// Whether text in this language is written in Devanagari.
    pub fn is_devanagari(self) -> bool {
        matches!(self, Language::Hindi)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Language::English),
            "hi" | "hin" | "hindi" => Ok(Language::Hindi),
            other => Err(Error::UnsupportedLanguage(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::English);
        assert_eq!("HI".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!(" hindi ".parse::<Language>().unwrap(), Language::Hindi);
        assert!(matches!(
            "ta".parse::<Language>(),
            Err(Error::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_language_code_roundtrip() {
        for lang in [Language::English, Language::Hindi] {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
        assert!(Language::Hindi.is_devanagari());
        assert!(!Language::English.is_devanagari());
    }
}
