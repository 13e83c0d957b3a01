//! Devanagari normalization for Hindi output.
//!
//! The normalizer always strips zero-width joiners and maps sentence-final
//! pipes to dandas. Nukta canonicalization needs a [`ScriptBackend`]; without
//! one the normalizer runs in reduced mode and reports it.

use super::result::DegradedCapability;
use super::stream::map_prose_lines;
use crate::error::{Error, Result};
use crate::model::Language;

const ZWNJ: char = '\u{200C}';
const ZWJ: char = '\u{200D}';
const DANDA: char = '\u{0964}';
const DOUBLE_DANDA: char = '\u{0965}';

/// Canonicalization primitives for Devanagari text.
pub trait ScriptBackend: Send + Sync {
    /// Backend name for reports.
    fn name(&self) -> &str;

    /// Canonicalize one line. Must be idempotent.
    fn canonicalize(&self, text: &str) -> String;
}

/// Unicode-data backend: NFC, then nukta sequences composed to their
/// precomposed letters.
///
/// NFC alone decomposes क़ (U+0958) and its siblings because they are
/// composition exclusions, so those are recomposed explicitly.
#[cfg(feature = "script-backend")]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeScriptBackend;

#[cfg(feature = "script-backend")]
impl ScriptBackend for UnicodeScriptBackend {
    fn name(&self) -> &str {
        "unicode-normalization"
    }

    fn canonicalize(&self, text: &str) -> String {
        use unicode_normalization::UnicodeNormalization;

        let nfc: Vec<char> = text.nfc().collect();
        let mut out = String::with_capacity(text.len());
        let mut chars = nfc.into_iter().peekable();
        while let Some(c) = chars.next() {
            let composed = chars
                .peek()
                .filter(|&&next| next == NUKTA)
                .and_then(|_| compose_nukta(c));
            match composed {
                Some(letter) => {
                    chars.next();
                    out.push(letter);
                }
                None => out.push(c),
            }
        }
        out
    }
}

#[cfg(feature = "script-backend")]
const NUKTA: char = '\u{093C}';

#[cfg(feature = "script-backend")]
fn compose_nukta(base: char) -> Option<char> {
    Some(match base {
        '\u{0915}' => '\u{0958}', // qa
        '\u{0916}' => '\u{0959}', // khha
        '\u{0917}' => '\u{095A}', // ghha
        '\u{091C}' => '\u{095B}', // za
        '\u{0921}' => '\u{095C}', // dddha
        '\u{0922}' => '\u{095D}', // rha
        '\u{092B}' => '\u{095E}', // fa
        '\u{092F}' => '\u{095F}', // yya
        '\u{0928}' => '\u{0929}', // nnna
        '\u{0930}' => '\u{0931}', // rra
        '\u{0933}' => '\u{0934}', // llla
        _ => return None,
    })
}

/// Applies Devanagari conventions to cleaned Hindi text.
///
/// A no-op for any other language. Table blocks are never touched.
pub struct ScriptNormalizer {
    language: Language,
    backend: Option<Box<dyn ScriptBackend>>,
}

impl std::fmt::Debug for ScriptNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptNormalizer")
            .field("language", &self.language)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl ScriptNormalizer {
    /// Normalizer with the best backend compiled in, reduced mode if none.
    pub fn new(language: Language) -> Self {
        Self::try_full(language).unwrap_or_else(|_| Self::reduced(language))
    }

    /// Normalizer with an explicit backend.
    pub fn with_backend(language: Language, backend: Box<dyn ScriptBackend>) -> Self {
        Self {
            language,
            backend: Some(backend),
        }
    }

    /// Normalizer without nukta canonicalization.
    pub fn reduced(language: Language) -> Self {
        Self {
            language,
            backend: None,
        }
    }

    /// Normalizer with the built-in Unicode backend.
    ///
    /// Fails when the crate was built without the `script-backend` feature.
    pub fn try_full(language: Language) -> Result<Self> {
        #[cfg(feature = "script-backend")]
        {
            Ok(Self::with_backend(language, Box::new(UnicodeScriptBackend)))
        }
        #[cfg(not(feature = "script-backend"))]
        {
            let _ = language;
            Err(Error::NormalizationBackendUnavailable(
                "built without the script-backend feature".to_string(),
            ))
        }
    }

    /// Target language.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Whether nukta canonicalization is skipped.
    pub fn is_reduced(&self) -> bool {
        self.backend.is_none()
    }

    /// The reduced-mode capability, if it matters for this language.
    pub fn degraded_capability(&self) -> Option<DegradedCapability> {
        if !self.language.is_devanagari() || !self.is_reduced() {
            return None;
        }
        let reason = Error::NormalizationBackendUnavailable(
            "nukta canonicalization skipped".to_string(),
        );
        Some(DegradedCapability::new("script-normalization", reason.to_string()))
    }

    /// Normalize prose lines of `text`.
    pub fn normalize(&self, text: &str) -> String {
        if !self.language.is_devanagari() {
            return text.to_string();
        }
        map_prose_lines(text, |line| {
            let stripped: String = line.chars().filter(|&c| c != ZWJ && c != ZWNJ).collect();
            let canonical = match &self.backend {
                Some(backend) => backend.canonicalize(&stripped),
                None => stripped,
            };
            map_dandas(&canonical)
        })
    }
}

/// Replace sentence-final `|` with `।` and `||` with `॥`.
///
/// A pipe is sentence-final when followed by the end of the line, whitespace
/// or closing punctuation.
fn map_dandas(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '|' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let double = chars.get(i + 1) == Some(&'|');
        let width = if double { 2 } else { 1 };
        if is_sentence_boundary(chars.get(i + width).copied()) {
            out.push(if double { DOUBLE_DANDA } else { DANDA });
        } else {
            out.extend(&chars[i..i + width]);
        }
        i += width;
    }
    out
}

fn is_sentence_boundary(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || "\"'”’)]}»".contains(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_to_danda() {
        let normalizer = ScriptNormalizer::new(Language::Hindi);
        assert_eq!(normalizer.normalize("यह घर है|"), "यह घर है।");
        assert_eq!(normalizer.normalize("पहला| दूसरा |"), "पहला। दूसरा ।");
        assert_eq!(normalizer.normalize("श्लोक||"), "श्लोक॥");
        assert_eq!(normalizer.normalize("\"कहो|\""), "\"कहो।\"");
    }

    #[test]
    fn test_inner_pipe_kept() {
        let normalizer = ScriptNormalizer::reduced(Language::Hindi);
        assert_eq!(normalizer.normalize("a|b"), "a|b");
        assert_eq!(normalizer.normalize("a||b"), "a||b");
    }

    #[test]
    fn test_strips_joiners() {
        let normalizer = ScriptNormalizer::reduced(Language::Hindi);
        assert_eq!(normalizer.normalize("क्\u{200D}ष\u{200C}त्र"), "क्षत्र");
    }

    #[test]
    fn test_tables_untouched() {
        let normalizer = ScriptNormalizer::new(Language::Hindi);
        let text = "वाक्य|\n[TABLE START]\n| नाम | मान |\n| --- | --- |\n| क\u{200D} | 1 |\n[TABLE END]";
        let normalized = normalizer.normalize(text);
        assert!(normalized.starts_with("वाक्य।\n"));
        assert!(normalized.contains("| नाम | मान |\n| --- | --- |\n| क\u{200D} | 1 |"));
    }

    #[test]
    fn test_english_is_noop() {
        let normalizer = ScriptNormalizer::new(Language::English);
        let text = "a|b |\u{200D}";
        assert_eq!(normalizer.normalize(text), text);
        assert!(normalizer.degraded_capability().is_none());
    }

    #[test]
    fn test_reduced_mode_reports_degradation() {
        let normalizer = ScriptNormalizer::reduced(Language::Hindi);
        assert!(normalizer.is_reduced());
        let degraded = normalizer.degraded_capability().unwrap();
        assert_eq!(degraded.capability, "script-normalization");
        // nukta sequences pass through unchanged
        assert_eq!(normalizer.normalize("क\u{093C}"), "क\u{093C}");
    }

    #[test]
    fn test_injected_backend() {
        struct Upper;
        impl ScriptBackend for Upper {
            fn name(&self) -> &str {
                "upper"
            }
            fn canonicalize(&self, text: &str) -> String {
                text.to_uppercase()
            }
        }

        let normalizer = ScriptNormalizer::with_backend(Language::Hindi, Box::new(Upper));
        assert!(!normalizer.is_reduced());
        assert_eq!(normalizer.normalize("abc|"), "ABC।");
    }

    #[cfg(feature = "script-backend")]
    #[test]
    fn test_nukta_composition() {
        let normalizer = ScriptNormalizer::new(Language::Hindi);
        assert!(!normalizer.is_reduced());
        assert_eq!(normalizer.normalize("क\u{093C}लम"), "\u{0958}लम");
        assert_eq!(normalizer.normalize("\u{0928}\u{093C}"), "\u{0929}");
        assert_eq!(normalizer.normalize("\u{0958}"), "\u{0958}");
    }

    #[cfg(feature = "script-backend")]
    #[test]
    fn test_idempotent() {
        let normalizer = ScriptNormalizer::new(Language::Hindi);
        let text = "ज\u{093C}रा\u{200C} रुको|\nफ\u{093C}ल|| बाद में";
        let once = normalizer.normalize(text);
        assert_eq!(normalizer.normalize(&once), once);
        assert_eq!(once, "\u{095B}रा रुको।\n\u{095E}ल॥ बाद में");
    }
}
