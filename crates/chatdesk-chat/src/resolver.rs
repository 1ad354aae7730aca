//! Static answer lookup.
//!
//! The response table is a JSON object whose keys are the answers and whose
//! values are the normalized questions they answer. Lookups match the
//! normalized input against the values and return the key of the first hit,
//! scanning in the order entries appear in the resource.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ChatError;

/// Bot reply used when no question in the table matches.
pub const FALLBACK_ANSWER: &str = "I don't understand that.";

/// Table shipped with the crate, used when no override is configured.
pub const BUNDLED_RESPONSES: &str = include_str!("../assets/responses.json");

/// Strip surrounding whitespace, counting U+FEFF (byte order mark) as
/// whitespace the way browser string trimming does.
pub fn trim_input(input: &str) -> &str {
    input.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// Lower-case and trim surrounding whitespace.
pub fn normalize(input: &str) -> String {
    trim_input(input).to_lowercase()
}

// =============================================================================
// QaTable
// =============================================================================

/// One answer and the normalized question it responds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaEntry {
    pub answer: String,
    pub question: String,
}

/// Ordered, read-only answer table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QaTable {
    entries: Vec<QaEntry>,
}

impl QaTable {
    /// Build a table from `(answer, question)` pairs, keeping their order.
    pub fn from_pairs<I, A, Q>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, Q)>,
        A: Into<String>,
        Q: Into<String>,
    {
        let mut table = Self::default();
        for (answer, question) in pairs {
            table.insert(answer.into(), question.into());
        }
        table
    }

    /// Parse a table from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ChatError> {
        let table: QaTable =
            serde_json::from_str(json).map_err(|e| ChatError::ResponseTable(e.to_string()))?;
        table.warn_on_unnormalized();
        Ok(table)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ChatError::ResponseTable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let table = Self::from_json_str(&json)?;
        info!(path = %path.display(), entries = table.len(), "Response table loaded");
        Ok(table)
    }

    /// The table compiled into the crate.
    pub fn bundled() -> Result<Self, ChatError> {
        Self::from_json_str(BUNDLED_RESPONSES)
    }

    pub fn entries(&self) -> &[QaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A repeated answer keeps its first position and takes the latest question,
    /// the way a JSON object with a duplicate key behaves in the browser.
    fn insert(&mut self, answer: String, question: String) {
        match self.entries.iter_mut().find(|e| e.answer == answer) {
            Some(existing) => existing.question = question,
            None => self.entries.push(QaEntry { answer, question }),
        }
    }

    fn warn_on_unnormalized(&self) {
        for entry in &self.entries {
            if normalize(&entry.question) != entry.question {
                warn!(
                    question = %entry.question,
                    "Question is not normalized and can never match"
                );
            }
        }
    }
}

impl<'de> Deserialize<'de> for QaTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = QaTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping answers to questions")
            }

            fn visit_map<M>(self, mut map: M) -> Result<QaTable, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut table = QaTable {
                    entries: Vec::with_capacity(map.size_hint().unwrap_or(0)),
                };
                while let Some((answer, question)) = map.next_entry::<String, String>()? {
                    table.insert(answer, question);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

// =============================================================================
// ResponseResolver
// =============================================================================

/// Maps raw user text to a bot reply. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResponseResolver {
    table: Arc<QaTable>,
}

impl ResponseResolver {
    pub fn new(table: QaTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &QaTable {
        &self.table
    }

    /// The first answer whose question equals the normalized input.
    pub fn lookup(&self, raw_input: &str) -> Option<&str> {
        let needle = normalize(raw_input);
        self.table
            .entries
            .iter()
            .find(|e| e.question == needle)
            .map(|e| e.answer.as_str())
    }

    /// Like [`lookup`](Self::lookup), falling back to [`FALLBACK_ANSWER`].
    pub fn resolve(&self, raw_input: &str) -> String {
        match self.lookup(raw_input) {
            Some(answer) => answer.to_string(),
            None => {
                debug!("No predefined answer matched");
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ResponseResolver {
        ResponseResolver::new(QaTable::from_pairs([
            ("It is noon.", "what time is it?"),
            ("Hello!", "hello"),
            ("Second hello.", "hello"),
        ]))
    }

    // ---- normalize ----

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize("  What Time IS it?\n"), "what time is it?");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\t "), "");
    }

    #[test]
    fn test_normalize_strips_byte_order_mark() {
        assert_eq!(normalize("\u{FEFF}Hello\u{FEFF} "), "hello");
        assert_eq!(normalize("\u{FEFF}"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for s in ["  Hello ", "HELLO", "hello", " mixed Case\t", "Ünïcode  "] {
            assert_eq!(normalize(&normalize(s)), normalize(s));
        }
    }

    // ---- resolve ----

    #[test]
    fn test_resolve_exact_match() {
        assert_eq!(resolver().resolve("what time is it?"), "It is noon.");
    }

    #[test]
    fn test_resolve_ignores_case_and_surrounding_whitespace() {
        let r = resolver();
        assert_eq!(r.resolve("What time is it?"), r.resolve("  what time is it?  "));
        assert_eq!(r.resolve("WHAT TIME IS IT?"), "It is noon.");
    }

    #[test]
    fn test_resolve_matches_through_byte_order_mark() {
        assert_eq!(resolver().resolve("\u{FEFF}what time is it?"), "It is noon.");
    }

    #[test]
    fn test_resolve_normalization_does_not_change_result() {
        let r = resolver();
        for s in ["  HeLLo ", "what time is it", "nope", "Hello!"] {
            assert_eq!(r.resolve(s), r.resolve(&normalize(s)));
        }
    }

    #[test]
    fn test_resolve_no_partial_matching() {
        let r = resolver();
        assert_eq!(r.resolve("what time"), FALLBACK_ANSWER);
        assert_eq!(r.resolve("hello there"), FALLBACK_ANSWER);
        assert_eq!(r.resolve("what  time is it?"), FALLBACK_ANSWER);
    }

    #[test]
    fn test_resolve_first_match_wins() {
        assert_eq!(resolver().resolve("hello"), "Hello!");
    }

    #[test]
    fn test_resolve_matches_values_not_keys() {
        // Typing an answer must not echo it back.
        assert_eq!(resolver().resolve("It is noon."), FALLBACK_ANSWER);
    }

    #[test]
    fn test_resolve_never_empty() {
        let r = resolver();
        for s in ["x", "hello", "???", "🙂", "what time is it?"] {
            assert!(!r.resolve(s).is_empty());
        }
        let empty = ResponseResolver::new(QaTable::default());
        assert_eq!(empty.resolve("hello"), FALLBACK_ANSWER);
    }

    #[test]
    fn test_lookup_reports_no_match() {
        let r = resolver();
        assert_eq!(r.lookup("hello"), Some("Hello!"));
        assert_eq!(r.lookup("goodbye"), None);
    }

    // ---- QaTable ----

    #[test]
    fn test_table_preserves_resource_order() {
        let table = QaTable::from_json_str(
            r#"{"Zebra answer": "z", "Apple answer": "a", "Mango answer": "m"}"#,
        )
        .unwrap();
        let answers: Vec<&str> = table.entries().iter().map(|e| e.answer.as_str()).collect();
        assert_eq!(answers, vec!["Zebra answer", "Apple answer", "Mango answer"]);
    }

    #[test]
    fn test_table_first_match_follows_resource_order() {
        let table = QaTable::from_json_str(r#"{"Later": "same", "Earlier": "same"}"#).unwrap();
        let r = ResponseResolver::new(table);
        assert_eq!(r.resolve("SAME"), "Later");
    }

    #[test]
    fn test_table_duplicate_answer_keeps_position_takes_last_question() {
        let table =
            QaTable::from_json_str(r#"{"A": "first", "B": "b", "A": "second"}"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].answer, "A");
        assert_eq!(table.entries()[0].question, "second");
    }

    #[test]
    fn test_table_rejects_non_object() {
        let err = QaTable::from_json_str(r#"["hello"]"#).unwrap_err();
        assert!(matches!(err, ChatError::ResponseTable(_)));
    }

    #[test]
    fn test_table_rejects_non_string_question() {
        assert!(QaTable::from_json_str(r#"{"Answer": 42}"#).is_err());
    }

    #[test]
    fn test_table_load_missing_file() {
        let err = QaTable::load(Path::new("/nonexistent/responses.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_table_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, r#"{"Pong.": "ping"}"#).unwrap();

        let table = QaTable::load(&path).unwrap();
        assert_eq!(ResponseResolver::new(table).resolve(" PING "), "Pong.");
    }

    #[test]
    fn test_bundled_table_is_valid_and_normalized() {
        let table = QaTable::bundled().unwrap();
        assert!(!table.is_empty());
        for entry in table.entries() {
            assert_eq!(normalize(&entry.question), entry.question);
        }
        let r = ResponseResolver::new(table);
        assert_ne!(r.resolve("Hello"), FALLBACK_ANSWER);
    }
}
