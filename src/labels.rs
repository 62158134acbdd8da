//! Label filtering and series identity.
//!
//! A series is identified by its metric name plus a label set drawn from the
//! closed [`LabelKey`] vocabulary. Raw labels from call sites are passed
//! through [`filter_labels`], which drops unknown or disallowed keys and
//! orders the survivors by key, so the same logical label set always yields
//! the same [`series_key`].
//!
//! Values are written verbatim between double quotes. A value containing `"`
//! or `,` therefore renders an ambiguous key; callers keep label values to
//! simple identifiers.

use std::fmt::{self, Display, Formatter, Write as _};
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::INLINE_LABELS;

// ----------------------------------------------------------------------------
// Label Keys - The Closed Vocabulary
// ----------------------------------------------------------------------------

/// The label keys a series may carry. Extending this list is a deliberate
/// design change; configuration can only narrow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKey {
    Engine,
    Mode,
    Model,
    Operation,
    Provider,
    Status,
}

impl LabelKey {
    /// Every key, in lexicographic order of its string form.
    pub const ALL: [LabelKey; 6] = [
        LabelKey::Engine,
        LabelKey::Mode,
        LabelKey::Model,
        LabelKey::Operation,
        LabelKey::Provider,
        LabelKey::Status,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            LabelKey::Engine => "engine",
            LabelKey::Mode => "mode",
            LabelKey::Model => "model",
            LabelKey::Operation => "operation",
            LabelKey::Provider => "provider",
            LabelKey::Status => "status",
        }
    }

    /// Look up a raw key. Returns `None` for anything outside the vocabulary.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl Display for LabelKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown label key '{}'", s))
    }
}

// ----------------------------------------------------------------------------
// Labels - Filtered, Canonically Ordered
// ----------------------------------------------------------------------------

/// A single accepted label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub key: LabelKey,
    pub value: CompactString,
}

impl Label {
    #[inline]
    pub fn new<V: Into<CompactString>>(key: LabelKey, value: V) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.key, self.value)
    }
}

/// An accepted label set, sorted by key with at most one entry per key.
pub type Labels = SmallVec<[Label; INLINE_LABELS]>;

/// Filter raw key/value pairs down to the allowed vocabulary.
///
/// Keys that are unknown or not in `allowed` are dropped. When a key repeats,
/// the last value wins. The result is sorted by key.
pub fn filter_labels(allowed: &[LabelKey], raw: &[(&str, &str)]) -> Labels {
    let mut labels = Labels::new();

    for (key, value) in raw {
        let Some(key) = LabelKey::parse(key) else {
            continue;
        };
        if !allowed.contains(&key) {
            continue;
        }

        match labels.binary_search_by(|l| l.key.as_str().cmp(key.as_str())) {
            Ok(pos) => labels[pos].value = CompactString::from(*value),
            Err(pos) => labels.insert(pos, Label::new(key, *value)),
        }
    }

    labels
}

/// Render the series key: the bare name when `labels` is empty, otherwise
/// `name{k1="v1",k2="v2"}` with keys in sorted order.
pub fn series_key(name: &str, labels: &[Label]) -> CompactString {
    if labels.is_empty() {
        return CompactString::from(name);
    }

    let mut key = CompactString::with_capacity(name.len() + labels.len() * 16);
    key.push_str(name);
    key.push('{');
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        // Writing into a CompactString cannot fail
        let _ = write!(key, "{}", label);
    }
    key.push('}');
    key
}

/// Whether `key` names a series of metric `name`, bare or labeled.
pub fn is_series_of(key: &str, name: &str) -> bool {
    match key.strip_prefix(name) {
        Some("") => true,
        Some(rest) => rest.starts_with('{'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unknown_keys_are_dropped() {
        let labels = filter_labels(&LabelKey::ALL, &[("invalid_label", "y"), ("status", "ok")]);

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0], Label::new(LabelKey::Status, "ok"));
        assert_eq!(series_key("x", &labels), "x{status=\"ok\"}");
    }

    #[test]
    fn test_disallowed_keys_are_dropped() {
        let allowed = [LabelKey::Status];
        let labels = filter_labels(&allowed, &[("provider", "openai"), ("status", "ok")]);

        assert_eq!(series_key("llm.calls", &labels), "llm.calls{status=\"ok\"}");
    }

    #[test]
    fn test_empty_labels_use_bare_name() {
        let labels = filter_labels(&LabelKey::ALL, &[("nope", "1")]);
        assert!(labels.is_empty());
        assert_eq!(series_key("db.queries_total", &labels), "db.queries_total");
    }

    #[test]
    fn test_keys_sorted_regardless_of_order() {
        let a = filter_labels(&LabelKey::ALL, &[("status", "ok"), ("engine", "tesseract")]);
        let b = filter_labels(&LabelKey::ALL, &[("engine", "tesseract"), ("status", "ok")]);

        assert_eq!(series_key("ocr.runs", &a), series_key("ocr.runs", &b));
        assert_eq!(series_key("ocr.runs", &a), "ocr.runs{engine=\"tesseract\",status=\"ok\"}");
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let labels = filter_labels(&LabelKey::ALL, &[("mode", "a"), ("mode", "b")]);
        assert_eq!(series_key("m", &labels), "m{mode=\"b\"}");
    }

    #[test]
    fn test_values_are_not_escaped() {
        let labels = filter_labels(&LabelKey::ALL, &[("status", "a\"b")]);
        assert_eq!(series_key("m", &labels), "m{status=\"a\"b\"}");
    }

    #[test]
    fn test_label_key_round_trip_through_str() {
        for key in LabelKey::ALL {
            assert_eq!(key.as_str().parse::<LabelKey>(), Ok(key));
        }
        assert!("host".parse::<LabelKey>().is_err());
    }

    #[test]
    fn test_all_is_sorted() {
        let names: Vec<_> = LabelKey::ALL.iter().map(|k| k.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_is_series_of() {
        assert!(is_series_of("http.requests", "http.requests"));
        assert!(is_series_of("http.requests{status=\"ok\"}", "http.requests"));
        assert!(!is_series_of("http.requests_total", "http.requests"));
        assert!(!is_series_of("http", "http.requests"));
    }

    proptest! {
        #[test]
        fn prop_insertion_order_does_not_change_key(
            pairs in proptest::collection::vec(
                (prop::sample::select(vec!["status", "provider", "mode", "engine", "model", "operation", "bogus"]),
                 "[a-z]{1,6}"),
                0..6,
            ),
            seed in any::<u64>(),
        ) {
            let mut pairs = pairs;
            // Keep one value per key so "last wins" does not depend on order
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            pairs.dedup_by(|a, b| a.0 == b.0);

            let forward: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            let mut shuffled = forward.clone();
            let len = shuffled.len().max(1);
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();

            let a = series_key("x", &filter_labels(&LabelKey::ALL, &forward));
            let b = series_key("x", &filter_labels(&LabelKey::ALL, &shuffled));
            prop_assert_eq!(a, b);
        }
    }
}
