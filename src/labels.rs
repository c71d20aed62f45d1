use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AgentError, Result};

/// Immutable class-id to class-name mapping, loaded once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: BTreeMap<i64, String>,
}

impl LabelCatalog {
    /// Load a label file.
    ///
    /// Each line is either `<index>:<label>`, `<index> <label>` or a bare
    /// label, in which case the zero-based line number is the key.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Parse(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(Self::parse(&raw))
    }

    pub fn parse(raw: &str) -> Self {
        let separator = separator();
        let mut labels = BTreeMap::new();
        for (row, line) in raw.lines().enumerate() {
            let line = line.trim();
            let mut pair = separator.splitn(line, 2);
            let head = pair.next().unwrap_or_default();
            match (head.parse::<i64>(), pair.next()) {
                (Ok(index), Some(label)) if is_digits(head) => {
                    labels.insert(index, label.trim().to_string());
                }
                _ => {
                    labels.insert(row as i64, line.to_string());
                }
            }
        }
        Self { labels }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self {
            labels: pairs.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Look up the label for an engine class id.
    ///
    /// Engine ids are float encoded; an id with a fractional part or without
    /// an entry is an error rather than a default label.
    pub fn label(&self, class_id: f32) -> Result<&str> {
        if !class_id.is_finite() || class_id.fract() != 0.0 {
            return Err(AgentError::UnknownLabel(class_id));
        }
        self.labels
            .get(&(class_id as i64))
            .map(String::as_str)
            .ok_or(AgentError::UnknownLabel(class_id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[:\s]+").expect("valid separator pattern"))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_indexed_lines() {
        let catalog = LabelCatalog::parse("0: cat\n1: dog\n");
        assert_eq!(catalog, LabelCatalog::from_pairs([(0, "cat"), (1, "dog")]));
    }

    #[test]
    fn parses_bare_lines_by_row() {
        let catalog = LabelCatalog::parse("cat\ndog\n");
        assert_eq!(catalog, LabelCatalog::from_pairs([(0, "cat"), (1, "dog")]));
    }

    #[test]
    fn space_separated_index_and_sparse_ids() {
        let catalog = LabelCatalog::parse("0 person\n17 cat\n18 dog");
        assert_eq!(catalog.label(17.0).unwrap(), "cat");
        assert_eq!(catalog.label(18.0).unwrap(), "dog");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn bare_multi_word_label_is_kept_whole() {
        let catalog = LabelCatalog::parse("person\ntraffic light\n");
        assert_eq!(catalog.label(1.0).unwrap(), "traffic light");
    }

    #[test]
    fn unknown_or_fractional_id_is_an_error() {
        let catalog = LabelCatalog::parse("cat\n");
        assert!(matches!(catalog.label(3.0), Err(AgentError::UnknownLabel(_))));
        assert!(matches!(catalog.label(0.5), Err(AgentError::UnknownLabel(_))));
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp labels");
        writeln!(file, "0:cat").unwrap();
        writeln!(file, "1:dog").unwrap();
        let catalog = LabelCatalog::load(file.path()).expect("load labels");
        assert_eq!(catalog.label(1.0).unwrap(), "dog");

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            LabelCatalog::load(missing),
            Err(AgentError::Parse(_))
        ));
    }
}
