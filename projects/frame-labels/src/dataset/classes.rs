// Class mapping: `<class_id> <description>` lines, in label-column order

use crate::error::{LabelError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// How a class id from an action instance turns into a category string.
///
/// Two conventions exist for these datasets. `Prefixed` looks the id up as-is
/// and keeps it in the label (`c092-Holding some clothes`). `Stripped` drops a
/// one-character type prefix from the action's id before the lookup and keeps
/// only the description, for class files whose ids carry no prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelFormat {
    #[default]
    Prefixed,
    Stripped,
}

impl LabelFormat {
    /// The key used to look `class_id` up in the class mapping.
    pub fn lookup_key<'a>(&self, class_id: &'a str) -> &'a str {
        match self {
            LabelFormat::Prefixed => class_id,
            LabelFormat::Stripped => class_id
                .char_indices()
                .nth(1)
                .map(|(i, _)| &class_id[i..])
                .unwrap_or(""),
        }
    }

    /// Renders the category for a class-mapping entry.
    pub fn render(&self, id: &str, description: &str) -> String {
        match self {
            LabelFormat::Prefixed => format!("{}-{}", id, description),
            LabelFormat::Stripped => description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    pub id: String,
    pub description: String,
}

/// Ordered, read-only class table. Load order defines label columns.
#[derive(Debug, Clone, Default)]
pub struct ClassMapping {
    entries: Vec<ClassEntry>,
    positions: HashMap<String, usize>,
}

impl ClassMapping {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LabelError::io(path, e))?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, source_name: &str) -> Result<Self> {
        let mut mapping = Self::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| LabelError::io(source_name, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (id, description) = line.split_once(char::is_whitespace).ok_or_else(|| {
                LabelError::parse(
                    source_name,
                    idx + 1,
                    format!("expected '<class_id> <description>', got '{}'", line),
                )
            })?;

            mapping.insert(id, description);
        }

        tracing::debug!("Loaded {} classes from {}", mapping.len(), source_name);
        Ok(mapping)
    }

    /// Last description wins; a re-defined id keeps its original column.
    fn insert(&mut self, id: &str, description: &str) {
        match self.positions.get(id) {
            Some(&pos) => self.entries[pos].description = description.to_string(),
            None => {
                self.positions.insert(id.to_string(), self.entries.len());
                self.entries.push(ClassEntry {
                    id: id.to_string(),
                    description: description.to_string(),
                });
            }
        }
    }

    pub fn description(&self, id: &str) -> Option<&str> {
        self.positions
            .get(id)
            .map(|&pos| self.entries[pos].description.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> {
        self.entries.iter()
    }

    /// Category string for an action's class id.
    pub fn category(&self, class_id: &str, format: LabelFormat) -> Result<String> {
        let key = format.lookup_key(class_id);
        let description = self
            .description(key)
            .ok_or_else(|| LabelError::UnknownClass(class_id.to_string()))?;
        Ok(format.render(key, description))
    }

    pub fn label_index(&self, format: LabelFormat) -> LabelIndex {
        let names: Vec<String> = self
            .iter()
            .map(|entry| format.render(&entry.id, &entry.description))
            .collect();

        let mut columns = HashMap::with_capacity(names.len());
        for (column, name) in names.iter().enumerate() {
            columns.entry(name.clone()).or_insert(column);
        }

        LabelIndex { names, columns }
    }
}

/// Category → label-matrix column.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    names: Vec<String>,
    columns: HashMap<String, usize>,
}

impl LabelIndex {
    pub fn column(&self, category: &str) -> Result<usize> {
        self.columns
            .get(category)
            .copied()
            .ok_or_else(|| LabelError::UnknownClass(category.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: &str = "c000 Holding some clothes\nc001 Putting clothes somewhere\n\nc157 someone is eating\n";

    #[test]
    fn test_load_preserves_order_and_descriptions() {
        let mapping = ClassMapping::from_reader(CLASSES.as_bytes(), "classes.txt").unwrap();
        assert_eq!(mapping.len(), 3);

        let ids: Vec<&str> = mapping.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c000", "c001", "c157"]);
        assert_eq!(mapping.description("c157"), Some("someone is eating"));
        assert_eq!(mapping.description("c999"), None);
    }

    #[test]
    fn test_malformed_line_names_source_and_line() {
        let err = ClassMapping::from_reader("c000 ok\nbroken\n".as_bytes(), "classes.txt")
            .unwrap_err();
        match err {
            LabelError::Parse {
                source_name, line, ..
            } => {
                assert_eq!(source_name, "classes.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_id_last_wins_keeps_column() {
        let mapping =
            ClassMapping::from_reader("a first\nb other\na second\n".as_bytes(), "dup").unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.description("a"), Some("second"));

        let index = mapping.label_index(LabelFormat::Prefixed);
        assert_eq!(index.column("a-second").unwrap(), 0);
        assert_eq!(index.column("b-other").unwrap(), 1);
    }

    #[test]
    fn test_category_formats() {
        let mapping = ClassMapping::from_reader("157 someone is eating\n".as_bytes(), "c").unwrap();

        assert_eq!(
            mapping.category("157", LabelFormat::Prefixed).unwrap(),
            "157-someone is eating"
        );
        assert_eq!(
            mapping.category("c157", LabelFormat::Stripped).unwrap(),
            "someone is eating"
        );
        assert!(matches!(
            mapping.category("c157", LabelFormat::Prefixed),
            Err(LabelError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_lookup_key_stripped_handles_short_ids() {
        assert_eq!(LabelFormat::Stripped.lookup_key("c092"), "092");
        assert_eq!(LabelFormat::Stripped.lookup_key("c"), "");
        assert_eq!(LabelFormat::Stripped.lookup_key(""), "");
        assert_eq!(LabelFormat::Prefixed.lookup_key("c092"), "c092");
    }

    #[test]
    fn test_label_index_columns_follow_load_order() {
        let mapping = ClassMapping::from_reader(CLASSES.as_bytes(), "classes.txt").unwrap();
        let index = mapping.label_index(LabelFormat::Prefixed);

        assert_eq!(index.len(), 3);
        assert_eq!(index.names()[2], "c157-someone is eating");
        assert_eq!(index.column("c001-Putting clothes somewhere").unwrap(), 1);
        assert!(index.column("nope").is_err());
    }
}
