use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Class id → label mapping owned by a detector backend.
///
/// A table may also carry a vocabulary: the labels reported with a zero count
/// even when never detected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
    vocabulary: Vec<String>,
}

impl LabelTable {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            vocabulary: Vec::new(),
        }
    }

    /// Load a names file: one label per line, class id = line number.
    pub fn from_names_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label names {}", path.display()))?;
        let names: Vec<String> = raw.lines().map(|line| line.trim().to_string()).collect();
        if names.iter().all(|name| name.is_empty()) {
            return Err(anyhow!("label names file {} is empty", path.display()));
        }
        Ok(Self::new(names))
    }

    pub fn with_vocabulary<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.vocabulary = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn label_for(&self, class_id: usize) -> Option<&str> {
        self.names
            .get(class_id)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn class_id(&self, label: &str) -> Option<usize> {
        self.names.iter().position(|name| name == label)
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn names_file_maps_line_numbers() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "person\nbicycle\ncar\n\nbus")?;

        let table = LabelTable::from_names_file(file.path())?;
        assert_eq!(table.label_for(0), Some("person"));
        assert_eq!(table.label_for(2), Some("car"));
        assert_eq!(table.label_for(3), None);
        assert_eq!(table.label_for(4), Some("bus"));
        assert_eq!(table.label_for(99), None);
        assert_eq!(table.class_id("bus"), Some(4));
        Ok(())
    }

    #[test]
    fn empty_names_file_is_rejected() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        assert!(LabelTable::from_names_file(file.path()).is_err());
        Ok(())
    }
}
