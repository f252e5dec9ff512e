// DataSource: where samples come from
//
// Either a directory whose immediate entries are the sample locations, or an
// explicit list of locations. Both resolve to a sorted list so that dataset
// indices do not depend on filesystem enumeration order.

use std::path::{Path, PathBuf};

use sluice_core::{Error, Result};

/// A directory or an explicit list of sample locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Dir(PathBuf),
    Paths(Vec<PathBuf>),
}

impl DataSource {
    /// Enumerate the sample locations, sorted lexicographically.
    ///
    /// A `Dir` source must name an existing directory; anything else is a
    /// configuration error.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        match self {
            DataSource::Dir(root) => {
                if !root.is_dir() {
                    return Err(Error::config(format!(
                        "{} is not a valid directory",
                        root.display()
                    )));
                }
                let mut paths = Vec::new();
                for entry in std::fs::read_dir(root)? {
                    paths.push(entry?.path());
                }
                paths.sort();
                Ok(paths)
            }
            DataSource::Paths(paths) => {
                let mut paths = paths.clone();
                paths.sort();
                Ok(paths)
            }
        }
    }
}

impl From<PathBuf> for DataSource {
    fn from(p: PathBuf) -> Self {
        DataSource::Dir(p)
    }
}

impl From<&Path> for DataSource {
    fn from(p: &Path) -> Self {
        DataSource::Dir(p.to_path_buf())
    }
}

impl From<&str> for DataSource {
    fn from(p: &str) -> Self {
        DataSource::Dir(PathBuf::from(p))
    }
}

impl From<Vec<PathBuf>> for DataSource {
    fn from(paths: Vec<PathBuf>) -> Self {
        DataSource::Paths(paths)
    }
}

impl From<&[PathBuf]> for DataSource {
    fn from(paths: &[PathBuf]) -> Self {
        DataSource::Paths(paths.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_are_sorted() {
        let src = DataSource::from(vec![
            PathBuf::from("b.bin"),
            PathBuf::from("a.bin"),
            PathBuf::from("c.bin"),
        ]);
        let names: Vec<_> = src.resolve().unwrap();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.bin"),
                PathBuf::from("b.bin"),
                PathBuf::from("c.bin")
            ]
        );
    }

    #[test]
    fn directory_entries_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s2", "s0", "s1"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let paths = DataSource::from(dir.path()).resolve().unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["s0", "s1", "s2"]);
    }

    #[test]
    fn non_directory_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(DataSource::from(file).resolve().unwrap_err().is_config());
        let missing = dir.path().join("missing");
        assert!(DataSource::from(missing).resolve().unwrap_err().is_config());
    }
}
