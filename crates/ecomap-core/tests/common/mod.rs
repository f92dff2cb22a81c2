//! Common test utilities for integration tests.
//!
//! Builds throwaway corpora on disk so tests exercise the real loaders.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use ecomap_core::{Corpus, LoaderConfig};
use tempfile::TempDir;

/// A corpus written into a temporary directory.
pub struct TestCorpus {
    dir: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            dir: tempfile::Builder::new()
                .prefix("ecomap-corpus-")
                .tempdir()
                .expect("Failed to create temp dir"),
        }
    }

    /// Write a file relative to the corpus root
    pub fn file(self, relative: &str, contents: &str) -> Self {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().expect("file has a parent")).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    /// Write an entity document
    pub fn entity(self, folder: &str, id: &str, yaml: &str) -> Self {
        self.file(&format!("{}/{}.yaml", folder, id), yaml)
    }

    /// Write a relationship document
    pub fn relationship(self, id: &str, source: &str, target: &str, kind: &str) -> Self {
        let yaml = format!(
            "source: {}\ntarget: {}\nrelationship_type: {}\n",
            source, target, kind
        );
        self.file(&format!("relationships/{}.yaml", id), &yaml)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Load the corpus with the default layout
    pub fn load(&self) -> Corpus {
        Corpus::from_directory(self.path(), LoaderConfig::default()).expect("Failed to load corpus")
    }
}

/// Two entities linked by a "funds" relationship, plus a dangling link to Z.
///
/// - A: organization tagged "safeguarding"
/// - B: service tagged "food"
/// - r1: A → B (funds)
/// - r2: A → Z (partners), Z is not a loaded entity
pub fn funding_corpus() -> TestCorpus {
    TestCorpus::new()
        .entity(
            "organizations",
            "A",
            "name: Alpha Trust\nregion: North\ntags:\n  - safeguarding\n  - housing\n",
        )
        .entity(
            "services",
            "B",
            "name: Beta Food Bank\norganisation: Alpha Trust\nregion: South\ntags: [food]\n",
        )
        .relationship("r1", "A", "B", "funds")
}

/// `funding_corpus` plus the dangling relationship to Z.
pub fn dangling_corpus() -> TestCorpus {
    funding_corpus().relationship("r2", "A", "Z", "partners")
}
