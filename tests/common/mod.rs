//! Shared helpers for odtmerge integration tests.

#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use odtmerge::package::OdtPackage;
use odtmerge::test_utils::OdtFixture;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory holding templates, contexts, and rendered output.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        odtmerge::test_utils::init_test_logging(None);
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `fixture` as `name` inside the project.
    pub fn write_template(&self, name: &str, fixture: &OdtFixture) -> Result<PathBuf> {
        fixture.write_to(self.path(), name)
    }

    pub fn write_context(&self, name: &str, context: &Value) -> Result<PathBuf> {
        self.write_file(name, serde_json::to_string_pretty(context)?.as_bytes())
    }

    pub fn write_file(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(name);
        std::fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// The `odtmerge` binary running inside the project directory.
    pub fn odtmerge(&self) -> Command {
        let mut cmd = Command::cargo_bin("odtmerge").expect("odtmerge binary is built");
        cmd.current_dir(self.path()).env_remove("RUST_LOG");
        cmd
    }

    pub fn open(&self, name: &str) -> Result<OdtPackage> {
        Ok(OdtPackage::open(self.path().join(name))?)
    }
}

/// Concatenated text of a package part.
pub fn text_of(document: &odtmerge::xml::Document) -> String {
    document.text_content(document.root())
}
