//! Temporary project directories for snapshot tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for a temporary project directory.
///
/// The directory is removed when the built project is dropped.
pub struct TestProject {
    temp_dir: TempDir,
    /// Files to create (path relative to root -> contents).
    files: BTreeMap<PathBuf, String>,
    /// Empty directories to create.
    dirs: Vec<PathBuf>,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            files: BTreeMap::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a file; parent directories are created on build.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.into());
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add a `.gitignore` file.
    pub fn with_gitignore(self, contents: &str) -> Self {
        self.with_file(".gitignore", contents)
    }

    /// Add a small published web application: tracked sources plus build
    /// output and logs that [`content::DEPLOY_GITIGNORE`] excludes.
    pub fn with_web_app(self) -> Self {
        self.with_file("wwwroot/index.html", content::INDEX_HTML)
            .with_file("appsettings.json", content::APP_SETTINGS)
            .with_file("bin/app.dll", "MZ binary")
            .with_file("logs/startup.log", "started\n")
            .with_gitignore(content::DEPLOY_GITIGNORE)
    }

    /// Create all directories and files on disk.
    pub fn build(self) -> BuiltTestProject {
        let root = self.temp_dir.path();

        for dir in &self.dirs {
            let full_path = root.join(dir);
            fs::create_dir_all(&full_path).unwrap_or_else(|e| {
                panic!("Failed to create directory {}: {}", full_path.display(), e)
            });
        }

        for (path, contents) in &self.files {
            write(&root.join(path), contents);
        }

        BuiltTestProject {
            temp_dir: self.temp_dir,
        }
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// A project whose files exist on disk.
pub struct BuiltTestProject {
    temp_dir: TempDir,
}

impl BuiltTestProject {
    /// Project root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> String {
        let full_path = self.path().join(path.as_ref());
        fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", full_path.display(), e))
    }

    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.path().join(path.as_ref()).exists()
    }

    /// Create or overwrite a file, creating parent directories.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<str>) {
        write(&self.path().join(path.as_ref()), contents.as_ref());
    }

    pub fn delete_file(&self, path: impl AsRef<Path>) {
        let full_path = self.path().join(path.as_ref());
        fs::remove_file(&full_path)
            .unwrap_or_else(|e| panic!("Failed to delete file {}: {}", full_path.display(), e));
    }
}

fn write(full_path: &Path, contents: &str) {
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| {
            panic!(
                "Failed to create parent directory for {}: {}",
                full_path.display(),
                e
            )
        });
    }
    fs::write(full_path, contents)
        .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
}

/// Common test file contents.
pub mod content {
    /// Ignore rules typical of a deployed .NET or node site.
    pub const DEPLOY_GITIGNORE: &str = "bin/\nobj/\nlogs/\n*.log\nnode_modules/\n";

    pub const INDEX_HTML: &str = "<!doctype html>\n<html><body>shop</body></html>\n";

    pub const APP_SETTINGS: &str = r#"{
  "Logging": { "LogLevel": { "Default": "Information" } },
  "AllowedHosts": "*"
}
"#;
}
