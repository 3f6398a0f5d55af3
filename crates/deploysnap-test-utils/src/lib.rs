//! Testing utilities for deploysnap.
//!
//! ```rust,ignore
//! use deploysnap_test_utils::{content, TestProject};
//!
//! #[test]
//! fn test_capture() {
//!     let project = TestProject::new()
//!         .with_file("wwwroot/index.html", "<html/>")
//!         .with_gitignore(content::DEPLOY_GITIGNORE)
//!         .build();
//!
//!     assert!(project.file_exists("wwwroot/index.html"));
//! }
//! ```

pub mod fixtures;

pub use fixtures::{content, BuiltTestProject, TestProject};
