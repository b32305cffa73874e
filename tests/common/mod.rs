//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_environment("base");
//! let env = fixture.environment("base", "work");
//! ```

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use virtphp::environment::Environment;

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::files;
    pub use super::TestFixture;
}

/// Contents of the files every environment carries, for a given root.
#[allow(dead_code)]
pub mod files {
    pub fn activate_script(root: &str) -> String {
        format!(
            "# This file must be used with \"source bin/activate.sh\"\n\
             deactivate () {{\n    export PATH=\"$_OLD_PATH\"\n}}\n\
             VIRT_ROOT=\"{root}\"\nexport VIRT_ROOT\n\
             _OLD_PATH=\"$PATH\"\nPATH=\"$VIRT_ROOT/bin:$PATH\"\nexport PATH\n"
        )
    }

    pub fn php_ini(root: &str) -> String {
        format!(
            "[PHP]\nmemory_limit = 128M\n\
             include_path = \".:{root}/share/php\"\n\
             extension_dir = \"{root}/lib/php/extensions\"\n\n\
             [Date]\ndate.timezone = UTC\n"
        )
    }

    pub fn php_wrapper(root: &str) -> String {
        format!("#!/bin/sh\nexec /usr/bin/php -c {root}/etc/php.ini \"$@\"\n")
    }

    /// A PEAR configuration with nested include paths.
    pub fn pear_conf(root: &str) -> Vec<u8> {
        fn s(value: &str) -> String {
            format!("s:{}:\"{}\";", value.len(), value)
        }
        let entries = [
            ("php_dir", format!("{root}/share/php")),
            ("bin_dir", format!("{root}/bin")),
            ("data_dir", format!("{root}/share/php/data")),
        ];
        let mut body = String::new();
        for (key, value) in &entries {
            body.push_str(&s(key));
            body.push_str(&s(value));
        }
        let includes = format!(
            "a:2:{{i:0;{}i:1;a:1:{{i:0;{}}}}}",
            s(&format!("{root}/share/pear")),
            s(&format!("{root}/lib/pear"))
        );
        body.push_str(&s("include_path"));
        body.push_str(&includes);
        body.push_str(&s("verbose"));
        body.push_str("i:1;");
        format!("#PEAR_Config 0.9\na:5:{{{}}}", body).into_bytes()
    }
}

/// A temporary directory holding one or more environments.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
    root: PathBuf,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        // Environments embed their canonical root.
        let root = fs::canonicalize(temp_dir.path()).expect("Failed to canonicalize temp dir");
        Self { temp_dir, root }
    }

    /// Add a complete environment in directory `name`.
    pub fn with_environment(self, name: &str) -> Self {
        let root = self.root.join(name);
        let r = root.to_str().expect("temp dir is not UTF-8");
        self.write(&format!("{name}/bin/activate.sh"), files::activate_script(r).as_bytes());
        self.write(&format!("{name}/etc/php.ini"), files::php_ini(r).as_bytes());
        self.write(&format!("{name}/bin/php"), files::php_wrapper(r).as_bytes());
        self.write(&format!("{name}/etc/pear.conf"), &files::pear_conf(r));
        self.write(&format!("{name}/share/php/PEAR.php"), b"<?php\n");
        set_executable(&root.join("bin/php"));
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.write(path, content.as_bytes());
        self
    }

    fn write(&self, path: &str, content: &[u8]) {
        self.temp_dir
            .child(path)
            .write_binary(content)
            .expect("Failed to write file");
    }

    /// Canonical path of the temporary directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Describe a clone of `source` to `target`, both relative to the fixture.
    pub fn environment(&self, source: &str, target: &str) -> Environment {
        Environment::new(self.root.join(source), self.root.join(target))
            .expect("Failed to build environment")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("virtphp");
        cmd.current_dir(self.path());
        cmd.env_remove("VIRTPHP_ENV_ROOT");
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Every regular file below `root`, with its contents.
#[allow(dead_code)]
pub fn read_tree(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("entry outside root")
                .to_path_buf();
            let content = fs::read(entry.path()).expect("Failed to read file");
            (relative, content)
        })
        .collect();
    files.sort();
    files
}

#[cfg(unix)]
fn set_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to set permissions");
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_environment() {
        let fixture = TestFixture::new().with_environment("base");
        assert!(fixture.path().join("base/etc/pear.conf").is_file());
        assert!(fixture.path().join("base/bin/php").is_file());
    }

    #[test]
    fn test_pear_conf_is_valid_serialized_data() {
        let doc = virtphp::serialized::Document::parse(&files::pear_conf("/envs/base")).unwrap();
        assert!(doc.value.get("include_path").is_some());
    }
}
