//! Interpreter configuration patching
//!
//! `etc/php.ini` names the environment's directories in values such as
//! `include_path` and `extension_dir`. The file is rewritten as raw bytes in
//! a single literal pass over the whole text, which covers the share and lib
//! path groups at once. PHP's INI grammar is looser than `rust-ini` (bare
//! keys, any byte encoding), so the file is parsed only to log which keys
//! are touched; a parse failure is a warning, never an error.

use std::path::Path;

use ::ini::{Ini, ParseOption};
use log::{debug, warn};

use super::{patch_text, FormatKind, FormatPatcher, PatchReport};
use crate::error::Result;
use crate::filesystem::Filesystem;
use crate::rewrite::SubstitutionRule;

/// Patcher for INI-style interpreter configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniPatcher;

impl FormatPatcher for IniPatcher {
    fn format(&self) -> FormatKind {
        FormatKind::Ini
    }

    fn patch(
        &self,
        fs: &dyn Filesystem,
        file: &Path,
        rule: &SubstitutionRule,
    ) -> Result<PatchReport> {
        patch_text(fs, file, rule, |original, _| {
            match parse_ini(original) {
                Ok(ini) => {
                    for key in keys_referencing(&ini, rule.from()) {
                        debug!("{}: rewriting {}", file.display(), key);
                    }
                }
                Err(reason) => warn!(
                    "{} is not plain INI ({}); rewriting it as text",
                    file.display(),
                    reason
                ),
            }
            Ok(())
        })
        .map_err(|e| e.into_patch(file))
    }
}

/// PHP's INI dialect has no escapes and keeps quotes as part of the value.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..Default::default()
    }
}

fn parse_ini(content: &[u8]) -> std::result::Result<Ini, String> {
    let text = std::str::from_utf8(content).map_err(|e| format!("not valid UTF-8: {}", e))?;
    Ini::load_from_str_opt(text, parse_options()).map_err(|e| e.to_string())
}

/// `section.key` names whose value mentions `needle`.
fn keys_referencing(ini: &Ini, needle: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for (section, properties) in ini.iter() {
        for (key, value) in properties.iter() {
            if value.contains(needle) {
                keys.push(match section {
                    Some(section) => format!("{}.{}", section, key),
                    None => key.to_string(),
                });
            }
        }
    }
    keys
}
