//! # virtPHP Library
//!
//! This library provides the environment cloning engine behind the `virtphp`
//! command-line tool. A virtPHP environment is a self-contained directory
//! holding a PHP interpreter wrapper, its configuration and a PEAR
//! installation. Several files inside it embed the environment's absolute
//! root, so copying the directory is not enough to get a working clone: the
//! copied files must be patched to point at the new root.
//!
//! ## Quick Example
//!
//! ```
//! use virtphp::rewrite::{rewrite, SubstitutionRule};
//!
//! let rule = SubstitutionRule::new("/envs/base", "/envs/work");
//! let patched = rewrite(b"VIRT_ROOT=/envs/base\n", &rule);
//! assert_eq!(patched, b"VIRT_ROOT=/envs/work\n".to_vec());
//! ```
//!
//! ## Core Concepts
//!
//! - **Rewriting (`rewrite`)**: the single literal path substitution every
//!   patcher uses, for raw bytes and for decoded structured values.
//! - **Serialized data (`serialized`)**: a codec for the PHP `serialize()`
//!   format PEAR stores its configuration in.
//! - **Patchers (`patch`)**: one [`patch::FormatPatcher`] per file format
//!   found in an environment.
//! - **Filesystem (`filesystem`)**: the I/O primitives the engine needs,
//!   behind a trait so failures can be injected in tests.
//! - **Cloning (`cloner`, `orchestrator`)**: the deep copy and the pipeline
//!   that sequences a clone with full rollback.
//!
//! ## Execution Flow
//!
//! [`orchestrator::CloneOrchestrator::run`] executes these steps:
//!
//! 1.  **Create destination**: the new root must not exist yet.
//! 2.  **Copy tree**: deep copy of the source environment.
//! 3.  **Patch activate script**: `bin/activate.sh`.
//! 4.  **Patch ini**: `etc/php.ini`.
//! 5.  **Patch wrapper**: `bin/php`.
//! 6.  **Patch PEAR config**: `etc/pear.conf`.
//!
//! If any step after the first fails, the new root is removed again and the
//! source is never modified.

pub mod cloner;
pub mod environment;
pub mod error;
pub mod filesystem;
pub mod orchestrator;
pub mod output;
pub mod patch;
pub mod rewrite;
pub mod serialized;

#[cfg(test)]
mod rewrite_proptest;
