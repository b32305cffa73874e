//! # CLI Command Implementations
//!
//! Each subcommand of the `virtphp` command-line tool lives in its own file
//! with an `Args` struct derived using `clap` and an `execute` function that
//! calls into the `virtphp` library.

pub mod clone;
