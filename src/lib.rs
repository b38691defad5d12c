//! Field access indirection for JVM class files (fieldlink)
//!
//! Rewrites every direct field instruction of a class file into an
//! `invokedynamic` call of a synthesized accessor, and provides the runtime
//! that links each such call site to its field on first execution.
//!
//! ## Architecture
//!
//! - **classfile**: class file container codec and constant pool builder
//! - **code**: instruction model for method bodies (decode, encode, labels)
//! - **rewrite**: classifier, call-site builder and rewrite driver
//! - **verify**: constant pool cross-reference checks for produced classes
//! - **rt**: type registry, accessor bootstrap, call-site table, interpreter
//! - **bin**: command-line interface
//!
//! ## Flow
//!
//! ```text
//! bytes → ClassFile::decode → classify → build/install → ClassFile::encode → bytes
//!                                                               ↓
//!              Runtime::define_type → first execution → bootstrap::resolve → Accessor
//! ```

pub mod classfile;
pub mod code;
pub mod config;
pub mod consts;
pub mod error;
pub mod rewrite;
pub mod rt;
pub mod verify;

pub use config::Config;
pub use error::{Error, ResolveError, Result};
pub use rewrite::{RewriteReport, Rewriter};
pub use rt::Runtime;

/// Rewrite a class file with the default configuration.
///
/// Returns the input bytes unchanged when the class contains no field
/// instruction.
pub fn rewrite(bytes: &[u8]) -> Result<Vec<u8>> {
    Rewriter::default().rewrite(bytes)
}

/// Rewrite a class file with an explicit configuration
pub fn rewrite_with_config(bytes: &[u8], config: &Config) -> Result<Vec<u8>> {
    Rewriter::new(config.clone()).rewrite(bytes)
}
