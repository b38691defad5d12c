use thiserror::Error;

/// Result type for fieldlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the rewriter and its runtime
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed class file: {message}")]
    MalformedInput { message: String },

    #[error("Constant pool is full ({count} slots)")]
    ConstantPoolFull { count: usize },

    #[error("Branch at instruction {index} cannot reach its target ({offset} bytes)")]
    BranchOutOfRange { index: usize, offset: i64 },

    #[error("Method code too large after rewrite: {length} bytes")]
    CodeTooLarge { length: usize },

    #[error("Class {class} (version {major}) cannot be raised to 51: method {method} {reason}")]
    UnsupportedVersion {
        class: String,
        major: u16,
        method: String,
        reason: String,
    },

    #[error("Output verification failed: {message}")]
    Verify { message: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Type {name} is already defined")]
    DuplicateType { name: String },

    #[error("Execution error: {message}")]
    Execution { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Create a malformed input error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput { message: message.into() }
    }

    /// Create a malformed input error pinned to a byte offset
    pub fn malformed_at(offset: usize, message: impl AsRef<str>) -> Self {
        Self::MalformedInput {
            message: format!("at offset {}: {}", offset, message.as_ref()),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an output verification error
    pub fn verify(message: impl Into<String>) -> Self {
        Self::Verify { message: message.into() }
    }
}

/// Failures raised while linking a call site on its first execution.
///
/// Cloneable because a failed binding is cached with the site and raised again
/// on every later execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Type not found: {name}")]
    TypeNotFound { name: String },

    #[error("Member not found: {owner}.{name} ({descriptor})")]
    MemberNotFound {
        owner: String,
        name: String,
        descriptor: String,
    },

    #[error("Linkage error: call site expects {expected}, accessor provides {actual}")]
    Linkage { expected: String, actual: String },
}

impl ResolveError {
    pub fn type_not_found(name: impl Into<String>) -> Self {
        Self::TypeNotFound { name: name.into() }
    }

    pub fn member_not_found(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self::MemberNotFound {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}
