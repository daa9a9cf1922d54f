//! Fatal compile errors.
//!
//! Anything that merely means "this construct isn't supported" is a
//! diagnostic collected in the `Context` instead; these variants abort
//! the whole compile because the input document itself is malformed.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CompileError {
    #[error("malformed {context}: {detail}")]
    Structural { context: String, detail: String },

    #[error("cannot assign to reserved name `{name}`")]
    NamingConflict { name: String },
}

impl CompileError {
    pub fn structural(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Structural {
            context: context.into(),
            detail: detail.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
