//! AST-level review run after the hierarchy checks and before codegen

use crate::ast::*;

mod locals;

pub type ReviewResult<T> = Result<T, ReviewError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("local variable '{name}' is used in its own initializer ({location})")]
    SelfReference { name: String, location: Span },
}

/// Review every unit of the program; the first violation wins
pub fn review(units: &[CompilationUnit]) -> ReviewResult<()> {
    log::debug!("review start: units={}", units.len());
    for unit in units {
        locals::review_local_initializers(unit)?;
    }
    log::debug!("review end: ok");
    Ok(())
}
