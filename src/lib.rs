//! joosc backend: hierarchy verification and x86 code generation
//!
//! Takes compilation units already built (and mostly name-resolved) by a
//! front end, verifies the program-wide class/interface hierarchy and lowers
//! the verified program to 32-bit x86 assembly in NASM syntax.
//!
//! ## Architecture
//!
//! - **ast**: input AST, the closed [`ast::Node`] view and generic traversal
//! - **hierarchy**: hierarchy graph construction and the fail-fast checker
//! - **review**: AST-level checks that do not need the graph
//! - **codegen**: dispatch layout, per-unit assembly, dispatch tables
//! - **bin**: command-line interface (`joosc`)
//!
//! ## Pipeline
//!
//! ```text
//! units → HierarchyGraph → HierarchyChecker → review → DispatchLayout → codegen → .s files
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod consts;
pub mod error;
pub mod hierarchy;
pub mod review;

pub use codegen::DispatchLayout;
pub use config::Config;
pub use error::{Error, Result};
pub use hierarchy::{HierarchyChecker, HierarchyGraph};

use ast::CompilationUnit;
use std::path::PathBuf;

/// Verify a whole program and return its hierarchy graph
pub fn check(units: &[CompilationUnit], config: &Config) -> Result<HierarchyGraph> {
    log::info!("checking {} compilation units", units.len());
    let mut checker = HierarchyChecker::with_config(config);
    checker.verify_class_and_interface_hierarchy(units)?;
    review::review(units)?;
    Ok(checker.into_graph())
}

/// Verify a program, compute its dispatch layout and write its assembly.
///
/// Returns the written files: one per unit in input order, then the
/// dispatch-table file.
pub fn compile(units: &[CompilationUnit], config: &Config) -> Result<Vec<PathBuf>> {
    let graph = check(units, config)?;
    let layout = DispatchLayout::build(&graph, units)?;
    codegen::generate_code(units, &layout, config)
}

/// Like [`compile`], but with a dispatch layout computed elsewhere; the
/// layout is trusted as-is.
pub fn compile_with_layout(units: &[CompilationUnit], layout: &DispatchLayout, config: &Config) -> Result<Vec<PathBuf>> {
    check(units, config)?;
    codegen::generate_code(units, layout, config)
}
