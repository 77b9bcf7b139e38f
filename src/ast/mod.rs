//! Abstract Syntax Tree (AST) representation consumed by the backend
//!
//! The front end (lexer, parser, name resolution) lives outside this crate and
//! hands over fully built compilation units. This module defines those nodes,
//! a closed tagged view over every node kind ([`Node`]) and the generic
//! traversal used by the review and code generation passes.

mod nodes;
mod visitor;
mod printer;

pub use nodes::*;
pub use visitor::*;
pub use printer::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

/// Span of source code (start and end locations)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// One input file: optional package, imports, exactly one type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    #[serde(default)]
    pub package_decl: Option<PackageDecl>,
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    pub type_decl: TypeDecl,
    #[serde(default)]
    pub span: Span,
}

impl CompilationUnit {
    pub fn new(type_decl: TypeDecl) -> Self {
        Self { package_decl: None, imports: Vec::new(), type_decl, span: Span::default() }
    }

    pub fn with_package(mut self, name: impl Into<String>) -> Self {
        self.package_decl = Some(PackageDecl { name: name.into(), span: Span::default() });
        self
    }

    pub fn with_import(mut self, name: impl Into<String>) -> Self {
        self.imports.push(ImportDecl { name: name.into(), is_wildcard: false, span: Span::default() });
        self
    }

    pub fn with_wildcard_import(mut self, package: impl Into<String>) -> Self {
        self.imports.push(ImportDecl { name: package.into(), is_wildcard: true, span: Span::default() });
        self
    }

    /// Package name, empty for the default package
    pub fn package_name(&self) -> &str {
        self.package_decl.as_ref().map(|p| p.name.as_str()).unwrap_or("")
    }

    /// Fully-qualified name of the unit's top-level type
    pub fn qualified_name(&self) -> String {
        qualify(self.package_name(), self.type_decl.name())
    }
}

impl fmt::Display for CompilationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref package) = self.package_decl {
            writeln!(f, "{}", package)?;
        }

        for import in &self.imports {
            writeln!(f, "{}", import)?;
        }

        writeln!(f, "{}", self.type_decl)
    }
}

/// Join a package and a simple name; the default package adds no prefix.
pub fn qualify(package: &str, simple: &str) -> String {
    if package.is_empty() {
        simple.to_string()
    } else {
        format!("{}.{}", package, simple)
    }
}
