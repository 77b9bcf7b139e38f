//! Code generation module: verified compilation units to NASM x86-32 assembly
//!
//! Each unit becomes one `.s` file named after its mangled qualified type
//! name. The whole-program subtype and selector-index tables go to one more
//! file, `__dispatch_tables.s`, together with their init routine.

pub mod asm;
pub mod gen_visitor;
pub mod layout;
pub mod register_alloc;
pub mod tables;

pub use asm::{AsmWriter, LabelGenerator};
pub use gen_visitor::CodeGenerationVisitor;
pub use layout::{ClassLayout, DispatchLayout, InterfaceSlot, VtableEntry};

use crate::ast::{traverse, CompilationUnit, Node};
use crate::config::Config;
use crate::consts::{ASM_EXTENSION, DISPATCH_TABLES_FILE, VTABLE_INIT_PREFIX, VTABLE_PREFIX};
use crate::error::{Error, Result};
use crate::hierarchy::Signature;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Generate every unit plus the dispatch tables into `config.output_dir`.
///
/// Returns the written files, units first in input order.
pub fn generate_code(units: &[CompilationUnit], layout: &DispatchLayout, config: &Config) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&config.output_dir)
        .map_err(|source| Error::Output { path: config.output_dir.clone(), source })?;

    let mut labels = LabelGenerator::new();
    let mut written = Vec::with_capacity(units.len() + 1);
    for unit in units {
        written.push(generate_unit(unit, layout, config, &mut labels)?);
    }
    written.push(generate_dispatch_tables(layout, config)?);
    log::info!("generated {} assembly files in {}", written.len(), config.output_dir.display());
    Ok(written)
}

/// Generate one unit's file. On failure the partial file is closed and
/// removed before the error propagates.
pub fn generate_unit(
    unit: &CompilationUnit,
    layout: &DispatchLayout,
    config: &Config,
    labels: &mut LabelGenerator,
) -> Result<PathBuf> {
    let path = asm_path(&config.output_dir, &mangle(&unit.qualified_name()));
    let file = File::create(&path).map_err(|source| Error::Output { path: path.clone(), source })?;

    // the writer, and with it the file, is dropped before any cleanup
    match write_unit(unit, layout, config, labels, BufWriter::new(file)).map(drop) {
        Ok(()) => {
            log::debug!("generated {}", path.display());
            Ok(path)
        }
        Err(err) => {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("could not remove partial output {}: {}", path.display(), e);
            }
            Err(match err {
                Error::Io(source) => Error::Output { path, source },
                other => other,
            })
        }
    }
}

/// Write `__dispatch_tables.s`
pub fn generate_dispatch_tables(layout: &DispatchLayout, config: &Config) -> Result<PathBuf> {
    let path = asm_path(&config.output_dir, DISPATCH_TABLES_FILE);
    let file = File::create(&path).map_err(|source| Error::Output { path: path.clone(), source })?;
    let mut out = AsmWriter::new(BufWriter::new(file), config.emit_comments);
    tables::write_dispatch_tables(&mut out, layout)
        .and_then(|()| out.flush().map_err(Error::from))
        .map_err(|err| match err {
            Error::Io(source) => Error::Output { path: path.clone(), source },
            other => other,
        })?;
    Ok(path)
}

/// Assembly text of one unit, without touching the file system
pub fn render_unit(unit: &CompilationUnit, layout: &DispatchLayout, config: &Config) -> Result<String> {
    let bytes = write_unit(unit, layout, config, &mut LabelGenerator::new(), Vec::new())?;
    String::from_utf8(bytes).map_err(|e| Error::internal(format!("non UTF-8 assembly output: {}", e)))
}

/// Assembly text of the dispatch tables, without touching the file system
pub fn render_dispatch_tables(layout: &DispatchLayout, config: &Config) -> Result<String> {
    let mut out = AsmWriter::new(Vec::new(), config.emit_comments);
    tables::write_dispatch_tables(&mut out, layout)?;
    String::from_utf8(out.into_inner()).map_err(|e| Error::internal(format!("non UTF-8 assembly output: {}", e)))
}

fn write_unit<W: Write>(
    unit: &CompilationUnit,
    layout: &DispatchLayout,
    config: &Config,
    labels: &mut LabelGenerator,
    out: W,
) -> Result<W> {
    let mut visitor = CodeGenerationVisitor::new(out, layout, config, labels);
    traverse(Node::from(unit), &mut visitor)?;
    visitor.finish()
}

fn asm_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, ASM_EXTENSION))
}

/// Qualified name as an assembler identifier.
///
/// `.` becomes `_`, while a `_` or `$` inside an identifier is escaped as
/// `_0` or `_1`. Identifiers never start with a digit, so the mapping is
/// injective: `p.q.A` is `p_q_A` and `p_q.A` is `p_0q_A`. A mangled name
/// never starts with `__`, the prefix of every label the backend reserves.
pub fn mangle(qualified: &str) -> String {
    let mut out = String::with_capacity(qualified.len());
    for (i, segment) in qualified.split('.').enumerate() {
        if i > 0 {
            out.push('_');
        }
        for c in segment.chars() {
            match c {
                '_' => out.push_str("_0"),
                '$' => out.push_str("_1"),
                c => out.push(c),
            }
        }
    }
    out
}

fn mangle_parameters(signature: &Signature) -> String {
    signature
        .parameters
        .iter()
        .map(|p| format!("${}{}", mangle(&p.type_name), if p.is_array { "@" } else { "" }))
        .collect()
}

/// Entry-point label of a method: `p_A_m$int$String@` for `p.A.m(int, String[])`
pub fn method_label(owner: &str, signature: &Signature) -> String {
    format!("{}_{}{}", mangle(owner), mangle(&signature.name), mangle_parameters(signature))
}

/// Entry-point label of a constructor: `__ctor_p_A$int` for `p.A(int)`
pub fn constructor_label(owner: &str, signature: &Signature) -> String {
    format!("__ctor_{}{}", mangle(owner), mangle_parameters(signature))
}

pub fn vtable_label(class: &str) -> String {
    format!("{}{}", VTABLE_PREFIX, mangle(class))
}

pub fn vtable_init_label(class: &str) -> String {
    format!("{}{}", VTABLE_INIT_PREFIX, mangle(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Parameter;

    #[test]
    fn labels_encode_owner_and_parameters() {
        let sig = Signature {
            name: "m".to_string(),
            parameters: vec![Parameter::new("int", false), Parameter::new("java.lang.String", true)],
        };
        assert_eq!(method_label("p.A", &sig), "p_A_m$int$java_lang_String@");
        assert_eq!(constructor_label("p.A", &Signature { name: "A".into(), parameters: vec![] }), "__ctor_p_A");
        assert_eq!(vtable_label("p.A"), "__vtable_p_A");
        assert_eq!(vtable_init_label("A"), "__init_vtable_A");
    }

    #[test]
    fn mangling_keeps_distinct_names_apart() {
        assert_eq!(mangle("p.q.A"), "p_q_A");
        assert_eq!(mangle("p_q.A"), "p_0q_A");
        assert_eq!(mangle("a_.b"), "a_0_b");
        assert_eq!(mangle("a._b"), "a__0b");
        assert_eq!(mangle("$A"), "_1A");

        let int = Signature { name: "m".to_string(), parameters: vec![Parameter::new("int", false)] };
        let dollar = Signature { name: "m$int".to_string(), parameters: vec![] };
        assert_eq!(method_label("A", &int), "A_m$int");
        assert_eq!(method_label("A", &dollar), "A_m_1int");
    }

    #[test]
    fn mangled_names_never_take_reserved_prefixes() {
        for name in ["_ctor", "__vtable_A", "_", "$", "p._q"] {
            assert!(!mangle(name).starts_with("__"), "{}", name);
        }
    }
}
