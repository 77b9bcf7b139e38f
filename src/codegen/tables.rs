//! Whole-program dispatch tables, emitted once per run
//!
//! Both tables are row-of-pointers: a top-level array with one pointer per
//! row, each row a separately allocated array of 4-byte cells. Rows are
//! allocated and stored one at a time, then their cells are filled.

use super::asm::AsmWriter;
use super::layout::DispatchLayout;
use crate::consts::{
    DISPATCH_TABLES_INIT_LABEL, MALLOC_LABEL, SELECTOR_INDEX_TABLE_LABEL, SUBTYPE_TABLE_LABEL, WORD_SIZE,
};
use crate::error::Result;
use std::collections::BTreeSet;
use std::io::Write;

pub fn write_dispatch_tables<W: Write>(out: &mut AsmWriter<W>, layout: &DispatchLayout) -> Result<()> {
    out.header("dispatch tables")?;
    out.section(".data")?;
    for table in [SUBTYPE_TABLE_LABEL, SELECTOR_INDEX_TABLE_LABEL] {
        out.global(table)?;
        out.data_word(table, 0)?;
    }

    out.blank()?;
    out.section(".text")?;
    let externs: BTreeSet<&str> = std::iter::once(MALLOC_LABEL)
        .chain(layout.selector.iter().flatten().flatten().map(String::as_str))
        .collect();
    for label in externs {
        out.extern_symbol(label)?;
    }
    out.global(DISPATCH_TABLES_INIT_LABEL)?;
    out.label(DISPATCH_TABLES_INIT_LABEL)?;

    out.comment(format_args!("subtype table: {} x {}", layout.types.len(), layout.types.len()))?;
    let subtype_rows = layout
        .subtypes
        .iter()
        .map(|row| row.iter().map(|&cell| u8::from(cell).to_string()).collect::<Vec<_>>());
    write_table(out, SUBTYPE_TABLE_LABEL, layout.types.len(), layout.types.len(), subtype_rows)?;

    let columns = layout.interface_slots.len();
    out.comment(format_args!("selector index table: {} x {}", layout.classes.len(), columns))?;
    let selector_rows = layout.selector.iter().map(|row| {
        row.iter().map(|cell| cell.clone().unwrap_or_else(|| "0".to_string())).collect::<Vec<_>>()
    });
    write_table(out, SELECTOR_INDEX_TABLE_LABEL, layout.classes.len(), columns, selector_rows)?;

    out.instr("ret")?;
    Ok(())
}

/// Allocate `rows` row pointers into `table`, then per row allocate
/// `columns` cells, store the row pointer and fill the cells.
fn write_table<W: Write>(
    out: &mut AsmWriter<W>,
    table: &str,
    rows: usize,
    columns: usize,
    cells: impl Iterator<Item = Vec<String>>,
) -> Result<()> {
    out.instr(format_args!("mov eax, {}", WORD_SIZE * rows))?;
    out.instr(format_args!("call {}", MALLOC_LABEL))?;
    out.instr(format_args!("mov [{}], eax", table))?;
    for (i, row) in cells.enumerate() {
        out.instr(format_args!("mov eax, {}", WORD_SIZE * columns))?;
        out.instr(format_args!("call {}", MALLOC_LABEL))?;
        out.instr(format_args!("mov ebx, [{}]", table))?;
        out.instr(format_args!("mov [ebx + {}], eax", WORD_SIZE * i))?;
        for (j, value) in row.iter().enumerate() {
            out.instr(format_args!("mov dword [eax + {}], {}", WORD_SIZE * j, value))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::layout::ClassLayout;

    #[test]
    fn selector_rows_are_sized_by_column_count() {
        let layout = DispatchLayout {
            types: vec!["A".into(), "B".into(), "I".into()],
            classes: vec![
                ClassLayout { name: "A".into(), class_id: 0, type_id: 0, vtable: vec![] },
                ClassLayout { name: "B".into(), class_id: 1, type_id: 1, vtable: vec![] },
            ],
            interface_slots: vec![],
            subtypes: vec![vec![true, false, false], vec![false, true, false], vec![false, false, true]],
            selector: vec![vec![], vec![]],
        };
        let mut out = AsmWriter::new(Vec::new(), false);
        write_dispatch_tables(&mut out, &layout).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        // two selector rows of zero columns, three subtype rows of three cells
        assert_eq!(text.matches("mov eax, 0\n").count(), 2);
        assert_eq!(text.matches("mov eax, 12\n").count(), 4);
        assert!(text.contains("mov eax, 8\n    call __malloc\n    mov [__selector_index_table], eax"));
    }
}
