// Layout and runtime symbol constants shared by the layout pass and the emitter

/// Every table slot and stack slot is one 32-bit pointer
pub const WORD_SIZE: usize = 4;

/// Runtime allocator entry point: size in eax, returns pointer in eax
pub const MALLOC_LABEL: &str = "__malloc";

pub const SUBTYPE_TABLE_LABEL: &str = "__subtype_table";
pub const SELECTOR_INDEX_TABLE_LABEL: &str = "__selector_index_table";
pub const DISPATCH_TABLES_INIT_LABEL: &str = "__init_dispatch_tables";

pub const VTABLE_PREFIX: &str = "__vtable_";
pub const VTABLE_INIT_PREFIX: &str = "__init_vtable_";

/// File name (without extension) of the whole-program table unit
pub const DISPATCH_TABLES_FILE: &str = "__dispatch_tables";
pub const ASM_EXTENSION: &str = "s";

pub const DEFAULT_OUTPUT_DIR: &str = "output";
