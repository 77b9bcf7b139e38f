//! Dispatch layout: the numbering and ordering every runtime table follows
//!
//! Built once per run from the verified hierarchy graph and read-only
//! afterwards. A layout produced by another tool (for instance deserialized
//! from JSON) is trusted as-is by the generator.

use super::{method_label, vtable_label};
use crate::ast::CompilationUnit;
use crate::error::{Error, Result};
use crate::hierarchy::{HierarchyGraph, Method, NodeId, Signature};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One vtable slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtableEntry {
    pub signature: Signature,
    /// Qualified name of the class declaring the implementation in this slot
    pub owner: String,
    /// Entry-point label of that implementation
    pub label: String,
    /// Abstract slots have no entry point and hold 0 at run time
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLayout {
    pub name: String,
    /// Row in the selector-index table
    pub class_id: usize,
    /// Row/column in the subtype table
    pub type_id: usize,
    pub vtable: Vec<VtableEntry>,
}

impl ClassLayout {
    pub fn vtable_label(&self) -> String {
        vtable_label(&self.name)
    }

    pub fn slot_of(&self, signature: &Signature) -> Option<usize> {
        self.vtable.iter().position(|e| &e.signature == signature)
    }
}

/// A program-wide interface method column of the selector-index table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSlot {
    pub signature: Signature,
    /// Type ids of the interfaces declaring the method
    pub declared_by: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLayout {
    /// Declared types in unit order; index is the type id
    pub types: Vec<String>,
    /// Classes in unit order; index is the class id
    pub classes: Vec<ClassLayout>,
    pub interface_slots: Vec<InterfaceSlot>,
    /// `subtypes[i][j]`: type i is type j or reaches it over extends/implements
    pub subtypes: Vec<Vec<bool>>,
    /// `selector[class_id][slot]`: implementing entry point, if any
    pub selector: Vec<Vec<Option<String>>>,
}

impl DispatchLayout {
    /// Compute the layout of a verified program
    pub fn build(graph: &HierarchyGraph, units: &[CompilationUnit]) -> Result<Self> {
        let mut ids = Vec::with_capacity(units.len());
        for unit in units {
            let name = unit.qualified_name();
            let id = graph
                .id_of(&name)
                .ok_or_else(|| Error::internal(format!("type '{}' is missing from the hierarchy graph", name)))?;
            ids.push(id);
        }

        let types: Vec<String> = ids.iter().map(|&id| graph.node(id).name.clone()).collect();
        let type_ids: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut vtables = HashMap::new();
        let mut classes = Vec::new();
        for (type_id, &id) in ids.iter().enumerate() {
            if graph.node(id).is_class() {
                let vtable = vtable_of(graph, id, &mut vtables, &mut HashSet::new())?.to_vec();
                classes.push(ClassLayout {
                    name: types[type_id].clone(),
                    class_id: classes.len(),
                    type_id,
                    vtable,
                });
            }
        }

        let mut interface_slots: Vec<InterfaceSlot> = Vec::new();
        let mut slot_index: HashMap<Signature, usize> = HashMap::new();
        for (type_id, &id) in ids.iter().enumerate() {
            let node = graph.node(id);
            if !node.is_interface() {
                continue;
            }
            for method in &node.methods {
                let signature = method.signature();
                let slot = *slot_index.entry(signature.clone()).or_insert_with(|| {
                    interface_slots.push(InterfaceSlot { signature, declared_by: Vec::new() });
                    interface_slots.len() - 1
                });
                let declared_by = &mut interface_slots[slot].declared_by;
                if !declared_by.contains(&type_id) {
                    declared_by.push(type_id);
                }
            }
        }

        let subtypes: Vec<Vec<bool>> = ids
            .iter()
            .map(|&id| {
                let supertypes = graph.supertypes(id);
                let mut row = vec![false; ids.len()];
                for s in supertypes {
                    if let Some(&j) = type_ids.get(&s) {
                        row[j] = true;
                    }
                }
                row
            })
            .collect();

        let selector: Vec<Vec<Option<String>>> = classes
            .iter()
            .map(|class| {
                interface_slots
                    .iter()
                    .map(|slot| {
                        let implements = slot.declared_by.iter().any(|&i| subtypes[class.type_id][i]);
                        if !implements {
                            return None;
                        }
                        class
                            .vtable
                            .iter()
                            .find(|e| e.signature == slot.signature && !e.is_abstract)
                            .map(|e| e.label.clone())
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let layout = Self { types, classes, interface_slots, subtypes, selector };
        log::debug!(
            "dispatch layout: {} types, {} classes, {} interface slots",
            layout.types.len(),
            layout.classes.len(),
            layout.interface_slots.len()
        );
        Ok(layout)
    }

    pub fn type_id(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t == name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassLayout> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn is_subtype(&self, sub: usize, sup: usize) -> bool {
        self.subtypes.get(sub).and_then(|row| row.get(sup)).copied().unwrap_or(false)
    }
}

/// Parent class's vtable, then each own instance method either replacing the
/// slot with the same signature in place or appended at the end.
///
/// `pending` holds the classes whose vtable is being computed; meeting one
/// again means the superclass chain is cyclic, which a verified graph rules
/// out.
fn vtable_of<'m>(
    graph: &HierarchyGraph,
    id: NodeId,
    memo: &'m mut HashMap<NodeId, Vec<VtableEntry>>,
    pending: &mut HashSet<NodeId>,
) -> Result<&'m [VtableEntry]> {
    if !memo.contains_key(&id) {
        if !pending.insert(id) {
            return Err(Error::internal(format!(
                "superclass chain of '{}' is cyclic; the hierarchy was not verified",
                graph.node(id).name
            )));
        }
        let mut vtable = match graph.superclass(id) {
            Some(parent) => vtable_of(graph, parent, memo, pending)?.to_vec(),
            None => Vec::new(),
        };
        let node = graph.node(id);
        for method in node.methods.iter().filter(|m| !m.is_static()) {
            let entry = entry_for(method);
            match vtable.iter().position(|e| e.signature == entry.signature) {
                Some(slot) => vtable[slot] = entry,
                None => vtable.push(entry),
            }
        }
        pending.remove(&id);
        memo.insert(id, vtable);
    }
    Ok(&memo[&id])
}

fn entry_for(method: &Method) -> VtableEntry {
    let signature = method.signature();
    VtableEntry {
        label: method_label(&method.owner, &signature),
        owner: method.owner.clone(),
        is_abstract: method.is_abstract(),
        signature,
    }
}
