use super::graph::{HierarchyGraph, HierarchyGraphNode, NodeId};
use super::method::{Method, Signature};
use super::{HierarchyError, HierarchyResult};
use crate::ast::CompilationUnit;
use crate::config::Config;
use crate::error::Result;
use std::collections::{HashMap, HashSet};

/// Runs the class and interface hierarchy checks.
///
/// Verification order is fixed and fail-fast:
/// 1. every referenced type resolves (unless unresolved types are allowed),
/// 2. extends/implements clauses connect the right kinds of types,
/// 3. the extends+implements graph is acyclic,
/// 4. declared and inherited methods are legal.
///
/// The checker never mutates the graph once it is built.
#[derive(Debug, Default)]
pub struct HierarchyChecker {
    graph: HierarchyGraph,
    allow_unresolved_types: bool,
}

impl HierarchyChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            graph: HierarchyGraph::new(),
            allow_unresolved_types: config.allow_unresolved_types,
        }
    }

    /// Discard the graph of the previous run
    pub fn reset(&mut self) {
        self.graph.clear();
    }

    pub fn graph(&self) -> &HierarchyGraph {
        &self.graph
    }

    pub fn into_graph(self) -> HierarchyGraph {
        self.graph
    }

    /// Build the hierarchy graph for `units` and verify it
    pub fn verify_class_and_interface_hierarchy(&mut self, units: &[CompilationUnit]) -> Result<()> {
        for unit in units {
            self.graph.add_node(unit)?;
        }
        log::debug!("hierarchy graph: {} nodes from {} units", self.graph.len(), units.len());
        self.verify_hierarchy_graph()?;
        Ok(())
    }

    /// Perform all hierarchy verifications on the current graph
    pub fn verify_hierarchy_graph(&self) -> HierarchyResult<()> {
        self.verify_resolved()?;
        for (_, node) in self.graph.iter().filter(|(_, n)| !n.is_placeholder()) {
            self.extends_verification(node)?;
            self.implements_verification(node)?;
        }
        log::debug!("extends/implements clauses verified");
        self.verify_acyclic()?;
        log::debug!("hierarchy is acyclic");
        MethodVerifier::new(&self.graph).verify_all()?;
        log::debug!("method hierarchy verified");
        Ok(())
    }

    fn verify_resolved(&self) -> HierarchyResult<()> {
        if self.allow_unresolved_types {
            return Ok(());
        }
        match self.graph.placeholders().next() {
            Some((_, placeholder)) => {
                let referenced_by = placeholder
                    .children
                    .first()
                    .map(|&c| self.graph.node(c).name.clone())
                    .unwrap_or_default();
                Err(HierarchyError::UnresolvedType {
                    name: placeholder.name.clone(),
                    referenced_by,
                })
            }
            None => Ok(()),
        }
    }

    /// Classes extend non-final classes; interfaces extend interfaces
    fn extends_verification(&self, node: &HierarchyGraphNode) -> HierarchyResult<()> {
        for &p in &node.extends {
            let parent = self.graph.node(p);
            if node.is_class() {
                if parent.is_interface() {
                    return Err(HierarchyError::ClassExtendsInterface {
                        class: node.name.clone(),
                        interface: parent.name.clone(),
                    });
                }
                if parent.is_final() {
                    return Err(HierarchyError::ExtendsFinalClass {
                        class: node.name.clone(),
                        parent: parent.name.clone(),
                    });
                }
            } else if node.is_interface() && parent.is_class() {
                return Err(HierarchyError::InterfaceExtendsClass {
                    interface: node.name.clone(),
                    class: parent.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Everything in an implements clause must be an interface
    fn implements_verification(&self, node: &HierarchyGraphNode) -> HierarchyResult<()> {
        for &p in &node.implements {
            let parent = self.graph.node(p);
            if parent.is_class() {
                return Err(HierarchyError::ImplementsClass {
                    class: node.name.clone(),
                    implemented: parent.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn verify_acyclic(&self) -> HierarchyResult<()> {
        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        for id in self.graph.ids() {
            if let Some(cyclic) = self.find_cycle(id, &mut visited, &mut in_progress) {
                return Err(HierarchyError::Cycle(self.graph.node(cyclic).name.clone()));
            }
        }
        Ok(())
    }

    /// DFS over children; returns the first node reached again while still
    /// on the recursion stack.
    fn find_cycle(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        in_progress: &mut HashSet<NodeId>,
    ) -> Option<NodeId> {
        if in_progress.contains(&id) {
            return Some(id);
        }
        if !visited.insert(id) {
            return None;
        }
        in_progress.insert(id);
        for &child in &self.graph.node(id).children {
            if let Some(cyclic) = self.find_cycle(child, visited, in_progress) {
                return Some(cyclic);
            }
        }
        in_progress.remove(&id);
        None
    }
}

/// Owned- and inherited-method checks with a per-node memo, so each node is
/// checked exactly once no matter how many descendants reach it.
struct MethodVerifier<'g> {
    graph: &'g HierarchyGraph,
    /// Methods visible at a verified node: inherited (deduplicated) then own
    visible: HashMap<NodeId, Vec<&'g Method>>,
}

impl<'g> MethodVerifier<'g> {
    fn new(graph: &'g HierarchyGraph) -> Self {
        Self { graph, visible: HashMap::new() }
    }

    fn verify_all(mut self) -> HierarchyResult<()> {
        for id in self.graph.ids() {
            self.verify_node(id)?;
        }
        Ok(())
    }

    fn verify_node(&mut self, id: NodeId) -> HierarchyResult<()> {
        if self.visible.contains_key(&id) {
            return Ok(());
        }
        let node = self.graph.node(id);

        // Bottom-up over extends only; an ancestor reached along two paths
        // contributes its methods once.
        let mut inherited: Vec<&'g Method> = Vec::new();
        let mut seen: HashSet<(&'g str, Signature)> = HashSet::new();
        for &parent in &node.extends {
            self.verify_node(parent)?;
            for &m in &self.visible[&parent] {
                if seen.insert((m.owner.as_str(), m.signature())) {
                    inherited.push(m);
                }
            }
        }

        verify_owned_methods(node)?;
        extended_method_checks(node, &inherited)?;

        inherited.extend(node.methods.iter());
        self.visible.insert(id, inherited);
        Ok(())
    }
}

fn verify_owned_methods(node: &HierarchyGraphNode) -> HierarchyResult<()> {
    let abstract_allowed = node.is_abstract() || node.is_interface();
    for (i, method) in node.methods.iter().enumerate() {
        if node.methods[..i].iter().any(|other| other.signatures_match(method)) {
            return Err(HierarchyError::DuplicateMethod {
                owner: node.name.clone(),
                method: method.signature().to_string(),
            });
        }
        if method.is_abstract() && !abstract_allowed {
            return Err(HierarchyError::AbstractMethodInConcreteClass {
                owner: node.name.clone(),
                method: method.signature().to_string(),
            });
        }
    }
    Ok(())
}

fn extended_method_checks(node: &HierarchyGraphNode, inherited: &[&Method]) -> HierarchyResult<()> {
    for extended in inherited {
        for method in &node.methods {
            if !extended.signatures_match(method) {
                continue;
            }
            let owner = node.name.clone();
            let describe = || (method.signature().to_string(), extended.to_string());
            if extended.return_type != method.return_type {
                let (method, inherited) = describe();
                return Err(HierarchyError::ReturnTypeMismatch { owner, method, inherited });
            }
            if extended.is_static() && !method.is_static() {
                let (method, inherited) = describe();
                return Err(HierarchyError::InstanceReplacesStatic { owner, method, inherited });
            }
            if !extended.is_static() && method.is_static() {
                let (method, inherited) = describe();
                return Err(HierarchyError::StaticReplacesInstance { owner, method, inherited });
            }
            if extended.is_public() && method.is_protected() {
                let (method, inherited) = describe();
                return Err(HierarchyError::ReducedVisibility { owner, method, inherited });
            }
            if extended.is_final() {
                let (method, inherited) = describe();
                return Err(HierarchyError::ReplacesFinal { owner, method, inherited });
            }
        }
    }
    Ok(())
}
