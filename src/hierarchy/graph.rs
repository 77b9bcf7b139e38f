use super::method::Method;
use super::HierarchyError;
use crate::ast::{qualify, CompilationUnit, ImportDecl, Modifier, TypeDecl, TypeRef};
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Index of a node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// class extends class, interface extends interface
    Extends,
    /// class implements interface
    Implements,
}

/// One type known to the program.
///
/// A node whose `kind` is `None` is a placeholder: it was referenced as a
/// parent but no declaration has been seen for it (yet).
#[derive(Debug, Clone)]
pub struct HierarchyGraphNode {
    /// Fully-qualified name (the literal referenced name for placeholders)
    pub name: String,
    pub identifier: String,
    pub package: String,
    pub kind: Option<TypeKind>,
    pub modifiers: BTreeSet<Modifier>,
    pub methods: Vec<Method>,
    pub constructors: Vec<Method>,
    pub extends: Vec<NodeId>,
    pub implements: Vec<NodeId>,
    pub children: Vec<NodeId>,
    pub imports: Vec<ImportDecl>,
    merged_into: Option<NodeId>,
}

impl HierarchyGraphNode {
    fn placeholder(name: &str) -> Self {
        let identifier = name.rsplit('.').next().unwrap_or(name).to_string();
        Self {
            name: name.to_string(),
            identifier,
            package: String::new(),
            kind: None,
            modifiers: BTreeSet::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            children: Vec::new(),
            imports: Vec::new(),
            merged_into: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind.is_none()
    }

    pub fn is_class(&self) -> bool {
        self.kind == Some(TypeKind::Class)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == Some(TypeKind::Interface)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(&Modifier::Final)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(&Modifier::Abstract)
    }

    /// Extends parents followed by implements parents
    pub fn parents(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.extends.iter().chain(self.implements.iter()).copied()
    }

    fn has_parent(&self, id: NodeId) -> bool {
        self.extends.contains(&id) || self.implements.contains(&id)
    }
}

/// Directed graph of all types in the program, keyed by qualified name.
///
/// Nodes are kept in insertion order so every walk over the graph, and
/// therefore the first reported violation, is deterministic.
#[derive(Debug, Default, Clone)]
pub struct HierarchyGraph {
    nodes: Vec<HierarchyGraphNode>,
    by_name: HashMap<String, NodeId>,
}

impl HierarchyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from every compilation unit of the program
    pub fn build(units: &[CompilationUnit]) -> Result<Self> {
        let mut graph = Self::new();
        for unit in units {
            graph.add_node(unit)?;
        }
        log::debug!(
            "hierarchy graph built: {} nodes ({} placeholders)",
            graph.len(),
            graph.placeholders().count()
        );
        Ok(graph)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.by_name.clear();
    }

    /// Number of live nodes (declared types and open placeholders)
    pub fn len(&self) -> usize {
        self.ids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, id: NodeId) -> &HierarchyGraphNode {
        &self.nodes[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&HierarchyGraphNode> {
        self.id_of(name).map(|id| self.node(id))
    }

    /// Live node ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.merged_into.is_none())
            .map(|(i, _)| NodeId(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HierarchyGraphNode)> + '_ {
        self.ids().map(move |id| (id, self.node(id)))
    }

    pub fn placeholders(&self) -> impl Iterator<Item = (NodeId, &HierarchyGraphNode)> + '_ {
        self.iter().filter(|(_, n)| n.is_placeholder())
    }

    /// The class a class directly extends, if it is part of the graph
    pub fn superclass(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        if node.is_class() {
            node.extends.first().copied()
        } else {
            None
        }
    }

    /// Every type reachable from `id` over extends and implements edges,
    /// including `id` itself
    pub fn supertypes(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if seen.insert(current) {
                stack.extend(self.node(current).parents());
            }
        }
        seen
    }

    /// Add the type declared by `unit`, creating placeholders for parents
    /// that have not been declared yet.
    pub fn add_node(&mut self, unit: &CompilationUnit) -> Result<NodeId> {
        let identifier = unit.type_decl.name();
        if identifier.trim().is_empty() {
            return Err(Error::internal("type declaration without an identifier"));
        }
        let qualified = unit.qualified_name();
        let id = self.fetch_or_create(&qualified);
        if !self.node(id).is_placeholder() {
            return Err(HierarchyError::DuplicateType(qualified).into());
        }

        {
            let node = &mut self.nodes[id.0];
            node.identifier = identifier.to_string();
            node.package = unit.package_name().to_string();
            node.imports = unit.imports.clone();
            node.modifiers = unit.type_decl.modifiers().iter().copied().collect();
            node.kind = Some(if unit.type_decl.is_interface() {
                TypeKind::Interface
            } else {
                TypeKind::Class
            });
        }
        self.reconcile_placeholder(id)?;
        self.process_type_declaration(&unit.type_decl, id)?;

        log::trace!(
            "added {} ({} methods, {} parents)",
            qualified,
            self.node(id).methods.len(),
            self.node(id).parents().count()
        );
        Ok(id)
    }

    fn process_type_declaration(&mut self, decl: &TypeDecl, id: NodeId) -> Result<()> {
        let owner = self.node(id).name.clone();
        match decl {
            TypeDecl::Class(class) => {
                if let Some(parent) = &class.extends {
                    self.update_node_relationships(parent, id, Relation::Extends)?;
                }
                for parent in &class.implements {
                    self.update_node_relationships(parent, id, Relation::Implements)?;
                }
                let methods = class.methods().map(|m| Method::from_decl(&owner, m)).collect();
                let constructors = class
                    .constructors()
                    .map(|c| Method::from_constructor(&owner, c))
                    .collect();
                let node = &mut self.nodes[id.0];
                node.methods = methods;
                node.constructors = constructors;
            }
            TypeDecl::Interface(interface) => {
                for parent in &interface.extends {
                    self.update_node_relationships(parent, id, Relation::Extends)?;
                }
                let methods = interface.body.iter().map(|m| Method::from_decl(&owner, m)).collect();
                self.nodes[id.0].methods = methods;
            }
        }
        Ok(())
    }

    /// Record the symmetric child/parent edge, creating the parent if needed
    fn update_node_relationships(&mut self, parent: &TypeRef, child: NodeId, relation: Relation) -> Result<()> {
        let parent_id = self.resolve(&parent.name, child);
        if self.node(child).has_parent(parent_id) {
            return Err(HierarchyError::DuplicateParent {
                child: self.node(child).name.clone(),
                parent: parent.name.clone(),
            }
            .into());
        }
        self.nodes[parent_id.0].children.push(child);
        let node = &mut self.nodes[child.0];
        match relation {
            Relation::Extends => node.extends.push(parent_id),
            Relation::Implements => node.implements.push(parent_id),
        }
        Ok(())
    }

    /// Resolve a parent name as seen from `child`: exact qualified match,
    /// then imports, then the child's own package. Falls back to a
    /// placeholder under the literal name.
    fn resolve(&mut self, name: &str, child: NodeId) -> NodeId {
        if let Some(id) = self.id_of(name) {
            return id;
        }
        if name.contains('.') {
            return self.fetch_or_create(name);
        }

        let node = self.node(child);
        // A single-type import names the type unambiguously even when its
        // declaration comes later.
        if let Some(import) = node.imports.iter().find(|i| !i.is_wildcard && i.simple_name() == name) {
            let qualified = import.name.clone();
            return self.fetch_or_create(&qualified);
        }
        let on_demand = node
            .imports
            .iter()
            .filter(|i| i.is_wildcard)
            .find_map(|i| self.id_of(&qualify(&i.name, name)));
        if let Some(id) = on_demand {
            return id;
        }
        if let Some(id) = self.id_of(&qualify(&node.package, name)) {
            return id;
        }

        log::trace!("placeholder created for '{}' (referenced by {})", name, node.name);
        self.fetch_or_create(name)
    }

    fn fetch_or_create(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.id_of(name) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(HierarchyGraphNode::placeholder(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// A placeholder created under the simple name of a type that is only now
    /// being declared is folded into the declaration, provided every type
    /// that referenced it can actually see the declaration.
    fn reconcile_placeholder(&mut self, declared: NodeId) -> Result<()> {
        let (qualified, simple, package) = {
            let node = self.node(declared);
            (node.name.clone(), node.identifier.clone(), node.package.clone())
        };
        if qualified == simple {
            return Ok(());
        }
        let Some(placeholder) = self.id_of(&simple) else {
            return Ok(());
        };
        let ph = self.node(placeholder);
        if !ph.is_placeholder() || ph.children.is_empty() {
            return Ok(());
        }
        let all_visible = ph.children.iter().all(|&c| {
            let child = self.node(c);
            child.package == package
                || child.imports.iter().any(|i| {
                    (i.is_wildcard && i.name == package) || (!i.is_wildcard && i.name == qualified)
                })
        });
        if !all_visible {
            return Ok(());
        }

        log::trace!("placeholder '{}' reconciled with {}", simple, qualified);
        let children = std::mem::take(&mut self.nodes[placeholder.0].children);
        for c in children {
            if self.node(c).has_parent(declared) {
                return Err(HierarchyError::DuplicateParent {
                    child: self.node(c).name.clone(),
                    parent: qualified.clone(),
                }
                .into());
            }
            let child = &mut self.nodes[c.0];
            for edge in child.extends.iter_mut().chain(child.implements.iter_mut()) {
                if *edge == placeholder {
                    *edge = declared;
                }
            }
            self.nodes[declared.0].children.push(c);
        }
        self.nodes[placeholder.0].merged_into = Some(declared);
        self.by_name.remove(&simple);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn class(name: &str, extends: Option<&str>, implements: &[&str]) -> TypeDecl {
        TypeDecl::Class(ClassDecl {
            modifiers: vec![Modifier::Public],
            name: name.to_string(),
            extends: extends.map(TypeRef::new),
            implements: implements.iter().map(|n| TypeRef::new(*n)).collect(),
            body: vec![],
            span: Span::default(),
        })
    }

    fn interface(name: &str, extends: &[&str]) -> TypeDecl {
        TypeDecl::Interface(InterfaceDecl {
            modifiers: vec![Modifier::Public],
            name: name.to_string(),
            extends: extends.iter().map(|n| TypeRef::new(*n)).collect(),
            body: vec![],
            span: Span::default(),
        })
    }

    #[test]
    fn edges_are_symmetric() {
        let units = vec![
            CompilationUnit::new(interface("I", &[])).with_package("p"),
            CompilationUnit::new(class("B", None, &[])).with_package("p"),
            CompilationUnit::new(class("A", Some("p.B"), &["p.I"])).with_package("p"),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        let a = graph.id_of("p.A").unwrap();
        let b = graph.id_of("p.B").unwrap();
        let i = graph.id_of("p.I").unwrap();
        assert_eq!(graph.node(a).extends, vec![b]);
        assert_eq!(graph.node(a).implements, vec![i]);
        assert_eq!(graph.node(b).children, vec![a]);
        assert_eq!(graph.node(i).children, vec![a]);
        assert_eq!(graph.placeholders().count(), 0);
    }

    #[test]
    fn forward_reference_creates_placeholder_then_reuses_it() {
        let units = vec![
            CompilationUnit::new(class("A", Some("p.B"), &[])).with_package("p"),
            CompilationUnit::new(class("B", None, &[])).with_package("p"),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        assert_eq!(graph.len(), 2);
        let b = graph.get("p.B").unwrap();
        assert!(b.is_class());
        assert_eq!(b.children.len(), 1);
    }

    #[test]
    fn simple_name_placeholder_is_reconciled_in_same_package() {
        let units = vec![
            CompilationUnit::new(class("A", Some("B"), &[])).with_package("p"),
            CompilationUnit::new(class("B", None, &[])).with_package("p"),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        assert!(graph.get("B").is_none());
        let a = graph.id_of("p.A").unwrap();
        let b = graph.id_of("p.B").unwrap();
        assert_eq!(graph.node(a).extends, vec![b]);
        assert_eq!(graph.node(b).children, vec![a]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn placeholder_not_reconciled_when_invisible() {
        let units = vec![
            CompilationUnit::new(class("A", Some("B"), &[])).with_package("p"),
            CompilationUnit::new(class("B", None, &[])).with_package("q"),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        assert!(graph.get("B").unwrap().is_placeholder());
        assert!(graph.get("q.B").unwrap().children.is_empty());
    }

    #[test]
    fn single_type_import_resolves_before_declaration() {
        let units = vec![
            CompilationUnit::new(class("A", Some("B"), &[]))
                .with_package("p")
                .with_import("q.B"),
            CompilationUnit::new(class("B", None, &[])).with_package("q"),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        let a = graph.id_of("p.A").unwrap();
        assert_eq!(graph.node(a).extends, vec![graph.id_of("q.B").unwrap()]);
        assert_eq!(graph.placeholders().count(), 0);
    }

    #[test]
    fn on_demand_import_resolves_declared_type() {
        let units = vec![
            CompilationUnit::new(interface("I", &[])).with_package("q"),
            CompilationUnit::new(class("A", None, &["I"]))
                .with_package("p")
                .with_wildcard_import("q"),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        let a = graph.id_of("p.A").unwrap();
        assert_eq!(graph.node(a).implements, vec![graph.id_of("q.I").unwrap()]);
    }

    #[test]
    fn repeated_parent_is_rejected() {
        let units = vec![
            CompilationUnit::new(interface("I", &[])),
            CompilationUnit::new(class("A", None, &["I", "I"])),
        ];
        let err = HierarchyGraph::build(&units).unwrap_err();
        assert!(matches!(
            err,
            Error::Hierarchy(HierarchyError::DuplicateParent { ref parent, .. }) if parent == "I"
        ));
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let units = vec![
            CompilationUnit::new(class("A", None, &[])).with_package("p"),
            CompilationUnit::new(interface("A", &[])).with_package("p"),
        ];
        let err = HierarchyGraph::build(&units).unwrap_err();
        assert!(matches!(err, Error::Hierarchy(HierarchyError::DuplicateType(ref n)) if n == "p.A"));
    }

    #[test]
    fn empty_identifier_is_an_internal_error() {
        let units = vec![CompilationUnit::new(class(" ", None, &[]))];
        assert!(HierarchyGraph::build(&units).unwrap_err().is_internal());
    }

    #[test]
    fn supertypes_include_self_and_transitive_parents() {
        let units = vec![
            CompilationUnit::new(interface("J", &[])),
            CompilationUnit::new(interface("I", &["J"])),
            CompilationUnit::new(class("B", None, &["I"])),
            CompilationUnit::new(class("A", Some("B"), &[])),
        ];
        let graph = HierarchyGraph::build(&units).unwrap();
        let a = graph.id_of("A").unwrap();
        let sup = graph.supertypes(a);
        for name in ["A", "B", "I", "J"] {
            assert!(sup.contains(&graph.id_of(name).unwrap()), "{}", name);
        }
        assert_eq!(graph.superclass(a), graph.id_of("B"));
    }
}
