//! Program-wide type hierarchy: graph construction and verification
//!
//! [`HierarchyGraph`] collects one node per declared (or referenced) type and
//! the extends/implements edges between them. [`HierarchyChecker`] then runs
//! a fixed, fail-fast sequence of legality checks over the finished graph.

mod checker;
mod graph;
mod method;

pub use checker::HierarchyChecker;
pub use graph::{HierarchyGraph, HierarchyGraphNode, NodeId, TypeKind};
pub use method::{Method, Parameter, ReturnType, Signature};

pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Violations of the inheritance rules; the first one found aborts the run
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),
    #[error("'{parent}' is repeated in the type declaration of '{child}'")]
    DuplicateParent { child: String, parent: String },
    #[error("type '{name}' referenced by '{referenced_by}' cannot be resolved")]
    UnresolvedType { name: String, referenced_by: String },
    #[error("a class cannot extend an interface [class: {class}, interface: {interface}]")]
    ClassExtendsInterface { class: String, interface: String },
    #[error("class '{class}' is extending final class '{parent}'")]
    ExtendsFinalClass { class: String, parent: String },
    #[error("an interface cannot extend a class [interface: {interface}, class: {class}]")]
    InterfaceExtendsClass { interface: String, class: String },
    #[error("a class cannot implement a class [class: {class}, implemented class: {implemented}]")]
    ImplementsClass { class: String, implemented: String },
    #[error("hierarchy graph is not acyclic: '{0}' is causing a cycle")]
    Cycle(String),
    #[error("a method with the exact same signature is declared twice in '{owner}': {method}")]
    DuplicateMethod { owner: String, method: String },
    #[error("'{owner}' declares abstract method {method} but is neither abstract nor an interface")]
    AbstractMethodInConcreteClass { owner: String, method: String },
    #[error("{method} in '{owner}' replaces {inherited} with a different return type")]
    ReturnTypeMismatch { owner: String, method: String, inherited: String },
    #[error("nonstatic {method} in '{owner}' must not replace static {inherited}")]
    InstanceReplacesStatic { owner: String, method: String, inherited: String },
    #[error("static {method} in '{owner}' must not replace nonstatic {inherited}")]
    StaticReplacesInstance { owner: String, method: String, inherited: String },
    #[error("protected {method} in '{owner}' must not replace public {inherited}")]
    ReducedVisibility { owner: String, method: String, inherited: String },
    #[error("{method} in '{owner}' must not replace final {inherited}")]
    ReplacesFinal { owner: String, method: String, inherited: String },
}
