use crate::ast::{ConstructorDecl, MethodDecl, Modifier, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One formal parameter as far as signatures are concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Parameter {
    pub type_name: String,
    pub is_array: bool,
}

impl Parameter {
    pub fn new(type_name: impl Into<String>, is_array: bool) -> Self {
        Self { type_name: type_name.into(), is_array }
    }
}

impl From<&TypeRef> for Parameter {
    fn from(t: &TypeRef) -> Self {
        Self::new(t.name.clone(), t.is_array)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.type_name)
        } else {
            f.write_str(&self.type_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Type(Parameter),
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_str("void"),
            ReturnType::Type(t) => write!(f, "{}", t),
        }
    }
}

/// Method identity: name plus ordered parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", p)?;
        }
        f.write_str(")")
    }
}

/// A method or constructor as recorded on a hierarchy node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Qualified name of the declaring type
    pub owner: String,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: ReturnType,
    pub modifiers: BTreeSet<Modifier>,
}

impl Method {
    pub fn from_decl(owner: &str, decl: &MethodDecl) -> Self {
        Self {
            owner: owner.to_string(),
            name: decl.name.clone(),
            parameters: decl.parameters.iter().map(|p| Parameter::from(&p.type_ref)).collect(),
            return_type: match &decl.return_type {
                Some(t) => ReturnType::Type(Parameter::from(t)),
                None => ReturnType::Void,
            },
            modifiers: decl.modifiers.iter().copied().collect(),
        }
    }

    /// Constructors carry no return type and never take part in overriding
    pub fn from_constructor(owner: &str, decl: &ConstructorDecl) -> Self {
        Self {
            owner: owner.to_string(),
            name: decl.name.clone(),
            parameters: decl.parameters.iter().map(|p| Parameter::from(&p.type_ref)).collect(),
            return_type: ReturnType::Void,
            modifiers: decl.modifiers.iter().copied().collect(),
        }
    }

    pub fn signature(&self) -> Signature {
        Signature { name: self.name.clone(), parameters: self.parameters.clone() }
    }

    /// Same identifier and parameter sequence; return type and modifiers ignored
    pub fn signatures_match(&self, other: &Method) -> bool {
        self.name == other.name && self.parameters == other.parameters
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_static(&self) -> bool {
        self.has_modifier(Modifier::Static)
    }

    pub fn is_abstract(&self) -> bool {
        self.has_modifier(Modifier::Abstract)
    }

    pub fn is_final(&self) -> bool {
        self.has_modifier(Modifier::Final)
    }

    pub fn is_public(&self) -> bool {
        self.has_modifier(Modifier::Public)
    }

    pub fn is_protected(&self) -> bool {
        self.has_modifier(Modifier::Protected)
    }

    pub fn is_native(&self) -> bool {
        self.has_modifier(Modifier::Native)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.return_type, self.owner, self.signature())
    }
}
