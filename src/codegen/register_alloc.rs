//! Stack frame slot allocation for parameters and locals
//!
//! Frame shape after the `push ebp` / `mov ebp, esp` prologue:
//! - argument word `i` lives at `[ebp + 8 + 4*i]`; instance routines receive
//!   `this` as word 0 and their declared parameters from word 1 on,
//! - local `k` (in declaration order across the whole body) lives at
//!   `[ebp - 4*(k+1)]`.
//!
//! Local slots are never reused, so the frame size is the number of local
//! declarations in the body and can be computed before emitting it.

use crate::ast::{traverse, Block, Node, Parameter, Stmt, Visitor, Walk};
use crate::consts::WORD_SIZE;
use std::collections::HashMap;
use std::convert::Infallible;

/// Where a named variable lives in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Argument word index above the saved `ebp` and return address
    Argument(usize),
    /// Local index below `ebp`
    Local(usize),
}

impl Slot {
    /// NASM memory operand for the slot
    pub fn operand(self) -> String {
        match self {
            Slot::Argument(i) => format!("[ebp + {}]", 2 * WORD_SIZE + WORD_SIZE * i),
            Slot::Local(k) => format!("[ebp - {}]", WORD_SIZE * (k + 1)),
        }
    }
}

/// Frame allocator for one routine at a time
#[derive(Debug, Default)]
pub struct RegisterAllocator {
    /// Next free local slot
    next_local: usize,
    arguments: HashMap<String, usize>,
    /// Innermost scope last
    scopes: Vec<HashMap<String, usize>>,
}

impl RegisterAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a routine: bind parameters, drop every local of the previous one
    pub fn begin_routine(&mut self, parameters: &[Parameter], is_instance: bool) {
        self.reset();
        let first = usize::from(is_instance);
        for (i, p) in parameters.iter().enumerate() {
            self.arguments.insert(p.name.clone(), first + i);
        }
    }

    pub fn reset(&mut self) {
        self.next_local = 0;
        self.arguments.clear();
        self.scopes.clear();
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Allocate the next local slot and bind `name` in the innermost scope
    pub fn new_local(&mut self, name: &str) -> Slot {
        let k = self.next_local;
        self.next_local += 1;
        if self.scopes.is_empty() {
            self.enter_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), k);
        }
        Slot::Local(k)
    }

    /// Innermost local first, then parameters
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied().map(Slot::Local))
            .or_else(|| self.arguments.get(name).copied().map(Slot::Argument))
    }

    /// Locals allocated so far in the current routine
    pub fn allocated(&self) -> usize {
        self.next_local
    }
}

/// Number of local slots a routine body needs
pub fn frame_slots(body: &Block) -> usize {
    let mut counter = LocalCounter(0);
    match traverse(Node::Block(body), &mut counter) {
        Ok(()) => counter.0,
        Err(never) => match never {},
    }
}

struct LocalCounter(usize);

impl<'a> Visitor<'a> for LocalCounter {
    type Error = Infallible;

    fn enter(&mut self, node: Node<'a>) -> Result<Walk, Infallible> {
        match node {
            Node::Stmt(Stmt::LocalVar(_)) => {
                self.0 += 1;
                // initializers cannot declare locals
                Ok(Walk::Skip)
            }
            Node::Expr(_) | Node::TypeRef(_) => Ok(Walk::Skip),
            _ => Ok(Walk::Continue),
        }
    }
}
