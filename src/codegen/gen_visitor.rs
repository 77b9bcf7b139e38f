//! Per-unit code generation
//!
//! The generic [`traverse`] walk drives the declaration level; only class,
//! routine and field nodes have hooks. Routine bodies are generated by the
//! `gen_*` functions, which walk their own subtrees because operand order and
//! branch interleaving matter there.
//!
//! Evaluation convention: every expression leaves its value in `eax`. A
//! binary operator keeps its left operand on the stack (`push eax`) while the
//! right one is evaluated, then pops it into `ebx`.

use super::asm::{AsmWriter, LabelGenerator};
use super::layout::{ClassLayout, DispatchLayout};
use super::register_alloc::{frame_slots, RegisterAllocator};
use super::{constructor_label, method_label, vtable_init_label};
use crate::ast::*;
use crate::config::Config;
use crate::consts::{MALLOC_LABEL, WORD_SIZE};
use crate::error::{Error, Result};
use crate::hierarchy::Method;
use std::collections::BTreeSet;
use std::io::Write;

pub struct CodeGenerationVisitor<'l, W: Write> {
    out: AsmWriter<W>,
    layout: &'l DispatchLayout,
    labels: &'l mut LabelGenerator,
    /// Qualified name of the unit's top-level type
    type_name: String,
    frame: RegisterAllocator,
    /// Shared exit label of the routine being generated
    epilogue: String,
}

impl<'l, W: Write> CodeGenerationVisitor<'l, W> {
    pub fn new(out: W, layout: &'l DispatchLayout, config: &Config, labels: &'l mut LabelGenerator) -> Self {
        Self {
            out: AsmWriter::new(out, config.emit_comments),
            layout,
            labels,
            type_name: String::new(),
            frame: RegisterAllocator::new(),
            epilogue: String::new(),
        }
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out.into_inner())
    }

    fn generate_method(&mut self, decl: &MethodDecl) -> Result<()> {
        let method = Method::from_decl(&self.type_name, decl);
        let label = method_label(&self.type_name, &method.signature());
        let Some(body) = &decl.body else {
            // a vtable slot of an instance method must point at code
            if method.is_native() && !method.is_static() {
                return Err(Error::unsupported(format!("native instance method {}", method)));
            }
            if !method.is_abstract() && !method.is_native() {
                return Err(Error::internal(format!("concrete method {} has no body", method)));
            }
            self.out.blank()?;
            self.out.header(format_args!("{} has no body", label))?;
            return Ok(());
        };
        self.generate_routine(&label, &decl.parameters, !method.is_static(), body, &decl.name)
    }

    fn generate_constructor(&mut self, ctor: &ConstructorDecl) -> Result<()> {
        let label = constructor_label(&self.type_name, &Method::from_constructor(&self.type_name, ctor).signature());
        self.generate_routine(&label, &ctor.parameters, true, &ctor.body, &ctor.name)
    }

    fn generate_routine(
        &mut self,
        label: &str,
        parameters: &[Parameter],
        is_instance: bool,
        body: &Block,
        name: &str,
    ) -> Result<()> {
        let locals = frame_slots(body);
        self.frame.begin_routine(parameters, is_instance);
        self.epilogue = self.labels.fresh();
        log::trace!("routine {} ({} locals)", label, locals);

        self.out.blank()?;
        self.out.header(format_args!("{} {}", if is_instance { "routine" } else { "static routine" }, name))?;
        self.out.global(label)?;
        self.out.label(label)?;
        self.out.instr("push ebp")?;
        self.out.instr("mov ebp, esp")?;
        if locals > 0 {
            self.out.instr(format_args!("sub esp, {}", WORD_SIZE * locals))?;
        }

        self.gen_block(body)?;
        if self.frame.allocated() != locals {
            return Err(Error::internal(format!(
                "frame of {} reserved {} locals but allocated {}",
                label,
                locals,
                self.frame.allocated()
            )));
        }

        let epilogue = self.epilogue.clone();
        self.out.label(&epilogue)?;
        self.out.instr("mov esp, ebp")?;
        self.out.instr("pop ebp")?;
        self.out.instr("ret")?;
        Ok(())
    }

    fn gen_block(&mut self, block: &Block) -> Result<()> {
        self.frame.enter_scope();
        for stmt in &block.statements {
            self.gen_stmt(stmt)?;
        }
        self.frame.exit_scope();
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        let node = Node::Stmt(stmt);
        if !matches!(stmt, Stmt::Block(_) | Stmt::Empty) {
            self.out.comment(format_args!("{:?} {}", node.kind(), node.span()))?;
        }
        match stmt {
            Stmt::Expression(es) => self.gen_expr(&es.expr),
            Stmt::LocalVar(decl) => {
                self.gen_expr(&decl.initializer)?;
                let slot = self.frame.new_local(&decl.name);
                self.out.instr(format_args!("mov {}, eax", slot.operand()))?;
                Ok(())
            }
            Stmt::If(s) => {
                let else_label = self.labels.fresh();
                self.gen_expr(&s.condition)?;
                self.out.instr("cmp eax, 0")?;
                self.out.instr(format_args!("je {}", else_label))?;
                self.gen_stmt(&s.then_branch)?;
                match &s.else_branch {
                    Some(else_branch) => {
                        let end = self.labels.fresh();
                        self.out.instr(format_args!("jmp {}", end))?;
                        self.out.label(&else_label)?;
                        self.gen_stmt(else_branch)?;
                        self.out.label(&end)?;
                    }
                    None => self.out.label(&else_label)?,
                }
                Ok(())
            }
            Stmt::While(s) => {
                let start = self.labels.fresh();
                let end = self.labels.fresh();
                self.out.label(&start)?;
                self.gen_expr(&s.condition)?;
                self.out.instr("cmp eax, 0")?;
                self.out.instr(format_args!("je {}", end))?;
                self.gen_stmt(&s.body)?;
                self.out.instr(format_args!("jmp {}", start))?;
                self.out.label(&end)?;
                Ok(())
            }
            Stmt::For(s) => {
                self.frame.enter_scope();
                if let Some(init) = &s.init {
                    self.gen_stmt(init)?;
                }
                let start = self.labels.fresh();
                let end = self.labels.fresh();
                self.out.label(&start)?;
                if let Some(condition) = &s.condition {
                    self.gen_expr(condition)?;
                    self.out.instr("cmp eax, 0")?;
                    self.out.instr(format_args!("je {}", end))?;
                }
                self.gen_stmt(&s.body)?;
                if let Some(update) = &s.update {
                    self.gen_expr(update)?;
                }
                self.out.instr(format_args!("jmp {}", start))?;
                self.out.label(&end)?;
                self.frame.exit_scope();
                Ok(())
            }
            Stmt::Return(r) => {
                if let Some(value) = &r.value {
                    self.gen_expr(value)?;
                }
                self.out.instr(format_args!("jmp {}", self.epilogue))?;
                Ok(())
            }
            Stmt::Block(b) => self.gen_block(b),
            Stmt::Empty => Ok(()),
        }
    }

    fn gen_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(lit) => self.gen_literal(&lit.value),
            Expr::Name(n) => match self.frame.lookup(&n.name) {
                Some(slot) => {
                    self.out.instr(format_args!("mov eax, {}", slot.operand()))?;
                    Ok(())
                }
                None => Err(Error::unsupported(format!("field access '{}'", n.name))),
            },
            Expr::Binary(b) => self.gen_binary(b),
            Expr::Unary(u) => {
                self.gen_expr(&u.operand)?;
                match u.operator {
                    UnaryOp::Minus => self.out.instr("neg eax")?,
                    UnaryOp::Not => self.out.instr("xor eax, 1")?,
                }
                Ok(())
            }
            Expr::Assignment(a) => {
                let slot = match a.target.as_ref() {
                    Expr::Name(n) => self.frame.lookup(&n.name),
                    _ => None,
                };
                let Some(slot) = slot else {
                    return Err(Error::unsupported("assignment to a field or array element"));
                };
                self.gen_expr(&a.value)?;
                self.out.instr(format_args!("mov {}, eax", slot.operand()))?;
                Ok(())
            }
            Expr::This(_) => Err(Error::unsupported("'this'")),
            Expr::MethodCall(m) => Err(Error::unsupported(format!("method invocation '{}'", m.name))),
            Expr::FieldAccess(f) => Err(Error::unsupported(format!("field access '{}'", f.name))),
            Expr::ArrayAccess(_) => Err(Error::unsupported("array access")),
            Expr::Cast(c) => Err(Error::unsupported(format!("cast to '{}'", c.target_type))),
            Expr::InstanceOf(_) => Err(Error::unsupported("instanceof")),
            Expr::New(n) => Err(Error::unsupported(format!("object creation 'new {}'", n.target_type))),
            Expr::NewArray(n) => Err(Error::unsupported(format!("array creation 'new {}[]'", n.element_type))),
        }
    }

    fn gen_literal(&mut self, literal: &Literal) -> Result<()> {
        let value = match literal {
            Literal::Integer(v) => {
                // 2147483648 only appears under unary minus and encodes as i32::MIN
                if *v < i64::from(i32::MIN) || *v > i64::from(i32::MAX) + 1 {
                    return Err(Error::internal(format!("integer literal {} does not fit in 32 bits", v)));
                }
                *v
            }
            Literal::Boolean(b) => i64::from(*b),
            Literal::Char(c) => i64::from(u32::from(*c)),
            Literal::Null => 0,
            Literal::String(_) => return Err(Error::unsupported("string literal")),
        };
        self.out.instr(format_args!("mov eax, {}", value))?;
        Ok(())
    }

    fn gen_binary(&mut self, b: &BinaryExpr) -> Result<()> {
        if matches!(b.operator, BinaryOp::And | BinaryOp::Or) {
            let end = self.labels.fresh();
            self.gen_expr(&b.left)?;
            self.out.instr("cmp eax, 0")?;
            let skip = if b.operator == BinaryOp::And { "je" } else { "jne" };
            self.out.instr(format_args!("{} {}", skip, end))?;
            self.gen_expr(&b.right)?;
            self.out.label(&end)?;
            return Ok(());
        }

        self.gen_expr(&b.left)?;
        self.out.instr("push eax")?;
        self.gen_expr(&b.right)?;
        self.out.instr("pop ebx")?;
        // ebx = left, eax = right
        match b.operator {
            BinaryOp::Add => self.out.instr("add eax, ebx")?,
            BinaryOp::Sub => {
                self.out.instr("sub ebx, eax")?;
                self.out.instr("mov eax, ebx")?;
            }
            BinaryOp::Mul => self.out.instr("imul eax, ebx")?,
            BinaryOp::Div | BinaryOp::Mod => {
                self.out.instr("xchg eax, ebx")?;
                self.out.instr("cdq")?;
                self.out.instr("idiv ebx")?;
                if b.operator == BinaryOp::Mod {
                    self.out.instr("mov eax, edx")?;
                }
            }
            BinaryOp::BitAnd => self.out.instr("and eax, ebx")?,
            BinaryOp::BitOr => self.out.instr("or eax, ebx")?,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
                let done = self.labels.fresh();
                self.out.instr("cmp ebx, eax")?;
                self.out.instr("mov eax, 0")?;
                self.out.instr(format_args!("{} {}", inverse_jump(b.operator), done))?;
                self.out.instr("mov eax, 1")?;
                self.out.label(&done)?;
            }
            BinaryOp::And | BinaryOp::Or => {
                return Err(Error::internal("short-circuit operator reached eager evaluation"));
            }
        }
        Ok(())
    }

    /// `.data` cell holding the vtable pointer plus the routine that
    /// allocates the table and stores one entry point per slot.
    fn emit_vtable(&mut self, class: &ClassLayout) -> Result<()> {
        let vtable = class.vtable_label();
        let init = vtable_init_label(&class.name);

        self.out.blank()?;
        self.out.header(format_args!("vtable of {}: {} slots", class.name, class.vtable.len()))?;
        self.out.section(".data")?;
        self.out.global(&vtable)?;
        self.out.data_word(&vtable, 0)?;
        self.out.section(".text")?;

        let externs: BTreeSet<&str> = std::iter::once(MALLOC_LABEL)
            .chain(
                class
                    .vtable
                    .iter()
                    .filter(|e| !e.is_abstract && e.owner != self.type_name)
                    .map(|e| e.label.as_str()),
            )
            .collect();
        for label in externs {
            self.out.extern_symbol(label)?;
        }

        self.out.global(&init)?;
        self.out.label(&init)?;
        self.out.instr(format_args!("mov eax, {}", WORD_SIZE * class.vtable.len()))?;
        self.out.instr(format_args!("call {}", MALLOC_LABEL))?;
        self.out.instr(format_args!("mov [{}], eax", vtable))?;
        self.out.instr("mov ebx, eax")?;
        for (slot, entry) in class.vtable.iter().enumerate() {
            self.out.comment(format_args!("slot {}: {}", slot, entry.signature))?;
            let target = if entry.is_abstract { "0" } else { entry.label.as_str() };
            self.out.instr(format_args!("mov dword [ebx + {}], {}", WORD_SIZE * slot, target))?;
        }
        self.out.instr("ret")?;
        Ok(())
    }
}

impl<'a, 'l, W: Write> Visitor<'a> for CodeGenerationVisitor<'l, W> {
    type Error = Error;

    fn enter(&mut self, node: Node<'a>) -> Result<Walk> {
        match node {
            Node::Unit(unit) => {
                self.type_name = unit.qualified_name();
                self.out.header(format_args!("{}", self.type_name))?;
                self.out.section(".text")?;
                Ok(Walk::Continue)
            }
            Node::Package(_) | Node::Import(_) | Node::TypeRef(_) => Ok(Walk::Skip),
            Node::Class(_) => Ok(Walk::Continue),
            Node::Interface(_) => {
                self.out.header("interface: no code")?;
                Ok(Walk::Skip)
            }
            Node::Field(field) => {
                if field.initializer.is_some() {
                    return Err(Error::unsupported(format!("initializer of field '{}'", field.name)));
                }
                Ok(Walk::Skip)
            }
            Node::Method(method) => {
                self.generate_method(method)?;
                Ok(Walk::Skip)
            }
            Node::Constructor(ctor) => {
                self.generate_constructor(ctor)?;
                Ok(Walk::Skip)
            }
            other => Err(Error::internal(format!(
                "{:?} reached outside of a routine body at {}",
                other.kind(),
                other.span()
            ))),
        }
    }

    fn leave(&mut self, node: Node<'a>) -> Result<()> {
        if let Node::Class(_) = node {
            let layout = self.layout;
            let class = layout.class(&self.type_name).ok_or_else(|| {
                Error::internal(format!("dispatch layout has no entry for class '{}'", self.type_name))
            })?;
            self.emit_vtable(class)?;
        }
        Ok(())
    }
}

/// Jump taken when a comparison is false
fn inverse_jump(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Lt => "jge",
        BinaryOp::Le => "jg",
        BinaryOp::Gt => "jle",
        BinaryOp::Ge => "jl",
        BinaryOp::Eq => "jne",
        _ => "je",
    }
}
