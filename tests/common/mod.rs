//! Shared helpers for integration tests: AST builders, a tiny interpreter for
//! the emitted x86 subset and a constant-propagating reachability analysis.

#![allow(dead_code)]

use joosc::ast::*;
use std::collections::{HashMap, HashSet};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
}

// ---------------------------------------------------------------------------
// AST builders

pub struct ClassBuilder {
    package: Option<String>,
    imports: Vec<ImportDecl>,
    decl: ClassDecl,
}

pub fn class(name: &str) -> ClassBuilder {
    ClassBuilder {
        package: None,
        imports: Vec::new(),
        decl: ClassDecl {
            modifiers: vec![Modifier::Public],
            name: name.to_string(),
            extends: None,
            implements: Vec::new(),
            body: Vec::new(),
            span: Span::default(),
        },
    }
}

impl ClassBuilder {
    pub fn package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    pub fn import(mut self, name: &str) -> Self {
        self.imports.push(ImportDecl { name: name.to_string(), is_wildcard: false, span: Span::default() });
        self
    }

    pub fn import_all(mut self, package: &str) -> Self {
        self.imports.push(ImportDecl { name: package.to_string(), is_wildcard: true, span: Span::default() });
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.decl.modifiers.push(modifier);
        self
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.decl.extends = Some(TypeRef::new(parent));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.decl.implements.push(TypeRef::new(interface));
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.decl.body.push(ClassMember::Method(method));
        self
    }

    pub fn constructor(mut self, parameters: &[(&str, &str)], body: Vec<Stmt>) -> Self {
        self.decl.body.push(ClassMember::Constructor(ConstructorDecl {
            modifiers: vec![Modifier::Public],
            name: self.decl.name.clone(),
            parameters: params(parameters),
            body: Block::new(body),
            span: Span::default(),
        }));
        self
    }

    pub fn field(mut self, type_name: &str, name: &str, initializer: Option<Expr>) -> Self {
        self.decl.body.push(ClassMember::Field(FieldDecl {
            modifiers: vec![Modifier::Protected],
            type_ref: TypeRef::new(type_name),
            name: name.to_string(),
            initializer,
            span: Span::default(),
        }));
        self
    }

    pub fn build(self) -> CompilationUnit {
        CompilationUnit {
            package_decl: self.package.map(|name| PackageDecl { name, span: Span::default() }),
            imports: self.imports,
            type_decl: TypeDecl::Class(self.decl),
            span: Span::default(),
        }
    }
}

pub struct InterfaceBuilder {
    package: Option<String>,
    decl: InterfaceDecl,
}

pub fn interface(name: &str) -> InterfaceBuilder {
    InterfaceBuilder {
        package: None,
        decl: InterfaceDecl {
            modifiers: vec![Modifier::Public],
            name: name.to_string(),
            extends: Vec::new(),
            body: Vec::new(),
            span: Span::default(),
        },
    }
}

impl InterfaceBuilder {
    pub fn package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.decl.extends.push(TypeRef::new(parent));
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.decl.body.push(method);
        self
    }

    pub fn build(self) -> CompilationUnit {
        CompilationUnit {
            package_decl: self.package.map(|name| PackageDecl { name, span: Span::default() }),
            imports: Vec::new(),
            type_decl: TypeDecl::Interface(self.decl),
            span: Span::default(),
        }
    }
}

pub struct MethodBuilder {
    decl: MethodDecl,
}

/// `public void name()` with an empty body
pub fn method(name: &str) -> MethodBuilder {
    MethodBuilder {
        decl: MethodDecl {
            modifiers: vec![Modifier::Public],
            return_type: None,
            name: name.to_string(),
            parameters: Vec::new(),
            body: Some(Block::default()),
            span: Span::default(),
        },
    }
}

impl MethodBuilder {
    /// Replace the modifier set
    pub fn modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.decl.modifiers = modifiers.to_vec();
        self
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.decl.modifiers.push(modifier);
        if modifier == Modifier::Abstract || modifier == Modifier::Native {
            self.decl.body = None;
        }
        self
    }

    pub fn returns(mut self, type_name: &str) -> Self {
        self.decl.return_type = Some(TypeRef::new(type_name));
        self
    }

    pub fn params(mut self, parameters: &[(&str, &str)]) -> Self {
        self.decl.parameters = params(parameters);
        self
    }

    pub fn array_param(mut self, type_name: &str, name: &str) -> Self {
        self.decl.parameters.push(Parameter::new(TypeRef::array_of(type_name), name));
        self
    }

    pub fn body(mut self, statements: Vec<Stmt>) -> Self {
        self.decl.body = Some(Block::new(statements));
        self
    }

    /// Drop the body without adding `abstract` or `native`
    pub fn without_body(mut self) -> Self {
        self.decl.body = None;
        self
    }

    pub fn build(self) -> MethodDecl {
        self.decl
    }
}

fn params(parameters: &[(&str, &str)]) -> Vec<Parameter> {
    parameters.iter().map(|(t, n)| Parameter::new(TypeRef::new(*t), *n)).collect()
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(ReturnStmt { value: Some(value), span: Span::default() })
}

pub fn local(name: &str, initializer: Expr) -> Stmt {
    Stmt::LocalVar(LocalVarDecl {
        type_ref: TypeRef::new("int"),
        name: name.to_string(),
        initializer,
        span: Span::default(),
    })
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Expression(ExprStmt {
        expr: Expr::Assignment(AssignmentExpr {
            target: Box::new(Expr::name(name)),
            value: Box::new(value),
            span: Span::default(),
        }),
        span: Span::default(),
    })
}

pub fn while_loop(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While(WhileStmt { condition, body: Box::new(Stmt::Block(Block::new(body))), span: Span::default() })
}

/// `for (int name = from; cond; name = update) { body }`
pub fn for_loop(name: &str, from: Expr, condition: Expr, update: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::For(ForStmt {
        init: Some(Box::new(local(name, from))),
        condition: Some(condition),
        update: Some(Expr::Assignment(AssignmentExpr {
            target: Box::new(Expr::name(name)),
            value: Box::new(update),
            span: Span::default(),
        })),
        body: Box::new(Stmt::Block(Block::new(body))),
        span: Span::default(),
    })
}

pub fn if_else(condition: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt>) -> Stmt {
    Stmt::If(IfStmt {
        condition,
        then_branch: Box::new(Stmt::Block(Block::new(then_branch))),
        else_branch: Some(Box::new(Stmt::Block(Block::new(else_branch)))),
        span: Span::default(),
    })
}

pub fn string(value: &str) -> Expr {
    Expr::Literal(LiteralExpr { value: Literal::String(value.to_string()), span: Span::default() })
}

pub fn char_lit(value: char) -> Expr {
    Expr::Literal(LiteralExpr { value: Literal::Char(value), span: Span::default() })
}

pub fn null() -> Expr {
    Expr::Literal(LiteralExpr { value: Literal::Null, span: Span::default() })
}

pub fn new_object(type_name: &str) -> Expr {
    Expr::New(NewExpr { target_type: TypeRef::new(type_name), arguments: Vec::new(), span: Span::default() })
}

// ---------------------------------------------------------------------------
// Assembly listing

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Label(String),
    Instr { op: String, args: Vec<String> },
}

/// Code lines of a listing; directives, data cells and comments are dropped
pub fn parse_listing(asm: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    for raw in asm.lines() {
        let line = raw.trim();
        if line.is_empty()
            || line.starts_with(';')
            || line.starts_with("section ")
            || line.starts_with("global ")
            || line.starts_with("extern ")
            || line.contains(": dd ")
        {
            continue;
        }
        if let Some(label) = line.strip_suffix(':') {
            lines.push(Line::Label(label.to_string()));
            continue;
        }
        let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
        let args = if rest.is_empty() { Vec::new() } else { rest.split(", ").map(str::to_string).collect() };
        lines.push(Line::Instr { op: op.to_string(), args });
    }
    lines
}

fn label_index(lines: &[Line]) -> HashMap<String, usize> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| match l {
            Line::Label(name) => Some((name.clone(), i)),
            _ => None,
        })
        .collect()
}

fn is_conditional_jump(op: &str) -> bool {
    matches!(op, "je" | "jne" | "jl" | "jle" | "jg" | "jge")
}

fn jump_taken(op: &str, left: i64, right: i64) -> bool {
    match op {
        "je" => left == right,
        "jne" => left != right,
        "jl" => left < right,
        "jle" => left <= right,
        "jg" => left > right,
        "jge" => left >= right,
        other => panic!("not a conditional jump: {}", other),
    }
}

// ---------------------------------------------------------------------------
// Interpreter

const RETURN_SENTINEL: i32 = -0x5eed;

struct Machine {
    regs: HashMap<String, i32>,
    memory: HashMap<i32, i32>,
    cmp: Option<(i32, i32)>,
}

impl Machine {
    fn reg(&self, name: &str) -> i32 {
        *self.regs.get(name).unwrap_or_else(|| panic!("unknown register {}", name))
    }

    fn address(&self, operand: &str) -> i32 {
        let inner = operand.trim_start_matches("dword ").trim_start_matches('[').trim_end_matches(']');
        let parts: Vec<&str> = inner.split_whitespace().collect();
        match parts.as_slice() {
            [reg] => self.reg(reg),
            [reg, "+", off] => self.reg(reg) + off.parse::<i32>().unwrap(),
            [reg, "-", off] => self.reg(reg) - off.parse::<i32>().unwrap(),
            other => panic!("unsupported memory operand {:?}", other),
        }
    }

    fn read(&self, operand: &str) -> i32 {
        if operand.contains('[') {
            *self.memory.get(&self.address(operand)).unwrap_or(&0)
        } else if let Ok(value) = operand.parse::<i64>() {
            value as i32
        } else {
            self.reg(operand)
        }
    }

    fn write(&mut self, operand: &str, value: i32) {
        if operand.contains('[') {
            let address = self.address(operand);
            self.memory.insert(address, value);
        } else {
            self.regs.insert(operand.to_string(), value);
        }
    }

    fn push(&mut self, value: i32) {
        let esp = self.reg("esp") - 4;
        self.regs.insert("esp".into(), esp);
        self.memory.insert(esp, value);
    }

    fn pop(&mut self) -> i32 {
        let esp = self.reg("esp");
        self.regs.insert("esp".into(), esp + 4);
        *self.memory.get(&esp).unwrap_or(&0)
    }
}

/// Run the routine at `entry` with cdecl-style stack arguments and return
/// `eax`. Only the instruction subset emitted for routine bodies is known.
pub fn run(asm: &str, entry: &str, args: &[i32]) -> i32 {
    let lines = parse_listing(asm);
    let labels = label_index(&lines);
    let mut m = Machine { regs: HashMap::new(), memory: HashMap::new(), cmp: None };
    for r in ["eax", "ebx", "ecx", "edx", "ebp"] {
        m.regs.insert(r.to_string(), 0);
    }
    m.regs.insert("esp".into(), 0x10000);
    for &arg in args.iter().rev() {
        m.push(arg);
    }
    m.push(RETURN_SENTINEL);

    let mut pc = *labels.get(entry).unwrap_or_else(|| panic!("no label {} in\n{}", entry, asm));
    for _ in 0..100_000 {
        let Some(line) = lines.get(pc) else { panic!("fell off the end of the listing") };
        pc += 1;
        let (op, args) = match line {
            Line::Label(_) => continue,
            Line::Instr { op, args } => (op.as_str(), args),
        };
        match op {
            "push" => {
                let v = m.read(&args[0]);
                m.push(v);
            }
            "pop" => {
                let v = m.pop();
                m.write(&args[0], v);
            }
            "mov" => {
                let v = m.read(&args[1]);
                m.write(&args[0], v);
            }
            "add" | "sub" | "imul" | "and" | "or" | "xor" => {
                let (a, b) = (m.read(&args[0]), m.read(&args[1]));
                let v = match op {
                    "add" => a.wrapping_add(b),
                    "sub" => a.wrapping_sub(b),
                    "imul" => a.wrapping_mul(b),
                    "and" => a & b,
                    "or" => a | b,
                    _ => a ^ b,
                };
                m.write(&args[0], v);
            }
            "neg" => {
                let v = m.read(&args[0]).wrapping_neg();
                m.write(&args[0], v);
            }
            "xchg" => {
                let (a, b) = (m.read(&args[0]), m.read(&args[1]));
                m.write(&args[0], b);
                m.write(&args[1], a);
            }
            "cdq" => {
                let sign = if m.reg("eax") < 0 { -1 } else { 0 };
                m.regs.insert("edx".into(), sign);
            }
            "idiv" => {
                let divisor = m.read(&args[0]);
                let dividend = m.reg("eax");
                m.regs.insert("eax".into(), dividend.wrapping_div(divisor));
                m.regs.insert("edx".into(), dividend.wrapping_rem(divisor));
            }
            "cmp" => m.cmp = Some((m.read(&args[0]), m.read(&args[1]))),
            "jmp" => pc = labels[&args[0]],
            op if is_conditional_jump(op) => {
                let (a, b) = m.cmp.expect("conditional jump without cmp");
                if jump_taken(op, a.into(), b.into()) {
                    pc = labels[&args[0]];
                }
            }
            "ret" => {
                if m.pop() == RETURN_SENTINEL {
                    return m.reg("eax");
                }
                panic!("nested calls are not supported");
            }
            other => panic!("unsupported instruction {}", other),
        }
    }
    panic!("step limit exceeded")
}

// ---------------------------------------------------------------------------
// Reachability

/// Indices (into [`parse_listing`]) of every line reachable from `entry`.
///
/// `eax` is tracked as a constant while it only receives immediates, so a
/// `cmp eax, imm` on a known value decides its conditional jump and the
/// untaken edge is pruned.
pub fn reachable(asm: &str, entry: &str) -> HashSet<usize> {
    let lines = parse_listing(asm);
    let labels = label_index(&lines);
    let start = labels[entry];

    type State = (usize, Option<i64>, Option<(i64, i64)>);
    let mut seen: HashSet<State> = HashSet::new();
    let mut work: Vec<State> = vec![(start, None, None)];
    let mut reached = HashSet::new();

    while let Some(state) = work.pop() {
        if !seen.insert(state) {
            continue;
        }
        let (pc, eax, flags) = state;
        let Some(line) = lines.get(pc) else { continue };
        reached.insert(pc);
        let (op, args) = match line {
            Line::Label(_) => {
                work.push((pc + 1, eax, flags));
                continue;
            }
            Line::Instr { op, args } => (op.as_str(), args),
        };
        match op {
            "ret" => {}
            "jmp" => work.push((labels[&args[0]], eax, flags)),
            op if is_conditional_jump(op) => {
                let target = labels[&args[0]];
                match flags {
                    Some((a, b)) if jump_taken(op, a, b) => work.push((target, eax, flags)),
                    Some(_) => work.push((pc + 1, eax, flags)),
                    None => {
                        work.push((target, eax, flags));
                        work.push((pc + 1, eax, flags));
                    }
                }
            }
            "cmp" => {
                let known = match (args[0].as_str(), eax, args[1].parse::<i64>()) {
                    ("eax", Some(v), Ok(imm)) => Some((v, imm)),
                    _ => None,
                };
                work.push((pc + 1, eax, known));
            }
            "mov" if args[0] == "eax" => work.push((pc + 1, args[1].parse::<i64>().ok(), flags)),
            _ => {
                let clobbers_eax = args.first().map_or(false, |a| a == "eax") || matches!(op, "xchg" | "idiv");
                let eax = if clobbers_eax { None } else { eax };
                work.push((pc + 1, eax, flags));
            }
        }
    }
    reached
}

/// Index of the first instruction equal to `op args...`
pub fn find_instr(asm: &str, text: &str) -> Option<usize> {
    parse_listing(asm).iter().position(|l| match l {
        Line::Instr { op, args } => format!("{} {}", op, args.join(", ")).trim_end() == text,
        _ => false,
    })
}
