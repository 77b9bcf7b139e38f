use super::visitor::{traverse, Node, Visitor, Walk};
use super::CompilationUnit;
use std::convert::Infallible;

/// AST printer for debugging and the `dump` command
pub struct AstPrinter {
    indent_level: usize,
    output: String,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, unit: &CompilationUnit) -> String {
        self.output.clear();
        self.indent_level = 0;
        // Infallible visitor
        let _ = traverse(Node::Unit(unit), self);
        self.output.clone()
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 2 {
            self.indent_level -= 2;
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.output.push_str(s);
        self.output.push('\n');
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Visitor<'a> for AstPrinter {
    type Error = Infallible;

    fn enter(&mut self, node: Node<'a>) -> Result<Walk, Self::Error> {
        let lexeme = node.lexeme();
        let line = if lexeme.is_empty() {
            format!("{:?}", node.kind())
        } else {
            format!("{:?} '{}'", node.kind(), lexeme)
        };
        self.writeln(&line);
        self.indent();
        Ok(Walk::Continue)
    }

    fn leave(&mut self, _node: Node<'a>) -> Result<(), Self::Error> {
        self.dedent();
        Ok(())
    }
}
