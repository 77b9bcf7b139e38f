use super::{ReviewError, ReviewResult};
use crate::ast::*;

/// `int x = x + 1;` is rejected: a local's initializer must not mention the
/// variable being declared.
pub(crate) fn review_local_initializers(unit: &CompilationUnit) -> ReviewResult<()> {
    traverse(Node::from(unit), &mut SelfAssignmentVisitor)
}

struct SelfAssignmentVisitor;

impl<'a> Visitor<'a> for SelfAssignmentVisitor {
    type Error = ReviewError;

    fn enter(&mut self, node: Node<'a>) -> ReviewResult<Walk> {
        if let Node::Stmt(Stmt::LocalVar(decl)) = node {
            let mut finder = NameFinder { name: &decl.name, found: None };
            traverse(Node::Expr(&decl.initializer), &mut finder)?;
            if let Some(location) = finder.found {
                return Err(ReviewError::SelfReference { name: decl.name.clone(), location });
            }
        }
        Ok(Walk::Continue)
    }
}

/// Records the first name expression whose leading segment is `name`
struct NameFinder<'n> {
    name: &'n str,
    found: Option<Span>,
}

impl<'a, 'n> Visitor<'a> for NameFinder<'n> {
    type Error = ReviewError;

    fn enter(&mut self, node: Node<'a>) -> ReviewResult<Walk> {
        if self.found.is_some() {
            return Ok(Walk::Skip);
        }
        if let Node::Expr(Expr::Name(n)) = node {
            if n.name.split('.').next() == Some(self.name) {
                self.found = Some(n.span);
            }
        }
        Ok(Walk::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_with(statements: Vec<Stmt>) -> CompilationUnit {
        let method = MethodDecl {
            modifiers: vec![Modifier::Public, Modifier::Static],
            return_type: None,
            name: "test".to_string(),
            parameters: vec![],
            body: Some(Block::new(statements)),
            span: Span::default(),
        };
        CompilationUnit::new(TypeDecl::Class(ClassDecl {
            modifiers: vec![Modifier::Public],
            name: "A".to_string(),
            extends: None,
            implements: vec![],
            body: vec![ClassMember::Method(method)],
            span: Span::default(),
        }))
    }

    fn local(name: &str, init: Expr) -> Stmt {
        Stmt::LocalVar(LocalVarDecl {
            type_ref: TypeRef::new("int"),
            name: name.to_string(),
            initializer: init,
            span: Span::default(),
        })
    }

    #[test]
    fn self_reference_in_initializer_is_rejected() {
        let unit = unit_with(vec![local("x", Expr::binary(Expr::name("x"), BinaryOp::Add, Expr::int(1)))]);
        let err = review_local_initializers(&unit).unwrap_err();
        assert!(matches!(err, ReviewError::SelfReference { ref name, .. } if name == "x"));
    }

    #[test]
    fn reports_the_offending_name_location() {
        let at = Span::new(Location::new(4, 17, 52), Location::new(4, 18, 53));
        let unit = unit_with(vec![local("x", Expr::Name(NameExpr { name: "x".to_string(), span: at }))]);
        let err = review_local_initializers(&unit).unwrap_err();
        assert_eq!(err, ReviewError::SelfReference { name: "x".to_string(), location: at });
        assert!(err.to_string().ends_with("(4:17)"));
    }

    #[test]
    fn earlier_locals_may_be_used() {
        let unit = unit_with(vec![
            local("x", Expr::int(1)),
            local("y", Expr::binary(Expr::name("x"), BinaryOp::Mul, Expr::int(2))),
        ]);
        assert!(review_local_initializers(&unit).is_ok());
    }

    #[test]
    fn nested_blocks_are_reviewed() {
        let inner = Stmt::Block(Block::new(vec![local("z", Expr::unary(UnaryOp::Minus, Expr::name("z")))]));
        let unit = unit_with(vec![Stmt::While(WhileStmt {
            condition: Expr::boolean(true),
            body: Box::new(inner),
            span: Span::default(),
        })]);
        assert!(review_local_initializers(&unit).is_err());
    }
}
