//! Flat storage for a file's expression and statement nodes.

use serde::{Deserialize, Serialize};

use crate::ast::{CallSite, Expr, ExprKind, Stmt, StmtKind};
use crate::{ExprId, IrError, Line, StmtId};

/// Arena holding every node of one compiled file.
///
/// Nodes are appended by the compiler (or by tests) and never removed.
/// Once the owning `File` is shared, the arena is read-only; the only
/// mutation allowed afterwards is the call-site resolution cache.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an expression node.
    pub fn alloc_expr(&mut self, kind: ExprKind, line: Line) -> ExprId {
        let id = ExprId::new(index_u32(self.exprs.len()));
        self.exprs.push(Expr { kind, line });
        id
    }

    /// Append a statement node.
    pub fn alloc_stmt(&mut self, kind: StmtKind, line: Line) -> StmtId {
        let id = StmtId::new(index_u32(self.stmts.len()));
        self.stmts.push(Stmt { kind, line });
        id
    }

    /// Append a named call.
    pub fn alloc_call(&mut self, name: &str, args: Vec<ExprId>, line: Line) -> ExprId {
        self.alloc_expr(ExprKind::Call(CallSite::new(name, args, line)), line)
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Every expression node with its id, in allocation order.
    pub fn iter_exprs(&self) -> impl Iterator<Item = (ExprId, &Expr)> {
        self.exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| (ExprId::new(index_u32(i)), expr))
    }

    /// Prepend `arg` to the argument list of the call at `call`.
    ///
    /// This is how method-call sugar is desugared: `x.f(y)` becomes
    /// `f(x, y)`. Only valid before the call has been resolved.
    pub fn unshift_argument(&mut self, call: ExprId, arg: ExprId) -> Result<(), IrError> {
        match &mut self.exprs[call.index()].kind {
            ExprKind::Call(site) => {
                if site.is_resolved() {
                    return Err(IrError::AlreadyResolved {
                        name: site.name.clone(),
                    });
                }
                site.args.insert(0, arg);
                Ok(())
            }
            _ => Err(IrError::NotACall { id: call }),
        }
    }
}

/// Arena indices are `u32`; a file with more nodes than that is not a template.
#[inline]
fn index_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX - 1)
}
