//! Expression and statement nodes.
//!
//! Nodes are stored flat in an `ExprArena` and refer to each other through
//! `ExprId`/`StmtId`. Every node carries the line it came from so that
//! diagnostics can point back at the template source.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{ExprId, FunctionHandle, Line, StmtId};

/// Expression node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: Line,
}

/// Expression kinds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ExprKind {
    // Literals
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
    List(Vec<ExprId>),
    Dict(Vec<(String, ExprId)>),

    /// Variable reference, resolved through the binding environment.
    Ref(String),
    /// Call by name: a bound lambda, otherwise a runtime function.
    Call(CallSite),
    /// Call of an arbitrary expression that must evaluate to a lambda.
    Invoke { callee: ExprId, args: Vec<ExprId> },
    /// Lambda literal; captures the visible bindings when evaluated.
    Lambda(LambdaDef),

    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    /// `base[index]`
    Index { base: ExprId, index: ExprId },
    /// `base.name`
    Field { base: ExprId, name: String },
    /// `target = value`; target is a `Ref`, `Index` or `Field`.
    Assign { target: ExprId, value: ExprId },

    /// Placeholder left by the compiler for a node it could not build.
    Error(String),
}

/// Identifies the resolver (a function registry) behind a cached resolution.
pub type ResolverId = u64;

/// A named call site.
///
/// The runtime function behind `name` is resolved on first evaluation and
/// cached here, together with the id of the resolver that produced it, so
/// later evaluations through the same resolver skip it. A file tree can be
/// shared by publishers with different registries: evaluating the site
/// through another resolver resolves it again and replaces the cache.
/// The cache is never serialized.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallSite {
    pub name: String,
    pub(crate) args: Vec<ExprId>,
    pub line: Line,
    #[serde(skip)]
    resolved: RwLock<Option<Resolution>>,
}

#[derive(Clone, Debug)]
struct Resolution {
    resolver: ResolverId,
    function: FunctionHandle,
}

impl CallSite {
    pub fn new(name: impl Into<String>, args: Vec<ExprId>, line: Line) -> Self {
        CallSite {
            name: name.into(),
            args,
            line,
            resolved: RwLock::new(None),
        }
    }

    #[inline]
    pub fn args(&self) -> &[ExprId] {
        &self.args
    }

    /// The cached resolution made through `resolver`, if any.
    pub fn resolved_by(&self, resolver: ResolverId) -> Option<FunctionHandle> {
        self.resolved
            .read()
            .as_ref()
            .filter(|cached| cached.resolver == resolver)
            .map(|cached| Arc::clone(&cached.function))
    }

    /// Whether any resolver has resolved this site.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved.read().is_some()
    }

    /// Return the function `resolver` resolved this site to, calling
    /// `resolve` when there is no cached resolution from that resolver.
    pub fn resolve_with<F>(&self, resolver: ResolverId, resolve: F) -> FunctionHandle
    where
        F: FnOnce(&str, &[ExprId], Line) -> FunctionHandle,
    {
        if let Some(function) = self.resolved_by(resolver) {
            return function;
        }
        let function = resolve(&self.name, &self.args, self.line);
        *self.resolved.write() = Some(Resolution {
            resolver,
            function: Arc::clone(&function),
        });
        function
    }
}

impl Clone for CallSite {
    fn clone(&self) -> Self {
        CallSite {
            name: self.name.clone(),
            args: self.args.clone(),
            line: self.line,
            resolved: RwLock::new(self.resolved.read().clone()),
        }
    }
}

/// Lambda literal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LambdaDef {
    /// Name used in backtraces; anonymous lambdas have none.
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<StmtId>,
}

/// Statement node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: Line,
}

/// One `if`/`elif` arm.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IfArm {
    pub cond: ExprId,
    pub body: Vec<StmtId>,
}

/// Statement kinds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StmtKind {
    /// Literal template text (HTML).
    Text(String),
    /// `${expr}`: evaluate and write the string form.
    Print(Vec<ExprId>),
    /// Expression evaluated for its side effects.
    Expr(ExprId),
    /// `locals { name: expr, ... }` in the innermost scope.
    Locals(Vec<(String, ExprId)>),
    /// `globals { ... }` in the publish-wide scope.
    Globals(Vec<(String, ExprId)>),
    /// `universals { ... }` in the process-wide root table.
    Universals(Vec<(String, ExprId)>),
    If {
        arms: Vec<IfArm>,
        otherwise: Option<Vec<StmtId>>,
    },
    /// `for (var, iter) { body } empty { ... }`
    For {
        var: String,
        iter: ExprId,
        body: Vec<StmtId>,
        empty: Option<Vec<StmtId>>,
    },
    While {
        cond: ExprId,
        body: Vec<StmtId>,
    },
    /// Publish another file in a fresh scope seeded with `args`.
    Include { file: ExprId, args: Option<ExprId> },
    /// Publish another file in the current scope.
    Load { file: ExprId },
    Break,
    Continue,
    Return(Option<ExprId>),
    /// Nested block; `preserve_ws` turns whitespace stripping off inside it.
    Zone { preserve_ws: bool, body: Vec<StmtId> },
}

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Source-level symbol, used in diagnostics.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}
