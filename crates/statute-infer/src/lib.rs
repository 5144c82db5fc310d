//! Bidirectional type checking for statute programs.
//!
//! This crate implements:
//! - a union-find type store ([`TypeStore`]) built on `ena`, whose classes
//!   hold a structural type and the position it came from
//! - the monomorphic operator signature table ([`ops`])
//! - synthesis and checking over expression trees, and per-program
//!   checking that threads one [`typeck::TypeEnv`] through every item
//!
//! A store lives for the checking of one top-level item. Nothing outside
//! this crate ever sees a [`TyVar`]: results are resolved back into
//! [`Typ`] before they leave.

pub mod ops;
pub mod trace;
pub mod typeck;

use std::fmt;

use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use statute_ast::{EnumName, LitTyp, Op, Span, StructName, Typ};
use trace::{UnifyAction, UnifyStep};

pub use statute_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
pub use typeck::{CheckedProgram, TypeEnv, check_expr, check_program, synthesize_expr};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Record every unification step (see [`trace::UnifyStep`]).
    pub trace_unification: bool,
}

// ---------------------------------------------------------------------------
// Store cells
// ---------------------------------------------------------------------------

/// Handle to a class in a [`TypeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(u32);

impl UnifyKey for TyVar {
    type Value = TyCell;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> TyVar {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

/// One level of type structure; children are classes of the same store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NakedTyp {
    Lit(LitTyp),
    Arrow(Vec<TyVar>, TyVar),
    Tuple(Vec<TyVar>),
    Struct(StructName),
    Enum(EnumName),
    Option(TyVar),
    Array(TyVar),
    /// Metavariable. Its identity is the class it lives in.
    Any,
}

impl NakedTyp {
    pub fn is_any(&self) -> bool {
        matches!(self, NakedTyp::Any)
    }
}

/// Value of a class: the best known type and where it was introduced.
/// The position never takes part in unification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TyCell {
    pub typ: NakedTyp,
    pub pos: Span,
}

impl UnifyValue for TyCell {
    type Error = NoError;

    /// A metavariable gives way to the other side; between two concrete
    /// cells the second one wins.
    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        if b.typ.is_any() && !a.typ.is_any() {
            Ok(a.clone())
        } else {
            Ok(b.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One side of a failed unification, resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    pub ty: Typ,
    /// Where the side's class was introduced.
    pub pos: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub expected: Side,
    pub actual: Side,
    /// The expression being checked when unification failed.
    pub span: Span,
    /// Failed on the occurs check rather than on a shape clash.
    pub infinite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Variable,
    ScopeVariable,
    SubScopeVariable,
    Scope,
    Struct,
    Field,
    Enum,
    Constructor,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameKind::Variable => "variable",
            NameKind::ScopeVariable => "scope variable",
            NameKind::SubScopeVariable => "sub-scope variable",
            NameKind::Scope => "scope",
            NameKind::Struct => "struct",
            NameKind::Field => "field",
            NameKind::Enum => "enum",
            NameKind::Constructor => "constructor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckError {
    #[error("{}", mismatch_message(.0))]
    Mismatch(Box<Mismatch>),

    #[error("unknown {kind} `{name}`")]
    Unresolved {
        kind: NameKind,
        name: String,
        span: Span,
    },

    #[error("{what}: expected {expected}, found {got}")]
    Arity {
        what: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("operator `{op}` is not available")]
    UnsupportedOperator { op: Op, span: Span },

    #[error("internal error: {message}")]
    Internal { message: String, span: Span },
}

fn mismatch_message(m: &Mismatch) -> String {
    if m.infinite {
        format!(
            "cannot construct the infinite type {} = {}",
            m.expected.ty, m.actual.ty
        )
    } else {
        format!(
            "type mismatch: expected {}, found {}",
            m.expected.ty, m.actual.ty
        )
    }
}

impl CheckError {
    pub fn span(&self) -> Span {
        match self {
            CheckError::Mismatch(m) => m.span,
            CheckError::Unresolved { span, .. }
            | CheckError::Arity { span, .. }
            | CheckError::UnsupportedOperator { span, .. }
            | CheckError::Internal { span, .. } => *span,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CheckError::Mismatch(_) => Category::TypeMismatch,
            CheckError::Unresolved { .. } => Category::UndefinedName,
            CheckError::Arity { .. } => Category::ArityMismatch,
            CheckError::UnsupportedOperator { .. } => Category::UnsupportedOperator,
            CheckError::Internal { .. } => Category::Internal,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let diag =
            Diagnostic::error(self.category(), self.to_string()).at(span_to_location(self.span()));
        match self {
            CheckError::Mismatch(m) => {
                let mut diag = diag;
                if !m.expected.pos.is_synthetic() {
                    diag = diag.with_label(
                        span_to_location(m.expected.pos),
                        format!("{} expected because of this", m.expected.ty),
                    );
                }
                if !m.actual.pos.is_synthetic() {
                    diag = diag.with_label(
                        span_to_location(m.actual.pos),
                        format!("{} comes from here", m.actual.ty),
                    );
                }
                diag
            }
            CheckError::UnsupportedOperator { op, .. } => match op {
                Op::Mult(_) | Op::Div(_) | Op::Minus(_) => diag
                    .with_help("dates support addition of a duration and subtraction of a date"),
                _ => diag,
            },
            CheckError::Unresolved { .. } | CheckError::Arity { .. } => diag,
            CheckError::Internal { .. } => diag.with_help(Category::Internal.example_fix()),
        }
    }
}

// ---------------------------------------------------------------------------
// Type store
// ---------------------------------------------------------------------------

/// Why an inner unification step failed.
#[derive(Debug, Clone, Copy)]
enum Clash {
    Shape,
    Occurs,
}

/// Union-find store of type classes for the checking of one item.
pub struct TypeStore {
    table: InPlaceUnificationTable<TyVar>,
    tracing: bool,
    unify_trace: Vec<UnifyStep>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self {
            table: InPlaceUnificationTable::new(),
            tracing: false,
            unify_trace: Vec::new(),
        }
    }

    pub fn with_options(options: &CheckOptions) -> Self {
        let mut store = Self::new();
        store.tracing = options.trace_unification;
        store
    }

    /// Allocate a new class.
    pub fn make(&mut self, typ: NakedTyp, pos: Span) -> TyVar {
        self.table.new_key(TyCell { typ, pos })
    }

    /// A fresh metavariable.
    pub fn any(&mut self, pos: Span) -> TyVar {
        self.make(NakedTyp::Any, pos)
    }

    pub fn lit(&mut self, lit: LitTyp, pos: Span) -> TyVar {
        self.make(NakedTyp::Lit(lit), pos)
    }

    pub fn arrow(&mut self, params: Vec<TyVar>, ret: TyVar, pos: Span) -> TyVar {
        self.make(NakedTyp::Arrow(params, ret), pos)
    }

    /// Canonical representative of the class.
    pub fn find(&mut self, v: TyVar) -> TyVar {
        self.table.find(v)
    }

    /// Current value of the class.
    pub fn get(&mut self, v: TyVar) -> TyCell {
        self.table.probe_value(v)
    }

    pub fn unify_trace(&self) -> &[UnifyStep] {
        &self.unify_trace
    }

    pub fn take_trace(&mut self) -> Vec<UnifyStep> {
        std::mem::take(&mut self.unify_trace)
    }

    /// Unify two classes while checking the expression at `at`.
    ///
    /// A failed unification leaves the store as it was before the call,
    /// so both sides are reported as they stood when the constraint was
    /// introduced.
    pub fn unify(&mut self, expected: TyVar, actual: TyVar, at: Span) -> Result<(), CheckError> {
        let snapshot = self.table.snapshot();
        match self.unify_classes(expected, actual) {
            Ok(()) => {
                self.table.commit(snapshot);
                Ok(())
            }
            Err(clash) => {
                self.table.rollback_to(snapshot);
                let expected_pos = self.get(expected).pos;
                let actual_pos = self.get(actual).pos;
                Err(CheckError::Mismatch(Box::new(Mismatch {
                    expected: Side {
                        ty: self.typ_to_ast(expected),
                        pos: expected_pos,
                    },
                    actual: Side {
                        ty: self.typ_to_ast(actual),
                        pos: actual_pos,
                    },
                    span: at,
                    infinite: matches!(clash, Clash::Occurs),
                })))
            }
        }
    }

    fn unify_classes(&mut self, a: TyVar, b: TyVar) -> Result<(), Clash> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            self.push_step(UnifyAction::Identity, ra, rb, String::new());
            return Ok(());
        }
        let ta = self.get(ra).typ;
        let tb = self.get(rb).typ;
        match (&ta, &tb) {
            (NakedTyp::Any, NakedTyp::Any) => {}
            (NakedTyp::Any, _) => self.absorb(ra, rb)?,
            (_, NakedTyp::Any) => self.absorb(rb, ra)?,
            (NakedTyp::Lit(x), NakedTyp::Lit(y)) if x == y => {}
            (NakedTyp::Arrow(pa, ra_ret), NakedTyp::Arrow(pb, rb_ret)) if pa.len() == pb.len() => {
                self.push_step(UnifyAction::Decompose, ra, rb, "arrow".to_string());
                self.unify_classes(*ra_ret, *rb_ret)?;
                for (x, y) in pa.iter().zip(pb) {
                    self.unify_classes(*x, *y)?;
                }
            }
            (NakedTyp::Tuple(xs), NakedTyp::Tuple(ys)) if xs.len() == ys.len() => {
                self.push_step(UnifyAction::Decompose, ra, rb, "tuple".to_string());
                for (x, y) in xs.iter().zip(ys) {
                    self.unify_classes(*x, *y)?;
                }
            }
            (NakedTyp::Struct(x), NakedTyp::Struct(y)) if x == y => {}
            (NakedTyp::Enum(x), NakedTyp::Enum(y)) if x == y => {}
            (NakedTyp::Option(x), NakedTyp::Option(y))
            | (NakedTyp::Array(x), NakedTyp::Array(y)) => {
                self.push_step(UnifyAction::Decompose, ra, rb, String::new());
                self.unify_classes(*x, *y)?;
            }
            _ => {
                self.push_step(UnifyAction::Error, ra, rb, String::new());
                return Err(Clash::Shape);
            }
        }
        self.table.union(ra, rb);
        Ok(())
    }

    /// Bind the metavariable class `meta` to the structure in `other`.
    fn absorb(&mut self, meta: TyVar, other: TyVar) -> Result<(), Clash> {
        if self.occurs(meta, other) {
            self.push_step(UnifyAction::OccursCheck, meta, other, String::new());
            return Err(Clash::Occurs);
        }
        self.push_step(UnifyAction::Absorb, meta, other, String::new());
        Ok(())
    }

    fn occurs(&mut self, meta: TyVar, v: TyVar) -> bool {
        let root = self.find(v);
        if root == meta {
            return true;
        }
        match self.get(root).typ {
            NakedTyp::Lit(_) | NakedTyp::Struct(_) | NakedTyp::Enum(_) | NakedTyp::Any => false,
            NakedTyp::Arrow(params, ret) => {
                self.occurs(meta, ret) || params.into_iter().any(|p| self.occurs(meta, p))
            }
            NakedTyp::Tuple(elems) => elems.into_iter().any(|e| self.occurs(meta, e)),
            NakedTyp::Option(inner) | NakedTyp::Array(inner) => self.occurs(meta, inner),
        }
    }

    fn push_step(&mut self, action: UnifyAction, left: TyVar, right: TyVar, detail: String) {
        if !self.tracing {
            return;
        }
        let left = self.typ_to_ast(left).to_string();
        let right = self.typ_to_ast(right).to_string();
        tracing::trace!(?action, %left, %right, "unify");
        let step = self.unify_trace.len() + 1;
        self.unify_trace.push(UnifyStep {
            step,
            action,
            left,
            right,
            detail,
        });
    }

    // -----------------------------------------------------------------------
    // Conversion from and to resolved types
    // -----------------------------------------------------------------------

    /// Resolve a class into a [`Typ`]. Unconstrained metavariables become
    /// [`Typ::Any`].
    pub fn typ_to_ast(&mut self, v: TyVar) -> Typ {
        match self.get(v).typ {
            NakedTyp::Lit(lit) => Typ::Lit(lit),
            NakedTyp::Arrow(params, ret) => {
                let params = params.into_iter().map(|p| self.typ_to_ast(p)).collect();
                Typ::arrow(params, self.typ_to_ast(ret))
            }
            NakedTyp::Tuple(elems) => {
                Typ::Tuple(elems.into_iter().map(|e| self.typ_to_ast(e)).collect())
            }
            NakedTyp::Struct(name) => Typ::Struct(name),
            NakedTyp::Enum(name) => Typ::Enum(name),
            NakedTyp::Option(inner) => Typ::option(self.typ_to_ast(inner)),
            NakedTyp::Array(elem) => Typ::array(self.typ_to_ast(elem)),
            NakedTyp::Any => Typ::Any,
        }
    }

    /// Allocate classes for a resolved type. Every `Any` becomes a distinct
    /// fresh metavariable.
    pub fn ast_to_typ(&mut self, ty: &Typ, pos: Span) -> TyVar {
        let naked = match ty {
            Typ::Lit(lit) => NakedTyp::Lit(*lit),
            Typ::Arrow(params, ret) => {
                let params = params.iter().map(|p| self.ast_to_typ(p, pos)).collect();
                NakedTyp::Arrow(params, self.ast_to_typ(ret, pos))
            }
            Typ::Tuple(elems) => {
                NakedTyp::Tuple(elems.iter().map(|e| self.ast_to_typ(e, pos)).collect())
            }
            Typ::Struct(name) => NakedTyp::Struct(name.clone()),
            Typ::Enum(name) => NakedTyp::Enum(name.clone()),
            Typ::Option(inner) => NakedTyp::Option(self.ast_to_typ(inner, pos)),
            Typ::Array(elem) => NakedTyp::Array(self.ast_to_typ(elem, pos)),
            Typ::Any => NakedTyp::Any,
        };
        self.make(naked, pos)
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}
