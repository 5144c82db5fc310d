//! Expression trees and source spans for statute programs.
//!
//! Trees are generic over their mark: [`Untyped`] trees come out of the
//! desugaring passes, [`Typed`] trees come out of the type checker and the
//! exception-elimination translator. Every node carries its mark, so every
//! node carries a [`Span`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

pub use statute_types::{
    ABSENT, EnumConstructor, EnumName, LitTyp, OPTION_ENUM, PRESENT, ScopeName, ScopeVar,
    StructField, StructName, SubScopeName, Typ, absent_cons, option_enum, present_cons,
};

/// Identifies a source file in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// A synthetic span for compiler-generated nodes.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.file == FileId(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Global counter for variable identities.
///
/// Every binder instance gets its own identity, including the binders the
/// translator synthesizes, so two passes over the same program never produce
/// colliding variables.
static NEXT_VAR: AtomicU32 = AtomicU32::new(0);

/// A term variable. Equality is by identity; the name is for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    id: u32,
    name: String,
}

impl Var {
    pub fn fresh(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_VAR.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    /// A new variable with the same display name.
    pub fn refresh(&self) -> Self {
        Self::fresh(self.name.clone())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.id)
    }
}

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Bool(bool),
    Int(i64),
    /// Exact ratio `num / den` in lowest terms, `den > 0`.
    Rat { num: i64, den: i64 },
    /// Amount in cents.
    Money(i64),
    Date(chrono::NaiveDate),
    Duration { years: i32, months: i32, days: i32 },
    Unit,
}

impl Lit {
    /// Decimal literal `num / den`, reduced. `None` for a zero denominator
    /// or a reduced ratio that does not fit.
    pub fn rat(num: i64, den: i64) -> Option<Lit> {
        if den == 0 {
            return None;
        }
        let g = i128::from(gcd(num.unsigned_abs(), den.unsigned_abs()));
        let sign = if den < 0 { -1 } else { 1 };
        let num = i64::try_from(sign * i128::from(num) / g).ok()?;
        let den = i64::try_from(i128::from(den).abs() / g).ok()?;
        Some(Lit::Rat { num, den })
    }

    pub fn typ(&self) -> LitTyp {
        match self {
            Lit::Bool(_) => LitTyp::Bool,
            Lit::Int(_) => LitTyp::Int,
            Lit::Rat { .. } => LitTyp::Rat,
            Lit::Money(_) => LitTyp::Money,
            Lit::Date(_) => LitTyp::Date,
            Lit::Duration { .. } => LitTyp::Duration,
            Lit::Unit => LitTyp::Unit,
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

// ---------------------------------------------------------------------------
// Exceptions and operators
// ---------------------------------------------------------------------------

/// Exceptions that can be raised or caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Except {
    /// No applicable definition. Eliminated by the translator.
    Empty,
    /// A required value was empty.
    NoValueProvided,
    /// More than one justified alternative applied.
    Conflict,
    AssertionFailed,
}

impl fmt::Display for Except {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Except::Empty => write!(f, "EmptyError"),
            Except::NoValueProvided => write!(f, "NoValueProvided"),
            Except::Conflict => write!(f, "ConflictError"),
            Except::AssertionFailed => write!(f, "AssertionFailed"),
        }
    }
}

/// Operand kind selecting a monomorphic instance of an arithmetic or
/// comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Int,
    Rat,
    Money,
    Date,
    Duration,
}

impl OpKind {
    pub fn lit_typ(self) -> LitTyp {
        match self {
            OpKind::Int => LitTyp::Int,
            OpKind::Rat => LitTyp::Rat,
            OpKind::Money => LitTyp::Money,
            OpKind::Date => LitTyp::Date,
            OpKind::Duration => LitTyp::Duration,
        }
    }
}

/// What a `Log` operator records when it is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEntry {
    VarDef,
    BeginCall,
    EndCall,
    PosRecordIfTrue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // -- Unary --
    Not,
    Minus(OpKind),
    IntToRat,
    MoneyToRat,
    RatToMoney,
    RoundRat,
    RoundMoney,
    GetDay,
    GetMonth,
    GetYear,
    FirstDayOfMonth,
    LastDayOfMonth,
    Length,
    Log(LogEntry),

    // -- Binary --
    And,
    Or,
    Xor,
    Add(OpKind),
    Sub(OpKind),
    Mult(OpKind),
    Div(OpKind),
    Lt(OpKind),
    Lte(OpKind),
    Gt(OpKind),
    Gte(OpKind),
    Eq,
    Neq,
    Concat,

    // -- Higher order over arrays --
    Map,
    Filter,
    Fold,
    Reduce,

    /// Default-logic resolution over option values. Only produced by the
    /// exception-elimination translator.
    HandleDefaultOptional,
}

impl Op {
    /// Number of arguments the operator takes.
    pub fn arity(self) -> usize {
        match self {
            Op::Not
            | Op::Minus(_)
            | Op::IntToRat
            | Op::MoneyToRat
            | Op::RatToMoney
            | Op::RoundRat
            | Op::RoundMoney
            | Op::GetDay
            | Op::GetMonth
            | Op::GetYear
            | Op::FirstDayOfMonth
            | Op::LastDayOfMonth
            | Op::Length
            | Op::Log(_) => 1,
            Op::And
            | Op::Or
            | Op::Xor
            | Op::Add(_)
            | Op::Sub(_)
            | Op::Mult(_)
            | Op::Div(_)
            | Op::Lt(_)
            | Op::Lte(_)
            | Op::Gt(_)
            | Op::Gte(_)
            | Op::Eq
            | Op::Neq
            | Op::Concat
            | Op::Map
            | Op::Filter => 2,
            Op::Fold | Op::Reduce | Op::HandleDefaultOptional => 3,
        }
    }

    /// Operators taking a function argument applied to array elements.
    pub fn is_higher_order(self) -> bool {
        matches!(self, Op::Map | Op::Filter | Op::Fold | Op::Reduce)
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Not => "not",
            Op::Minus(_) => "-",
            Op::IntToRat => "integer_to_decimal",
            Op::MoneyToRat => "money_to_decimal",
            Op::RatToMoney => "decimal_to_money",
            Op::RoundRat => "round_decimal",
            Op::RoundMoney => "round_money",
            Op::GetDay => "get_day",
            Op::GetMonth => "get_month",
            Op::GetYear => "get_year",
            Op::FirstDayOfMonth => "first_day_of_month",
            Op::LastDayOfMonth => "last_day_of_month",
            Op::Length => "length",
            Op::Log(_) => "log",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Add(_) => "+",
            Op::Sub(_) => "-",
            Op::Mult(_) => "*",
            Op::Div(_) => "/",
            Op::Lt(_) => "<",
            Op::Lte(_) => "<=",
            Op::Gt(_) => ">",
            Op::Gte(_) => ">=",
            Op::Eq => "=",
            Op::Neq => "!=",
            Op::Concat => "++",
            Op::Map => "map",
            Op::Filter => "filter",
            Op::Fold => "fold",
            Op::Reduce => "reduce",
            Op::HandleDefaultOptional => "handle_default_optional",
        }
    }

    pub fn kind(self) -> Option<OpKind> {
        match self {
            Op::Minus(k)
            | Op::Add(k)
            | Op::Sub(k)
            | Op::Mult(k)
            | Op::Div(k)
            | Op::Lt(k)
            | Op::Lte(k)
            | Op::Gt(k)
            | Op::Gte(k) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}[{}]", self.name(), kind.lit_typ()),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// A reference to a scope-level variable, resolved through the environment
/// rather than through a binder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    ScopeVar(ScopeVar),
    /// `alias.var` where `alias` invokes scope `scope`.
    SubScopeVar {
        scope: ScopeName,
        alias: SubScopeName,
        var: ScopeVar,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::ScopeVar(var) => write!(f, "{var}"),
            Location::SubScopeVar { alias, var, .. } => write!(f, "{alias}.{var}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Marks
// ---------------------------------------------------------------------------

/// Annotation attached to every node.
pub trait Mark: Clone + fmt::Debug {
    fn span(&self) -> Span;

    /// Type recorded by an earlier pass, if any.
    fn annotation(&self) -> Option<&Typ>;
}

/// Position only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Untyped {
    pub span: Span,
}

/// Position and resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typed {
    pub span: Span,
    pub ty: Typ,
}

impl Typed {
    pub fn new(span: Span, ty: Typ) -> Self {
        Self { span, ty }
    }

    /// A mark whose type is left for re-inference.
    pub fn erased(span: Span) -> Self {
        Self { span, ty: Typ::Any }
    }
}

impl Mark for Untyped {
    fn span(&self) -> Span {
        self.span
    }

    fn annotation(&self) -> Option<&Typ> {
        None
    }
}

impl Mark for Typed {
    fn span(&self) -> Span {
        self.span
    }

    fn annotation(&self) -> Option<&Typ> {
        Some(&self.ty)
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Expr<M> {
    pub kind: ExprKind<M>,
    pub mark: M,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<M> {
    Var(Var),
    Lit(Lit),
    Tuple(Vec<Expr<M>>),
    TupleAccess {
        expr: Box<Expr<M>>,
        index: usize,
        size: usize,
    },
    Struct {
        name: StructName,
        fields: BTreeMap<StructField, Expr<M>>,
    },
    StructAccess {
        expr: Box<Expr<M>>,
        name: StructName,
        field: StructField,
    },
    Inj {
        name: EnumName,
        cons: EnumConstructor,
        expr: Box<Expr<M>>,
    },
    /// Each case is a one-parameter abstraction receiving the payload.
    Match {
        expr: Box<Expr<M>>,
        name: EnumName,
        cases: BTreeMap<EnumConstructor, Expr<M>>,
    },
    Op(Op),
    App {
        func: Box<Expr<M>>,
        args: Vec<Expr<M>>,
    },
    Abs {
        params: Vec<Var>,
        tys: Vec<Typ>,
        body: Box<Expr<M>>,
    },
    /// `{ excepts | just :- cons }`.
    Default {
        excepts: Vec<Expr<M>>,
        just: Box<Expr<M>>,
        cons: Box<Expr<M>>,
    },
    Raise(Except),
    Catch {
        body: Box<Expr<M>>,
        exn: Except,
        handler: Box<Expr<M>>,
    },
    ErrorOnEmpty(Box<Expr<M>>),
    Array(Vec<Expr<M>>),
    IfThenElse {
        cond: Box<Expr<M>>,
        then_branch: Box<Expr<M>>,
        else_branch: Box<Expr<M>>,
    },
    Assert(Box<Expr<M>>),
    Location(Location),
}

impl<M: Mark> Expr<M> {
    pub fn new(kind: ExprKind<M>, mark: M) -> Self {
        Self { kind, mark }
    }

    pub fn span(&self) -> Span {
        self.mark.span()
    }
}

impl Expr<Typed> {
    pub fn typ(&self) -> &Typ {
        &self.mark.ty
    }
}

impl<M> Expr<M> {
    /// Rebuild the tree with every mark replaced, bottom-up.
    pub fn map_marks<N, E>(self, f: &mut impl FnMut(M) -> Result<N, E>) -> Result<Expr<N>, E> {
        let kind = match self.kind {
            ExprKind::Var(v) => ExprKind::Var(v),
            ExprKind::Lit(l) => ExprKind::Lit(l),
            ExprKind::Tuple(elems) => ExprKind::Tuple(map_all(elems, f)?),
            ExprKind::TupleAccess { expr, index, size } => ExprKind::TupleAccess {
                expr: Box::new(expr.map_marks(f)?),
                index,
                size,
            },
            ExprKind::Struct { name, fields } => ExprKind::Struct {
                name,
                fields: fields
                    .into_iter()
                    .map(|(field, e)| Ok((field, e.map_marks(f)?)))
                    .collect::<Result<_, E>>()?,
            },
            ExprKind::StructAccess { expr, name, field } => ExprKind::StructAccess {
                expr: Box::new(expr.map_marks(f)?),
                name,
                field,
            },
            ExprKind::Inj { name, cons, expr } => ExprKind::Inj {
                name,
                cons,
                expr: Box::new(expr.map_marks(f)?),
            },
            ExprKind::Match { expr, name, cases } => ExprKind::Match {
                expr: Box::new(expr.map_marks(f)?),
                name,
                cases: cases
                    .into_iter()
                    .map(|(cons, e)| Ok((cons, e.map_marks(f)?)))
                    .collect::<Result<_, E>>()?,
            },
            ExprKind::Op(op) => ExprKind::Op(op),
            ExprKind::App { func, args } => ExprKind::App {
                func: Box::new(func.map_marks(f)?),
                args: map_all(args, f)?,
            },
            ExprKind::Abs { params, tys, body } => ExprKind::Abs {
                params,
                tys,
                body: Box::new(body.map_marks(f)?),
            },
            ExprKind::Default {
                excepts,
                just,
                cons,
            } => ExprKind::Default {
                excepts: map_all(excepts, f)?,
                just: Box::new(just.map_marks(f)?),
                cons: Box::new(cons.map_marks(f)?),
            },
            ExprKind::Raise(exn) => ExprKind::Raise(exn),
            ExprKind::Catch { body, exn, handler } => ExprKind::Catch {
                body: Box::new(body.map_marks(f)?),
                exn,
                handler: Box::new(handler.map_marks(f)?),
            },
            ExprKind::ErrorOnEmpty(e) => ExprKind::ErrorOnEmpty(Box::new(e.map_marks(f)?)),
            ExprKind::Array(elems) => ExprKind::Array(map_all(elems, f)?),
            ExprKind::IfThenElse {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::IfThenElse {
                cond: Box::new(cond.map_marks(f)?),
                then_branch: Box::new(then_branch.map_marks(f)?),
                else_branch: Box::new(else_branch.map_marks(f)?),
            },
            ExprKind::Assert(e) => ExprKind::Assert(Box::new(e.map_marks(f)?)),
            ExprKind::Location(loc) => ExprKind::Location(loc),
        };
        Ok(Expr {
            kind,
            mark: f(self.mark)?,
        })
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().into_iter().map(Expr::size).sum::<usize>()
    }

    /// Direct subexpressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expr<M>> {
        match &self.kind {
            ExprKind::Var(_)
            | ExprKind::Lit(_)
            | ExprKind::Op(_)
            | ExprKind::Raise(_)
            | ExprKind::Location(_) => vec![],
            ExprKind::Tuple(elems) | ExprKind::Array(elems) => elems.iter().collect(),
            ExprKind::TupleAccess { expr, .. }
            | ExprKind::StructAccess { expr, .. }
            | ExprKind::Inj { expr, .. }
            | ExprKind::ErrorOnEmpty(expr)
            | ExprKind::Assert(expr) => vec![&**expr],
            ExprKind::Struct { fields, .. } => fields.values().collect(),
            ExprKind::Match { expr, cases, .. } => {
                std::iter::once(&**expr).chain(cases.values()).collect()
            }
            ExprKind::App { func, args } => std::iter::once(&**func).chain(args).collect(),
            ExprKind::Abs { body, .. } => vec![&**body],
            ExprKind::Default {
                excepts,
                just,
                cons,
            } => excepts.iter().chain([&**just, &**cons]).collect(),
            ExprKind::Catch { body, handler, .. } => vec![&**body, &**handler],
            ExprKind::IfThenElse {
                cond,
                then_branch,
                else_branch,
            } => vec![&**cond, &**then_branch, &**else_branch],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Expr<M>> {
        match &mut self.kind {
            ExprKind::Var(_)
            | ExprKind::Lit(_)
            | ExprKind::Op(_)
            | ExprKind::Raise(_)
            | ExprKind::Location(_) => vec![],
            ExprKind::Tuple(elems) | ExprKind::Array(elems) => elems.iter_mut().collect(),
            ExprKind::TupleAccess { expr, .. }
            | ExprKind::StructAccess { expr, .. }
            | ExprKind::Inj { expr, .. }
            | ExprKind::ErrorOnEmpty(expr)
            | ExprKind::Assert(expr) => vec![&mut **expr],
            ExprKind::Struct { fields, .. } => fields.values_mut().collect(),
            ExprKind::Match { expr, cases, .. } => std::iter::once(&mut **expr)
                .chain(cases.values_mut())
                .collect(),
            ExprKind::App { func, args } => {
                std::iter::once(&mut **func).chain(args.iter_mut()).collect()
            }
            ExprKind::Abs { body, .. } => vec![&mut **body],
            ExprKind::Default {
                excepts,
                just,
                cons,
            } => excepts
                .iter_mut()
                .chain([&mut **just, &mut **cons])
                .collect(),
            ExprKind::Catch { body, handler, .. } => vec![&mut **body, &mut **handler],
            ExprKind::IfThenElse {
                cond,
                then_branch,
                else_branch,
            } => vec![&mut **cond, &mut **then_branch, &mut **else_branch],
        }
    }
}

fn map_all<M, N, E>(
    exprs: Vec<Expr<M>>,
    f: &mut impl FnMut(M) -> Result<N, E>,
) -> Result<Vec<Expr<N>>, E> {
    exprs.into_iter().map(|e| e.map_marks(f)).collect()
}

// ---------------------------------------------------------------------------
// Declarations and programs
// ---------------------------------------------------------------------------

/// Declared struct and enum layouts.
///
/// Field and case sets are assumed validated by the pass that built them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclCtx {
    pub structs: BTreeMap<StructName, BTreeMap<StructField, Typ>>,
    pub enums: BTreeMap<EnumName, BTreeMap<EnumConstructor, Typ>>,
}

impl DeclCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_struct(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'static str, Typ)>,
    ) -> Self {
        self.structs.insert(
            StructName::new(name),
            fields
                .into_iter()
                .map(|(field, ty)| (StructField::new(field), ty))
                .collect(),
        );
        self
    }

    pub fn with_enum(
        mut self,
        name: impl Into<String>,
        cases: impl IntoIterator<Item = (&'static str, Typ)>,
    ) -> Self {
        self.enums.insert(
            EnumName::new(name),
            cases
                .into_iter()
                .map(|(cons, ty)| (EnumConstructor::new(cons), ty))
                .collect(),
        );
        self
    }

    pub fn struct_fields(&self, name: &StructName) -> Option<&BTreeMap<StructField, Typ>> {
        self.structs.get(name)
    }

    pub fn field_type(&self, name: &StructName, field: &StructField) -> Option<&Typ> {
        self.structs.get(name).and_then(|fields| fields.get(field))
    }

    pub fn enum_cases(&self, name: &EnumName) -> Option<&BTreeMap<EnumConstructor, Typ>> {
        self.enums.get(name)
    }
}

/// Role of a local definition inside a scope body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeLetKind {
    /// `let x = input.field`.
    DestructuringInputStruct,
    /// A variable of the scope itself.
    ScopeVarDefinition,
    /// An input handed to a sub-scope before calling it.
    SubScopeVarDefinition,
    /// The call of a sub-scope on its input record.
    CallingSubScope,
    /// `let y = result.field` after a sub-scope call.
    DestructuringSubScopeResults,
    Assertion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeLet<M> {
    pub var: Var,
    pub kind: ScopeLetKind,
    pub typ: Typ,
    pub expr: Expr<M>,
    pub span: Span,
}

/// A scope compiled to a function from its input record to its output
/// record, through an ordered list of local definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeBody<M> {
    pub input_var: Var,
    pub input_struct: StructName,
    pub output_struct: StructName,
    pub lets: Vec<ScopeLet<M>>,
    /// Record literal of type `output_struct`.
    pub result: Expr<M>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topdef<M> {
    pub var: Var,
    pub typ: Typ,
    pub expr: Expr<M>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeDef<M> {
    pub name: ScopeName,
    pub var: Var,
    pub body: ScopeBody<M>,
    pub span: Span,
}

impl<M> ScopeDef<M> {
    /// `input_struct -> output_struct`.
    pub fn typ(&self) -> Typ {
        Typ::arrow(
            vec![Typ::Struct(self.body.input_struct.clone())],
            Typ::Struct(self.body.output_struct.clone()),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CodeItem<M> {
    Topdef(Topdef<M>),
    ScopeDef(ScopeDef<M>),
}

impl<M> CodeItem<M> {
    pub fn var(&self) -> &Var {
        match self {
            CodeItem::Topdef(def) => &def.var,
            CodeItem::ScopeDef(def) => &def.var,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CodeItem::Topdef(def) => def.span,
            CodeItem::ScopeDef(def) => def.span,
        }
    }
}

/// Top-level items in dependency order, plus the declarations they use.
#[derive(Debug, Clone, PartialEq)]
pub struct Program<M> {
    pub decls: DeclCtx,
    pub items: Vec<CodeItem<M>>,
}
