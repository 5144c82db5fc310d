//! Exception elimination for statute programs.
//!
//! Default terms and the empty value are rewritten into explicit
//! computations over the synthetic option enum: an empty value becomes
//! `Absent ()`, a computed value `Present v`, and every default becomes an
//! application of the `handle_default_opt` operator. The output is an
//! ordinary program with erased types, ready to be checked again against
//! the translated declarations.

use std::collections::BTreeMap;

use statute_ast::{
    CodeItem, DeclCtx, Expr, ExprKind, Op, Program, ScopeBody, ScopeDef, ScopeLet, ScopeLetKind,
    Span, Topdef, Typ, Typed, absent_cons, option_enum, present_cons,
};
use statute_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
use tracing::{debug, debug_span};

mod expr;
pub mod monad;

pub use expr::{TransCtx, translate_expr};
use monad::{TExpr, error_on_empty, mk};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Shapes the translation does not accept. All of them are internal: the
/// passes upstream never produce them from a well-typed program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LowerError {
    #[error("variable `{var}` is not bound during translation")]
    UnboundVariable { var: String, span: Span },

    #[error("scope `{var}` used outside of a scope call")]
    ScopeOutsideCall { var: String, span: Span },

    #[error("scope `{var}` must be called on a single input record literal")]
    ScopeCallShape { var: String, span: Span },

    #[error("list operator `{op}` is partially applied")]
    PartialApplication { op: Op, span: Span },

    #[error("operator `{op}` cannot be used as a value")]
    UnliftableOperator { op: Op, span: Span },

    #[error("location `{location}` survived to translation")]
    Location { location: String, span: Span },

    #[error("{message}")]
    Malformed { message: String, span: Span },
}

impl LowerError {
    pub fn span(&self) -> Span {
        match self {
            LowerError::UnboundVariable { span, .. }
            | LowerError::ScopeOutsideCall { span, .. }
            | LowerError::ScopeCallShape { span, .. }
            | LowerError::PartialApplication { span, .. }
            | LowerError::UnliftableOperator { span, .. }
            | LowerError::Location { span, .. }
            | LowerError::Malformed { span, .. } => *span,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let span = self.span();
        let diag = Diagnostic::error(Category::Internal, format!("internal error: {self}"))
            .with_help(Category::Internal.example_fix());
        if span.is_synthetic() {
            diag
        } else {
            diag.at(SourceLocation {
                file_id: span.file.0,
                start: span.start,
                end: span.end,
            })
        }
    }
}

impl From<LowerError> for DiagnosticError {
    fn from(err: LowerError) -> Self {
        DiagnosticError::single(err.into_diagnostic())
    }
}

// ---------------------------------------------------------------------------
// Types and declarations
// ---------------------------------------------------------------------------

/// Payload type of a translated value of type `t`.
///
/// Array elements become options, thunks collapse to their result and
/// other functions return options.
pub fn translate_type(t: &Typ) -> Typ {
    match t {
        Typ::Lit(_) | Typ::Struct(_) | Typ::Enum(_) | Typ::Any => t.clone(),
        Typ::Tuple(elems) => Typ::Tuple(elems.iter().map(translate_type).collect()),
        Typ::Option(inner) => Typ::option(translate_type(inner)),
        Typ::Array(elem) => Typ::array(Typ::option(translate_type(elem))),
        Typ::Arrow(_, ret) if t.is_thunk() => translate_type(ret),
        Typ::Arrow(params, ret) => Typ::arrow(
            params.iter().map(translate_type).collect(),
            Typ::option(translate_type(ret)),
        ),
    }
}

/// Struct fields hold options, enum payloads hold plain values, and the
/// option enum itself is declared.
pub fn translate_decls(decls: &DeclCtx) -> DeclCtx {
    let structs = decls
        .structs
        .iter()
        .map(|(name, fields)| {
            let fields = fields
                .iter()
                .map(|(f, t)| (f.clone(), Typ::option(translate_type(t))))
                .collect();
            (name.clone(), fields)
        })
        .collect();
    let mut enums: BTreeMap<_, _> = decls
        .enums
        .iter()
        .map(|(name, cases)| {
            let cases = cases
                .iter()
                .map(|(c, t)| (c.clone(), translate_type(t)))
                .collect();
            (name.clone(), cases)
        })
        .collect();
    enums.insert(
        option_enum(),
        BTreeMap::from([(absent_cons(), Typ::unit()), (present_cons(), Typ::Any)]),
    );
    DeclCtx { structs, enums }
}

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

fn translate_scope_let(
    ctx: &TransCtx,
    lt: &ScopeLet<Typed>,
) -> Result<(TransCtx, ScopeLet<Typed>), LowerError> {
    let (expr, is_pure) = match (lt.kind, &lt.expr.kind) {
        // A forced sub-scope input is handed over as a raw payload.
        (ScopeLetKind::SubScopeVarDefinition, ExprKind::ErrorOnEmpty(inner)) => {
            let inner = translate_expr(ctx, inner)?;
            (error_on_empty(inner, lt.expr.span()), true)
        }
        (ScopeLetKind::SubScopeVarDefinition, ExprKind::Abs { params, tys, body })
            if params.len() == 1 && tys.first() == Some(&Typ::unit()) =>
        {
            (translate_expr(ctx, body)?, false)
        }
        (ScopeLetKind::SubScopeVarDefinition, _) => {
            return Err(LowerError::Malformed {
                message: format!(
                    "sub-scope input `{}` is neither forced nor a thunk",
                    lt.var
                ),
                span: lt.span,
            });
        }
        _ => (translate_expr(ctx, &lt.expr)?, false),
    };
    let (next, var) = ctx.with_var(&lt.var, is_pure, false);
    debug!(var = %var, kind = ?lt.kind, is_pure, "translated scope let");
    Ok((
        next,
        ScopeLet {
            var,
            kind: lt.kind,
            typ: Typ::Any,
            expr,
            span: lt.span,
        },
    ))
}

/// Output records cross the scope boundary with option fields, so the
/// result literal is translated field by field without re-wrapping.
fn translate_scope_result(ctx: &TransCtx, result: &Expr<Typed>) -> Result<TExpr, LowerError> {
    let ExprKind::Struct { name, fields } = &result.kind else {
        return Err(LowerError::Malformed {
            message: "scope result is not a record literal".to_string(),
            span: result.span(),
        });
    };
    let fields = fields
        .iter()
        .map(|(k, f)| Ok((k.clone(), translate_expr(ctx, f)?)))
        .collect::<Result<BTreeMap<_, _>, LowerError>>()?;
    Ok(mk(
        ExprKind::Struct {
            name: name.clone(),
            fields,
        },
        result.span(),
    ))
}

pub fn translate_scope_body(
    ctx: &TransCtx,
    body: &ScopeBody<Typed>,
) -> Result<ScopeBody<Typed>, LowerError> {
    let (mut ctx, input_var) = ctx.with_var(&body.input_var, true, false);
    let mut lets = Vec::with_capacity(body.lets.len());
    for lt in &body.lets {
        let (next, lt) = translate_scope_let(&ctx, lt)?;
        ctx = next;
        lets.push(lt);
    }
    let result = translate_scope_result(&ctx, &body.result)?;
    Ok(ScopeBody {
        input_var,
        input_struct: body.input_struct.clone(),
        output_struct: body.output_struct.clone(),
        lets,
        result,
    })
}

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

/// Translate a checked program. Stops at the first item that fails.
pub fn translate_program(program: &Program<Typed>) -> Result<Program<Typed>, DiagnosticError> {
    let decls = translate_decls(&program.decls);
    let mut ctx = TransCtx::new();
    let mut items = Vec::with_capacity(program.items.len());
    for item in &program.items {
        let _span = debug_span!("translate_item", var = %item.var()).entered();
        let translated = match item {
            CodeItem::Topdef(def) => {
                let expr = translate_expr(&ctx, &def.expr)?;
                let (next, var) = ctx.with_var(&def.var, false, false);
                ctx = next;
                CodeItem::Topdef(Topdef {
                    var,
                    typ: Typ::Any,
                    expr,
                    span: def.span,
                })
            }
            CodeItem::ScopeDef(def) => {
                let body = translate_scope_body(&ctx, &def.body)?;
                let (next, var) = ctx.with_var(&def.var, true, true);
                ctx = next;
                CodeItem::ScopeDef(ScopeDef {
                    name: def.name.clone(),
                    var,
                    body,
                    span: def.span,
                })
            }
        };
        debug!(size = item_size(&translated), "translated item");
        items.push(translated);
    }
    Ok(Program { decls, items })
}

fn item_size(item: &CodeItem<Typed>) -> usize {
    match item {
        CodeItem::Topdef(def) => def.expr.size(),
        CodeItem::ScopeDef(def) => {
            def.body.lets.iter().map(|l| l.expr.size()).sum::<usize>() + def.body.result.size()
        }
    }
}
