//! Expression translation.
//!
//! A translated expression of source type `T` has type
//! `option<translate_type(T)>`, with two exceptions: the body of a stripped
//! thunk and the raw payload bound to a pure variable.

use std::collections::BTreeMap;

use imbl::OrdMap;
use statute_ast::{Except, Expr, ExprKind, Lit, Op, Span, Typ, Typed, Var};

use crate::monad::{
    TExpr, abs, app, bind_cont, empty, error_on_empty, mbind_cont, mk, mmap, ret, thunk, var,
};
use crate::{LowerError, translate_type};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct VarInfo {
    /// Bound to a raw payload rather than an option.
    pub is_pure: bool,
    /// Bound to a top-level scope function.
    pub is_scope: bool,
    pub var: Var,
}

/// Source variable to target variable, with how the target is bound.
///
/// Extension shares structure with the parent context, so sibling branches
/// never see each other's binders.
#[derive(Debug, Clone, Default)]
pub struct TransCtx {
    vars: OrdMap<Var, VarInfo>,
}

impl TransCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `source` to a fresh target variable.
    pub fn with_var(&self, source: &Var, is_pure: bool, is_scope: bool) -> (Self, Var) {
        let target = source.refresh();
        let info = VarInfo {
            is_pure,
            is_scope,
            var: target.clone(),
        };
        let next = Self {
            vars: self.vars.update(source.clone(), info),
        };
        (next, target)
    }

    pub(crate) fn get(&self, source: &Var) -> Option<&VarInfo> {
        self.vars.get(source)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn lookup<'a>(ctx: &'a TransCtx, v: &Var, span: Span) -> Result<&'a VarInfo, LowerError> {
    ctx.get(v).ok_or_else(|| LowerError::UnboundVariable {
        var: v.to_string(),
        span,
    })
}

fn is_thunk_abs(e: &Expr<Typed>) -> bool {
    matches!(&e.kind, ExprKind::Abs { params, tys, .. }
        if params.len() == 1 && tys.first() == Some(&Typ::unit()))
}

fn is_unit_lit(e: &Expr<Typed>) -> bool {
    matches!(e.kind, ExprKind::Lit(Lit::Unit))
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Translate one expression under `ctx`.
pub fn translate_expr(ctx: &TransCtx, e: &Expr<Typed>) -> Result<TExpr, LowerError> {
    let pos = e.span();
    match &e.kind {
        ExprKind::Var(v) => {
            let info = lookup(ctx, v, pos)?;
            if info.is_scope {
                return Err(LowerError::ScopeOutsideCall {
                    var: v.to_string(),
                    span: pos,
                });
            }
            let target = var(&info.var, pos);
            Ok(if info.is_pure { ret(target, pos) } else { target })
        }

        ExprKind::Lit(lit) => Ok(ret(mk(ExprKind::Lit(lit.clone()), pos), pos)),

        ExprKind::Raise(Except::Empty) => Ok(empty(pos)),
        ExprKind::Raise(exn) => Ok(mk(ExprKind::Raise(*exn), pos)),

        ExprKind::Catch {
            body,
            exn: Except::Empty,
            handler,
        } => {
            // The empty value is no longer an exception: catching it is a
            // match on absence.
            let body = translate_expr(ctx, body)?;
            let handler = translate_expr(ctx, handler)?;
            let x = Var::fresh("x");
            let present = ret(var(&x, pos), pos);
            Ok(mk(
                ExprKind::Match {
                    expr: Box::new(body),
                    name: statute_ast::option_enum(),
                    cases: BTreeMap::from([
                        (statute_ast::absent_cons(), thunk(handler, pos)),
                        (
                            statute_ast::present_cons(),
                            abs(vec![x], vec![Typ::Any], present, pos),
                        ),
                    ]),
                },
                pos,
            ))
        }
        ExprKind::Catch { body, exn, handler } => Ok(mk(
            ExprKind::Catch {
                body: Box::new(translate_expr(ctx, body)?),
                exn: *exn,
                handler: Box::new(translate_expr(ctx, handler)?),
            },
            pos,
        )),

        ExprKind::ErrorOnEmpty(inner) => {
            let inner = translate_expr(ctx, inner)?;
            Ok(ret(error_on_empty(inner, pos), pos))
        }

        // A thunk disappears: its body is already a suspended option.
        ExprKind::Abs { body, .. } if is_thunk_abs(e) => translate_expr(ctx, body),
        ExprKind::Abs { params, tys, body } => {
            let mut inner = ctx.clone();
            let mut targets = Vec::with_capacity(params.len());
            for p in params {
                let (next, target) = inner.with_var(p, true, false);
                inner = next;
                targets.push(target);
            }
            let tys = tys.iter().map(translate_type).collect();
            let body = translate_expr(&inner, body)?;
            Ok(ret(abs(targets, tys, body, pos), pos))
        }

        ExprKind::Default {
            excepts,
            just,
            cons,
        } => {
            let excepts = excepts
                .iter()
                .map(|x| translate_expr(ctx, x))
                .collect::<Result<Vec<_>, _>>()?;
            let just = translate_expr(ctx, just)?;
            let cons = translate_expr(ctx, cons)?;
            Ok(app(
                mk(ExprKind::Op(Op::HandleDefaultOptional), pos),
                vec![
                    mk(ExprKind::Array(excepts), pos),
                    thunk(just, pos),
                    thunk(cons, pos),
                ],
                pos,
            ))
        }

        ExprKind::App { func, args } => translate_app(ctx, func, args, pos),

        ExprKind::Tuple(elems) => {
            let elems = translate_all(ctx, elems)?;
            Ok(mbind_cont(
                elems,
                |xs| {
                    let vs = xs.iter().map(|x| var(x, pos)).collect();
                    ret(mk(ExprKind::Tuple(vs), pos), pos)
                },
                pos,
            ))
        }

        ExprKind::TupleAccess { expr, index, size } => {
            let expr = translate_expr(ctx, expr)?;
            Ok(bind_cont(
                expr,
                |t| {
                    let access = ExprKind::TupleAccess {
                        expr: Box::new(var(t, pos)),
                        index: *index,
                        size: *size,
                    };
                    ret(mk(access, pos), pos)
                },
                pos,
            ))
        }

        ExprKind::Struct { name, fields } => {
            let keys: Vec<_> = fields.keys().cloned().collect();
            let values = fields
                .values()
                .map(|f| translate_expr(ctx, f))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(mbind_cont(
                values,
                |xs| {
                    let fields = keys
                        .into_iter()
                        .zip(xs)
                        .map(|(k, x)| (k, ret(var(x, pos), pos)))
                        .collect();
                    ret(
                        mk(
                            ExprKind::Struct {
                                name: name.clone(),
                                fields,
                            },
                            pos,
                        ),
                        pos,
                    )
                },
                pos,
            ))
        }

        // Fields are stored as options already.
        ExprKind::StructAccess { expr, name, field } => {
            let expr = translate_expr(ctx, expr)?;
            Ok(bind_cont(
                expr,
                |s| {
                    mk(
                        ExprKind::StructAccess {
                            expr: Box::new(var(s, pos)),
                            name: name.clone(),
                            field: field.clone(),
                        },
                        pos,
                    )
                },
                pos,
            ))
        }

        ExprKind::Inj { name, cons, expr } => {
            let expr = translate_expr(ctx, expr)?;
            Ok(bind_cont(
                expr,
                |v| {
                    let inj = ExprKind::Inj {
                        name: name.clone(),
                        cons: cons.clone(),
                        expr: Box::new(var(v, pos)),
                    };
                    ret(mk(inj, pos), pos)
                },
                pos,
            ))
        }

        ExprKind::Match { expr, name, cases } => {
            let expr = translate_expr(ctx, expr)?;
            let mut out = BTreeMap::new();
            for (cons, case) in cases {
                out.insert(cons.clone(), translate_case(ctx, case)?);
            }
            Ok(bind_cont(
                expr,
                |v| {
                    mk(
                        ExprKind::Match {
                            expr: Box::new(var(v, pos)),
                            name: name.clone(),
                            cases: out,
                        },
                        pos,
                    )
                },
                pos,
            ))
        }

        ExprKind::Array(elems) => {
            let elems = translate_all(ctx, elems)?;
            Ok(mbind_cont(
                elems,
                |xs| {
                    let vs = xs.iter().map(|x| ret(var(x, pos), pos)).collect();
                    ret(mk(ExprKind::Array(vs), pos), pos)
                },
                pos,
            ))
        }

        ExprKind::IfThenElse {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond = translate_expr(ctx, cond)?;
            let then_branch = translate_expr(ctx, then_branch)?;
            let else_branch = translate_expr(ctx, else_branch)?;
            Ok(bind_cont(
                cond,
                |c| {
                    mk(
                        ExprKind::IfThenElse {
                            cond: Box::new(var(c, pos)),
                            then_branch: Box::new(then_branch),
                            else_branch: Box::new(else_branch),
                        },
                        pos,
                    )
                },
                pos,
            ))
        }

        ExprKind::Assert(inner) => {
            let inner = translate_expr(ctx, inner)?;
            Ok(bind_cont(
                inner,
                |v| ret(mk(ExprKind::Assert(Box::new(var(v, pos))), pos), pos),
                pos,
            ))
        }

        ExprKind::Op(op) => translate_standalone_op(*op, pos),

        ExprKind::Location(location) => Err(LowerError::Location {
            location: location.to_string(),
            span: pos,
        }),
    }
}

fn translate_all(ctx: &TransCtx, es: &[Expr<Typed>]) -> Result<Vec<TExpr>, LowerError> {
    es.iter().map(|e| translate_expr(ctx, e)).collect()
}

/// A match case keeps its abstraction; the payload is bound pure.
fn translate_case(ctx: &TransCtx, case: &Expr<Typed>) -> Result<TExpr, LowerError> {
    let ExprKind::Abs { params, tys, body } = &case.kind else {
        return Err(LowerError::Malformed {
            message: "match case is not an abstraction".to_string(),
            span: case.span(),
        });
    };
    let [param] = params.as_slice() else {
        return Err(LowerError::Malformed {
            message: format!("match case binds {} variables", params.len()),
            span: case.span(),
        });
    };
    let (inner, target) = ctx.with_var(param, true, false);
    let body = translate_expr(&inner, body)?;
    Ok(abs(
        vec![target],
        tys.iter().map(translate_type).collect(),
        body,
        case.span(),
    ))
}

/// An operator used as a value becomes `Present (λxs. Present (op xs))`.
fn translate_standalone_op(op: Op, pos: Span) -> Result<TExpr, LowerError> {
    if op.is_higher_order() || op == Op::HandleDefaultOptional {
        return Err(LowerError::UnliftableOperator { op, span: pos });
    }
    let params: Vec<Var> = (0..op.arity()).map(|_| Var::fresh("x")).collect();
    let args = params.iter().map(|p| var(p, pos)).collect();
    let body = ret(app(mk(ExprKind::Op(op), pos), args, pos), pos);
    let tys = vec![Typ::Any; params.len()];
    Ok(ret(abs(params, tys, body, pos), pos))
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

fn translate_app(
    ctx: &TransCtx,
    func: &Expr<Typed>,
    args: &[Expr<Typed>],
    pos: Span,
) -> Result<TExpr, LowerError> {
    match &func.kind {
        ExprKind::Var(v) if lookup(ctx, v, func.span())?.is_scope => {
            translate_scope_call(ctx, v, args, pos)
        }
        ExprKind::Op(Op::HandleDefaultOptional) => Err(LowerError::Malformed {
            message: "default handler in source program".to_string(),
            span: pos,
        }),
        ExprKind::Op(op) if op.is_higher_order() => translate_list_op(ctx, *op, args, pos),
        ExprKind::Op(op) => {
            let args = translate_all(ctx, args)?;
            Ok(mmap(mk(ExprKind::Op(*op), pos), args, pos))
        }
        _ if args.len() == 1
            && is_unit_lit(&args[0])
            && (is_thunk_abs(func) || func.typ().is_thunk()) =>
        {
            translate_expr(ctx, func)
        }
        _ => {
            let func = translate_expr(ctx, func)?;
            let args = translate_all(ctx, args)?;
            Ok(bind_cont(
                func,
                |f| {
                    mbind_cont(
                        args,
                        |xs| app(var(f, pos), xs.iter().map(|x| var(x, pos)).collect(), pos),
                        pos,
                    )
                },
                pos,
            ))
        }
    }
}

/// Scope calls cross the record boundary as-is: the callee expects option
/// fields and returns a record of option fields.
fn translate_scope_call(
    ctx: &TransCtx,
    scope: &Var,
    args: &[Expr<Typed>],
    pos: Span,
) -> Result<TExpr, LowerError> {
    let [arg] = args else {
        return Err(LowerError::ScopeCallShape {
            var: scope.to_string(),
            span: pos,
        });
    };
    let ExprKind::Struct { name, fields } = &arg.kind else {
        return Err(LowerError::ScopeCallShape {
            var: scope.to_string(),
            span: pos,
        });
    };
    let target = lookup(ctx, scope, pos)?.var.clone();
    let fields = fields
        .iter()
        .map(|(k, f)| Ok((k.clone(), translate_expr(ctx, f)?)))
        .collect::<Result<BTreeMap<_, _>, LowerError>>()?;
    let record = mk(
        ExprKind::Struct {
            name: name.clone(),
            fields,
        },
        arg.span(),
    );
    Ok(ret(app(var(&target, pos), vec![record], pos), pos))
}

/// List operators take the function and the list as options and work on
/// arrays of options, so their callbacks are wrapped to unwrap elements.
fn translate_list_op(
    ctx: &TransCtx,
    op: Op,
    args: &[Expr<Typed>],
    pos: Span,
) -> Result<TExpr, LowerError> {
    if args.len() != op.arity() {
        return Err(LowerError::PartialApplication { op, span: pos });
    }
    let args = translate_all(ctx, args)?;
    let op_expr = mk(ExprKind::Op(op), pos);
    match op {
        Op::Map | Op::Filter => {
            let Ok([f, list]) = <[TExpr; 2]>::try_from(args) else {
                return Err(LowerError::PartialApplication { op, span: pos });
            };
            Ok(bind_cont(
                f,
                |fv| {
                    bind_cont(
                        list,
                        |lv| {
                            let x = Var::fresh("x");
                            let call = bind_cont(
                                var(&x, pos),
                                |xv| app(var(fv, pos), vec![var(xv, pos)], pos),
                                pos,
                            );
                            // A filter never drops an absent element silently.
                            let call = if op == Op::Filter {
                                error_on_empty(call, pos)
                            } else {
                                call
                            };
                            let wrapper = abs(vec![x], vec![Typ::Any], call, pos);
                            ret(app(op_expr, vec![wrapper, var(lv, pos)], pos), pos)
                        },
                        pos,
                    )
                },
                pos,
            ))
        }
        Op::Fold | Op::Reduce => {
            let Ok([f, init, list]) = <[TExpr; 3]>::try_from(args) else {
                return Err(LowerError::PartialApplication { op, span: pos });
            };
            Ok(bind_cont(
                f,
                |fv| {
                    bind_cont(
                        list,
                        |lv| {
                            let acc = Var::fresh("acc");
                            let x = Var::fresh("x");
                            let step = mbind_cont(
                                vec![var(&acc, pos), var(&x, pos)],
                                |vs| {
                                    app(var(fv, pos), vs.iter().map(|v| var(v, pos)).collect(), pos)
                                },
                                pos,
                            );
                            let wrapper = abs(vec![acc, x], vec![Typ::Any, Typ::Any], step, pos);
                            app(op_expr, vec![wrapper, init, var(lv, pos)], pos)
                        },
                        pos,
                    )
                },
                pos,
            ))
        }
        _ => Err(LowerError::PartialApplication { op, span: pos }),
    }
}
