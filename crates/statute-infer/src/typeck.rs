//! Bidirectional checking of expressions, scopes and programs.
//!
//! [`Checker::synthesize`] infers a type bottom-up; [`Checker::check`]
//! pushes an expected type down and only invents metavariables where a
//! subterm's shape forces a distinct inner type. Both produce a tree marked
//! with store classes, which is resolved into `Expr<Typed>` once the item
//! is fully checked.

use std::collections::BTreeMap;

use imbl::OrdMap;
use statute_ast::{
    CodeItem, DeclCtx, EnumConstructor, EnumName, Expr, ExprKind, LitTyp, Location, Mark,
    Program, ScopeBody, ScopeDef, ScopeLet, ScopeLetKind, ScopeName, ScopeVar, Span, StructName,
    Topdef, Typ, Typed, Var, absent_cons, present_cons,
};
use tracing::{debug, debug_span};

use crate::ops::op_type;
use crate::trace::UnifyStep;
use crate::{CheckError, CheckOptions, DiagnosticError, NakedTyp, NameKind, TyVar, TypeStore};

// ---------------------------------------------------------------------------
// Type environment
// ---------------------------------------------------------------------------

/// Types of the names visible to an item: earlier top-level definitions,
/// scope variables, and the variables each scope exposes to its callers.
///
/// The environment is persistent. Extending it yields a new environment that
/// shares structure with the original and leaves it untouched, so a binder
/// never leaks into its siblings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnv {
    vars: OrdMap<Var, Typ>,
    scope_vars: OrdMap<ScopeVar, Typ>,
    scopes: OrdMap<ScopeName, BTreeMap<ScopeVar, Typ>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(&self, var: Var, ty: Typ) -> Self {
        Self {
            vars: self.vars.update(var, ty),
            ..self.clone()
        }
    }

    pub fn with_scope_var(&self, var: ScopeVar, ty: Typ) -> Self {
        Self {
            scope_vars: self.scope_vars.update(var, ty),
            ..self.clone()
        }
    }

    pub fn with_scope(&self, name: ScopeName, vars: BTreeMap<ScopeVar, Typ>) -> Self {
        Self {
            scopes: self.scopes.update(name, vars),
            ..self.clone()
        }
    }

    pub fn var(&self, var: &Var) -> Option<&Typ> {
        self.vars.get(var)
    }

    pub fn scope_var(&self, var: &ScopeVar) -> Option<&Typ> {
        self.scope_vars.get(var)
    }

    pub fn sub_scope_var(&self, scope: &ScopeName, var: &ScopeVar) -> Option<&Typ> {
        self.scopes.get(scope).and_then(|vars| vars.get(var))
    }

    pub fn vars(&self) -> impl Iterator<Item = (&Var, &Typ)> {
        self.vars.iter()
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Mark of the intermediate tree: a store class instead of a type.
#[derive(Debug, Clone, Copy)]
struct Pending {
    span: Span,
    ty: TyVar,
}

/// Term variables bound inside the item being checked.
type Locals = OrdMap<Var, TyVar>;

type Checked = Expr<Pending>;

fn node(kind: ExprKind<Pending>, span: Span, ty: TyVar) -> Checked {
    Expr {
        kind,
        mark: Pending { span, ty },
    }
}

fn bind(locals: &Locals, params: &[Var], tys: &[TyVar]) -> Locals {
    let mut locals = locals.clone();
    locals.extend(params.iter().cloned().zip(tys.iter().copied()));
    locals
}

struct Checker<'d> {
    decls: &'d DeclCtx,
    store: TypeStore,
}

impl<'d> Checker<'d> {
    fn new(decls: &'d DeclCtx, options: &CheckOptions) -> Self {
        Self {
            decls,
            store: TypeStore::with_options(options),
        }
    }

    fn prior_annotation<M: Mark>(&mut self, e: &Expr<M>) -> Option<TyVar> {
        match e.mark.annotation() {
            Some(ann) if !ann.is_any() => Some(self.store.ast_to_typ(ann, e.span())),
            _ => None,
        }
    }

    fn shape(&mut self, v: TyVar) -> NakedTyp {
        self.store.get(v).typ
    }

    fn lit(&mut self, lit: LitTyp, pos: Span) -> TyVar {
        self.store.lit(lit, pos)
    }

    // -----------------------------------------------------------------------
    // Synthesis
    // -----------------------------------------------------------------------

    fn synthesize<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        e: &Expr<M>,
    ) -> Result<(Checked, TyVar), CheckError> {
        let span = e.span();
        let (kind, ty) = self.synthesize_kind(env, locals, e)?;
        if let Some(ann) = self.prior_annotation(e) {
            self.store.unify(ann, ty, span)?;
        }
        Ok((node(kind, span, ty), ty))
    }

    fn synthesize_kind<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        e: &Expr<M>,
    ) -> Result<(ExprKind<Pending>, TyVar), CheckError> {
        let span = e.span();
        match &e.kind {
            ExprKind::Var(v) => {
                let ty = match (locals.get(v), env.var(v)) {
                    (Some(ty), _) => *ty,
                    (None, Some(ty)) => self.store.ast_to_typ(ty, span),
                    (None, None) => {
                        return Err(CheckError::Unresolved {
                            kind: NameKind::Variable,
                            name: v.to_string(),
                            span,
                        });
                    }
                };
                Ok((ExprKind::Var(v.clone()), ty))
            }
            ExprKind::Lit(l) => Ok((ExprKind::Lit(l.clone()), self.lit(l.typ(), span))),
            ExprKind::Tuple(elems) => {
                let mut out = Vec::with_capacity(elems.len());
                let mut tys = Vec::with_capacity(elems.len());
                for elem in elems {
                    let (elem, ty) = self.synthesize(env, locals, elem)?;
                    out.push(elem);
                    tys.push(ty);
                }
                Ok((ExprKind::Tuple(out), self.store.make(NakedTyp::Tuple(tys), span)))
            }
            ExprKind::TupleAccess { expr, index, size } => {
                if index >= size {
                    return Err(CheckError::Arity {
                        what: "components in tuple access".to_string(),
                        expected: *size,
                        got: index.saturating_add(1),
                        span,
                    });
                }
                let comps: Vec<TyVar> = (0..*size).map(|_| self.store.any(span)).collect();
                let tuple = self.store.make(NakedTyp::Tuple(comps.clone()), span);
                let expr = self.check(env, locals, tuple, expr)?;
                let kind = ExprKind::TupleAccess {
                    expr: Box::new(expr),
                    index: *index,
                    size: *size,
                };
                Ok((kind, comps[*index]))
            }
            ExprKind::Struct { name, fields } => {
                let kind = self.struct_literal(env, locals, name, fields, span)?;
                Ok((kind, self.store.make(NakedTyp::Struct(name.clone()), span)))
            }
            ExprKind::StructAccess { expr, name, field } => {
                let field_ty = self
                    .decls
                    .struct_fields(name)
                    .ok_or_else(|| unknown(NameKind::Struct, name, span))?
                    .get(field)
                    .ok_or_else(|| unknown(NameKind::Field, format!("{name}.{field}"), span))?
                    .clone();
                let record = self.store.make(NakedTyp::Struct(name.clone()), span);
                let expr = self.check(env, locals, record, expr)?;
                let ty = self.store.ast_to_typ(&field_ty, span);
                let kind = ExprKind::StructAccess {
                    expr: Box::new(expr),
                    name: name.clone(),
                    field: field.clone(),
                };
                Ok((kind, ty))
            }
            ExprKind::Inj { name, cons, expr } if name.is_option() => {
                let (expr, payload) = if *cons == absent_cons() {
                    let unit = self.lit(LitTyp::Unit, span);
                    let expr = self.check(env, locals, unit, expr)?;
                    (expr, self.store.any(span))
                } else if *cons == present_cons() {
                    self.synthesize(env, locals, expr)?
                } else {
                    return Err(unknown(NameKind::Constructor, format!("{name}.{cons}"), span));
                };
                let kind = ExprKind::Inj {
                    name: name.clone(),
                    cons: cons.clone(),
                    expr: Box::new(expr),
                };
                Ok((kind, self.store.make(NakedTyp::Option(payload), span)))
            }
            ExprKind::Inj { name, cons, expr } => {
                let payload = self
                    .decls
                    .enum_cases(name)
                    .ok_or_else(|| unknown(NameKind::Enum, name, span))?
                    .get(cons)
                    .ok_or_else(|| unknown(NameKind::Constructor, format!("{name}.{cons}"), span))?
                    .clone();
                let payload = self.store.ast_to_typ(&payload, span);
                let expr = self.check(env, locals, payload, expr)?;
                let kind = ExprKind::Inj {
                    name: name.clone(),
                    cons: cons.clone(),
                    expr: Box::new(expr),
                };
                Ok((kind, self.store.make(NakedTyp::Enum(name.clone()), span)))
            }
            ExprKind::Match { expr, name, cases } => {
                let ret = self.store.any(span);
                let kind = self.match_cases(env, locals, expr, name, cases, ret, span)?;
                Ok((kind, ret))
            }
            ExprKind::Op(op) => Ok((ExprKind::Op(*op), op_type(&mut self.store, *op, span)?)),
            ExprKind::App { func, args } => {
                let (func, func_ty) = self.synthesize(env, locals, func)?;
                let (args, ret) = self.apply(env, locals, func_ty, args, span)?;
                let kind = ExprKind::App {
                    func: Box::new(func),
                    args,
                };
                Ok((kind, ret))
            }
            ExprKind::Abs { params, tys, body } => {
                let param_tys = self.binder_types(params, tys, span)?;
                let locals = bind(locals, params, &param_tys);
                let (body, ret) = self.synthesize(env, &locals, body)?;
                let kind = ExprKind::Abs {
                    params: params.clone(),
                    tys: tys.clone(),
                    body: Box::new(body),
                };
                Ok((kind, self.store.arrow(param_tys, ret, span)))
            }
            ExprKind::Default {
                excepts,
                just,
                cons,
            } => {
                let (cons, ty) = self.synthesize(env, locals, cons)?;
                let kind = self.default_parts(env, locals, excepts, just, cons, ty)?;
                Ok((kind, ty))
            }
            ExprKind::Raise(exn) => Ok((ExprKind::Raise(*exn), self.store.any(span))),
            ExprKind::Catch { body, exn, handler } => {
                let (body, ty) = self.synthesize(env, locals, body)?;
                let handler = self.check(env, locals, ty, handler)?;
                let kind = ExprKind::Catch {
                    body: Box::new(body),
                    exn: *exn,
                    handler: Box::new(handler),
                };
                Ok((kind, ty))
            }
            ExprKind::ErrorOnEmpty(inner) => {
                let (inner, ty) = self.synthesize(env, locals, inner)?;
                Ok((ExprKind::ErrorOnEmpty(Box::new(inner)), ty))
            }
            ExprKind::Array(elems) => {
                let elem_ty = self.store.any(span);
                let elems = self.check_all(env, locals, elem_ty, elems)?;
                Ok((
                    ExprKind::Array(elems),
                    self.store.make(NakedTyp::Array(elem_ty), span),
                ))
            }
            ExprKind::IfThenElse {
                cond,
                then_branch,
                else_branch,
            } => {
                let bool_ = self.lit(LitTyp::Bool, cond.span());
                let cond = self.check(env, locals, bool_, cond)?;
                let (then_branch, ty) = self.synthesize(env, locals, then_branch)?;
                let else_branch = self.check(env, locals, ty, else_branch)?;
                let kind = ExprKind::IfThenElse {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                };
                Ok((kind, ty))
            }
            ExprKind::Assert(inner) => {
                let bool_ = self.lit(LitTyp::Bool, inner.span());
                let inner = self.check(env, locals, bool_, inner)?;
                Ok((
                    ExprKind::Assert(Box::new(inner)),
                    self.lit(LitTyp::Unit, span),
                ))
            }
            ExprKind::Location(loc) => {
                let ty = match loc {
                    Location::ScopeVar(var) => env
                        .scope_var(var)
                        .ok_or_else(|| unknown(NameKind::ScopeVariable, var, span))?,
                    Location::SubScopeVar { scope, alias, var } => env
                        .sub_scope_var(scope, var)
                        .ok_or_else(|| {
                            unknown(NameKind::SubScopeVariable, format!("{alias}.{var}"), span)
                        })?,
                };
                let ty = self.store.ast_to_typ(ty, span);
                Ok((ExprKind::Location(loc.clone()), ty))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Checking
    // -----------------------------------------------------------------------

    fn check<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        expected: TyVar,
        e: &Expr<M>,
    ) -> Result<Checked, CheckError> {
        let span = e.span();
        if let Some(ann) = self.prior_annotation(e) {
            self.store.unify(expected, ann, span)?;
        }
        let kind = self.check_kind(env, locals, expected, e)?;
        Ok(node(kind, span, expected))
    }

    fn check_kind<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        expected: TyVar,
        e: &Expr<M>,
    ) -> Result<ExprKind<Pending>, CheckError> {
        let span = e.span();
        match (&e.kind, self.shape(expected)) {
            (ExprKind::Abs { params, tys, body }, NakedTyp::Arrow(expected_params, ret)) => {
                if expected_params.len() != params.len() {
                    return Err(CheckError::Arity {
                        what: "function parameters".to_string(),
                        expected: expected_params.len(),
                        got: params.len(),
                        span,
                    });
                }
                let param_tys = self.binder_types(params, tys, span)?;
                for (want, have) in expected_params.iter().zip(&param_tys) {
                    self.store.unify(*want, *have, span)?;
                }
                let locals = bind(locals, params, &param_tys);
                let body = self.check(env, &locals, ret, body)?;
                Ok(ExprKind::Abs {
                    params: params.clone(),
                    tys: tys.clone(),
                    body: Box::new(body),
                })
            }
            (ExprKind::Tuple(elems), NakedTyp::Tuple(comps)) if comps.len() == elems.len() => {
                let elems = elems
                    .iter()
                    .zip(comps)
                    .map(|(elem, ty)| self.check(env, locals, ty, elem))
                    .collect::<Result<_, _>>()?;
                Ok(ExprKind::Tuple(elems))
            }
            (ExprKind::Inj { name, cons, expr }, NakedTyp::Option(payload))
                if name.is_option() && *cons == present_cons() =>
            {
                let expr = self.check(env, locals, payload, expr)?;
                Ok(ExprKind::Inj {
                    name: name.clone(),
                    cons: cons.clone(),
                    expr: Box::new(expr),
                })
            }
            (ExprKind::Match { expr, name, cases }, _) => {
                self.match_cases(env, locals, expr, name, cases, expected, span)
            }
            (
                ExprKind::Default {
                    excepts,
                    just,
                    cons,
                },
                _,
            ) => {
                let cons = self.check(env, locals, expected, cons)?;
                self.default_parts(env, locals, excepts, just, cons, expected)
            }
            (ExprKind::Catch { body, exn, handler }, _) => {
                let body = self.check(env, locals, expected, body)?;
                let handler = self.check(env, locals, expected, handler)?;
                Ok(ExprKind::Catch {
                    body: Box::new(body),
                    exn: *exn,
                    handler: Box::new(handler),
                })
            }
            (ExprKind::ErrorOnEmpty(inner), _) => {
                let inner = self.check(env, locals, expected, inner)?;
                Ok(ExprKind::ErrorOnEmpty(Box::new(inner)))
            }
            (ExprKind::Array(elems), _) => {
                let elem_ty = self.store.any(span);
                let array = self.store.make(NakedTyp::Array(elem_ty), span);
                self.store.unify(expected, array, span)?;
                Ok(ExprKind::Array(self.check_all(env, locals, elem_ty, elems)?))
            }
            (
                ExprKind::IfThenElse {
                    cond,
                    then_branch,
                    else_branch,
                },
                _,
            ) => {
                let bool_ = self.lit(LitTyp::Bool, cond.span());
                let cond = self.check(env, locals, bool_, cond)?;
                let then_branch = self.check(env, locals, expected, then_branch)?;
                let else_branch = self.check(env, locals, expected, else_branch)?;
                Ok(ExprKind::IfThenElse {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                })
            }
            (ExprKind::Raise(exn), _) => Ok(ExprKind::Raise(*exn)),
            _ => {
                let (kind, actual) = self.synthesize_kind(env, locals, e)?;
                self.store.unify(expected, actual, span)?;
                Ok(kind)
            }
        }
    }

    fn check_all<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        expected: TyVar,
        exprs: &[Expr<M>],
    ) -> Result<Vec<Checked>, CheckError> {
        exprs
            .iter()
            .map(|e| self.check(env, locals, expected, e))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Shared pieces of both directions
    // -----------------------------------------------------------------------

    fn binder_types(
        &mut self,
        params: &[Var],
        tys: &[Typ],
        span: Span,
    ) -> Result<Vec<TyVar>, CheckError> {
        if params.len() != tys.len() {
            return Err(CheckError::Arity {
                what: "parameter types".to_string(),
                expected: params.len(),
                got: tys.len(),
                span,
            });
        }
        Ok(tys.iter().map(|ty| self.store.ast_to_typ(ty, span)).collect())
    }

    /// Check the arguments of an application of a function of type
    /// `func_ty`, returning them with the result type.
    fn apply<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        func_ty: TyVar,
        args: &[Expr<M>],
        span: Span,
    ) -> Result<(Vec<Checked>, TyVar), CheckError> {
        if let NakedTyp::Arrow(params, ret) = self.shape(func_ty) {
            if params.len() != args.len() {
                return Err(CheckError::Arity {
                    what: "arguments".to_string(),
                    expected: params.len(),
                    got: args.len(),
                    span,
                });
            }
            let args = args
                .iter()
                .zip(params)
                .map(|(arg, param)| self.check(env, locals, param, arg))
                .collect::<Result<_, _>>()?;
            return Ok((args, ret));
        }
        let mut checked = Vec::with_capacity(args.len());
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            let (arg, ty) = self.synthesize(env, locals, arg)?;
            checked.push(arg);
            arg_tys.push(ty);
        }
        let ret = self.store.any(span);
        let arrow = self.store.arrow(arg_tys, ret, span);
        self.store.unify(func_ty, arrow, span)?;
        Ok((checked, ret))
    }

    fn struct_literal<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        name: &StructName,
        fields: &BTreeMap<statute_ast::StructField, Expr<M>>,
        span: Span,
    ) -> Result<ExprKind<Pending>, CheckError> {
        let decl = self
            .decls
            .struct_fields(name)
            .ok_or_else(|| unknown(NameKind::Struct, name, span))?;
        let mut out = BTreeMap::new();
        for (field, e) in fields {
            let declared = decl
                .get(field)
                .ok_or_else(|| unknown(NameKind::Field, format!("{name}.{field}"), e.span()))?;
            let ty = self.store.ast_to_typ(declared, e.span());
            out.insert(field.clone(), self.check(env, locals, ty, e)?);
        }
        if out.len() != decl.len() {
            return Err(CheckError::Arity {
                what: format!("fields of struct {name}"),
                expected: decl.len(),
                got: out.len(),
                span,
            });
        }
        Ok(ExprKind::Struct {
            name: name.clone(),
            fields: out,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn match_cases<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        scrutinee: &Expr<M>,
        name: &EnumName,
        cases: &BTreeMap<EnumConstructor, Expr<M>>,
        ret: TyVar,
        span: Span,
    ) -> Result<ExprKind<Pending>, CheckError> {
        let (scrutinee_ty, payloads) = if name.is_option() {
            let payload = self.store.any(span);
            let unit = self.lit(LitTyp::Unit, span);
            let payloads = BTreeMap::from([(absent_cons(), unit), (present_cons(), payload)]);
            (self.store.make(NakedTyp::Option(payload), span), payloads)
        } else {
            let declared = self
                .decls
                .enum_cases(name)
                .ok_or_else(|| unknown(NameKind::Enum, name, span))?;
            let payloads = declared
                .iter()
                .map(|(cons, ty)| (cons.clone(), self.store.ast_to_typ(ty, span)))
                .collect::<BTreeMap<_, _>>();
            (self.store.make(NakedTyp::Enum(name.clone()), span), payloads)
        };
        let scrutinee = self.check(env, locals, scrutinee_ty, scrutinee)?;
        let mut out = BTreeMap::new();
        for (cons, case) in cases {
            let payload = *payloads
                .get(cons)
                .ok_or_else(|| unknown(NameKind::Constructor, format!("{name}.{cons}"), case.span()))?;
            let case_ty = self.store.arrow(vec![payload], ret, case.span());
            out.insert(cons.clone(), self.check(env, locals, case_ty, case)?);
        }
        if out.len() != payloads.len() {
            return Err(CheckError::Arity {
                what: format!("cases in match on {name}"),
                expected: payloads.len(),
                got: out.len(),
                span,
            });
        }
        Ok(ExprKind::Match {
            expr: Box::new(scrutinee),
            name: name.clone(),
            cases: out,
        })
    }

    /// Exceptions are checked against the consequence type, the
    /// justification against boolean.
    fn default_parts<M: Mark>(
        &mut self,
        env: &TypeEnv,
        locals: &Locals,
        excepts: &[Expr<M>],
        just: &Expr<M>,
        cons: Checked,
        ty: TyVar,
    ) -> Result<ExprKind<Pending>, CheckError> {
        let excepts = self.check_all(env, locals, ty, excepts)?;
        let bool_ = self.lit(LitTyp::Bool, just.span());
        let just = self.check(env, locals, bool_, just)?;
        Ok(ExprKind::Default {
            excepts,
            just: Box::new(just),
            cons: Box::new(cons),
        })
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    fn finish(&mut self, e: Checked) -> Expr<Typed> {
        let store = &mut self.store;
        let Ok(mut typed) = e.map_marks(&mut |p: Pending| {
            Ok::<_, std::convert::Infallible>(Typed::new(p.span, store.typ_to_ast(p.ty)))
        });
        fill_binder_types(&mut typed);
        typed
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    fn topdef<M: Mark>(
        &mut self,
        env: &TypeEnv,
        def: &Topdef<M>,
    ) -> Result<(Topdef<Typed>, TypeEnv), CheckError> {
        let expected = self.store.ast_to_typ(&def.typ, def.span);
        let expr = self.check(env, &Locals::new(), expected, &def.expr)?;
        let expr = self.finish(expr);
        let typ = self.store.typ_to_ast(expected);
        let env = env.with_var(def.var.clone(), typ.clone());
        let def = Topdef {
            var: def.var.clone(),
            typ,
            expr,
            span: def.span,
        };
        Ok((def, env))
    }

    fn scope_def<M: Mark>(
        &mut self,
        env: &TypeEnv,
        def: &ScopeDef<M>,
    ) -> Result<(ScopeDef<Typed>, TypeEnv), CheckError> {
        let body = self.scope_body(env, &def.body, def.span)?;
        let outputs: BTreeMap<ScopeVar, Typ> = self
            .decls
            .struct_fields(&def.body.output_struct)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(field, ty)| (ScopeVar::new(field.as_str()), ty.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let env = env
            .with_var(def.var.clone(), def.typ())
            .with_scope(def.name.clone(), outputs);
        let def = ScopeDef {
            name: def.name.clone(),
            var: def.var.clone(),
            body,
            span: def.span,
        };
        Ok((def, env))
    }

    fn scope_body<M: Mark>(
        &mut self,
        env: &TypeEnv,
        body: &ScopeBody<M>,
        span: Span,
    ) -> Result<ScopeBody<Typed>, CheckError> {
        for name in [&body.input_struct, &body.output_struct] {
            if self.decls.struct_fields(name).is_none() {
                return Err(unknown(NameKind::Struct, name, span));
            }
        }
        let input_ty = self
            .store
            .make(NakedTyp::Struct(body.input_struct.clone()), span);
        let mut locals = Locals::new();
        locals.insert(body.input_var.clone(), input_ty);
        let mut env = env.clone();

        let mut pending = Vec::with_capacity(body.lets.len());
        for scope_let in &body.lets {
            let ty = self.store.ast_to_typ(&scope_let.typ, scope_let.span);
            let expr = self.check(&env, &locals, ty, &scope_let.expr)?;
            locals.insert(scope_let.var.clone(), ty);
            if scope_let.kind == ScopeLetKind::ScopeVarDefinition {
                let resolved = self.store.typ_to_ast(ty);
                env = env.with_scope_var(ScopeVar::new(scope_let.var.name()), resolved);
            }
            pending.push((scope_let, expr, ty));
        }
        let output_ty = self
            .store
            .make(NakedTyp::Struct(body.output_struct.clone()), span);
        let result = self.check(&env, &locals, output_ty, &body.result)?;

        let lets = pending
            .into_iter()
            .map(|(scope_let, expr, ty)| ScopeLet {
                var: scope_let.var.clone(),
                kind: scope_let.kind,
                typ: self.store.typ_to_ast(ty),
                expr: self.finish(expr),
                span: scope_let.span,
            })
            .collect();
        Ok(ScopeBody {
            input_var: body.input_var.clone(),
            input_struct: body.input_struct.clone(),
            output_struct: body.output_struct.clone(),
            lets,
            result: self.finish(result),
        })
    }
}

/// Abstractions record the parameter types they were checked at.
fn fill_binder_types(e: &mut Expr<Typed>) {
    if let (ExprKind::Abs { tys, .. }, Typ::Arrow(params, _)) = (&mut e.kind, &e.mark.ty) {
        if params.len() == tys.len() {
            tys.clone_from(params);
        }
    }
    for child in e.children_mut() {
        fill_binder_types(child);
    }
}

fn unknown(kind: NameKind, name: impl ToString, span: Span) -> CheckError {
    CheckError::Unresolved {
        kind,
        name: name.to_string(),
        span,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Infer the type of a closed expression against `env`.
pub fn synthesize_expr<M: Mark>(
    decls: &DeclCtx,
    env: &TypeEnv,
    expr: &Expr<M>,
) -> Result<Expr<Typed>, CheckError> {
    let mut checker = Checker::new(decls, &CheckOptions::default());
    let (expr, _) = checker.synthesize(env, &Locals::new(), expr)?;
    Ok(checker.finish(expr))
}

/// Check an expression against a known type.
pub fn check_expr<M: Mark>(
    decls: &DeclCtx,
    env: &TypeEnv,
    expr: &Expr<M>,
    expected: &Typ,
) -> Result<Expr<Typed>, CheckError> {
    let mut checker = Checker::new(decls, &CheckOptions::default());
    let expected = checker.store.ast_to_typ(expected, expr.span());
    let expr = checker.check(env, &Locals::new(), expected, expr)?;
    Ok(checker.finish(expr))
}

#[derive(Debug, Clone)]
pub struct CheckedProgram {
    pub program: Program<Typed>,
    /// Environment after the last item.
    pub env: TypeEnv,
    /// Unification steps of every item, in order. Empty unless tracing was
    /// requested.
    pub trace: Vec<UnifyStep>,
}

/// Check every item in order, threading one environment.
///
/// Each item gets its own store. The first error aborts the program and is
/// returned as a diagnostic.
pub fn check_program<M: Mark>(
    program: &Program<M>,
    options: &CheckOptions,
) -> Result<CheckedProgram, DiagnosticError> {
    let mut env = TypeEnv::new();
    let mut items = Vec::with_capacity(program.items.len());
    let mut trace = Vec::new();
    for item in &program.items {
        let span = debug_span!("check_item", var = %item.var());
        let _enter = span.enter();

        let mut checker = Checker::new(&program.decls, options);
        let result = match item {
            CodeItem::Topdef(def) => checker
                .topdef(&env, def)
                .map(|(def, env)| (CodeItem::Topdef(def), env)),
            CodeItem::ScopeDef(def) => checker
                .scope_def(&env, def)
                .map(|(def, env)| (CodeItem::ScopeDef(def), env)),
        };
        let (checked, next_env) =
            result.map_err(|err| DiagnosticError::single(err.into_diagnostic()))?;
        trace.extend(checker.store.take_trace());
        debug!(var = %item.var(), "item checked");

        env = next_env;
        items.push(checked);
    }
    Ok(CheckedProgram {
        program: Program {
            decls: program.decls.clone(),
            items,
        },
        env,
        trace,
    })
}
