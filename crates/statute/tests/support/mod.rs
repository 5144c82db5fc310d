//! Reference evaluator and tree builders shared by the integration tests.
//!
//! The evaluator understands both the source calculus (defaults, the empty
//! exception) and translated code (the option enum and the optional default
//! handler), so a test can run a term before and after translation.

#![allow(dead_code)]

use std::collections::BTreeMap;

use statute_ast::*;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Money(i64),
    Unit,
    Tuple(Vec<Value>),
    Struct(StructName, BTreeMap<StructField, Value>),
    Enum(EnumName, EnumConstructor, Box<Value>),
    Array(Vec<Value>),
    Closure {
        params: Vec<Var>,
        body: Box<Expr<Typed>>,
        env: Env,
    },
    Op(Op),
    Scope {
        body: Box<ScopeBody<Typed>>,
        env: Env,
    },
}

impl Value {
    pub fn present(v: Value) -> Value {
        Value::Enum(option_enum(), present_cons(), Box::new(v))
    }

    pub fn absent() -> Value {
        Value::Enum(option_enum(), absent_cons(), Box::new(Value::Unit))
    }

    fn as_present(&self) -> Option<&Value> {
        match self {
            Value::Enum(name, cons, payload) if name.is_option() && *cons == present_cons() => {
                Some(payload)
            }
            _ => None,
        }
    }
}

pub type Env = BTreeMap<Var, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Raised(Except),
    Stuck(String),
}

type EvalResult = Result<Value, EvalError>;

fn stuck<T>(msg: impl Into<String>) -> Result<T, EvalError> {
    Err(EvalError::Stuck(msg.into()))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

pub fn eval(env: &Env, e: &Expr<Typed>) -> EvalResult {
    match &e.kind {
        ExprKind::Var(v) => match env.get(v) {
            Some(value) => Ok(value.clone()),
            None => stuck(format!("unbound {v}")),
        },
        ExprKind::Lit(lit) => match lit {
            Lit::Bool(b) => Ok(Value::Bool(*b)),
            Lit::Int(n) => Ok(Value::Int(*n)),
            Lit::Money(c) => Ok(Value::Money(*c)),
            Lit::Unit => Ok(Value::Unit),
            other => stuck(format!("literal {other:?}")),
        },
        ExprKind::Tuple(es) => Ok(Value::Tuple(eval_all(env, es)?)),
        ExprKind::TupleAccess { expr, index, .. } => match eval(env, expr)? {
            Value::Tuple(mut vs) if *index < vs.len() => Ok(vs.swap_remove(*index)),
            other => stuck(format!("tuple access on {other:?}")),
        },
        ExprKind::Struct { name, fields } => {
            let mut out = BTreeMap::new();
            for (k, f) in fields {
                out.insert(k.clone(), eval(env, f)?);
            }
            Ok(Value::Struct(name.clone(), out))
        }
        ExprKind::StructAccess { expr, field, .. } => match eval(env, expr)? {
            Value::Struct(_, mut fields) => match fields.remove(field) {
                Some(v) => Ok(v),
                None => stuck(format!("no field {field}")),
            },
            other => stuck(format!("field access on {other:?}")),
        },
        ExprKind::Inj { name, cons, expr } => Ok(Value::Enum(
            name.clone(),
            cons.clone(),
            Box::new(eval(env, expr)?),
        )),
        ExprKind::Match { expr, cases, .. } => match eval(env, expr)? {
            Value::Enum(_, cons, payload) => match cases.get(&cons) {
                Some(case) => {
                    let case = eval(env, case)?;
                    apply(case, vec![*payload])
                }
                None => stuck(format!("no case {cons}")),
            },
            other => stuck(format!("match on {other:?}")),
        },
        ExprKind::Op(op) => Ok(Value::Op(*op)),
        ExprKind::App { func, args } => {
            let func = eval(env, func)?;
            let args = eval_all(env, args)?;
            apply(func, args)
        }
        ExprKind::Abs { params, body, .. } => Ok(Value::Closure {
            params: params.clone(),
            body: body.clone(),
            env: env.clone(),
        }),
        ExprKind::Default {
            excepts,
            just,
            cons,
        } => {
            let mut found = Vec::new();
            for x in excepts {
                match eval(env, x) {
                    Ok(v) => found.push(v),
                    Err(EvalError::Raised(Except::Empty)) => {}
                    Err(err) => return Err(err),
                }
            }
            match found.len() {
                0 => match eval(env, just)? {
                    Value::Bool(true) => eval(env, cons),
                    Value::Bool(false) => Err(EvalError::Raised(Except::Empty)),
                    other => stuck(format!("justification {other:?}")),
                },
                1 => Ok(found.remove(0)),
                _ => Err(EvalError::Raised(Except::Conflict)),
            }
        }
        ExprKind::Raise(exn) => Err(EvalError::Raised(*exn)),
        ExprKind::Catch { body, exn, handler } => match eval(env, body) {
            Err(EvalError::Raised(raised)) if raised == *exn => eval(env, handler),
            other => other,
        },
        ExprKind::ErrorOnEmpty(inner) => match eval(env, inner) {
            Err(EvalError::Raised(Except::Empty)) => {
                Err(EvalError::Raised(Except::NoValueProvided))
            }
            other => other,
        },
        ExprKind::Array(es) => Ok(Value::Array(eval_all(env, es)?)),
        ExprKind::IfThenElse {
            cond,
            then_branch,
            else_branch,
        } => match eval(env, cond)? {
            Value::Bool(true) => eval(env, then_branch),
            Value::Bool(false) => eval(env, else_branch),
            other => stuck(format!("condition {other:?}")),
        },
        ExprKind::Assert(inner) => match eval(env, inner)? {
            Value::Bool(true) => Ok(Value::Unit),
            Value::Bool(false) => Err(EvalError::Raised(Except::AssertionFailed)),
            other => stuck(format!("assertion {other:?}")),
        },
        ExprKind::Location(loc) => stuck(format!("location {loc}")),
    }
}

fn eval_all(env: &Env, es: &[Expr<Typed>]) -> Result<Vec<Value>, EvalError> {
    es.iter().map(|e| eval(env, e)).collect()
}

pub fn apply(func: Value, args: Vec<Value>) -> EvalResult {
    match func {
        Value::Closure { params, body, env } => {
            if params.len() != args.len() {
                return stuck("arity");
            }
            let mut env = env;
            env.extend(params.into_iter().zip(args));
            eval(&env, &body)
        }
        Value::Op(op) => apply_op(op, args),
        Value::Scope { body, env } => {
            let [input] = <[Value; 1]>::try_from(args).map_err(|_| {
                EvalError::Stuck("scope called on more than one argument".to_string())
            })?;
            run_scope(&body, env, input)
        }
        other => stuck(format!("applying {other:?}")),
    }
}

fn apply_op(op: Op, args: Vec<Value>) -> EvalResult {
    use Value::{Array, Bool, Int, Money, Unit};
    match (op, args.as_slice()) {
        (Op::Not, [Bool(a)]) => Ok(Bool(!a)),
        (Op::And, [Bool(a), Bool(b)]) => Ok(Bool(*a && *b)),
        (Op::Or, [Bool(a), Bool(b)]) => Ok(Bool(*a || *b)),
        (Op::Add(OpKind::Int), [Int(a), Int(b)]) => Ok(Int(a + b)),
        (Op::Add(OpKind::Money), [Money(a), Money(b)]) => Ok(Money(a + b)),
        (Op::Sub(OpKind::Int), [Int(a), Int(b)]) => Ok(Int(a - b)),
        (Op::Mult(OpKind::Int), [Int(a), Int(b)]) => Ok(Int(a * b)),
        (Op::Gt(OpKind::Int), [Int(a), Int(b)]) => Ok(Bool(a > b)),
        (Op::Lt(OpKind::Int), [Int(a), Int(b)]) => Ok(Bool(a < b)),
        (Op::Eq, [a, b]) => Ok(Bool(a == b)),
        (Op::Length, [Array(xs)]) => Ok(Int(xs.len() as i64)),
        (Op::Map, [f, Array(xs)]) => Ok(Array(
            xs.iter()
                .map(|x| apply(f.clone(), vec![x.clone()]))
                .collect::<Result<_, _>>()?,
        )),
        (Op::Filter, [p, Array(xs)]) => {
            let mut kept = Vec::new();
            for x in xs {
                match apply(p.clone(), vec![x.clone()])? {
                    Bool(true) => kept.push(x.clone()),
                    Bool(false) => {}
                    other => return stuck(format!("predicate {other:?}")),
                }
            }
            Ok(Array(kept))
        }
        (Op::Fold, [f, init, Array(xs)]) => xs
            .iter()
            .try_fold(init.clone(), |acc, x| apply(f.clone(), vec![acc, x.clone()])),
        (Op::Reduce, [f, default, Array(xs)]) => match xs.split_first() {
            None => Ok(default.clone()),
            Some((first, rest)) => rest
                .iter()
                .try_fold(first.clone(), |acc, x| apply(f.clone(), vec![acc, x.clone()])),
        },
        (Op::HandleDefaultOptional, [Array(excepts), just, cons]) => {
            let mut present: Vec<&Value> = excepts.iter().filter(|x| x.as_present().is_some()).collect();
            match present.len() {
                0 => {
                    let j = apply(just.clone(), vec![Unit])?;
                    match j.as_present() {
                        Some(Bool(true)) => apply(cons.clone(), vec![Unit]),
                        Some(Bool(false)) | None => Ok(Value::absent()),
                        Some(other) => stuck(format!("justification {other:?}")),
                    }
                }
                1 => Ok(present.remove(0).clone()),
                _ => Err(EvalError::Raised(Except::Conflict)),
            }
        }
        (op, args) => stuck(format!("operator {op} on {args:?}")),
    }
}

fn run_scope(body: &ScopeBody<Typed>, env: Env, input: Value) -> EvalResult {
    let mut env = env;
    env.insert(body.input_var.clone(), input);
    for lt in &body.lets {
        let v = eval(&env, &lt.expr)?;
        env.insert(lt.var.clone(), v);
    }
    eval(&env, &body.result)
}

/// Evaluate every item; scopes become callable values.
pub fn load_program(program: &Program<Typed>) -> Result<Env, EvalError> {
    let mut env = Env::new();
    for item in &program.items {
        let value = match item {
            CodeItem::Topdef(def) => eval(&env, &def.expr)?,
            CodeItem::ScopeDef(def) => Value::Scope {
                body: Box::new(def.body.clone()),
                env: env.clone(),
            },
        };
        env.insert(item.var().clone(), value);
    }
    Ok(env)
}

/// Find an item of `program` by its source name.
pub fn item_var<'a>(program: &'a Program<Typed>, name: &str) -> &'a Var {
    program
        .items
        .iter()
        .map(CodeItem::var)
        .find(|v| v.name() == name)
        .unwrap_or_else(|| panic!("no item named {name}"))
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn s() -> Span {
    Span::new(FileId(0), 0, 1)
}

pub fn sp(kind: ExprKind<Untyped>) -> Expr<Untyped> {
    Expr::new(kind, Untyped { span: s() })
}

pub fn lit_int(n: i64) -> Expr<Untyped> {
    sp(ExprKind::Lit(Lit::Int(n)))
}

pub fn lit_bool(b: bool) -> Expr<Untyped> {
    sp(ExprKind::Lit(Lit::Bool(b)))
}

pub fn lit_money(cents: i64) -> Expr<Untyped> {
    sp(ExprKind::Lit(Lit::Money(cents)))
}

pub fn var(v: &Var) -> Expr<Untyped> {
    sp(ExprKind::Var(v.clone()))
}

pub fn op(o: Op) -> Expr<Untyped> {
    sp(ExprKind::Op(o))
}

pub fn app(func: Expr<Untyped>, args: Vec<Expr<Untyped>>) -> Expr<Untyped> {
    sp(ExprKind::App {
        func: Box::new(func),
        args,
    })
}

pub fn abs(params: &[&Var], tys: Vec<Typ>, body: Expr<Untyped>) -> Expr<Untyped> {
    sp(ExprKind::Abs {
        params: params.iter().map(|v| (*v).clone()).collect(),
        tys,
        body: Box::new(body),
    })
}

pub fn default(
    excepts: Vec<Expr<Untyped>>,
    just: Expr<Untyped>,
    cons: Expr<Untyped>,
) -> Expr<Untyped> {
    sp(ExprKind::Default {
        excepts,
        just: Box::new(just),
        cons: Box::new(cons),
    })
}

pub fn empty() -> Expr<Untyped> {
    sp(ExprKind::Raise(Except::Empty))
}

pub fn array(elems: Vec<Expr<Untyped>>) -> Expr<Untyped> {
    sp(ExprKind::Array(elems))
}

pub fn record(name: &str, fields: Vec<(&str, Expr<Untyped>)>) -> Expr<Untyped> {
    sp(ExprKind::Struct {
        name: StructName::new(name),
        fields: fields
            .into_iter()
            .map(|(f, e)| (StructField::new(f), e))
            .collect(),
    })
}

pub fn access(e: Expr<Untyped>, name: &str, field: &str) -> Expr<Untyped> {
    sp(ExprKind::StructAccess {
        expr: Box::new(e),
        name: StructName::new(name),
        field: StructField::new(field),
    })
}

/// A program made of one top-level definition.
pub fn topdef_program(name: &str, typ: Typ, expr: Expr<Untyped>) -> Program<Untyped> {
    topdefs_program(DeclCtx::new(), vec![(name, typ, expr)])
}

pub fn topdefs_program(
    decls: DeclCtx,
    defs: Vec<(&str, Typ, Expr<Untyped>)>,
) -> Program<Untyped> {
    Program {
        decls,
        items: defs
            .into_iter()
            .map(|(name, typ, expr)| {
                CodeItem::Topdef(Topdef {
                    var: Var::fresh(name),
                    typ,
                    expr,
                    span: s(),
                })
            })
            .collect(),
    }
}
