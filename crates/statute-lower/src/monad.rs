//! Option-monad combinators over typed trees.
//!
//! Every combinator builds plain injections into and matches on the
//! synthetic option enum, so translated code needs nothing beyond the
//! ordinary expression language. Marks carry the position of the source
//! node and an erased type; the checker re-derives every type afterwards.

use std::collections::BTreeMap;

use statute_ast::{
    Except, Expr, ExprKind, Lit, Span, Typ, Typed, Var, absent_cons, option_enum, present_cons,
};

pub type TExpr = Expr<Typed>;

pub(crate) fn mk(kind: ExprKind<Typed>, pos: Span) -> TExpr {
    Expr::new(kind, Typed::erased(pos))
}

pub(crate) fn var(v: &Var, pos: Span) -> TExpr {
    mk(ExprKind::Var(v.clone()), pos)
}

pub(crate) fn abs(params: Vec<Var>, tys: Vec<Typ>, body: TExpr, pos: Span) -> TExpr {
    mk(
        ExprKind::Abs {
            params,
            tys,
            body: Box::new(body),
        },
        pos,
    )
}

pub(crate) fn app(func: TExpr, args: Vec<TExpr>, pos: Span) -> TExpr {
    mk(
        ExprKind::App {
            func: Box::new(func),
            args,
        },
        pos,
    )
}

/// `λ_: unit. body`
pub fn thunk(body: TExpr, pos: Span) -> TExpr {
    abs(vec![Var::fresh("_")], vec![Typ::unit()], body, pos)
}

/// `Present e`
pub fn ret(e: TExpr, pos: Span) -> TExpr {
    mk(
        ExprKind::Inj {
            name: option_enum(),
            cons: present_cons(),
            expr: Box::new(e),
        },
        pos,
    )
}

/// `Absent ()`
pub fn empty(pos: Span) -> TExpr {
    mk(
        ExprKind::Inj {
            name: option_enum(),
            cons: absent_cons(),
            expr: Box::new(mk(ExprKind::Lit(Lit::Unit), pos)),
        },
        pos,
    )
}

fn option_match(arg: TExpr, on_absent: TExpr, x: Var, on_present: TExpr, pos: Span) -> TExpr {
    mk(
        ExprKind::Match {
            expr: Box::new(arg),
            name: option_enum(),
            cases: BTreeMap::from([
                (absent_cons(), thunk(on_absent, pos)),
                (present_cons(), abs(vec![x], vec![Typ::Any], on_present, pos)),
            ]),
        },
        pos,
    )
}

/// `match arg with Absent -> Absent | Present x -> body`
pub fn bind(x: Var, arg: TExpr, body: TExpr, pos: Span) -> TExpr {
    option_match(arg, empty(pos), x, body, pos)
}

/// [`bind`] with a fresh payload variable handed to `f`.
pub fn bind_cont(arg: TExpr, f: impl FnOnce(&Var) -> TExpr, pos: Span) -> TExpr {
    let x = Var::fresh("x");
    let body = f(&x);
    bind(x, arg, body, pos)
}

/// Bind every argument in order and apply `func` to the payloads.
pub fn mbind(func: TExpr, args: Vec<TExpr>, pos: Span) -> TExpr {
    mbind_cont(
        args,
        |xs| app(func, xs.iter().map(|x| var(x, pos)).collect(), pos),
        pos,
    )
}

/// Bind every argument in order; `f` receives the payload variables in
/// argument order. Any absent argument makes the whole result absent.
pub fn mbind_cont(args: Vec<TExpr>, f: impl FnOnce(&[Var]) -> TExpr, pos: Span) -> TExpr {
    let xs: Vec<Var> = args.iter().map(|_| Var::fresh("x")).collect();
    let body = f(&xs);
    xs.into_iter()
        .zip(args)
        .rev()
        .fold(body, |body, (x, arg)| bind(x, arg, body, pos))
}

/// `bind` whose body is re-wrapped as present.
pub fn map(x: Var, arg: TExpr, body: TExpr, pos: Span) -> TExpr {
    bind(x, arg, ret(body, pos), pos)
}

/// `mbind` whose application is re-wrapped as present.
pub fn mmap(func: TExpr, args: Vec<TExpr>, pos: Span) -> TExpr {
    mbind_cont(
        args,
        |xs| ret(app(func, xs.iter().map(|x| var(x, pos)).collect(), pos), pos),
        pos,
    )
}

/// Force an option: absent raises `NoValueProvided`.
pub fn error_on_empty(arg: TExpr, pos: Span) -> TExpr {
    let x = Var::fresh("x");
    let payload = var(&x, pos);
    option_match(
        arg,
        mk(ExprKind::Raise(Except::NoValueProvided), pos),
        x,
        payload,
        pos,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use statute_ast::FileId;

    fn s() -> Span {
        Span::new(FileId(0), 0, 1)
    }

    fn int(n: i64) -> TExpr {
        mk(ExprKind::Lit(Lit::Int(n)), s())
    }

    #[test]
    fn ret_and_empty_use_option_enum() {
        let ExprKind::Inj { name, cons, .. } = ret(int(1), s()).kind else {
            panic!("expected injection");
        };
        assert!(name.is_option());
        assert_eq!(cons, present_cons());

        let ExprKind::Inj { cons, expr, .. } = empty(s()).kind else {
            panic!("expected injection");
        };
        assert_eq!(cons, absent_cons());
        assert_eq!(expr.kind, ExprKind::Lit(Lit::Unit));
    }

    #[test]
    fn bind_matches_on_both_cases() {
        let x = Var::fresh("x");
        let e = bind(x.clone(), ret(int(1), s()), var(&x, s()), s());
        let ExprKind::Match { name, cases, .. } = &e.kind else {
            panic!("expected match");
        };
        assert!(name.is_option());
        assert_eq!(cases.len(), 2);
        let ExprKind::Abs { params, .. } = &cases[&present_cons()].kind else {
            panic!("expected abstraction");
        };
        assert_eq!(params, &vec![x]);
    }

    #[test]
    fn mbind_nests_in_argument_order() {
        let args = vec![ret(int(1), s()), ret(int(2), s()), ret(int(3), s())];
        let mut seen = Vec::new();
        let e = mbind_cont(
            args,
            |xs| {
                seen.extend(xs.iter().cloned());
                int(0)
            },
            s(),
        );
        // The outermost match scrutinizes the first argument and binds the
        // first payload variable.
        let ExprKind::Match { expr, cases, .. } = &e.kind else {
            panic!("expected match");
        };
        assert_eq!(expr.kind, ret(int(1), s()).kind);
        let ExprKind::Abs { params, .. } = &cases[&present_cons()].kind else {
            panic!("expected abstraction");
        };
        assert_eq!(params[0], seen[0]);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn map_rewraps_the_body() {
        let x = Var::fresh("x");
        let e = map(x.clone(), empty(s()), var(&x, s()), s());
        let ExprKind::Match { cases, .. } = &e.kind else {
            panic!("expected match");
        };
        let ExprKind::Abs { body, .. } = &cases[&present_cons()].kind else {
            panic!("expected abstraction");
        };
        assert_eq!(body.kind, ret(var(&x, s()), s()).kind);
    }

    #[test]
    fn mbind_of_nothing_is_the_body() {
        let e = mbind_cont(vec![], |_| int(7), s());
        assert_eq!(e.kind, ExprKind::Lit(Lit::Int(7)));
    }

    #[test]
    fn error_on_empty_raises_no_value() {
        let e = error_on_empty(empty(s()), s());
        let ExprKind::Match { cases, .. } = &e.kind else {
            panic!("expected match");
        };
        let ExprKind::Abs { body, tys, .. } = &cases[&absent_cons()].kind else {
            panic!("expected abstraction");
        };
        assert_eq!(tys, &vec![Typ::unit()]);
        assert_eq!(body.kind, ExprKind::Raise(Except::NoValueProvided));
    }
}
