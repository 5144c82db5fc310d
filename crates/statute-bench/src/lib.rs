//! Synthetic programs for the benchmarks.

use statute_ast::{
    CodeItem, DeclCtx, Expr, ExprKind, FileId, Lit, Op, OpKind, Program, Span, Topdef, Typ,
    Untyped, Var,
};

fn span(n: usize) -> Span {
    let start = u32::try_from(n).unwrap_or(u32::MAX);
    Span::new(FileId(0), start, start.saturating_add(1))
}

fn node(kind: ExprKind<Untyped>, n: usize) -> Expr<Untyped> {
    Expr::new(kind, Untyped { span: span(n) })
}

fn int(value: i64, n: usize) -> Expr<Untyped> {
    node(ExprKind::Lit(Lit::Int(value)), n)
}

/// `n` top-level integers, each a default over the previous one:
/// `x_i = { x_{i-1} > i | true :- x_{i-1} + 1 }`.
pub fn default_chain(n: usize) -> Program<Untyped> {
    let mut items = Vec::with_capacity(n);
    let mut prev: Option<Var> = None;
    for i in 0..n {
        let var = Var::fresh(format!("x{i}"));
        let expr = match &prev {
            None => int(0, i),
            Some(p) => {
                let p_ref = node(ExprKind::Var(p.clone()), i);
                let plus_one = node(
                    ExprKind::App {
                        func: Box::new(node(ExprKind::Op(Op::Add(OpKind::Int)), i)),
                        args: vec![p_ref.clone(), int(1, i)],
                    },
                    i,
                );
                let exception = node(
                    ExprKind::Default {
                        excepts: vec![],
                        just: Box::new(node(
                            ExprKind::App {
                                func: Box::new(node(ExprKind::Op(Op::Gt(OpKind::Int)), i)),
                                args: vec![p_ref, int(i as i64, i)],
                            },
                            i,
                        )),
                        cons: Box::new(int(-1, i)),
                    },
                    i,
                );
                node(
                    ExprKind::Default {
                        excepts: vec![exception],
                        just: Box::new(node(ExprKind::Lit(Lit::Bool(true)), i)),
                        cons: Box::new(plus_one),
                    },
                    i,
                )
            }
        };
        items.push(CodeItem::Topdef(Topdef {
            var: var.clone(),
            typ: Typ::int(),
            expr,
            span: span(i),
        }));
        prev = Some(var);
    }
    Program {
        decls: DeclCtx::new(),
        items,
    }
}

/// One definition folding a literal array of `len` integers.
pub fn fold_program(len: usize) -> Program<Untyped> {
    let acc = Var::fresh("acc");
    let x = Var::fresh("x");
    let body = node(
        ExprKind::App {
            func: Box::new(node(ExprKind::Op(Op::Add(OpKind::Int)), 0)),
            args: vec![
                node(ExprKind::Var(acc.clone()), 0),
                node(ExprKind::Var(x.clone()), 0),
            ],
        },
        0,
    );
    let step = node(
        ExprKind::Abs {
            params: vec![acc, x],
            tys: vec![Typ::Any, Typ::Any],
            body: Box::new(body),
        },
        0,
    );
    let elems = (0..len).map(|i| int(i as i64, i)).collect();
    let fold = node(
        ExprKind::App {
            func: Box::new(node(ExprKind::Op(Op::Fold), 0)),
            args: vec![step, int(0, 0), node(ExprKind::Array(elems), 0)],
        },
        0,
    );
    Program {
        decls: DeclCtx::new(),
        items: vec![CodeItem::Topdef(Topdef {
            var: Var::fresh("total"),
            typ: Typ::int(),
            expr: fold,
            span: span(0),
        })],
    }
}
