//! Operator signature table.
//!
//! Every operator has exactly one arrow type per operand kind. Operators
//! that look polymorphic (equality, the array combinators, logging) get
//! fresh metavariables at each use site instead of a type scheme.

use statute_ast::{LitTyp, Op, OpKind, Span};

use crate::{CheckError, NakedTyp, TyVar, TypeStore};

/// Allocate the type of `op` at the use site `pos`.
pub fn op_type(store: &mut TypeStore, op: Op, pos: Span) -> Result<TyVar, CheckError> {
    let mut sig = Sig { store, pos };
    let ty = match op {
        Op::Not => sig.lits(&[LitTyp::Bool], LitTyp::Bool),
        Op::And | Op::Or | Op::Xor => sig.lits(&[LitTyp::Bool, LitTyp::Bool], LitTyp::Bool),

        Op::Minus(OpKind::Date) => return Err(CheckError::UnsupportedOperator { op, span: pos }),
        Op::Minus(k) => sig.lits(&[k.lit_typ()], k.lit_typ()),

        Op::IntToRat => sig.lits(&[LitTyp::Int], LitTyp::Rat),
        Op::MoneyToRat => sig.lits(&[LitTyp::Money], LitTyp::Rat),
        Op::RatToMoney => sig.lits(&[LitTyp::Rat], LitTyp::Money),
        Op::RoundRat => sig.lits(&[LitTyp::Rat], LitTyp::Rat),
        Op::RoundMoney => sig.lits(&[LitTyp::Money], LitTyp::Money),
        Op::GetDay | Op::GetMonth | Op::GetYear => sig.lits(&[LitTyp::Date], LitTyp::Int),
        Op::FirstDayOfMonth | Op::LastDayOfMonth => sig.lits(&[LitTyp::Date], LitTyp::Date),

        Op::Add(OpKind::Date) | Op::Sub(OpKind::Date) => {
            sig.lits(&[LitTyp::Date, LitTyp::Date], LitTyp::Duration)
        }
        Op::Add(k) | Op::Sub(k) => sig.lits(&[k.lit_typ(), k.lit_typ()], k.lit_typ()),

        Op::Mult(OpKind::Date) | Op::Div(OpKind::Date) => {
            return Err(CheckError::UnsupportedOperator { op, span: pos });
        }
        Op::Mult(OpKind::Money) => sig.lits(&[LitTyp::Money, LitTyp::Rat], LitTyp::Money),
        Op::Mult(OpKind::Duration) => {
            sig.lits(&[LitTyp::Duration, LitTyp::Int], LitTyp::Duration)
        }
        Op::Mult(k) => sig.lits(&[k.lit_typ(), k.lit_typ()], k.lit_typ()),
        Op::Div(OpKind::Money) => sig.lits(&[LitTyp::Money, LitTyp::Money], LitTyp::Rat),
        Op::Div(OpKind::Duration) => {
            sig.lits(&[LitTyp::Duration, LitTyp::Duration], LitTyp::Rat)
        }
        Op::Div(k) => sig.lits(&[k.lit_typ(), k.lit_typ()], k.lit_typ()),

        Op::Lt(k) | Op::Lte(k) | Op::Gt(k) | Op::Gte(k) => {
            sig.lits(&[k.lit_typ(), k.lit_typ()], LitTyp::Bool)
        }

        Op::Eq | Op::Neq => {
            let a = sig.any();
            let b = sig.lit(LitTyp::Bool);
            sig.arrow(vec![a, a], b)
        }
        Op::Log(_) => {
            let a = sig.any();
            sig.arrow(vec![a], a)
        }
        Op::Length => {
            let a = sig.any();
            let arr = sig.array(a);
            let int = sig.lit(LitTyp::Int);
            sig.arrow(vec![arr], int)
        }
        Op::Concat => {
            let a = sig.any();
            let arr = sig.array(a);
            sig.arrow(vec![arr, arr], arr)
        }

        // (a -> b, array<a>) -> array<b>
        Op::Map => {
            let a = sig.any();
            let b = sig.any();
            let f = sig.arrow(vec![a], b);
            let arr_a = sig.array(a);
            let arr_b = sig.array(b);
            sig.arrow(vec![f, arr_a], arr_b)
        }
        // (a -> boolean, array<a>) -> array<a>
        Op::Filter => {
            let a = sig.any();
            let bool_ = sig.lit(LitTyp::Bool);
            let pred = sig.arrow(vec![a], bool_);
            let arr = sig.array(a);
            sig.arrow(vec![pred, arr], arr)
        }
        // ((b, a) -> b, b, array<a>) -> b
        Op::Fold => {
            let a = sig.any();
            let b = sig.any();
            let f = sig.arrow(vec![b, a], b);
            let arr = sig.array(a);
            sig.arrow(vec![f, b, arr], b)
        }
        // ((a, a) -> a, a, array<a>) -> a, the middle argument being the
        // result on an empty array.
        Op::Reduce => {
            let a = sig.any();
            let f = sig.arrow(vec![a, a], a);
            let arr = sig.array(a);
            sig.arrow(vec![f, a, arr], a)
        }
        // (array<option<a>>, unit -> option<boolean>, unit -> option<a>) -> option<a>
        Op::HandleDefaultOptional => {
            let a = sig.any();
            let opt_a = sig.option(a);
            let excepts = sig.array(opt_a);
            let unit = sig.lit(LitTyp::Unit);
            let bool_ = sig.lit(LitTyp::Bool);
            let opt_bool = sig.option(bool_);
            let just = sig.arrow(vec![unit], opt_bool);
            let cons = sig.arrow(vec![unit], opt_a);
            sig.arrow(vec![excepts, just, cons], opt_a)
        }
    };
    Ok(ty)
}

/// Builds classes that all point at the operator's use site.
struct Sig<'s> {
    store: &'s mut TypeStore,
    pos: Span,
}

impl Sig<'_> {
    fn any(&mut self) -> TyVar {
        self.store.any(self.pos)
    }

    fn lit(&mut self, lit: LitTyp) -> TyVar {
        self.store.lit(lit, self.pos)
    }

    fn array(&mut self, elem: TyVar) -> TyVar {
        self.store.make(NakedTyp::Array(elem), self.pos)
    }

    fn option(&mut self, inner: TyVar) -> TyVar {
        self.store.make(NakedTyp::Option(inner), self.pos)
    }

    fn arrow(&mut self, params: Vec<TyVar>, ret: TyVar) -> TyVar {
        self.store.arrow(params, ret, self.pos)
    }

    fn lits(&mut self, params: &[LitTyp], ret: LitTyp) -> TyVar {
        let params = params.iter().map(|p| self.lit(*p)).collect();
        let ret = self.lit(ret);
        self.arrow(params, ret)
    }
}
