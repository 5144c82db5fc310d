//! Type representations for statute programs.
//!
//! This crate defines the resolved types attached to typed expression trees
//! and used in declarations. They are distinct from the mutable type classes
//! manipulated during inference (which live in `statute-infer` and never
//! leave it).

use std::fmt;

// ---------------------------------------------------------------------------
// Nominal names
// ---------------------------------------------------------------------------

macro_rules! nominal_name {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

nominal_name!(
    /// Name of a declared record ("struct") type.
    StructName
);
nominal_name!(
    /// Name of a field inside a declared struct.
    StructField
);
nominal_name!(
    /// Name of a declared sum ("enum") type.
    EnumName
);
nominal_name!(
    /// Name of one case of a declared enum.
    EnumConstructor
);
nominal_name!(
    /// Name of a scope: a unit of legislative computation.
    ScopeName
);
nominal_name!(
    /// A variable owned by a scope.
    ScopeVar
);
nominal_name!(
    /// Local alias under which a scope invokes another scope.
    SubScopeName
);

/// Name of the synthetic two-case enum used by translated code.
pub const OPTION_ENUM: &str = "Optional";
/// Case of [`OPTION_ENUM`] carrying no value (unit payload).
pub const ABSENT: &str = "Absent";
/// Case of [`OPTION_ENUM`] carrying the present value.
pub const PRESENT: &str = "Present";

pub fn option_enum() -> EnumName {
    EnumName::new(OPTION_ENUM)
}

pub fn absent_cons() -> EnumConstructor {
    EnumConstructor::new(ABSENT)
}

pub fn present_cons() -> EnumConstructor {
    EnumConstructor::new(PRESENT)
}

impl EnumName {
    pub fn is_option(&self) -> bool {
        self.0 == OPTION_ENUM
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Primitive literal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LitTyp {
    Bool,
    Int,
    /// Exact decimal, held as a reduced ratio.
    Rat,
    Money,
    Date,
    Duration,
    Unit,
}

impl LitTyp {
    pub const ALL: [LitTyp; 7] = [
        LitTyp::Bool,
        LitTyp::Int,
        LitTyp::Rat,
        LitTyp::Money,
        LitTyp::Date,
        LitTyp::Duration,
        LitTyp::Unit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LitTyp::Bool => "boolean",
            LitTyp::Int => "integer",
            LitTyp::Rat => "decimal",
            LitTyp::Money => "money",
            LitTyp::Date => "date",
            LitTyp::Duration => "duration",
            LitTyp::Unit => "unit",
        }
    }
}

impl fmt::Display for LitTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved type.
///
/// `Any` stands for "not constrained": an unresolved inference variable in
/// checker output, or an erased annotation awaiting re-inference in
/// translator output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Typ {
    Lit(LitTyp),
    /// Function taking all parameters at once.
    Arrow(Vec<Typ>, Box<Typ>),
    Tuple(Vec<Typ>),
    Struct(StructName),
    Enum(EnumName),
    Option(Box<Typ>),
    Array(Box<Typ>),
    Any,
}

impl Typ {
    pub fn bool() -> Self {
        Typ::Lit(LitTyp::Bool)
    }

    pub fn int() -> Self {
        Typ::Lit(LitTyp::Int)
    }

    pub fn rat() -> Self {
        Typ::Lit(LitTyp::Rat)
    }

    pub fn money() -> Self {
        Typ::Lit(LitTyp::Money)
    }

    pub fn date() -> Self {
        Typ::Lit(LitTyp::Date)
    }

    pub fn duration() -> Self {
        Typ::Lit(LitTyp::Duration)
    }

    pub fn unit() -> Self {
        Typ::Lit(LitTyp::Unit)
    }

    pub fn arrow(params: Vec<Typ>, ret: Typ) -> Self {
        Typ::Arrow(params, Box::new(ret))
    }

    pub fn option(inner: Typ) -> Self {
        Typ::Option(Box::new(inner))
    }

    pub fn array(elem: Typ) -> Self {
        Typ::Array(Box::new(elem))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Typ::Any)
    }

    /// `unit -> T`: a delayed value.
    pub fn is_thunk(&self) -> bool {
        match self {
            Typ::Arrow(params, _) => params.len() == 1 && params[0] == Typ::unit(),
            _ => false,
        }
    }

    /// True when no `Any` occurs anywhere inside the type.
    pub fn is_concrete(&self) -> bool {
        match self {
            Typ::Any => false,
            Typ::Lit(_) | Typ::Struct(_) | Typ::Enum(_) => true,
            Typ::Arrow(params, ret) => params.iter().all(Typ::is_concrete) && ret.is_concrete(),
            Typ::Tuple(elems) => elems.iter().all(Typ::is_concrete),
            Typ::Option(inner) | Typ::Array(inner) => inner.is_concrete(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Typ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typ::Lit(lit) => write!(f, "{lit}"),
            Typ::Arrow(params, ret) => {
                if params.len() == 1 && !matches!(params[0], Typ::Arrow(..)) {
                    write!(f, "{} -> {ret}", params[0])
                } else {
                    write!(f, "(")?;
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{param}")?;
                    }
                    write!(f, ") -> {ret}")
                }
            }
            Typ::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Typ::Struct(name) => write!(f, "{name}"),
            Typ::Enum(name) => write!(f, "{name}"),
            Typ::Option(inner) => write!(f, "option<{inner}>"),
            Typ::Array(elem) => write!(f, "array<{elem}>"),
            Typ::Any => write!(f, "any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn display_nested_types() {
        let ty = Typ::arrow(
            vec![Typ::int(), Typ::array(Typ::money())],
            Typ::option(Typ::Tuple(vec![Typ::bool(), Typ::Any])),
        );
        assert_snapshot!(ty.to_string(), @"(integer, array<money>) -> option<(boolean * any)>");
    }

    #[test]
    fn display_single_param_arrow_without_parens() {
        let ty = Typ::arrow(vec![Typ::date()], Typ::duration());
        assert_snapshot!(ty.to_string(), @"date -> duration");
    }

    #[test]
    fn display_higher_order_param_keeps_parens() {
        let inner = Typ::arrow(vec![Typ::int()], Typ::bool());
        let ty = Typ::arrow(vec![inner], Typ::unit());
        assert_snapshot!(ty.to_string(), @"(integer -> boolean) -> unit");
    }

    #[test]
    fn thunk_detection() {
        assert!(Typ::arrow(vec![Typ::unit()], Typ::int()).is_thunk());
        assert!(!Typ::arrow(vec![Typ::int()], Typ::int()).is_thunk());
        assert!(!Typ::arrow(vec![Typ::unit(), Typ::unit()], Typ::int()).is_thunk());
    }

    #[test]
    fn concreteness_looks_through_structure() {
        assert!(Typ::array(Typ::Struct(StructName::new("Household"))).is_concrete());
        assert!(!Typ::option(Typ::array(Typ::Any)).is_concrete());
    }

    #[test]
    fn option_enum_names() {
        assert!(option_enum().is_option());
        assert!(!EnumName::new("Tenure").is_option());
        assert_eq!(present_cons().as_str(), "Present");
        assert_eq!(absent_cons().as_str(), "Absent");
    }
}
