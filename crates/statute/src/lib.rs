//! Middle-end driver: check a program, eliminate exceptions, and check the
//! translation again.

mod compiler;

pub use compiler::{
    CompilationContext, CompileOptions, PassStats, compile_program, render_diagnostics,
};
pub use statute_infer::CheckOptions;
