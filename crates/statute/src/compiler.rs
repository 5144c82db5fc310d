use statute_ast::{CodeItem, Mark, Program, Typed};
use statute_diag::{Diagnostic, DiagnosticError};
use statute_infer::trace::UnifyStep;
use statute_infer::{CheckOptions, TypeEnv, check_program};
use statute_lower::translate_program;
use tracing::{debug, info_span};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub check: CheckOptions,
    /// Check the translated program again against the translated
    /// declarations.
    pub recheck_translation: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            check: CheckOptions::default(),
            recheck_translation: true,
        }
    }
}

/// Node counts per pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub items: usize,
    pub typed_nodes: usize,
    pub lowered_nodes: usize,
}

#[derive(Debug, Clone)]
pub struct CompilationContext {
    /// The input program with every mark resolved.
    pub typed: Program<Typed>,
    /// Environment after the last source item.
    pub env: TypeEnv,
    /// The translated program. Its marks are resolved when the translation
    /// was checked again, erased otherwise.
    pub lowered: Program<Typed>,
    /// Unification steps of the source check followed by the re-check.
    pub trace: Vec<UnifyStep>,
    pub stats: PassStats,
}

/// Check, translate and optionally re-check `program`.
///
/// The first failing item aborts the pass it failed in.
pub fn compile_program<M: Mark>(
    program: &Program<M>,
    options: &CompileOptions,
) -> Result<CompilationContext, DiagnosticError> {
    let checked = {
        let _span = info_span!("check", items = program.items.len()).entered();
        check_program(program, &options.check)?
    };
    let mut trace = checked.trace;

    let lowered = {
        let _span = info_span!("translate").entered();
        translate_program(&checked.program)?
    };

    let lowered = if options.recheck_translation {
        let _span = info_span!("recheck").entered();
        let rechecked = check_program(&lowered, &options.check)?;
        trace.extend(rechecked.trace);
        rechecked.program
    } else {
        lowered
    };

    let stats = PassStats {
        items: checked.program.items.len(),
        typed_nodes: program_size(&checked.program),
        lowered_nodes: program_size(&lowered),
    };
    debug!(?stats, "compiled");

    Ok(CompilationContext {
        typed: checked.program,
        env: checked.env,
        lowered,
        trace,
        stats,
    })
}

fn program_size(program: &Program<Typed>) -> usize {
    program
        .items
        .iter()
        .map(|item| match item {
            CodeItem::Topdef(def) => def.expr.size(),
            CodeItem::ScopeDef(def) => {
                def.body.lets.iter().map(|l| l.expr.size()).sum::<usize>()
                    + def.body.result.size()
            }
        })
        .sum()
}

/// One line per diagnostic under a heading.
pub fn render_diagnostics(prefix: &str, err: &DiagnosticError) -> String {
    format_diagnostics(prefix, err.diagnostics())
}

fn format_diagnostics(prefix: &str, diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return prefix.to_string();
    }

    let rendered = diagnostics
        .iter()
        .map(|d| format!("  - {d}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{prefix}:\n{rendered}")
}
