//! cwe-134: Use of externally-controlled format string
//!
//! `main`'s argument vector is tainted on entry. Whatever is read out of it
//! stays tainted, and calls passing a tainted region carry the fact forward
//! on the path. A printf-family call whose format argument is tainted is
//! reported.

use std::sync::LazyLock;

use regex::Regex;

use crate::declare_rule;
use crate::rules::RuleError;
use crate::symbolic::{
    BaseRegion, CallEvent, Checker, CheckerContext, Fact, FactMap, ProgramPointKind, Region,
};
use crate::syntax::NodeId;

/// Regions holding data that came from the program arguments.
pub const TAINT: FactMap = FactMap::new("cwe-134.taint");

static PRINTF_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:__builtin_)?(v?(?:f|s|d|sn)?printf|syslog)$").expect("Invalid regex pattern")
});

declare_rule!(
    TaintedFormatString,
    id = "cwe-134",
    name = "tainted-format-string",
    description = "The format string of a printf-style call must not come from the program arguments",
    category = Cwe,
    severity = Warning,
    error_kind = "CWE_134",
    docs_url = "https://cwe.mitre.org/data/definitions/134.html",
    examples = "// Bad\nint main(int argc, char **argv) { printf(argv[1]); }\n\n// Good\nint main(int argc, char **argv) { printf(\"%s\", argv[1]); }"
);

impl TaintedFormatString {
    pub const POINTS: &'static [ProgramPointKind] =
        &[ProgramPointKind::BeginFunction, ProgramPointKind::PreCall];
}

/// Position of the format argument for printf-family functions.
pub fn format_arg_index(callee: &str) -> Option<usize> {
    let captures = PRINTF_FAMILY.captures(callee)?;
    match captures.get(1)?.as_str() {
        "printf" | "vprintf" => Some(0),
        "snprintf" | "vsnprintf" => Some(2),
        _ => Some(1),
    }
}

/// Whether `region`, or anything it was read out of, carries taint.
///
/// A symbolic region stands for the unknown contents of another region, so
/// the walk continues through that origin.
pub fn is_tainted(ctx: &CheckerContext<'_>, region: &Region) -> bool {
    let state = ctx.state();
    let mut current = Some(region.clone());
    while let Some(region) = current.take() {
        if region.ancestors_and_self().any(|r| TAINT.contains(state, &r)) {
            return true;
        }
        if let BaseRegion::Symbolic(symbol) = region.base() {
            current = ctx.symbol_origin_region(symbol).cloned();
        }
    }
    false
}

fn argument_vector(ctx: &CheckerContext<'_>, function: NodeId) -> Option<NodeId> {
    let tree = ctx.tree();
    if tree.node(function).name() != Some("main") {
        return None;
    }
    match tree.parameters(function).as_slice() {
        [_, argv] if tree.node(*argv).ty().is_some_and(|ty| ty.is_pointer()) => Some(*argv),
        _ => None,
    }
}

impl Checker for TaintedFormatString {
    fn check_begin_function(
        &self,
        function: NodeId,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RuleError> {
        let Some(argv) = argument_vector(ctx, function) else {
            return Ok(());
        };
        let symbol = ctx.region_value_symbol(&Region::var(argv));
        let state = TAINT.set(ctx.state(), Region::symbolic(symbol), Fact::Marker);
        ctx.add_transition(state);
        Ok(())
    }

    fn check_pre_call(&self, call: &CallEvent, ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        let mut state = ctx.state().clone();
        let mut changed = false;
        for (_, value) in &call.args {
            let Some(region) = value.as_region() else {
                continue;
            };
            if !TAINT.contains(&state, region) && is_tainted(ctx, region) {
                state = TAINT.set(&state, region.clone(), Fact::Marker);
                changed = true;
            }
        }
        if changed {
            ctx.add_transition(state);
        }

        let Some(name) = call.callee_name.as_deref() else {
            return Ok(());
        };
        let Some(index) = format_arg_index(name) else {
            return Ok(());
        };
        let format_tainted = call
            .arg(index)
            .and_then(|(_, value)| value.as_region())
            .is_some_and(|region| is_tainted(ctx, region));
        if format_tainted {
            ctx.report(
                call.expr,
                format!(
                    "[cwe-134]: Uncontrolled format string: the format argument of '{}' comes from the program arguments",
                    name
                ),
            );
        }
        Ok(())
    }
}
