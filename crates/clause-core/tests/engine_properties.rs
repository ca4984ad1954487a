//! Behavioral properties of the matcher, symbolic engine and reporter

use parking_lot::Mutex;

use clause_core::analysis::run_rules;
use clause_core::diagnostic::{Reporter, RuleTag};
use clause_core::matcher::Matcher;
use clause_core::rules::symbolic::{PointerCastProvenance, PointerComparison, TAINT, TaintedFormatString};
use clause_core::rules::structural::PointerIntegerCast;
use clause_core::rules::{RuleError, RuleRegistry, StructuralRule};
use clause_core::symbolic::{
    CallEvent, Checker, CheckerContext, EngineConfig, Fact, FactMap, ProgramPointKind, ProgramState,
    Region, SymbolicEngine,
};
use clause_core::syntax::{BinaryOp, CastKind, NodeId, SyntaxTree, TreeBuilder, TypeClass, TypeInfo, UnaryOp};
use clause_core::{ResultsCollection, Severity};

fn int() -> TypeInfo {
    TypeInfo::integral("int")
}

fn void() -> TypeInfo {
    TypeInfo::new("void", TypeClass::Void)
}

/// `void f(int n) { int *p; long l = (long)p; int y; if (n) { y = 1; } else { y = 2; } <dest> q = (<dest>)l; }`
fn provenance_tree(destination: TypeInfo) -> SyntaxTree {
    let mut b = TreeBuilder::new();
    let file = b.add_file("provenance.cpp", false);
    b.at(file, 1);
    let n = b.param("n", int());
    b.line(2);
    let p = b.var("p", TypeInfo::pointer("int"));
    let decl_p = b.decl_stmt(&[p]);
    b.line(3);
    let p_value = b.rvalue(p);
    let to_int = b.c_cast(CastKind::PointerToIntegral, p_value, TypeInfo::integral("long"));
    let l = b.var_init("l", TypeInfo::integral("long"), to_int);
    let decl_l = b.decl_stmt(&[l]);
    b.line(4);
    let y = b.var("y", int());
    let decl_y = b.decl_stmt(&[y]);
    let cond = b.rvalue(n);
    let y1 = b.decl_ref(y);
    let one = b.int_literal(1);
    let then_assign = b.assign(y1, one);
    let then = b.compound(&[then_assign]);
    let y2 = b.decl_ref(y);
    let two = b.int_literal(2);
    let else_assign = b.assign(y2, two);
    let otherwise = b.compound(&[else_assign]);
    let branch = b.if_stmt(cond, then, Some(otherwise));
    b.line(9);
    let l_value = b.rvalue(l);
    let to_ptr = b.c_cast(CastKind::IntegralToPointer, l_value, destination.clone());
    let q = b.var_init("q", destination, to_ptr);
    let decl_q = b.decl_stmt(&[q]);
    let body = b.compound(&[decl_p, decl_l, decl_y, branch, decl_q]);
    b.line(1);
    b.function("f", void(), &[n], Some(body));
    b.finish()
}

fn run_symbolic<R>(rule: R, points: &[ProgramPointKind], tree: &SyntaxTree) -> (clause_core::RunSummary, Vec<clause_core::Diagnostic>)
where
    R: clause_core::rules::Rule + Checker + 'static,
{
    let mut registry = RuleRegistry::new();
    registry.register_symbolic(rule, points).unwrap();
    let results = ResultsCollection::new();
    let summary = run_rules(tree, &registry.all(), &results);
    (summary, results.into_inner())
}

#[test]
fn duplicate_reports_from_sibling_paths_are_collapsed() {
    let tree = provenance_tree(TypeInfo::pointer("char"));
    let (summary, diagnostics) = run_symbolic(
        PointerCastProvenance::new(),
        PointerCastProvenance::POINTS,
        &tree,
    );

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, "misra-cpp2008-5.2.7");
    assert_eq!(diagnostics[0].line, 9);
    assert_eq!(summary.suppressed, 1);
    assert_eq!(summary.exploration.paths_completed, 2);
}

#[test]
fn matching_round_trip_is_not_reported() {
    let tree = provenance_tree(TypeInfo::pointer("int"));
    let (summary, diagnostics) = run_symbolic(
        PointerCastProvenance::new(),
        PointerCastProvenance::POINTS,
        &tree,
    );

    assert!(diagnostics.is_empty());
    assert_eq!(summary.suppressed, 0);
}

/// Records whether the first argument of every call is tainted.
#[derive(Default)]
struct TaintProbe {
    seen: Mutex<Vec<(String, bool)>>,
}

impl Checker for TaintProbe {
    fn check_pre_call(&self, call: &CallEvent, ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        let tainted = call
            .arg(0)
            .and_then(|(_, value)| value.as_region())
            .is_some_and(|region| TAINT.contains(ctx.state(), region));
        self.seen
            .lock()
            .push((call.callee_name.clone().unwrap_or_default(), tainted));
        Ok(())
    }
}

const PROBE: RuleTag<'static> = RuleTag {
    id: "probe",
    severity: Severity::Info,
    error_kind: None,
};

#[test]
fn taint_reaches_calls_through_argv() {
    // int main(int argc, char **argv) { char *x; int y; x = argv[1]; f(x); y = 42; g(y); }
    let mut b = TreeBuilder::new();
    let file = b.add_file("taint.c", false);
    b.at(file, 1);
    let char_ptr = TypeInfo::pointer("char");
    let fp = b.param("s", char_ptr.clone());
    let f = b.function("f", void(), &[fp], None);
    let gp = b.param("v", int());
    let g = b.function("g", void(), &[gp], None);
    b.line(2);
    let argc = b.param("argc", int());
    let argv = b.param("argv", TypeInfo::new("char **", TypeClass::Pointer));
    b.line(3);
    let x = b.var("x", char_ptr.clone());
    let y = b.var("y", int());
    let decls = b.decl_stmt(&[x, y]);
    b.line(4);
    let x_ref = b.decl_ref(x);
    let argv_value = b.rvalue(argv);
    let one = b.int_literal(1);
    let element = b.subscript(argv_value, one, char_ptr);
    let loaded = b.load(element);
    let assign_x = b.assign(x_ref, loaded);
    b.line(5);
    let x_value = b.rvalue(x);
    let call_f = b.call(f, &[x_value], void());
    b.line(6);
    let y_ref = b.decl_ref(y);
    let forty_two = b.int_literal(42);
    let assign_y = b.assign(y_ref, forty_two);
    b.line(7);
    let y_value = b.rvalue(y);
    let call_g = b.call(g, &[y_value], void());
    let body = b.compound(&[decls, assign_x, call_f, assign_y, call_g]);
    b.line(2);
    b.function("main", int(), &[argc, argv], Some(body));
    let tree = b.finish();

    let rule = TaintedFormatString::new();
    let probe = TaintProbe::default();
    let results = ResultsCollection::new();
    let mut reporter = Reporter::new(&tree, &results);
    let mut engine = SymbolicEngine::new(EngineConfig::default());
    engine.register(PROBE, TaintedFormatString::POINTS, &rule);
    engine.register(PROBE, &[ProgramPointKind::PreCall], &probe);
    engine.run(&tree, &mut reporter);

    assert_eq!(
        *probe.seen.lock(),
        vec![("f".to_string(), true), ("g".to_string(), false)]
    );
    assert!(results.is_empty());
}

const BRANCH_FACT: FactMap = FactMap::new("test.branch");

/// Marks the region of `mark(&x)`'s argument; records whether `observe(&x)` sees it.
#[derive(Default)]
struct BranchRecorder {
    observed: Mutex<Vec<bool>>,
}

impl Checker for BranchRecorder {
    fn check_pre_call(&self, call: &CallEvent, ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        let Some(region) = call.arg(0).and_then(|(_, v)| v.as_region()).cloned() else {
            return Ok(());
        };
        match call.callee_name.as_deref() {
            Some("mark") => {
                let next = BRANCH_FACT.set(ctx.state(), region, Fact::Marker);
                ctx.add_transition(next);
            }
            Some("observe") => self.observed.lock().push(BRANCH_FACT.contains(ctx.state(), &region)),
            _ => {}
        }
        Ok(())
    }
}

#[test]
fn facts_written_on_one_branch_stay_there() {
    // void h(int n) { int x; if (n) { mark(&x); } observe(&x); }
    let mut b = TreeBuilder::new();
    let file = b.add_file("fork.c", false);
    b.at(file, 1);
    let mp = b.param("p", TypeInfo::pointer("int"));
    let mark = b.function("mark", void(), &[mp], None);
    let op = b.param("p", TypeInfo::pointer("int"));
    let observe = b.function("observe", void(), &[op], None);
    let n = b.param("n", int());
    let x = b.var("x", int());
    let decl = b.decl_stmt(&[x]);
    let cond = b.rvalue(n);
    let x1 = b.decl_ref(x);
    let addr1 = b.addr_of(x1);
    let mark_call = b.call(mark, &[addr1], void());
    let then = b.compound(&[mark_call]);
    let branch = b.if_stmt(cond, then, None);
    let x2 = b.decl_ref(x);
    let addr2 = b.addr_of(x2);
    let observe_call = b.call(observe, &[addr2], void());
    let body = b.compound(&[decl, branch, observe_call]);
    b.function("h", void(), &[n], Some(body));
    let tree = b.finish();

    let recorder = BranchRecorder::default();
    let results = ResultsCollection::new();
    let mut reporter = Reporter::new(&tree, &results);
    let mut engine = SymbolicEngine::new(EngineConfig::default());
    engine.register(PROBE, &[ProgramPointKind::PreCall], &recorder);
    engine.run(&tree, &mut reporter);

    let mut observed = recorder.observed.lock().clone();
    observed.sort();
    assert_eq!(observed, vec![false, true]);
}

#[test]
fn forked_states_do_not_share_writes() {
    let mut b = TreeBuilder::new();
    let x = b.var("x", int());
    let region = Region::var(x);

    let fork = ProgramState::new();
    let left = BRANCH_FACT.set(&fork, region.clone(), Fact::Type("int *".into()));
    let right = fork.clone();

    assert_eq!(BRANCH_FACT.get(&left, &region), Some(&Fact::Type("int *".into())));
    assert_eq!(BRANCH_FACT.get(&right, &region), None);
    assert_eq!(BRANCH_FACT.get(&fork, &region), None);
}

#[test]
fn system_header_matches_are_never_reported() {
    let mut b = TreeBuilder::new();
    let header = b.add_file("/usr/include/sys/mman.h", true);
    let source = b.add_file("src/map.c", false);
    b.at(header, 40);
    let addr = b.int_literal(4096);
    let in_header = b.c_cast(CastKind::IntegralToPointer, addr, TypeInfo::pointer("void"));
    b.at(source, 7);
    let addr = b.int_literal(8192);
    b.c_cast(CastKind::IntegralToPointer, addr, TypeInfo::pointer("void"));
    let tree = b.finish();

    let rule = PointerIntegerCast::new();
    let pattern: &Matcher = rule.pattern();
    assert!(pattern.is_match(&tree, in_header));

    let mut registry = RuleRegistry::new();
    registry.register_structural(rule).unwrap();
    let results = ResultsCollection::new();
    run_rules(&tree, &registry.all(), &results);

    let diagnostics = results.into_inner();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].file, "src/map.c");
    assert_eq!(diagnostics[0].line, 7);
}

fn comparison_tree(build: impl FnOnce(&mut TreeBuilder, NodeId, NodeId, NodeId) -> NodeId) -> SyntaxTree {
    let mut b = TreeBuilder::new();
    let file = b.add_file("compare.c", false);
    b.at(file, 1);
    let p = b.param("p", TypeInfo::pointer("int"));
    let q = b.param("q", TypeInfo::pointer("int"));
    let a = b.var("a", TypeInfo::new("int[8]", TypeClass::Array));
    let decl = b.decl_stmt(&[a]);
    b.line(2);
    let comparison = build(&mut b, p, q, a);
    let body = b.compound(&[decl, comparison]);
    b.line(1);
    b.function("cmp", void(), &[p, q], Some(body));
    b.finish()
}

fn array_element(b: &mut TreeBuilder, array: NodeId, index: i64) -> NodeId {
    let reference = b.decl_ref(array);
    let decayed = b.implicit_cast(CastKind::ArrayToPointerDecay, reference, TypeInfo::pointer("int"));
    let index = b.int_literal(index);
    let subscript = b.subscript(decayed, index, int());
    b.addr_of(subscript)
}

#[test]
fn pointer_comparison_follows_base_regions() {
    let different = comparison_tree(|b, p, q, _| {
        let lhs = b.rvalue(p);
        let rhs = b.rvalue(q);
        b.binary(BinaryOp::Gt, lhs, rhs, int())
    });
    let same = comparison_tree(|b, _, _, a| {
        let lhs = array_element(b, a, 2);
        let rhs = array_element(b, a, 5);
        b.binary(BinaryOp::Gt, lhs, rhs, int())
    });
    let null = comparison_tree(|b, p, _, _| {
        let lhs = b.rvalue(p);
        let null = b.null_ptr();
        let rhs = b.implicit_cast(CastKind::NullToPointer, null, TypeInfo::pointer("int"));
        b.binary(BinaryOp::Gt, lhs, rhs, int())
    });

    let count = |tree: &SyntaxTree| {
        run_symbolic(PointerComparison::new(), PointerComparison::POINTS, tree)
            .1
            .len()
    };
    assert_eq!(count(&different), 1);
    assert_eq!(count(&same), 0);
    assert_eq!(count(&null), 1);
}

#[test]
fn statements_after_a_counted_loop_are_checked() {
    // void f(int *p, int *q) { for (int i = 0; i < 10; i++) {} p > q; }
    let mut b = TreeBuilder::new();
    let file = b.add_file("loop.c", false);
    b.at(file, 1);
    let p = b.param("p", TypeInfo::pointer("int"));
    let q = b.param("q", TypeInfo::pointer("int"));
    b.line(2);
    let zero = b.int_literal(0);
    let i = b.var_init("i", int(), zero);
    let init = b.decl_stmt(&[i]);
    let i_value = b.rvalue(i);
    let ten = b.int_literal(10);
    let cond = b.binary(BinaryOp::Lt, i_value, ten, int());
    let i_ref = b.decl_ref(i);
    let step = b.unary(UnaryOp::PostInc, i_ref, int());
    let empty = b.compound(&[]);
    let counted = b.for_stmt(Some(init), Some(cond), Some(step), empty);
    b.line(3);
    let lhs = b.rvalue(p);
    let rhs = b.rvalue(q);
    let comparison = b.binary(BinaryOp::Gt, lhs, rhs, int());
    let body = b.compound(&[counted, comparison]);
    b.line(1);
    b.function("f", void(), &[p, q], Some(body));
    let tree = b.finish();

    let (summary, diagnostics) =
        run_symbolic(PointerComparison::new(), PointerComparison::POINTS, &tree);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, "misra-c2012-18.3");
    assert_eq!(diagnostics[0].line, 3);
    assert_eq!(summary.exploration.paths_completed, 1);
    assert!(summary.exploration.widenings > 0);
}
