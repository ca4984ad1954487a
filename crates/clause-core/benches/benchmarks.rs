use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use clause_core::syntax::{BinaryOp, CastKind, SyntaxTree, TreeBuilder, TypeClass, TypeInfo};
use clause_core::{AnalysisEngine, ResultsCollection};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

fn read_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("{}/{}", FIXTURES_DIR, path))
        .unwrap_or_else(|_| panic!("Failed to read fixture: {}", path))
}

fn int() -> TypeInfo {
    TypeInfo::integral("int")
}

/// `void f(int c0, ..., int cN, int *p) { long l = (long)p; if (c0) { y = 0; } ... char *q = (char *)l; }`
///
/// Every `if` doubles the number of live paths.
fn branching_function(branches: usize) -> SyntaxTree {
    let mut b = TreeBuilder::new();
    let file = b.add_file("bench.c", false);
    b.at(file, 1);
    let conditions: Vec<_> = (0..branches)
        .map(|i| b.param(&format!("c{i}"), int()))
        .collect();
    let p = b.param("p", TypeInfo::pointer("int"));

    let mut stmts = Vec::new();
    b.line(2);
    let p_value = b.rvalue(p);
    let to_int = b.c_cast(CastKind::PointerToIntegral, p_value, TypeInfo::integral("long"));
    let l = b.var_init("l", TypeInfo::integral("long"), to_int);
    stmts.push(b.decl_stmt(&[l]));
    let y = b.var("y", int());
    stmts.push(b.decl_stmt(&[y]));

    for (i, &condition) in conditions.iter().enumerate() {
        b.line(3 + i as u32);
        let cond = b.rvalue(condition);
        let target = b.decl_ref(y);
        let current = b.rvalue(y);
        let step = b.int_literal(i as i64 + 1);
        let sum = b.binary(BinaryOp::Add, current, step, int());
        let assign = b.assign(target, sum);
        let then = b.compound(&[assign]);
        stmts.push(b.if_stmt(cond, then, None));
    }

    b.line(3 + branches as u32);
    let l_value = b.rvalue(l);
    let to_ptr = b.c_cast(CastKind::IntegralToPointer, l_value, TypeInfo::pointer("char"));
    let q = b.var_init("q", TypeInfo::pointer("char"), to_ptr);
    stmts.push(b.decl_stmt(&[q]));

    let body = b.compound(&stmts);
    let mut params = conditions;
    params.push(p);
    b.line(1);
    b.function("f", TypeInfo::new("void", TypeClass::Void), &params, Some(body));
    b.finish()
}

fn bench_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("loading");

    let dump = read_fixture("format_string.tu.json");
    group.throughput(Throughput::Bytes(dump.len() as u64));
    group.bench_function("format_string_dump", |b| {
        b.iter(|| SyntaxTree::from_json(black_box(&dump)))
    });

    group.finish();
}

fn bench_exploration(c: &mut Criterion) {
    let mut group = c.benchmark_group("exploration");

    let engine = AnalysisEngine::with_config(&Default::default())
        .unwrap_or_else(|e| panic!("Failed to build registry: {}", e));

    for branches in [2, 4, 8] {
        let tree = branching_function(branches);
        group.throughput(Throughput::Elements(1 << branches));
        group.bench_with_input(BenchmarkId::new("branches", branches), &tree, |b, tree| {
            b.iter(|| {
                let results = ResultsCollection::new();
                engine.analyze(black_box(tree), &results)
            })
        });
    }

    group.finish();
}

fn bench_fixture(c: &mut Criterion) {
    let mut group = c.benchmark_group("rules");

    let engine = AnalysisEngine::with_config(&Default::default())
        .unwrap_or_else(|e| panic!("Failed to build registry: {}", e));
    let tree = SyntaxTree::from_json(&read_fixture("format_string.tu.json"))
        .unwrap_or_else(|e| panic!("Failed to load fixture: {}", e));

    group.bench_function("default_registry", |b| {
        b.iter(|| {
            let results = ResultsCollection::new();
            engine.analyze(black_box(&tree), &results);
            results.len()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_loading, bench_exploration, bench_fixture);
criterion_main!(benches);
