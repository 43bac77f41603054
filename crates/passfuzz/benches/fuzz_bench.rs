//! Criterion benchmarks for generation and the fuzz loop.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use passfuzz::{
    ident, int_literal, Field, Fuzzer, Generators, Node, NullSink, PassDef, Presets, Schema,
    SchemaRef, Shape, Token, Wellformed, TOP,
};

const LET: Token = Token::new("let");
const IDENT: Token = Token::new("ident");
const INT: Token = Token::new("int");
const ADD: Token = Token::new("add");
const EXPR: Token = Token::new("expr");

fn expr_wf() -> Wellformed {
    let operand = [INT, ADD];
    Wellformed::new()
        .shape(TOP, Shape::seq([LET]).at_least(1))
        .shape(
            LET,
            Shape::fields([Field::new(IDENT), Field::named(EXPR, operand)]),
        )
        .shape(
            ADD,
            Shape::fields([Field::named(EXPR, operand), Field::named(EXPR, operand)]),
        )
        .binding_shadowing(LET, IDENT)
        .scope(TOP)
}

fn gens() -> Generators {
    Generators::new()
        .with(IDENT, ident("x", 8))
        .with(INT, int_literal(0..=9))
}

fn bench_generation_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation_depth");
    let wf = expr_wf();
    let gens = gens();

    for depth in [4usize, 8, 12, 16] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut seed = 0u64;
            b.iter(|| {
                seed = seed.wrapping_add(1);
                wf.gen(TOP, &gens, seed, depth)
            });
        });
    }

    group.finish();
}

fn bench_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("verification");
    let wf = expr_wf();
    let tree = wf.gen(TOP, &gens(), 42, 12).unwrap_or_else(|_| Node::new(TOP));

    group.bench_function("check", |b| b.iter(|| wf.check(&tree)));
    group.bench_function("build_st", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| wf.build_st(&mut tree),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_presets(c: &mut Criterion) {
    let mut group = c.benchmark_group("presets");
    group.sample_size(10);
    let wf: SchemaRef = Arc::new(expr_wf());

    for (name, config) in [("quick", Presets::quick()), ("standard", Presets::standard())] {
        let passes = vec![
            PassDef::map("identity", |ast: Node| ast)
                .with_shared_wf(wf.clone())
                .into_ref(),
            PassDef::map("identity", |ast: Node| ast)
                .with_shared_wf(wf.clone())
                .into_ref(),
        ];
        let fuzzer = match Fuzzer::new(passes, Some(wf.clone()), gens())
            .with_config(config.with_start_seed(42))
        {
            Ok(fuzzer) => fuzzer.with_sink(Arc::new(NullSink)),
            Err(err) => panic!("invalid preset {name}: {err}"),
        };

        group.throughput(Throughput::Elements(fuzzer.seed_count()));
        group.bench_function(name, |b| b.iter(|| fuzzer.test()));
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_generation_depth,
    bench_verification,
    bench_presets
);
criterion_main!(benches);
