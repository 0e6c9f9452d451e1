//! Benchmarks for rule compilation, string replacement, and node apply/revert
//!
//! - Compilation across vocabulary sizes
//! - `replace` throughput across input sizes, with numerals on
//! - `replace_node` over a tree of paragraphs followed by `revert_all`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use vocab_swap::{ConfigUpdate, Engine, TermTarget, TextTree, Vocabulary};

const SENTENCE: &str =
    "The quick brown fox jumps over the lazy dog while 42 cats watch the caterpillar eat.";

fn synthetic_vocabulary(size: usize) -> Vocabulary {
    let mut vocab: Vocabulary = [
        ("fox", TermTarget::new("狐狸")),
        ("dog", TermTarget::new("狗")),
        ("cats", TermTarget::new("猫")),
        ("caterpillar", TermTarget::new("毛毛虫")),
    ]
    .into_iter()
    .collect();
    for i in 0..size {
        vocab.insert(format!("term{}", i), TermTarget::new(format!("词{}", i)));
    }
    vocab
}

fn engine_with(size: usize) -> Engine {
    let mut engine = Engine::immediate();
    engine.set_vocabulary(&synthetic_vocabulary(size), Vec::<String>::new());
    engine.update_config(ConfigUpdate::new().numbers_replacement(true));
    engine
}

/// Benchmark compiling vocabularies of increasing size
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for size in [100, 1_000, 10_000].iter() {
        let vocab = synthetic_vocabulary(*size);
        group.throughput(Throughput::Elements(vocab.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &vocab, |b, vocab| {
            let mut engine = Engine::immediate();
            b.iter(|| {
                engine.set_vocabulary(black_box(vocab), Vec::<String>::new());
                black_box(engine.rule_count())
            });
        });
    }

    group.finish();
}

/// Benchmark replacement over inputs of increasing length
fn bench_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace");
    let engine = engine_with(5_000);

    for repeat in [1, 10, 100, 1_000].iter() {
        let text = vec![SENTENCE; *repeat].join(" ");
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(repeat), &text, |b, text| {
            b.iter(|| black_box(engine.replace(black_box(text))));
        });
    }

    group.finish();
}

/// Benchmark applying to every paragraph of a tree and reverting them all
fn bench_nodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("nodes");
    let mut engine = engine_with(5_000);

    for count in [100, 1_000].iter() {
        let mut tree = TextTree::new();
        let root = tree.root();
        let mut units = Vec::new();
        for _ in 0..*count {
            let p = tree.create_element("p");
            let t = tree.create_text(SENTENCE);
            tree.append_child(p, t);
            tree.append_child(root, p);
            units.push(t);
        }

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_function(BenchmarkId::new("apply_revert", count), |b| {
            b.iter(|| {
                for &unit in &units {
                    engine.replace_node(&mut tree, unit);
                }
                engine.revert_all(&mut tree);
                black_box(tree.live_count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_replace, bench_nodes);
criterion_main!(benches);
