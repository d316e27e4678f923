//! Evaluation benchmarks for secl-eval.
//!
//! Measures operator composition, single-event evaluation of each matching
//! strategy, and containment against literal sets of growing size.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use secl_eval::{
    CidrEvaluator, CidrValuesEvaluator, Context, Opts, State, StringEvaluator, StringValues,
    StringValuesEvaluator, ValueType, operators,
};
use serde_json::json;

fn path_set(n: usize) -> StringValues {
    let mut set = StringValues::new();
    for i in 0..n {
        if i % 2 == 0 {
            set.append_scalar(format!("/opt/app{i}/bin/run"));
        } else {
            set.append(format!("/opt/app{i}/*"), ValueType::Pattern);
        }
    }
    set
}

// ---------------------------------------------------------------------------
// Benchmark: compose a field read against a literal set
// ---------------------------------------------------------------------------

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_string_values");

    for n in [10, 100, 1000] {
        let set = path_set(n);
        group.bench_with_input(BenchmarkId::new("members", n), &set, |b, set| {
            b.iter(|| {
                let mut state = State::new();
                let rule = operators::string_values_contains(
                    &StringEvaluator::field_read("process.file.path"),
                    &StringValuesEvaluator::constant(set.clone()),
                    &Opts::default(),
                    &mut state,
                )
                .unwrap();
                black_box((rule, state));
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: one event against each string matching strategy
// ---------------------------------------------------------------------------

fn bench_string_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_equals");
    let event = json!({"process": {"file": {"path": "/usr/local/bin/python3"}}});
    let ctx = Context::from_value(&event);

    let literals = [
        ("exact", StringEvaluator::constant("/usr/local/bin/python3".into())),
        ("pattern", StringEvaluator::pattern("/usr/*/python*")),
        ("glob", StringEvaluator::glob("/usr/**/python?")),
        ("regex", StringEvaluator::regex(r"python\d$")),
    ];

    for (name, literal) in literals {
        let mut state = State::new();
        let rule = operators::string_equals(
            &StringEvaluator::field_read("process.file.path"),
            &literal,
            &Opts::default(),
            &mut state,
        )
        .unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(rule.eval(black_box(&ctx))));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: containment cost versus set size
// ---------------------------------------------------------------------------

fn bench_containment(c: &mut Criterion) {
    let mut group = c.benchmark_group("containment");
    let event = json!({"process.file.path": "/opt/app7/lib/x.so", "ip": "10.20.30.40"});
    let ctx = Context::from_value(&event);

    for n in [10, 100, 1000] {
        let mut state = State::new();
        let rule = operators::string_values_contains(
            &StringEvaluator::field_read("process.file.path"),
            &StringValuesEvaluator::constant(path_set(n)),
            &Opts::default(),
            &mut state,
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("string_values", n), &rule, |b, rule| {
            b.iter(|| black_box(rule.eval(black_box(&ctx))));
        });

        let cidrs: Vec<String> = (0..n).map(|i| format!("10.{}.0.0/16", i % 256)).collect();
        let set = CidrValuesEvaluator::cidrs(cidrs.iter().map(String::as_str)).unwrap();
        let rule = operators::cidr_values_contains(
            &CidrEvaluator::field_read("ip"),
            &set,
            &Opts::default(),
            &mut state,
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("cidr_values", n), &rule, |b, rule| {
            b.iter(|| black_box(rule.eval(black_box(&ctx))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compose,
    bench_string_strategies,
    bench_containment
);
criterion_main!(benches);
