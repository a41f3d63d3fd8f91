//! Criterion benchmarks for the compilation pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quasar::{compile_source, lex, parse, NoImports};

const PROGRAM: &str = r#"
struct Point { x: int, y: int }
enum Color { Red, Green, Blue }

fn dist2(a: Point, b: Point) -> int {
    let dx: int = a.x - b.x
    let dy: int = a.y - b.y
    return dx * dx + dy * dy
}

fn classify(d: int) -> Color {
    if d < 10 { return Color.Red }
    if d < 100 { return Color.Green }
    return Color.Blue
}

let origin: Point = Point { x: 0, y: 0 }
let seen: Dict[int, bool] = {}
for i in 0..100 {
    let p: Point = Point { x: i, y: i * 2 }
    let d: int = dist2(origin, p)
    seen[d] = classify(d) == Color.Red
    print("d={}", d)
}
"#;

fn bench_lex(c: &mut Criterion) {
    c.bench_function("lex", |b| {
        b.iter(|| lex(black_box(PROGRAM), "bench.qsr").unwrap())
    });
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| parse(black_box(PROGRAM), "bench.qsr").unwrap())
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    c.bench_function("compile", |b| {
        b.iter(|| {
            let mut resolver = NoImports;
            compile_source(black_box(PROGRAM), "bench.qsr", &mut resolver).unwrap()
        })
    });
}

criterion_group!(benches, bench_lex, bench_parse, bench_full_pipeline);
criterion_main!(benches);
