use criterion::{Criterion, criterion_group, criterion_main};
use htmlquery::Parser;
use std::hint::black_box;

fn sample_markup() -> String {
    (0..200)
        .map(|i| format!("<div class=\"row\"><span>{i}</span><p>cell {i}</p></div>"))
        .collect()
}

fn bench_parse_and_find(c: &mut Criterion) {
    let markup = sample_markup();
    let parser = Parser::new();

    c.bench_function("parse", |b| {
        b.iter(|| parser.parse(black_box(&markup), None).expect("parse"))
    });

    let set = parser.parse(&markup, None).expect("parse");
    c.bench_function("find", |b| {
        b.iter(|| set.find(black_box(".row > p")).expect("find"))
    });

    c.bench_function("deep_clone", |b| b.iter(|| set.deep_clone().expect("clone")));
}

criterion_group!(benches, bench_parse_and_find);
criterion_main!(benches);
