use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ax_compiler::{compile_ruleset, custom_block_rule};

fn bench_compile(c: &mut Criterion) {
    let custom: Vec<_> = (0..500)
        .map(|n| custom_block_rule(1_700_000_000_000 + n, "||ads.example^"))
        .collect();
    let whitelist: Vec<String> = (0..5_000).map(|n| format!("https://Site{n}.example/path")).collect();

    c.bench_function("compile_ruleset 500 custom / 5k allowlist", |b| {
        b.iter(|| compile_ruleset(black_box(true), black_box(&custom), black_box(&whitelist)))
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
