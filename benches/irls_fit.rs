/// IRLS fit benchmark on simulated data, sequential vs rayon working-quantity evaluation.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logit_irls::simulate::simulate_logistic;
use logit_irls::{fit_logistic_irls, IrlsOptions};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_logistic_irls");

    for &n in &[300usize, 10_000, 100_000] {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let data = simulate_logistic(&mut rng, n, &[-1.0, 2.0, -0.5]);

        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            let options = IrlsOptions::default().parallel(parallel);
            group.bench_with_input(BenchmarkId::new(label, n), &data, |b, data| {
                b.iter(|| {
                    fit_logistic_irls(black_box(&data.design), black_box(&data.y), &options)
                        .map(|fit| fit.coefficients)
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
