use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use mlp_machine::{Activation, Evaluation, Mlp};

fn machine() -> Mlp {
    let mut mlp = Mlp::new(&[128, 256, 256, 10]).unwrap();
    mlp.randomize_with(&mut StdRng::seed_from_u64(0));
    mlp
}

fn mlp_forward_bench(c: &mut Criterion) {
    let mlp = machine();
    let input = Array2::from_elem((1, mlp.input_size()), 0.1);
    let mut output = Array2::zeros((1, mlp.output_size()));

    c.bench_function("mlp_forward_128_256_256_10", |b| {
        b.iter(|| {
            mlp.forward_unchecked(black_box(&input), &mut output);
            black_box(&output);
        })
    });
}

fn mlp_forward_batch_bench(c: &mut Criterion) {
    let mlp = machine();
    let input = Array2::from_elem((64, mlp.input_size()), 0.1);
    let mut output = Array2::zeros((64, mlp.output_size()));

    c.bench_function("mlp_forward_batch64_128_256_256_10", |b| {
        b.iter(|| {
            mlp.forward_into(black_box(&input), &mut output).unwrap();
            black_box(&output);
        })
    });
}

fn activation_apply_bench(c: &mut Criterion) {
    let act = Activation::Sigmoid;
    let input = Array2::from_shape_fn((256, 256), |(i, j)| (i as f64 - j as f64) * 0.01);
    let mut output = Array2::zeros((256, 256));

    c.bench_function("sigmoid_apply_256x256", |b| {
        b.iter(|| {
            act.apply_into(Evaluation::F, black_box(&input), &mut output)
                .unwrap();
            black_box(&output);
        })
    });
}

criterion_group!(
    benches,
    mlp_forward_bench,
    mlp_forward_batch_bench,
    activation_apply_bench
);
criterion_main!(benches);
