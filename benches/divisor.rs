use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use pifm::audio::SampleQueue;
use pifm::modulation::Modulator;

fn bench_conversion(c: &mut Criterion) {
    let modulator = Modulator::gpclk0(100.5, 0.075);
    let samples: Vec<i16> = (0..20000).map(|i| ((i * 7919) % 65536 - 32768) as i16).collect();

    let mut group = c.benchmark_group("conversion");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("one_second_of_samples", |b| {
        b.iter(|| {
            for &s in &samples {
                black_box(modulator.divisor(black_box(s)));
            }
        })
    });
    group.finish();
}

fn bench_queue(c: &mut Criterion) {
    let queue = SampleQueue::new(20000);

    c.bench_function("queue_push_pull", |b| {
        b.iter(|| {
            queue.push(black_box(20378));
            black_box(queue.pull());
        })
    });
}

criterion_group!(benches, bench_conversion, bench_queue);
criterion_main!(benches);
