use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use window_ring::WindowRing;

fn count_event(ring: &WindowRing) {
    if let Some(bucket) = ring.current_bucket() {
        bucket.increment();
    }
}

fn bench_single(group_name: &str, c: &mut Criterion, ring: Arc<WindowRing>) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("count-single-threaded", |b| {
        b.iter(|| count_event(black_box(ring.as_ref())))
    });

    group.bench_function("sum-single-threaded", |b| {
        b.iter(|| black_box(ring.as_ref()).sum())
    });

    group.finish();
}

// Writers count events while one reader keeps polling the windowed sum, the
// way an admission policy sits beside the request path.
fn bench_parallel(group_name: &str, c: &mut Criterion, ring: Arc<WindowRing>) {
    let mut group = c.benchmark_group(format!("{}-with-reader", group_name));

    for writers in [2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-writers", writers)),
            &writers,
            |b, &n| {
                b.iter_custom(|iters| {
                    let done = Arc::new(AtomicBool::new(false));
                    let reader = {
                        let r = Arc::clone(&ring);
                        let done = Arc::clone(&done);
                        thread::spawn(move || {
                            let mut sums = 0u64;
                            while !done.load(Ordering::Acquire) {
                                let _ = black_box(r.sum());
                                sums += 1;
                            }
                            sums
                        })
                    };

                    let per_writer = iters / n as u64;
                    let start = Instant::now();
                    thread::scope(|scope| {
                        for _ in 0..n {
                            scope.spawn(|| {
                                for _ in 0..per_writer {
                                    count_event(black_box(ring.as_ref()));
                                }
                            });
                        }
                    });
                    let elapsed = start.elapsed();

                    done.store(true, Ordering::Release);
                    let _ = black_box(reader.join());
                    elapsed
                });
            },
        );
    }
    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    // A ring with short buckets recycles constantly, a long one almost never.
    let rings = [
        ("Ring-2x1s", WindowRing::new(2, 1_000)),
        ("Ring-10x1s", WindowRing::new(10, 1_000)),
        ("Ring-60x1m", WindowRing::new(60, 60_000)),
    ];

    for (name, ring) in rings {
        let ring = Arc::new(ring.expect("valid ring geometry"));
        bench_single(name, c, Arc::clone(&ring));
        bench_parallel(name, c, ring);
    }
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
