use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use hdrhistogram::Histogram;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;
use window_ring::RetryPolicy;
use window_ring::SystemClock;
use window_ring::WindowConfig;
use window_ring::WindowError;
use window_ring::WindowRing;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hammer a shared window ring from many tasks and report latency
#[derive(Debug, Parser)]
struct Args {
    /// Number of buckets in the ring
    #[arg(long, default_value_t = 10)]
    samples: usize,

    /// Total interval covered by the ring, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: i64,

    /// Concurrent tasks counting events
    #[arg(long, default_value_t = 64)]
    tasks: usize,

    /// Events counted by each task
    #[arg(long, default_value_t = 50_000)]
    events: usize,

    /// Give up on a contended slot after this many attempts
    #[arg(long)]
    max_attempts: Option<std::num::NonZeroU32>,
}

#[derive(Default)]
struct Outcome {
    counted: usize,
    contended: usize,
}

async fn run_load_test(
    name: &str,
    ring: Arc<WindowRing>,
    tasks: usize,
    events: usize,
) -> Result<(), BoxError> {
    let mut hist_count = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?;
    let mut set = JoinSet::new();
    let barrier = Arc::new(Barrier::new(tasks));

    let start = Instant::now();

    for _ in 0..tasks {
        let rl = Arc::clone(&ring);
        let bar = Arc::clone(&barrier);
        set.spawn(async move {
            let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?;
            let mut outcome = Outcome::default();
            bar.wait().await;
            for _ in 0..events {
                let call_start = Instant::now();
                match rl.try_current_bucket() {
                    Ok(bucket) => {
                        bucket.increment();
                        outcome.counted += 1;
                    }
                    Err(WindowError::Contended { .. }) => outcome.contended += 1,
                    Err(err) => return Err(BoxError::from(err)),
                }
                hist.record(call_start.elapsed().as_nanos().max(1) as u64)?;
            }
            Ok::<_, BoxError>((hist, outcome))
        });
    }

    let mut total = Outcome::default();
    while let Some(task) = set.join_next().await {
        let (hist, outcome) = task??;
        hist_count.add(&hist)?;
        total.counted += outcome.counted;
        total.contended += outcome.contended;
    }

    let total_duration = start.elapsed();
    let throughput = (tasks * events) as f64 / total_duration.as_secs_f64();

    println!("--- {} ---", name);
    println!("Total Duration:  {:.2?}", total_duration);
    println!("Counted/Total:   {}/{}", total.counted, tasks * events);
    println!("Contended:       {}", total.contended);
    println!("Total Rate:      {:.2} events/sec", throughput);
    println!("Window Sum:      {}", ring.sum()?);
    println!("P50 (Count):     {}ns", hist_count.value_at_quantile(0.5));
    println!("P99 (Count):     {}ns", hist_count.value_at_quantile(0.99));
    println!("P99.9 (Count):   {}ns", hist_count.value_at_quantile(0.999));
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    info!(?args, "starting stress run");

    let unbounded = WindowConfig::new(args.samples, args.interval_ms);
    let ring = Arc::new(WindowRing::with_config(unbounded.clone(), SystemClock::new()?)?);
    run_load_test("Unbounded Retry", ring, args.tasks, args.events).await?;

    if let Some(max_attempts) = args.max_attempts {
        let bounded = unbounded.retry(RetryPolicy::bounded(max_attempts));
        let ring = Arc::new(WindowRing::with_config(bounded, SystemClock::new()?)?);
        run_load_test("Bounded Retry", ring, args.tasks, args.events).await?;
    }

    Ok(())
}
