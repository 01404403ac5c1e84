use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use matchbook::{BookConfig, Engine, OrderBookImplType, OrderCommand, OrderMode, Side, SymbolType};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Impl {
    Naive,
    Fast,
    Both,
}

/// Place-order latency report for the order book representations.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Representation to measure
    #[arg(long = "impl", value_enum, default_value = "both")]
    implementation: Impl,

    /// Number of place commands per run
    #[arg(long, default_value_t = 1_000_000)]
    iterations: u64,

    /// Dense window width of the hot-zone book
    #[arg(long, default_value_t = matchbook::config::DEFAULT_HOT_WIDTH)]
    hot_width: u32,

    /// Price band (ticks) the generated orders fall into
    #[arg(long, default_value_t = 100)]
    band: u64,
}

fn run(impl_type: OrderBookImplType, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = BookConfig::default()
        .with_hot_width(args.hot_width)
        .with_order_capacity(100_000);
    let mut engine = Engine::new(impl_type, 1, SymbolType::CurrencyExchangePair, config)?;
    engine.warm_up();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3)?;
    let mut total_duration = Duration::ZERO;
    let band = args.band.max(1);

    info!(?impl_type, iterations = args.iterations, "running");

    for order_id in 1..=args.iterations {
        let side = if order_id % 2 == 0 { Side::Bid } else { Side::Ask };
        let mut cmd = OrderCommand::place(
            OrderMode::Gtc,
            order_id,
            1,
            10_000 + (order_id % band),
            10,
            side,
        );

        // Critical measurement section
        let start = Instant::now();
        std::hint::black_box(engine.process_command(&mut cmd));
        let elapsed = start.elapsed();

        // Outliers beyond the histogram bound are dropped
        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total_duration += elapsed;
    }

    println!("\n=== {impl_type:?} Latency Report (ns) ===");
    println!("Total Ops:  {}", args.iterations);
    println!(
        "Throughput: {:.2} ops/sec",
        args.iterations as f64 / total_duration.as_secs_f64()
    );
    println!("Resting:    {}", engine.order_count());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    println!("\nDistribution:");
    for v in histogram.iter_log(100, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("<= {:6} ns: {:10} count", v.value_iterated_to(), count);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let targets: &[OrderBookImplType] = match args.implementation {
        Impl::Naive => &[OrderBookImplType::Naive],
        Impl::Fast => &[OrderBookImplType::Fast],
        Impl::Both => &[OrderBookImplType::Naive, OrderBookImplType::Fast],
    };

    for &impl_type in targets {
        if let Err(e) = run(impl_type, &args) {
            error!(?impl_type, error = %e, "latency run failed");
            std::process::exit(1);
        }
    }
}
