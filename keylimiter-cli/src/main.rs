mod config;
mod limiter;
mod replay;
mod stress;

use anyhow::Result;
use std::io;

use crate::config::{Config, Mode};

fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Logs go to stderr so replay output stays clean JSON
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("keylimiter={}", config.log_level).parse()?),
        )
        .init();

    let limiter = limiter::create_limiter(&config.limiter)?;

    tracing::info!(
        "keylimiter started with algorithm: {:?}, mode: {:?}",
        config.limiter.algorithm,
        config.mode
    );

    match config.mode {
        Mode::Replay => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            replay::run(&*limiter, stdin.lock(), stdout.lock())?;
        }
        Mode::Stress => {
            let report = stress::run(limiter, &config.stress)?;

            println!("Elapsed:     {:.3}s", report.elapsed.as_secs_f64());
            println!("Operations:  {}", report.operations);
            println!("Throughput:  {:.0} ops/s", report.throughput());
            println!("Allow calls: {}", report.allow_calls);
            println!("  allowed:   {}", report.allowed);
            println!("  throttled: {}", report.throttled);
            println!("Orphan keys: {}", report.orphan_keys);
        }
    }

    Ok(())
}
