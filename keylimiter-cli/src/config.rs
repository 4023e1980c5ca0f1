//! CLI configuration and argument parsing
//!
//! Every option can be given on the command line or through an environment
//! variable with the KEYLIMITER_ prefix.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Answer keys read from stdin with a token bucket
//! printf 'alice\nalice\nbob\n' | keylimiter --bucket-size 1 --refill-rate 0.5
//!
//! # Using environment variables
//! export KEYLIMITER_ALGORITHM=sliding-window
//! export KEYLIMITER_MAX_REQUESTS=100
//! export KEYLIMITER_WINDOW_UNIT=minute
//! keylimiter --mode stress
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use keylimiter::WindowUnit;

/// Configuration built from CLI arguments and environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Which limiter to run and how to size it
    pub limiter: LimiterConfig,
    /// What to drive the limiter with
    pub mode: Mode,
    /// Load generator settings, used in stress mode
    pub stress: StressConfig,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Limiter configuration
///
/// Only the parameters of the selected algorithm are used.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub algorithm: Algorithm,
    /// Token bucket capacity
    pub bucket_size: u64,
    /// Token bucket refill rate (tokens per second)
    pub refill_rate: f64,
    /// Sliding window limit per window
    pub max_requests: u64,
    /// Sliding window length
    pub window_unit: WindowUnit,
    /// Expected number of distinct keys
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Worker threads sharing the limiter
    pub threads: usize,
    /// Operations per worker thread
    pub iterations: u64,
    /// Size of the key pool
    pub keys: usize,
}

/// Available rate limiting algorithms
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    /// Continuous refill token bucket
    TokenBucket,
    /// Sliding window counter
    SlidingWindow,
}

impl std::str::FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "token-bucket" => Ok(Algorithm::TokenBucket),
            "sliding-window" => Ok(Algorithm::SlidingWindow),
            _ => Err(anyhow!(
                "Invalid algorithm: {}. Valid options are: token-bucket, sliding-window",
                s
            )),
        }
    }
}

/// How the binary drives the limiter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// One key per stdin line, one JSON verdict per stdout line
    Replay,
    /// Multi-threaded random load against a shared limiter
    Stress,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "replay" => Ok(Mode::Replay),
            "stress" => Ok(Mode::Stress),
            _ => Err(anyhow!(
                "Invalid mode: {}. Valid options are: replay, stress",
                s
            )),
        }
    }
}

/// Command-line arguments
///
/// All arguments can also be set via environment variables with the
/// KEYLIMITER_ prefix. CLI arguments take precedence over environment variables.
///
/// # Examples
///
/// Sliding window over stdin keys:
/// ```bash
/// keylimiter --algorithm sliding-window --max-requests 5 --window-unit second
/// ```
///
/// Stress a token bucket with debug logging:
/// ```bash
/// keylimiter --mode stress --threads 8 --log-level debug
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "keylimiter",
    about = "Per-key rate limiting from the command line",
    long_about = "Runs a token bucket or sliding window rate limiter over keys read from stdin, or under generated multi-threaded load.\n\nEnvironment variables with KEYLIMITER_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // Limiter
    #[arg(
        long,
        value_name = "ALGORITHM",
        help = "Algorithm: token-bucket, sliding-window",
        default_value = "token-bucket",
        env = "KEYLIMITER_ALGORITHM"
    )]
    pub algorithm: Algorithm,
    #[arg(
        long,
        value_name = "N",
        help = "Token bucket capacity",
        default_value_t = 10,
        env = "KEYLIMITER_BUCKET_SIZE"
    )]
    pub bucket_size: u64,
    #[arg(
        long,
        value_name = "RATE",
        help = "Token bucket refill rate (tokens per second)",
        default_value_t = 1.0,
        env = "KEYLIMITER_REFILL_RATE"
    )]
    pub refill_rate: f64,
    #[arg(
        long,
        value_name = "N",
        help = "Sliding window limit per window",
        default_value_t = 10,
        env = "KEYLIMITER_MAX_REQUESTS"
    )]
    pub max_requests: u64,
    #[arg(
        long,
        value_name = "UNIT",
        help = "Sliding window length: second, minute, hour",
        default_value = "second",
        env = "KEYLIMITER_WINDOW_UNIT"
    )]
    pub window_unit: WindowUnit,
    #[arg(
        long,
        value_name = "SIZE",
        help = "Expected number of distinct keys",
        default_value_t = 100_000,
        env = "KEYLIMITER_CAPACITY"
    )]
    pub capacity: usize,

    // Mode
    #[arg(
        long,
        value_name = "MODE",
        help = "Mode: replay, stress",
        default_value = "replay",
        env = "KEYLIMITER_MODE"
    )]
    pub mode: Mode,

    // Stress options
    #[arg(
        long,
        value_name = "N",
        help = "Worker threads in stress mode",
        default_value_t = 4,
        env = "KEYLIMITER_THREADS"
    )]
    pub threads: usize,
    #[arg(
        long,
        value_name = "N",
        help = "Operations per thread in stress mode",
        default_value_t = 100_000,
        env = "KEYLIMITER_ITERATIONS"
    )]
    pub iterations: u64,
    #[arg(
        long,
        value_name = "N",
        help = "Key pool size in stress mode",
        default_value_t = 1000,
        env = "KEYLIMITER_KEYS"
    )]
    pub keys: usize,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "KEYLIMITER_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments cannot be parsed or the stress
    /// settings are empty. Limiter parameters are checked when the limiter
    /// is built.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        let config = Self::from_args(args);
        config.validate()?;

        Ok(config)
    }

    fn from_args(args: Args) -> Self {
        Config {
            limiter: LimiterConfig {
                algorithm: args.algorithm,
                bucket_size: args.bucket_size,
                refill_rate: args.refill_rate,
                max_requests: args.max_requests,
                window_unit: args.window_unit,
                capacity: args.capacity,
            },
            mode: args.mode,
            stress: StressConfig {
                threads: args.threads,
                iterations: args.iterations,
                keys: args.keys,
            },
            log_level: args.log_level,
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if stress mode has no threads or no keys to work with.
    fn validate(&self) -> Result<()> {
        if self.mode == Mode::Stress {
            if self.stress.threads == 0 {
                return Err(anyhow!("Stress mode needs at least one thread (--threads)"));
            }
            if self.stress.keys == 0 {
                return Err(anyhow!("Stress mode needs at least one key (--keys)"));
            }
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("keylimiter Environment Variables");
        println!("================================");
        println!();
        println!("All environment variables use the KEYLIMITER_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Limiter Configuration:");
        println!(
            "  KEYLIMITER_ALGORITHM=<name>       Algorithm: token-bucket, sliding-window [default: token-bucket]"
        );
        println!("  KEYLIMITER_CAPACITY=<size>        Expected distinct keys [default: 100000]");
        println!();
        println!("  For token bucket:");
        println!("    KEYLIMITER_BUCKET_SIZE=<n>        Bucket capacity [default: 10]");
        println!("    KEYLIMITER_REFILL_RATE=<rate>     Tokens per second [default: 1]");
        println!();
        println!("  For sliding window:");
        println!("    KEYLIMITER_MAX_REQUESTS=<n>       Limit per window [default: 10]");
        println!(
            "    KEYLIMITER_WINDOW_UNIT=<unit>     Window length: second, minute, hour [default: second]"
        );
        println!();

        println!("Mode Configuration:");
        println!("  KEYLIMITER_MODE=<mode>            Mode: replay, stress [default: replay]");
        println!();
        println!("  For stress mode:");
        println!("    KEYLIMITER_THREADS=<n>            Worker threads [default: 4]");
        println!("    KEYLIMITER_ITERATIONS=<n>         Operations per thread [default: 100000]");
        println!("    KEYLIMITER_KEYS=<n>               Key pool size [default: 1000]");
        println!();

        println!("General Configuration:");
        println!(
            "  KEYLIMITER_LOG_LEVEL=<level>      Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Sliding window of 100 requests per minute");
        println!("  export KEYLIMITER_ALGORITHM=sliding-window");
        println!("  export KEYLIMITER_MAX_REQUESTS=100");
        println!("  export KEYLIMITER_WINDOW_UNIT=minute");
        println!();
        println!("  # Run (CLI args override env vars)");
        println!("  keylimiter --max-requests 50  # Will use 50, not 100");
    }
}
