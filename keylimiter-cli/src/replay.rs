//! Replay mode
//!
//! Reads one key per input line and answers each with a JSON line:
//!
//! ```text
//! {"key":"alice","allowed":true,"limit":10,"remaining":9,"retry_after":0}
//! ```
//!
//! Blank lines are skipped. Surrounding whitespace is not part of the key.
//! Lines that are not valid UTF-8 are logged and skipped.

use anyhow::Result;
use keylimiter::KeyLimiter;
use serde::Serialize;
use std::io::{BufRead, Write};

/// JSON verdict written for each key
#[derive(Debug, Serialize)]
pub struct Verdict<'a> {
    pub key: &'a str,
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub retry_after: u64,
}

/// Totals for a finished replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub requests: u64,
    pub allowed: u64,
    /// Lines dropped for not being valid UTF-8
    pub skipped: u64,
}

/// Answer every key from `input` on `output`
///
/// Output is flushed after each line so an interactive producer sees
/// verdicts as it goes.
pub fn run<L, R, W>(limiter: &L, input: R, mut output: W) -> Result<ReplaySummary>
where
    L: KeyLimiter + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut summary = ReplaySummary::default();

    for (index, line) in input.split(b'\n').enumerate() {
        let line = match String::from_utf8(line?) {
            Ok(line) => line,
            Err(_) => {
                tracing::warn!(
                    line = index + 1,
                    "skipping input line that is not valid UTF-8"
                );
                summary.skipped += 1;
                continue;
            }
        };
        let key = line.trim();
        if key.is_empty() {
            continue;
        }

        let result = limiter.check(key);
        summary.requests += 1;
        if result.allowed {
            summary.allowed += 1;
        }

        let verdict = Verdict {
            key,
            allowed: result.allowed,
            limit: result.limit,
            remaining: result.remaining,
            retry_after: result.retry_after,
        };
        serde_json::to_writer(&mut output, &verdict)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    tracing::info!(
        requests = summary.requests,
        allowed = summary.allowed,
        skipped = summary.skipped,
        "replay finished"
    );

    Ok(summary)
}
