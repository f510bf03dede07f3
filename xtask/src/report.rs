//! Aggregates step results into the human-readable summary block.

use crate::pipeline::StepResult;
use std::fmt::Write as _;
use std::time::Duration;

pub struct Summary {
    pub text: String,
    pub all_ok: bool,
}

pub fn summarize(results: &[StepResult]) -> Summary {
    let mut text = String::new();
    let mut all_ok = true;
    let mut total = Duration::ZERO;

    let _ = writeln!(text, "\n================ SUMMARY ================");
    for res in results {
        total += res.duration;
        let status = if res.succeeded {
            "OK".to_string()
        } else {
            format!("FAIL ({})", res.exit_code)
        };
        let _ = writeln!(
            text,
            "- {:<32} : {:>10}  [{:.1}s]",
            res.name,
            status,
            res.duration.as_secs_f64()
        );
        all_ok = all_ok && res.succeeded;
    }
    let _ = writeln!(text, "----------------------------------------");
    let _ = writeln!(text, "Total: {:.1}s", total.as_secs_f64());
    let _ = writeln!(text, "Result: {}", if all_ok { "SUCCESS" } else { "FAILURE" });

    Summary { text, all_ok }
}
