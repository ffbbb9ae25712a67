use std::sync::OnceLock;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

fn usize_from_env(key: &str) -> Option<usize> {
    let val = std::env::var(key).ok()?;
    match val.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!("ignoring {}={:?}: expected a positive integer", key, val);
            None
        }
    }
}

/// Whether a literal `div`/`rem` by zero that is left unfolded should also be
/// reported as a warning diagnostic.
pub fn report_const_division_by_zero() -> bool {
    static REPORT: OnceLock<bool> = OnceLock::new();
    *REPORT.get_or_init(|| bool_from_env("FERROPHASE_REPORT_CONST_DIV_ZERO"))
}

/// Worker count used when finalizing several expression trees at once.
pub fn finalize_threads() -> usize {
    static THREADS: OnceLock<usize> = OnceLock::new();
    *THREADS.get_or_init(|| {
        usize_from_env("FERROPHASE_FINALIZE_THREADS").unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    })
}
