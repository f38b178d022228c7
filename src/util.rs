use crate::error::DedupError;
use std::env;
use std::time::Instant;
use tracing::info;

pub fn get_env_var(name: &str) -> Result<String, DedupError> {
    env::var(name).map_err(|_| {
        DedupError::invalid_config(format!("Environment variable '{}' not found", name))
    })
}

/// Runs `f` and logs how long it took, e.g. "Shingled records in 0.0123 secs".
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let output = f();
    info!(
        "{} in {:.4} secs",
        label,
        (Instant::now() - start).as_secs_f64()
    );
    output
}
