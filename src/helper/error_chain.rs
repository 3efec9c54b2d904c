use log::error;

/// Returns the `Ok` value, or logs the whole error chain of `doing` and panics
#[track_caller]
pub fn unwrap_or_report<T>(result: anyhow::Result<T>, doing: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log_error_chain(&e, doing);
            panic!("{} failed: {:#}", doing, e);
        }
    }
}

/// Logs `error` and then each of its causes, innermost last
pub fn log_error_chain(error: &anyhow::Error, doing: &str) {
    error!("{} failed: {}", doing, error);
    for (depth, cause) in error.chain().skip(1).enumerate() {
        error!("  caused by ({}): {}", depth, cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn ok_value_is_returned() {
        assert_eq!(unwrap_or_report(Ok(7), "count spheres"), 7);
    }

    #[test]
    #[should_panic(expected = "load scene failed: reading file: disk on fire")]
    fn error_panics_with_full_chain() {
        let result: anyhow::Result<()> = Err(anyhow!("disk on fire")).context("reading file");
        unwrap_or_report(result, "load scene");
    }
}
