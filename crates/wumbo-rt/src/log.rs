//! Stderr logging for the toolchain, silent unless `WUMBO_LOG=1`.

const LOG_ENV: &str = "WUMBO_LOG";
const LEVEL_ENV: &str = "WUMBO_LOG_LEVEL";

pub fn enabled() -> bool {
    matches!(std::env::var(LOG_ENV).as_deref(), Ok("1"))
}

pub fn debug_enabled() -> bool {
    enabled() && matches!(std::env::var(LEVEL_ENV).as_deref(), Ok("debug"))
}

pub fn debug(message: &str) {
    if debug_enabled() {
        eprintln!("[debug] {message}");
    }
}

pub fn info(message: &str) {
    if enabled() {
        eprintln!("[info] {message}");
    }
}

pub fn warn(message: &str) {
    if enabled() {
        eprintln!("[warn] {message}");
    }
}

pub fn error(message: &str) {
    if enabled() {
        eprintln!("[error] {message}");
    }
}
