use std::env;
use std::process::Command;

// Fingerprints stamped into build/meta.bin; artifacts from another
// toolchain or target are rebuilt.
fn main() {
    for var in ["RUSTC", "TARGET"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_string());
    let rustc = rustc_version().unwrap_or_else(|| "unknown-rustc".to_string());
    println!("cargo:rustc-env=WUMBO_BUILD_TARGET={target}");
    println!("cargo:rustc-env=WUMBO_BUILD_RUSTC_VERSION={rustc}");
}

fn rustc_version() -> Option<String> {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let out = Command::new(rustc).arg("--version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
