use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_source(name: &str, src: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("wumboc_cli_test_{name}_{nanos}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("main.wumbo");
    fs::write(&path, src).expect("write source");
    path
}

#[test]
fn check_fails_with_located_diagnostics() {
    let path = temp_source("check", "void f() {\n    x++;\n}\n");
    let output = Command::new(env!("CARGO_BIN_EXE_wumboc"))
        .arg("--check")
        .arg(&path)
        .output()
        .expect("run wumboc");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error: Undeclared identifier (") && stderr.contains("main.wumbo:2:5)"),
        "stderr: {stderr}"
    );
    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn unparse_with_annotate_analyzes_first() {
    let path = temp_source("unparse", "int n;\nvoid f() { n = n + 1; }\n");
    let output = Command::new(env!("CARGO_BIN_EXE_wumboc"))
        .args(["--unparse", "--annotate"])
        .arg(&path)
        .env_remove("WUMBO_UNPARSE_ANNOTATE")
        .output()
        .expect("run wumboc");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "int n;\nvoid f() {\n    n(int) = (n(int) + 1);\n}\n\n"
    );
    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}
