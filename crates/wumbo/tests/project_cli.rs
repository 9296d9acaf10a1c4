use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

fn temp_project_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    dir.push(format!("wumbo_project_cli_test_{nanos}_{seq}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_project(dir: &Path, manifest: &str, main_src: &str) {
    fs::write(dir.join("wumbo.toml"), manifest).expect("write wumbo.toml");
    fs::write(dir.join("main.wumbo"), main_src).expect("write main.wumbo");
}

fn wumbo(dir: &Path, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_wumbo");
    Command::new(exe)
        .args(args)
        .arg("--manifest-path")
        .arg(dir)
        .env_remove("WUMBO_UNPARSE_ANNOTATE")
        .env_remove("WUMBO_BUILD_OUT_DIR")
        .env_remove("WUMBO_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("run wumbo")
}

const MANIFEST: &str = r#"
[package]
entry = "main.wumbo"
"#;

const VALID_SRC: &str = "struct Point{ int x; };
struct Point p;
void main() {
    p.x = 1;
    cout << p.x;
}
";

const BROKEN_SRC: &str = "int x;
void main() {
    y = x;
}
";

#[test]
fn check_accepts_a_resolved_program() {
    let dir = temp_project_dir();
    write_project(&dir, MANIFEST, VALID_SRC);

    let output = wumbo(&dir, &["check"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("[check] ok"), "stderr: {stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn check_reports_location_with_source_excerpt() {
    let dir = temp_project_dir();
    write_project(&dir, MANIFEST, BROKEN_SRC);

    let output = wumbo(&dir, &["check"]);
    assert!(!output.status.success(), "check unexpectedly succeeded");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error: Undeclared identifier"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("main.wumbo:3:5)"), "stderr: {stderr}");
    assert!(stderr.contains("      y = x;\n      ^"), "stderr: {stderr}");
    assert!(stderr.contains("[check] failed"), "stderr: {stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unparse_annotates_on_request() {
    let dir = temp_project_dir();
    write_project(&dir, MANIFEST, VALID_SRC);

    let plain = wumbo(&dir, &["unparse"]);
    assert!(plain.status.success());
    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("    (p).x = 1;\n"), "stdout: {stdout}");

    let annotated = wumbo(&dir, &["unparse", "--annotate"]);
    assert!(annotated.status.success());
    let stdout = String::from_utf8_lossy(&annotated.stdout);
    assert!(stdout.contains("    (p(Point)).x(int) = 1;\n"), "stdout: {stdout}");
    assert!(stdout.contains("    cout << (p(Point)).x(int);\n"), "stdout: {stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unparse_reads_annotate_default_from_manifest() {
    let dir = temp_project_dir();
    let manifest = r#"
[package]
main = "main.wumbo"

[unparse]
annotate = true
"#;
    write_project(&dir, manifest, VALID_SRC);

    let output = wumbo(&dir, &["unparse"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(p(Point)).x(int)"), "stdout: {stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn build_writes_artifacts_and_reuses_them() {
    let dir = temp_project_dir();
    write_project(&dir, MANIFEST, VALID_SRC);

    let output = wumbo(&dir, &["build"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    let out_dir = dir.join(".wumbo").join("build");
    let program = fs::metadata(out_dir.join("program.bin")).expect("program.bin");
    assert!(program.len() > 0);
    assert!(out_dir.join("meta.bin").exists());

    let output = wumbo(&dir, &["build"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("[build] up to date"), "stderr: {stderr}");

    fs::write(dir.join("main.wumbo"), format!("{VALID_SRC}int extra;\n")).expect("rewrite");
    let output = wumbo(&dir, &["build"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("[build] wrote"), "stderr: {stderr}");

    let output = wumbo(&dir, &["build", "--clean"]);
    assert!(output.status.success());
    assert!(!out_dir.exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn build_refuses_programs_with_errors() {
    let dir = temp_project_dir();
    let manifest = r#"
[package]
entry = "main.wumbo"

[build]
out_dir = "out"
"#;
    write_project(&dir, manifest, BROKEN_SRC);

    let output = wumbo(&dir, &["build"]);
    assert!(!output.status.success());
    assert!(!dir.join("out").join("program.bin").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rejects_unknown_commands_and_misplaced_options() {
    let dir = temp_project_dir();
    write_project(&dir, MANIFEST, VALID_SRC);

    let output = wumbo(&dir, &["run"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown command: run"));

    let output = wumbo(&dir, &["check", "--annotate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("--annotate is only supported for wumbo unparse")
    );

    let _ = fs::remove_dir_all(&dir);
}
