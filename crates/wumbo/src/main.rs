use std::env;
use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use wumbo_rt::{config, log};
use wumboc::ast::Program;
use wumboc::diag::{Diag, Level, with_path};
use wumboc::sema::symbols::SymbolTable;
use wumboc::unparse::{unparse, unparse_annotated};

const USAGE: &str = r#"usage: wumbo <command> [options] [file]

commands:
  check     Parse + name analysis
  unparse   Print the entry program
  build     Analyze and write build artifacts

options:
  --manifest-path <path>  Path to wumbo.toml (defaults to nearest parent)
  --file <path>           Entry file override
  --annotate              Show resolved types in statements (unparse only)
  --color <auto|always|never>  Colorized CLI output policy
  --clean                 Remove the build directory (build only)
"#;

const MANIFEST_FILE: &str = "wumbo.toml";
const DEFAULT_OUT_DIR: &str = ".wumbo/build";
const PROGRAM_FILE: &str = "program.bin";
const META_FILE: &str = "meta.bin";
const ARTIFACT_FORMAT_VERSION: u32 = 1;
const BUILD_TARGET_FINGERPRINT: &str = env!("WUMBO_BUILD_TARGET");
const BUILD_RUSTC_FINGERPRINT: &str = env!("WUMBO_BUILD_RUSTC_VERSION");
const BUILD_CLI_VERSION_FINGERPRINT: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    package: PackageConfig,
    #[serde(default)]
    unparse: Option<UnparseConfig>,
    #[serde(default)]
    build: Option<BuildConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct PackageConfig {
    #[serde(alias = "main")]
    entry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnparseConfig {
    annotate: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct BuildConfig {
    out_dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
struct BuildMeta {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    entry: String,
    #[serde(default)]
    source_hash: u64,
    #[serde(default)]
    build_target: String,
    #[serde(default)]
    rustc_version: String,
    #[serde(default)]
    cli_version: String,
}

#[derive(Serialize)]
struct ProgramArtifact<'a> {
    version: u32,
    program: &'a Program,
    symbols: &'a SymbolTable,
}

struct Analyzed {
    src: String,
    program: Program,
    symbols: SymbolTable,
}

#[derive(Default)]
struct CommonArgs {
    manifest_path: Option<PathBuf>,
    entry: Option<String>,
    color: Option<ColorChoice>,
    annotate: bool,
    clean: bool,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Command {
    Check,
    Unparse,
    Build,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

static COLOR_MODE: AtomicU8 = AtomicU8::new(0);

fn apply_color_choice(choice: ColorChoice) {
    let mode = match choice {
        ColorChoice::Always => 2,
        ColorChoice::Never => 0,
        ColorChoice::Auto => {
            if env::var_os("NO_COLOR").is_some() {
                0
            } else if color_auto_is_tty() {
                1
            } else {
                0
            }
        }
    };
    COLOR_MODE.store(mode, Ordering::Relaxed);
}

fn color_auto_is_tty() -> bool {
    if let Some(force) = env::var_os("WUMBO_COLOR_FORCE_TTY") {
        return force == "1";
    }
    std::io::stderr().is_terminal()
}

fn color_enabled() -> bool {
    COLOR_MODE.load(Ordering::Relaxed) != 0
}

fn ansi_paint(text: &str, code: &str) -> String {
    if color_enabled() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn style_error(text: &str) -> String {
    ansi_paint(text, "31;1")
}

fn style_warning(text: &str) -> String {
    ansi_paint(text, "33;1")
}

fn style_header(text: &str) -> String {
    ansi_paint(text, "36;1")
}

fn emit_cli_error(message: &str) {
    eprintln!("{}", style_error(&format!("error: {message}")));
}

fn command_tag(command: Command) -> Option<&'static str> {
    match command {
        Command::Check => Some("check"),
        Command::Build => Some("build"),
        Command::Unparse => None,
    }
}

fn emit_command_step(command: Command, message: &str) {
    if let Some(tag) = command_tag(command) {
        eprintln!("{} {message}", style_header(&format!("[{tag}]")));
    }
}

fn finalize_command(command: Command, code: i32) -> i32 {
    match code {
        0 => emit_command_step(command, "ok"),
        _ => emit_command_step(command, "failed"),
    }
    code
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let code = run(args);
    std::process::exit(code);
}

fn run(args: Vec<String>) -> i32 {
    apply_color_choice(ColorChoice::Auto);
    let Some((cmd, rest)) = args.split_first() else {
        eprintln!("{}", style_header(USAGE));
        return 1;
    };
    let command = match cmd.as_str() {
        "check" => Command::Check,
        "unparse" => Command::Unparse,
        "build" => Command::Build,
        _ => {
            emit_cli_error(&format!("unknown command: {cmd}"));
            eprintln!("{}", style_header(USAGE));
            return 1;
        }
    };
    let common = match parse_common_args(rest, command) {
        Ok(args) => args,
        Err(err) => {
            emit_cli_error(&err);
            eprintln!("{}", style_header(USAGE));
            return 1;
        }
    };
    apply_color_choice(common.color.unwrap_or(ColorChoice::Auto));

    let (manifest, manifest_dir) = match load_manifest(common.manifest_path.as_deref()) {
        Ok(value) => value,
        Err(err) => {
            emit_cli_error(&err);
            return 1;
        }
    };
    let entry = match resolve_entry(&common, manifest.as_ref(), manifest_dir.as_deref()) {
        Ok(entry) => entry,
        Err(err) => {
            emit_cli_error(&err);
            return 1;
        }
    };
    log::info(&format!("entry: {}", entry.display()));

    let code = match command {
        Command::Check => run_check(&entry),
        Command::Unparse => {
            let annotate = resolve_annotate(&common, manifest.as_ref());
            run_unparse(&entry, annotate)
        }
        Command::Build => run_build(
            &entry,
            manifest.as_ref(),
            manifest_dir.as_deref(),
            common.clean,
        ),
    };
    finalize_command(command, code)
}

fn parse_common_args(args: &[String], command: Command) -> Result<CommonArgs, String> {
    let mut out = CommonArgs::default();
    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if arg == "--manifest-path" {
            idx += 1;
            let Some(path) = args.get(idx) else {
                return Err("--manifest-path expects a path".to_string());
            };
            out.manifest_path = Some(PathBuf::from(path));
            idx += 1;
            continue;
        }
        if arg == "--file" {
            idx += 1;
            let Some(path) = args.get(idx) else {
                return Err("--file expects a path".to_string());
            };
            out.entry = Some(path.clone());
            idx += 1;
            continue;
        }
        if arg == "--color" {
            idx += 1;
            let Some(choice) = args.get(idx) else {
                return Err("--color expects auto, always, or never".to_string());
            };
            out.color = Some(parse_color(choice)?);
            idx += 1;
            continue;
        }
        if let Some(choice) = arg.strip_prefix("--color=") {
            out.color = Some(parse_color(choice)?);
            idx += 1;
            continue;
        }
        if arg == "--annotate" {
            if command != Command::Unparse {
                return Err("--annotate is only supported for wumbo unparse".to_string());
            }
            out.annotate = true;
            idx += 1;
            continue;
        }
        if arg == "--clean" {
            if command != Command::Build {
                return Err("--clean is only supported for wumbo build".to_string());
            }
            out.clean = true;
            idx += 1;
            continue;
        }
        if arg.starts_with("--") {
            return Err(format!("unknown option: {arg}"));
        }
        if out.entry.is_none() {
            if out.manifest_path.is_none() {
                let candidate = PathBuf::from(arg);
                if candidate.is_dir() && candidate.join(MANIFEST_FILE).exists() {
                    out.manifest_path = Some(candidate);
                    idx += 1;
                    continue;
                }
            }
            out.entry = Some(arg.clone());
            idx += 1;
            continue;
        }
        return Err(format!("unexpected argument: {arg}"));
    }
    Ok(out)
}

fn parse_color(raw: &str) -> Result<ColorChoice, String> {
    ColorChoice::parse(raw)
        .ok_or_else(|| format!("invalid --color value: {raw} (expected auto|always|never)"))
}

fn load_manifest(
    manifest_override: Option<&Path>,
) -> Result<(Option<Manifest>, Option<PathBuf>), String> {
    let (manifest_path, manifest_dir) = if let Some(path) = manifest_override {
        if path.is_dir() {
            (Some(path.join(MANIFEST_FILE)), Some(path.to_path_buf()))
        } else {
            (
                Some(path.to_path_buf()),
                path.parent().map(|p| p.to_path_buf()),
            )
        }
    } else {
        let cwd = env::current_dir().map_err(|err| format!("cwd error: {err}"))?;
        let path = find_manifest(&cwd);
        let dir = path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()));
        (path, dir)
    };

    let Some(path) = manifest_path else {
        return Ok((None, None));
    };
    let content = fs::read_to_string(&path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let manifest: Manifest =
        toml::from_str(&content).map_err(|err| format!("invalid manifest: {err}"))?;
    log::debug(&format!("loaded manifest {}", path.display()));
    Ok((Some(manifest), manifest_dir))
}

fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_FILE))
        .find(|candidate| candidate.exists())
}

fn resolve_entry(
    common: &CommonArgs,
    manifest: Option<&Manifest>,
    manifest_dir: Option<&Path>,
) -> Result<PathBuf, String> {
    let entry = common
        .entry
        .clone()
        .or_else(|| manifest.and_then(|m| m.package.entry.clone()));
    let Some(entry) = entry else {
        return Err(
            "missing entry: pass a file path or set package.entry in wumbo.toml".to_string(),
        );
    };
    let path = PathBuf::from(&entry);
    if path.is_absolute() {
        return Ok(path);
    }
    // A --file path is taken as typed; a manifest entry is relative to the
    // manifest.
    if common.entry.is_none() {
        if let Some(dir) = manifest_dir {
            return Ok(dir.join(path));
        }
    }
    let cwd = env::current_dir().map_err(|err| format!("cwd error: {err}"))?;
    Ok(cwd.join(path))
}

/// Command line wins, then `WUMBO_UNPARSE_ANNOTATE`, then the manifest.
fn resolve_annotate(common: &CommonArgs, manifest: Option<&Manifest>) -> bool {
    if common.annotate {
        return true;
    }
    config::env_flag("unparse", "annotate")
        .or_else(|| manifest.and_then(|m| m.unparse.as_ref()).and_then(|u| u.annotate))
        .unwrap_or(false)
}

fn run_check(entry: &Path) -> i32 {
    match analyze_entry(entry) {
        Ok(_) => 0,
        Err(code) => code,
    }
}

fn run_unparse(entry: &Path, annotate: bool) -> i32 {
    if annotate {
        return match analyze_entry(entry) {
            Ok(analyzed) => {
                print!("{}", unparse_annotated(&analyzed.program, &analyzed.symbols));
                0
            }
            Err(code) => code,
        };
    }
    let src = match read_entry(entry) {
        Ok(src) => src,
        Err(code) => return code,
    };
    let (program, diags) = wumboc::parse_source(&src);
    if emit_diags(&with_path(diags, entry), &src) {
        return 1;
    }
    print!("{}", unparse(&program));
    0
}

fn run_build(
    entry: &Path,
    manifest: Option<&Manifest>,
    manifest_dir: Option<&Path>,
    clean: bool,
) -> i32 {
    let out_dir = match build_dir(manifest, manifest_dir) {
        Ok(dir) => dir,
        Err(err) => {
            emit_cli_error(&err);
            return 1;
        }
    };
    if clean {
        if let Err(err) = clean_build_dir(&out_dir) {
            emit_cli_error(&err);
            return 1;
        }
        return 0;
    }
    let analyzed = match analyze_entry(entry) {
        Ok(analyzed) => analyzed,
        Err(code) => return code,
    };
    let meta = build_meta(entry, &analyzed.src);
    let program_path = out_dir.join(PROGRAM_FILE);
    let cached = load_build_meta(&out_dir.join(META_FILE));
    if program_path.exists() && cached.as_ref() == Some(&meta) {
        emit_command_step(Command::Build, "up to date");
        return 0;
    }
    if let Err(err) = write_artifacts(&out_dir, &analyzed, &meta) {
        emit_cli_error(&err);
        return 1;
    }
    emit_command_step(Command::Build, &format!("wrote {}", program_path.display()));
    0
}

fn read_entry(entry: &Path) -> Result<String, i32> {
    fs::read_to_string(entry).map_err(|err| {
        emit_cli_error(&format!("failed to read {}: {err}", entry.display()));
        1
    })
}

/// Reads, parses and analyzes `entry`, printing every diagnostic. `Err`
/// carries the exit code.
fn analyze_entry(entry: &Path) -> Result<Analyzed, i32> {
    let src = read_entry(entry)?;
    let (mut program, diags) = wumboc::parse_source(&src);
    if emit_diags(&with_path(diags, entry), &src) {
        return Err(1);
    }
    let (analysis, diags) = match wumboc::sema::analyze_program(&mut program) {
        Ok(result) => result,
        Err(err) => {
            log::error(&format!("name analysis aborted on {}", entry.display()));
            eprintln!("{}", style_error(&format!("internal error: {err}")));
            return Err(101);
        }
    };
    if emit_diags(&with_path(diags, entry), &src) {
        return Err(1);
    }
    Ok(Analyzed {
        src,
        program,
        symbols: analysis.symbols,
    })
}

fn build_dir(manifest: Option<&Manifest>, manifest_dir: Option<&Path>) -> Result<PathBuf, String> {
    let base = match manifest_dir {
        Some(dir) => dir.to_path_buf(),
        None => env::current_dir().map_err(|err| format!("cwd error: {err}"))?,
    };
    let configured = config::env_string("build", "out_dir").or_else(|| {
        manifest
            .and_then(|m| m.build.as_ref())
            .and_then(|b| b.out_dir.clone())
    });
    let path = PathBuf::from(configured.unwrap_or_else(|| DEFAULT_OUT_DIR.to_string()));
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(base.join(path))
    }
}

fn clean_build_dir(dir: &Path) -> Result<(), String> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .map_err(|err| format!("failed to remove {}: {err}", dir.display()))?;
    }
    Ok(())
}

fn build_meta(entry: &Path, src: &str) -> BuildMeta {
    let mut hasher = DefaultHasher::new();
    src.hash(&mut hasher);
    BuildMeta {
        version: ARTIFACT_FORMAT_VERSION,
        entry: entry.to_string_lossy().to_string(),
        source_hash: hasher.finish(),
        build_target: BUILD_TARGET_FINGERPRINT.to_string(),
        rustc_version: BUILD_RUSTC_FINGERPRINT.to_string(),
        cli_version: BUILD_CLI_VERSION_FINGERPRINT.to_string(),
    }
}

fn load_build_meta(path: &Path) -> Option<BuildMeta> {
    let bytes = fs::read(path).ok()?;
    let meta: BuildMeta = bincode::deserialize(&bytes).ok()?;
    if meta.version != ARTIFACT_FORMAT_VERSION {
        log::warn(&format!("stale build metadata in {}", path.display()));
        return None;
    }
    Some(meta)
}

fn write_artifacts(out_dir: &Path, analyzed: &Analyzed, meta: &BuildMeta) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("failed to create {}: {err}", out_dir.display()))?;
    let artifact = ProgramArtifact {
        version: ARTIFACT_FORMAT_VERSION,
        program: &analyzed.program,
        symbols: &analyzed.symbols,
    };
    let program_bytes = bincode::serialize(&artifact)
        .map_err(|err| format!("failed to encode program: {err}"))?;
    let meta_bytes =
        bincode::serialize(meta).map_err(|err| format!("failed to encode build meta: {err}"))?;
    let program_path = out_dir.join(PROGRAM_FILE);
    fs::write(&program_path, program_bytes)
        .map_err(|err| format!("failed to write {}: {err}", program_path.display()))?;
    let meta_path = out_dir.join(META_FILE);
    fs::write(&meta_path, meta_bytes)
        .map_err(|err| format!("failed to write {}: {err}", meta_path.display()))?;
    Ok(())
}

/// Prints `diags` with source excerpts; true when any of them is an error.
fn emit_diags(diags: &[Diag], src: &str) -> bool {
    let mut failed = false;
    for diag in diags {
        emit_diag(diag, src);
        failed |= diag.level == Level::Error;
    }
    failed
}

fn styled_diag_level(level: &Level) -> String {
    match level {
        Level::Error => style_error("error"),
        Level::Warning => style_warning("warning"),
    }
}

fn emit_diag(diag: &Diag, src: &str) {
    let level = styled_diag_level(&diag.level);
    let (line, col) = (diag.span.line, diag.span.col);
    match &diag.path {
        Some(path) => eprintln!(
            "{level}: {} ({}:{line}:{col})",
            diag.message,
            path.display()
        ),
        None => eprintln!("{level}: {} ({line}:{col})", diag.message),
    }
    if let Some(line_text) = source_line(src, line) {
        eprintln!("  {line_text}");
        eprintln!(
            "  {}{}",
            " ".repeat((col as usize).saturating_sub(1)),
            style_error("^")
        );
    }
}

fn source_line(src: &str, line: u32) -> Option<&str> {
    let idx = (line as usize).checked_sub(1)?;
    src.lines().nth(idx)
}
