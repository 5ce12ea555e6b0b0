//! CLI integration tests for portcfg.
//!
//! These tests drive the binary with presets, signal files and macro dumps,
//! so no real compiler is needed.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the portcfg binary command, isolated from any user configuration.
fn portcfg(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("portcfg").unwrap();
    cmd.env("HOME", home).env_remove("CXX").current_dir(home);
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const GCC_DUMP: &str = "\
#define __GNUC__ 9
#define __GNUC_MINOR__ 4
#define __GNUC_PATCHLEVEL__ 0
#define __cplusplus 201703L
#define __linux__ 1
#define __x86_64__ 1
#define __SSE2__ 1
#define __ORDER_LITTLE_ENDIAN__ 1234
#define __ORDER_BIG_ENDIAN__ 4321
#define __BYTE_ORDER__ __ORDER_LITTLE_ENDIAN__
#define __CHAR_BIT__ 8
#define __SIZEOF_INT__ 4
#define __SIZEOF_INT128__ 16
#define __GLIBCXX__ 20200808
#define __GLIBC__ 2
#define __GLIBC_MINOR__ 31
#define __EXCEPTIONS 1
#define __cpp_exceptions 199711L
";

// ============================================================================
// portcfg resolve
// ============================================================================

#[test]
fn test_resolve_preset_prints_header() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["resolve", "--preset", "linux-gcc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#ifndef PORTCFG_CONFIG_H_"))
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_MMAP 1"))
        .stdout(predicate::str::contains("#define PORTCFG_ATTRIBUTE_COLD __attribute__((cold))"))
        .stdout(predicate::str::contains("PORTCFG_IS_BIG_ENDIAN").not());
}

#[test]
fn test_resolve_writes_file_with_prefix() {
    let tmp = temp_dir();
    let out = tmp.path().join("include").join("phmap_config.h");

    portcfg(tmp.path())
        .args(["resolve", "--preset", "linux-clang", "--prefix", "PHMAP", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let header = fs::read_to_string(&out).unwrap();
    assert!(header.contains("#ifndef PHMAP_CONFIG_H_"));
    assert!(header.contains("#define PHMAP_HAVE_ATTRIBUTE(x) __has_attribute(x)"));
    assert!(!header.contains("PORTCFG_"));
}

#[test]
fn test_resolve_json() {
    let tmp = temp_dir();

    let output = portcfg(tmp.path())
        .args(["resolve", "--preset", "windows-msvc", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["flags"]["PORTCFG_HAVE_MMAP"], false);
    assert_eq!(value["flags"]["PORTCFG_IS_LITTLE_ENDIAN"], true);
    assert_eq!(
        value["shims"]["PORTCFG_ATTRIBUTE_NORETURN"],
        "__declspec(noreturn)"
    );
}

#[test]
fn test_compiler_version_override_downgrades_predicates() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["resolve", "--preset", "linux-gcc", "--compiler-version", "4.7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_ATTRIBUTE(x) 0\n"))
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_BUILTIN(x) 0\n"))
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_CPP_ATTRIBUTE(x) 0\n"))
        .stdout(predicate::str::contains("HAVE_STD_IS_TRIVIALLY_DESTRUCTIBLE").not());
}

#[test]
fn test_resolve_from_macro_dump() {
    let tmp = temp_dir();
    let dump = tmp.path().join("gcc.macros");
    fs::write(&dump, GCC_DUMP).unwrap();

    portcfg(tmp.path())
        .args(["resolve", "--macros"])
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_INTRINSIC_INT128 1"))
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_EXCEPTIONS 1"))
        .stdout(predicate::str::contains("#define PORTCFG_HAVE_SSE2 1"));
}

#[test]
fn test_project_config_sets_prefix_and_overrides() {
    let tmp = temp_dir();
    fs::create_dir_all(tmp.path().join(".portcfg")).unwrap();
    fs::write(
        tmp.path().join(".portcfg").join("config.toml"),
        "[output]\nprefix = \"MYLIB\"\n\n[overrides]\nsse2 = false\n",
    )
    .unwrap();

    portcfg(tmp.path())
        .args(["resolve", "--preset", "linux-gcc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#ifndef MYLIB_CONFIG_H_"))
        .stdout(predicate::str::contains("// MYLIB_HAVE_SSE2 is supplied by the build (0)"))
        .stdout(predicate::str::contains("emmintrin").not());
}

// ============================================================================
// Negotiation failures
// ============================================================================

#[test]
fn test_old_gcc_is_rejected_with_exit_code_2() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["resolve", "--preset", "linux-gcc", "--compiler-version", "4.6"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unsupported build environment"))
        .stderr(predicate::str::contains("GCC 4.7 or newer"));
}

#[test]
fn test_gcc_signal_file_without_gnuc_is_rejected() {
    let tmp = temp_dir();
    let signals = tmp.path().join("old-gcc.toml");
    fs::write(
        &signals,
        "[compiler]\nfamily = \"gcc\"\nversion = \"4.6\"\n\n[library]\nstdlib = \"libstdc++\"\n",
    )
    .unwrap();

    portcfg(tmp.path())
        .args(["check", "--signals"])
        .arg(&signals)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("GCC 4.7 or newer"));
}

#[test]
fn test_predefined_flag_conflicts() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["resolve", "--preset", "linux-gcc", "-D", "PORTCFG_HAVE_MMAP=1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("`PORTCFG_HAVE_MMAP` is defined twice"))
        .stderr(predicate::str::contains("-DPORTCFG_HAVE_MMAP"));
}

#[test]
fn test_unknown_preset_is_a_usage_error() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["check", "--preset", "amiga-sas-c"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown preset `amiga-sas-c`"));
}

// ============================================================================
// portcfg check / probe
// ============================================================================

#[test]
fn test_check_accepts_supported_environment() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["check", "--preset", "macos-apple-clang"])
        .assert()
        .success()
        .stdout(predicate::str::contains("meets every minimum requirement"));
}

#[test]
fn test_probe_round_trips_through_signal_file() {
    let tmp = temp_dir();
    let signals = tmp.path().join("signals.toml");

    portcfg(tmp.path())
        .args(["probe", "--preset", "android-clang", "-o"])
        .arg(&signals)
        .assert()
        .success();

    let text = fs::read_to_string(&signals).unwrap();
    assert!(text.starts_with("# fingerprint: "));
    assert!(text.contains("android"));

    let from_preset = portcfg(tmp.path())
        .args(["resolve", "--preset", "android-clang"])
        .output()
        .unwrap();
    let from_file = portcfg(tmp.path())
        .args(["resolve", "--signals"])
        .arg(&signals)
        .output()
        .unwrap();
    assert!(from_file.status.success());
    assert_eq!(from_preset.stdout, from_file.stdout);
}

// ============================================================================
// portcfg explain
// ============================================================================

#[test]
fn test_explain_flag() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["explain", "PORTCFG_HAVE_MMAP", "--preset", "linux-gcc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORTCFG_HAVE_MMAP"))
        .stdout(predicate::str::contains("decided by: rule"))
        .stdout(predicate::str::contains("result: present"));
}

#[test]
fn test_explain_shim_fallback() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["explain", "attribute_weak", "--preset", "unknown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("decided by: fallback"))
        .stdout(predicate::str::contains("marker: PORTCFG_HAVE_ATTRIBUTE_WEAK = 0"));
}

#[test]
fn test_explain_unknown_name() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["explain", "HAVE_FLUX_CAPACITOR", "--preset", "linux-gcc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a known configuration name"));
}

// ============================================================================
// portcfg matrix
// ============================================================================

#[test]
fn test_matrix_run() {
    let tmp = temp_dir();
    let matrix = tmp.path().join("matrix.toml");
    fs::write(
        &matrix,
        r#"
[[case]]
name = "gcc-4.7"
preset = "linux-gcc"
compiler-version = "4.7"
absent = ["HAVE_STD_IS_TRIVIALLY_DESTRUCTIBLE"]

[[case]]
name = "gcc-4.6"
preset = "linux-gcc"
compiler-version = "4.6"
expect = "unsupported"
"#,
    )
    .unwrap();

    portcfg(tmp.path())
        .arg("matrix")
        .arg(&matrix)
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] gcc-4.7"))
        .stdout(predicate::str::contains("2 passed, 0 failed"));
}

#[test]
fn test_matrix_failure_exits_nonzero() {
    let tmp = temp_dir();
    let matrix = tmp.path().join("matrix.toml");
    fs::write(
        &matrix,
        "[[case]]\nname = \"msvc-mmap\"\npreset = \"windows-msvc\"\npresent = [\"HAVE_MMAP\"]\n",
    )
    .unwrap();

    portcfg(tmp.path())
        .arg("matrix")
        .arg(&matrix)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[!!] msvc-mmap"))
        .stderr(predicate::str::contains("1 of 1 matrix cases failed"));
}

// ============================================================================
// portcfg completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    portcfg(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("portcfg"));
}
