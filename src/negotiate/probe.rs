//! Environment probe.
//!
//! Reads a predefined-macro table into [`Signals`]. The probe never fails
//! and never judges: anything it cannot recognize becomes `Unknown` or
//! `None`, and the gate decides what to make of it.
//!
//! `__has_attribute`, `__has_cpp_attribute`, `__has_feature` and
//! `__has_builtin` answers are not visible in a macro dump, so they are
//! filled from the knowledge tables below, keyed on compiler family and
//! version. Signal files may state them explicitly instead.

use std::collections::BTreeSet;

use semver::Version;
use tracing::debug;

use crate::core::macros::MacroTable;
use crate::core::signal::{
    cxx, Arch, ByteOrder, CompilerFamily, CompilerSignals, ExceptionSwitch, MsvcVersion,
    Sanitizer, Signals, SimdExtension, StdLib, TargetOs,
};

/// Switch (after the prefix) that opts out of XRay attributes.
pub const NO_XRAY_SWITCH: &str = "NO_XRAY_ATTRIBUTES";

/// Library feature-test macros and the header each implies.
const LIBRARY_FEATURE_HEADERS: &[(&str, &str)] = &[
    ("__cpp_lib_any", "any"),
    ("__cpp_lib_optional", "optional"),
    ("__cpp_lib_variant", "variant"),
    ("__cpp_lib_string_view", "string_view"),
];

/// Read signals from a macro table.
///
/// Macros starting with `<prefix>_` are recorded as pre-existing
/// configuration definitions.
pub fn from_macros(macros: &MacroTable, prefix: &str) -> Signals {
    let mut s = Signals::default();

    s.compiler = compiler(macros);
    read_target(macros, &mut s);
    read_library(macros, &mut s);
    read_language(macros, &mut s);
    read_build(macros, prefix, &mut s);

    fill_predicates(&mut s);

    debug!(
        "probe: {} {} on {} {} ({} macros)",
        s.compiler.family,
        s.compiler.version,
        s.target.arch,
        s.target.os,
        macros.len()
    );
    s
}

fn triple(macros: &MacroTable, major: &str, minor: &str, patch: &str) -> Option<Version> {
    let major = macros.uint(major)?;
    Some(Version::new(
        major,
        macros.uint(minor).unwrap_or(0),
        macros.uint(patch).unwrap_or(0),
    ))
}

fn compiler(macros: &MacroTable) -> CompilerSignals {
    let mut c = CompilerSignals {
        gnuc: triple(
            macros,
            "__GNUC__",
            "__GNUC_MINOR__",
            "__GNUC_PATCHLEVEL__",
        ),
        apple_build: macros.uint("__apple_build_version__"),
        ..CompilerSignals::default()
    };

    if let Some(ver) = macros.uint("_MSC_VER").and_then(|v| u32::try_from(v).ok()) {
        c.msvc = Some(MsvcVersion {
            ver,
            full: macros
                .uint("_MSC_FULL_VER")
                .unwrap_or(u64::from(ver) * 100_000),
            lang: macros.uint("_MSVC_LANG").and_then(|v| u32::try_from(v).ok()),
        });
    }

    if macros.is_defined("__CUDACC__") {
        c.cuda = Some(
            triple(macros, "__CUDACC_VER_MAJOR__", "__CUDACC_VER_MINOR__", "__CUDACC_VER_BUILD__")
                .unwrap_or_else(|| Version::new(0, 0, 0)),
        );
    }

    if macros.is_defined("__clang__") {
        c.family = if c.apple_build.is_some() {
            CompilerFamily::AppleClang
        } else {
            CompilerFamily::Clang
        };
        c.version = triple(
            macros,
            "__clang_major__",
            "__clang_minor__",
            "__clang_patchlevel__",
        )
        .unwrap_or_else(|| Version::new(0, 0, 0));
    } else if let Some(msvc) = &c.msvc {
        c.family = CompilerFamily::Msvc;
        c.version = Version::new(u64::from(msvc.ver / 100), u64::from(msvc.ver % 100), 0);
    } else if let Some(gnuc) = &c.gnuc {
        c.family = CompilerFamily::Gcc;
        c.version = gnuc.clone();
    }

    c
}

/// Fill the predicate answers from the knowledge tables.
pub fn fill_predicates(s: &mut Signals) {
    s.language.attributes = known_attributes(&s.compiler);
    s.language.cpp_attributes = known_cpp_attributes(&s.compiler, s.language.cplusplus);
    s.language.builtins = known_builtins(&s.compiler);
    s.language.features = known_features(&s.compiler, &s.language.exceptions);
}

/// Replace the compiler version and re-derive the predicates that depend
/// on it.
pub fn override_compiler_version(s: &mut Signals, version: Version) {
    s.set_compiler_version(version);
    if s.compiler.family == CompilerFamily::Gcc {
        s.language.has_include = is_gcc_at_least(&s.compiler, 5);
    }
    fill_predicates(s);
    debug!("probe: compiler version overridden to {}", s.compiler.version);
}

/// Decode an Apple deployment-target macro.
///
/// Five and six digit values read `MMmmpp` (`80000`, `101400`); four
/// digit values are the older macOS `Mmp` form (`1090`).
pub fn apple_version(raw: u64) -> Version {
    if raw >= 10_000 {
        Version::new(raw / 10_000, (raw / 100) % 100, raw % 100)
    } else {
        Version::new(raw / 100, (raw / 10) % 10, raw % 10)
    }
}

fn read_target(macros: &MacroTable, s: &mut Signals) {
    let t = &mut s.target;
    let any = |names: &[&str]| names.iter().any(|n| macros.is_defined(n));

    t.arch = if any(&["__x86_64__", "_M_X64", "_M_AMD64"]) {
        Arch::X86_64
    } else if any(&["__i386__", "_M_IX86"]) {
        Arch::X86
    } else if any(&["__aarch64__", "_M_ARM64"]) {
        Arch::Aarch64
    } else if any(&["__arm__", "_M_ARM"]) {
        Arch::Arm
    } else if any(&["__wasm32__"]) {
        Arch::Wasm32
    } else if any(&["__powerpc64__", "__ppc64__"]) {
        Arch::Powerpc64
    } else if macros.is_defined("__riscv") && macros.int("__riscv_xlen") == Some(64) {
        Arch::Riscv64
    } else if any(&["__s390x__"]) {
        Arch::S390x
    } else {
        Arch::Unknown
    };

    t.os = if any(&["__CYGWIN__"]) {
        TargetOs::Cygwin
    } else if any(&["__ANDROID__"]) {
        TargetOs::Android
    } else if any(&["__APPLE__"]) {
        if any(&["__ENVIRONMENT_IPHONE_OS_VERSION_MIN_REQUIRED__"]) {
            TargetOs::Ios
        } else if any(&["__ENVIRONMENT_TV_OS_VERSION_MIN_REQUIRED__"]) {
            TargetOs::Tvos
        } else if any(&["__ENVIRONMENT_WATCH_OS_VERSION_MIN_REQUIRED__"]) {
            TargetOs::Watchos
        } else {
            TargetOs::Macos
        }
    } else if any(&["__linux__"]) {
        TargetOs::Linux
    } else if any(&["_WIN32"]) {
        TargetOs::Windows
    } else if any(&["__FreeBSD__"]) {
        TargetOs::Freebsd
    } else if any(&["__Fuchsia__"]) {
        TargetOs::Fuchsia
    } else if any(&["__sun"]) {
        TargetOs::Solaris
    } else if any(&["__EMSCRIPTEN__", "__asmjs__"]) {
        TargetOs::Emscripten
    } else if any(&["__native_client__"]) {
        TargetOs::NativeClient
    } else if any(&["__ros__"]) {
        TargetOs::Akaros
    } else if any(&["__ASYLO__"]) {
        TargetOs::Asylo
    } else {
        TargetOs::Unknown
    };

    t.ios_min = macros
        .uint("__IPHONE_OS_VERSION_MIN_REQUIRED")
        .or_else(|| macros.uint("__ENVIRONMENT_IPHONE_OS_VERSION_MIN_REQUIRED__"))
        .map(apple_version);
    t.macos_min = macros
        .uint("__ENVIRONMENT_MAC_OS_X_VERSION_MIN_REQUIRED__")
        .map(apple_version);
    t.android_ndk = triple(macros, "__NDK_MAJOR__", "__NDK_MINOR__", "__NDK_BUILD__");

    t.byte_order = byte_order(macros);
    if let Some(bits) = macros.uint("__CHAR_BIT__").and_then(|v| u32::try_from(v).ok()) {
        t.char_bits = bits;
    }
    if let Some(size) = macros.uint("__SIZEOF_INT__").and_then(|v| u32::try_from(v).ok()) {
        t.int_bits = size * 8;
    }

    if macros.is_defined("__SSE2__") {
        t.simd.insert(SimdExtension::Sse2);
    }
    if macros.is_defined("__SSSE3__") {
        t.simd.insert(SimdExtension::Ssse3);
    }
    t.ix86_fp = macros.uint("_M_IX86_FP").and_then(|v| u32::try_from(v).ok());
}

fn byte_order(macros: &MacroTable) -> Option<ByteOrder> {
    let raw = macros.get("__BYTE_ORDER__")?.trim();
    let value = macros.int("__BYTE_ORDER__");
    let matches = |order: &str| raw == order || (value.is_some() && macros.int(order) == value);

    if matches("__ORDER_LITTLE_ENDIAN__") {
        Some(ByteOrder::Little)
    } else if matches("__ORDER_BIG_ENDIAN__") {
        Some(ByteOrder::Big)
    } else {
        None
    }
}

fn read_library(macros: &MacroTable, s: &mut Signals) {
    let lib = &mut s.library;
    lib.stdlib = if macros.is_defined("_STLPORT_VERSION") {
        StdLib::Stlport
    } else if macros.is_defined("_LIBCPP_VERSION") {
        StdLib::Libcxx
    } else if macros.is_defined("__GLIBCXX__") {
        StdLib::Libstdcxx
    } else if macros.is_defined("_MSC_VER") {
        StdLib::MsvcStl
    } else {
        StdLib::Unknown
    };
    lib.glibcxx_tls = macros.truthy("_GLIBCXX_HAVE_TLS");
    lib.glibc = triple(macros, "__GLIBC__", "__GLIBC_MINOR__", "__GLIBC_PATCHLEVEL__");
    lib.glibc_prereq = macros.is_defined("__GLIBC_PREREQ");
}

fn read_language(macros: &MacroTable, s: &mut Signals) {
    let gcc5 = is_gcc_at_least(&s.compiler, 5);
    let has_include = macros.is_defined("__has_include") || s.is_clang() || gcc5;

    let lang = &mut s.language;
    lang.cplusplus = macros
        .uint("__cplusplus")
        .and_then(|v| u32::try_from(v).ok());
    lang.has_include = has_include;

    for (feature, header) in LIBRARY_FEATURE_HEADERS {
        if macros.is_defined(feature) {
            lang.headers.insert(header.to_string());
        }
    }

    lang.int128 = macros.is_defined("__SIZEOF_INT128__");

    if macros.is_defined("__EXCEPTIONS") {
        lang.exceptions.insert(ExceptionSwitch::Gnu);
    }
    if macros.is_defined("__cpp_exceptions") {
        lang.exceptions.insert(ExceptionSwitch::Cpp);
    }
    if macros.is_defined("_CPPUNWIND") {
        lang.exceptions.insert(ExceptionSwitch::MsvcUnwind);
    }
}

/// Read build switches into `s`, adding to what is already there.
///
/// Also used for `-D` switches given alongside a preset or signal file.
pub fn read_build(macros: &MacroTable, prefix: &str, s: &mut Signals) {
    let b = &mut s.build;
    for san in Sanitizer::ALL {
        if macros.is_defined(san.switch_macro()) {
            b.sanitizers.insert(san);
        }
    }
    b.debug |= macros.is_defined("_DEBUG");

    let head = format!("{}_", prefix);
    for (name, value) in macros.with_prefix(&head) {
        let bare = &name[head.len()..];
        if bare == NO_XRAY_SWITCH {
            b.no_xray = true;
        } else {
            b.predefined.insert(bare.to_string(), value.to_string());
        }
    }
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn is_gcc_at_least(compiler: &CompilerSignals, major: u64) -> bool {
    compiler.family == CompilerFamily::Gcc && compiler.version.major >= major
}

/// `__has_attribute` answers for a compiler; `None` when the predicate is
/// unavailable (GCC before 5, MSVC, unknown compilers).
pub fn known_attributes(compiler: &CompilerSignals) -> Option<BTreeSet<String>> {
    const COMMON: &[&str] = &[
        "aligned",
        "always_inline",
        "cold",
        "force_align_arg_pointer",
        "format",
        "hot",
        "noinline",
        "nonnull",
        "noreturn",
        "no_sanitize_address",
        "no_sanitize_thread",
        "packed",
        "returns_nonnull",
        "section",
        "tls_model",
        "unused",
        "warn_unused_result",
        "weak",
    ];

    match compiler.family {
        CompilerFamily::Clang | CompilerFamily::AppleClang => {
            let mut attrs = set(COMMON);
            attrs.extend(set(&["disable_tail_calls", "no_sanitize", "no_sanitize_memory"]));
            Some(attrs)
        }
        CompilerFamily::Gcc if is_gcc_at_least(compiler, 5) => {
            let mut attrs = set(COMMON);
            attrs.insert("optimize".to_string());
            if is_gcc_at_least(compiler, 8) {
                attrs.insert("no_sanitize".to_string());
            }
            Some(attrs)
        }
        _ => None,
    }
}

/// `__has_cpp_attribute` answers; `None` outside C++ or without the predicate.
pub fn known_cpp_attributes(
    compiler: &CompilerSignals,
    cplusplus: Option<u32>,
) -> Option<BTreeSet<String>> {
    let level = cplusplus?;
    match compiler.family {
        CompilerFamily::Clang => {
            let mut attrs = set(&[
                "clang::reinitializes",
                "clang::require_constant_initialization",
                "clang::xray_always_instrument",
                "clang::xray_log_args",
                "clang::xray_never_instrument",
            ]);
            if compiler.version.major >= 10 {
                attrs.insert("nodiscard".to_string());
            }
            Some(attrs)
        }
        // Apple's toolchain ships without XRay.
        CompilerFamily::AppleClang => {
            let mut attrs = set(&[
                "clang::reinitializes",
                "clang::require_constant_initialization",
            ]);
            if compiler.version.major >= 12 {
                attrs.insert("nodiscard".to_string());
            }
            Some(attrs)
        }
        CompilerFamily::Gcc if is_gcc_at_least(compiler, 5) => {
            let mut attrs = BTreeSet::new();
            if is_gcc_at_least(compiler, 7) && level >= cxx::CXX17 {
                attrs.insert("nodiscard".to_string());
            }
            Some(attrs)
        }
        _ => None,
    }
}

/// `__has_builtin` answers; `None` when the predicate is unavailable.
pub fn known_builtins(compiler: &CompilerSignals) -> Option<BTreeSet<String>> {
    const BUILTINS: &[&str] = &[
        "__builtin_clz",
        "__builtin_clzll",
        "__builtin_ctz",
        "__builtin_ctzll",
        "__builtin_expect",
        "__builtin_popcount",
        "__builtin_popcountll",
        "__builtin_prefetch",
        "__builtin_unreachable",
    ];
    match compiler.family {
        CompilerFamily::Clang | CompilerFamily::AppleClang => Some(set(BUILTINS)),
        CompilerFamily::Gcc if is_gcc_at_least(compiler, 10) => Some(set(BUILTINS)),
        _ => None,
    }
}

/// `__has_feature` answers. Only Clang has the predicate.
pub fn known_features(
    compiler: &CompilerSignals,
    exceptions: &BTreeSet<ExceptionSwitch>,
) -> BTreeSet<String> {
    let mut features = BTreeSet::new();
    if matches!(
        compiler.family,
        CompilerFamily::Clang | CompilerFamily::AppleClang
    ) {
        features.insert("cxx_thread_local".to_string());
        if exceptions.contains(&ExceptionSwitch::Gnu) || exceptions.contains(&ExceptionSwitch::Cpp) {
            features.insert("cxx_exceptions".to_string());
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCC48_DUMP: &str = "\
#define __GNUC__ 4
#define __GNUC_MINOR__ 8
#define __GNUC_PATCHLEVEL__ 5
#define __cplusplus 201103L
#define __x86_64__ 1
#define __linux__ 1
#define __SSE2__ 1
#define __CHAR_BIT__ 8
#define __SIZEOF_INT__ 4
#define __SIZEOF_INT128__ 16
#define __ORDER_LITTLE_ENDIAN__ 1234
#define __ORDER_BIG_ENDIAN__ 4321
#define __BYTE_ORDER__ __ORDER_LITTLE_ENDIAN__
#define __EXCEPTIONS 1
#define __cpp_exceptions 199711
#define __GLIBCXX__ 20150623
#define _GLIBCXX_HAVE_TLS 1
#define __GLIBC__ 2
#define __GLIBC_MINOR__ 17
#define __GLIBC_PREREQ(maj,min) ((__GLIBC__ << 16) + __GLIBC_MINOR__ >= ((maj) << 16) + (min))
";

    const CLANG_DUMP: &str = "\
#define __clang__ 1
#define __clang_major__ 16
#define __clang_minor__ 0
#define __clang_patchlevel__ 6
#define __GNUC__ 4
#define __GNUC_MINOR__ 2
#define __GNUC_PATCHLEVEL__ 1
#define __cplusplus 201703L
#define __aarch64__ 1
#define __APPLE__ 1
#define __ENVIRONMENT_MAC_OS_X_VERSION_MIN_REQUIRED__ 101300
#define __apple_build_version__ 16000026
#define _LIBCPP_VERSION 16000
#define __BYTE_ORDER__ 1234
#define __ORDER_LITTLE_ENDIAN__ 1234
#define __cpp_lib_optional 201606L
";

    #[test]
    fn test_gcc_dump() {
        let s = from_macros(&MacroTable::parse(GCC48_DUMP), "PORTCFG");
        assert_eq!(s.compiler.family, CompilerFamily::Gcc);
        assert_eq!(s.compiler.version, Version::new(4, 8, 5));
        assert_eq!(s.compiler.gnuc, Some(Version::new(4, 8, 5)));
        assert_eq!(s.target.arch, Arch::X86_64);
        assert_eq!(s.target.os, TargetOs::Linux);
        assert_eq!(s.target.byte_order, Some(ByteOrder::Little));
        assert_eq!(s.target.int_bits, 32);
        assert!(s.target.simd.contains(&SimdExtension::Sse2));
        assert_eq!(s.library.stdlib, StdLib::Libstdcxx);
        assert!(s.library.glibcxx_tls);
        assert!(s.library.glibc_prereq);
        assert_eq!(s.library.glibc, Some(Version::new(2, 17, 0)));
        assert_eq!(s.language.cplusplus, Some(201103));
        assert!(s.language.int128);
        assert!(s.language.exceptions.contains(&ExceptionSwitch::Gnu));
        // GCC 4.8 has no __has_attribute.
        assert!(s.language.attributes.is_none());
        assert!(!s.language.has_include);
    }

    #[test]
    fn test_apple_clang_dump() {
        let s = from_macros(&MacroTable::parse(CLANG_DUMP), "PORTCFG");
        assert_eq!(s.compiler.family, CompilerFamily::AppleClang);
        assert_eq!(s.compiler.version, Version::new(16, 0, 6));
        assert_eq!(s.compiler.apple_build, Some(16_000_026));
        assert_eq!(s.target.os, TargetOs::Macos);
        assert_eq!(s.target.macos_min, Some(Version::new(10, 13, 0)));
        assert_eq!(s.library.stdlib, StdLib::Libcxx);
        assert_eq!(s.target.byte_order, Some(ByteOrder::Little));
        assert!(s.language.has_include);
        assert!(s.language.headers.contains("optional"));
        assert!(s.language.features.contains("cxx_thread_local"));
        assert!(s.language.attributes.as_ref().unwrap().contains("disable_tail_calls"));
    }

    #[test]
    fn test_msvc_table() {
        let macros = MacroTable::from_switches([
            "_MSC_VER=1916",
            "_MSC_FULL_VER=191627051",
            "_MSVC_LANG=201703L",
            "_WIN32",
            "_M_X64=100",
            "_CPPUNWIND",
            "_DEBUG",
        ]);
        let s = from_macros(&macros, "PORTCFG");
        assert_eq!(s.compiler.family, CompilerFamily::Msvc);
        assert_eq!(s.compiler.version, Version::new(19, 16, 0));
        let msvc = s.compiler.msvc.as_ref().unwrap();
        assert_eq!(msvc.full, 191_627_051);
        assert_eq!(msvc.lang, Some(201703));
        assert_eq!(s.target.os, TargetOs::Windows);
        assert_eq!(s.target.arch, Arch::X86_64);
        assert_eq!(s.library.stdlib, StdLib::MsvcStl);
        assert!(s.build.debug);
        assert!(s.target.byte_order.is_none());
    }

    #[test]
    fn test_unrecognized_is_unknown() {
        let s = from_macros(&MacroTable::new(), "PORTCFG");
        assert_eq!(s.compiler.family, CompilerFamily::Unknown);
        assert_eq!(s.target.os, TargetOs::Unknown);
        assert_eq!(s.target.char_bits, 8);
        assert!(s.language.cplusplus.is_none());
    }

    #[test]
    fn test_apple_version_formats() {
        assert_eq!(apple_version(101400), Version::new(10, 14, 0));
        assert_eq!(apple_version(90000), Version::new(9, 0, 0));
        assert_eq!(apple_version(80000), Version::new(8, 0, 0));
        assert_eq!(apple_version(10000), Version::new(1, 0, 0));
        assert_eq!(apple_version(1090), Version::new(10, 9, 0));
        assert_eq!(apple_version(120100), Version::new(12, 1, 0));
    }

    #[test]
    fn test_ios_8_dump_has_no_thread_local() {
        let dump = "\
#define __clang__ 1
#define __clang_major__ 12
#define __clang_minor__ 0
#define __GNUC__ 4
#define __GNUC_MINOR__ 2
#define __GNUC_PATCHLEVEL__ 1
#define __apple_build_version__ 12000032
#define __cplusplus 201402L
#define __aarch64__ 1
#define __APPLE__ 1
#define __ENVIRONMENT_IPHONE_OS_VERSION_MIN_REQUIRED__ 80000
#define _LIBCPP_VERSION 11000
#define __BYTE_ORDER__ __ORDER_LITTLE_ENDIAN__
#define __ORDER_LITTLE_ENDIAN__ 1234
";
        let s = from_macros(&MacroTable::parse(dump), "PORTCFG");
        assert_eq!(s.target.os, TargetOs::Ios);
        assert_eq!(s.target.ios_min, Some(Version::new(8, 0, 0)));

        let config = crate::negotiate(&s).unwrap();
        assert!(!config.has(crate::CapabilityFlag::ThreadLocal));
    }

    #[test]
    fn test_ndk_version_from_dump() {
        let macros = MacroTable::from_switches([
            "__clang__",
            "__clang_major__=3",
            "__clang_minor__=8",
            "__GNUC__=4",
            "__GNUC_MINOR__=2",
            "__cplusplus=201103L",
            "__ANDROID__",
            "__linux__",
            "__aarch64__",
            "__NDK_MAJOR__=11",
            "__NDK_MINOR__=0",
            "__BYTE_ORDER__=1234",
            "__ORDER_LITTLE_ENDIAN__=1234",
        ]);
        let s = from_macros(&macros, "PORTCFG");
        assert_eq!(s.target.android_ndk, Some(Version::new(11, 0, 0)));

        let config = crate::negotiate(&s).unwrap();
        assert!(!config.has(crate::CapabilityFlag::ThreadLocal));
        assert!(!config.has(crate::CapabilityFlag::Tls));
    }

    #[test]
    fn test_version_override_refreshes_predicates() {
        let mut s = crate::core::presets::linux_gcc(Version::new(11, 4, 0));
        assert!(s.language.builtins.is_some());

        override_compiler_version(&mut s, Version::new(4, 7, 0));
        assert_eq!(s.compiler.gnuc, Some(Version::new(4, 7, 0)));
        assert!(s.language.attributes.is_none());
        assert!(s.language.builtins.is_none());
        assert!(!s.language.has_include);

        let mut clang = crate::core::presets::linux_clang(Version::new(16, 0, 0));
        override_compiler_version(&mut clang, Version::new(9, 0, 0));
        assert!(clang.language.has_include);
        assert!(!clang
            .language
            .cpp_attributes
            .as_ref()
            .unwrap()
            .contains("nodiscard"));
    }

    #[test]
    fn test_build_switches_and_predefined() {
        let macros = MacroTable::from_switches([
            "ADDRESS_SANITIZER",
            "PORTCFG_HAVE_SSE2=0",
            "PORTCFG_NO_XRAY_ATTRIBUTES",
        ]);
        let s = from_macros(&macros, "PORTCFG");
        assert!(s.build.sanitizers.contains(&Sanitizer::Address));
        assert!(s.build.no_xray);
        assert_eq!(s.build.predefined.get("HAVE_SSE2").map(|v| v.as_str()), Some("0"));
        assert!(!s.build.predefined.contains_key(NO_XRAY_SWITCH));
    }

    #[test]
    fn test_knowledge_tables() {
        let mut gcc = CompilerSignals {
            family: CompilerFamily::Gcc,
            version: Version::new(4, 9, 0),
            ..CompilerSignals::default()
        };
        assert!(known_attributes(&gcc).is_none());
        assert!(known_builtins(&gcc).is_none());

        gcc.version = Version::new(7, 1, 0);
        assert!(known_attributes(&gcc).unwrap().contains("optimize"));
        assert!(known_cpp_attributes(&gcc, Some(cxx::CXX17))
            .unwrap()
            .contains("nodiscard"));
        assert!(known_cpp_attributes(&gcc, None).is_none());
        assert!(known_features(&gcc, &BTreeSet::new()).is_empty());
    }
}
