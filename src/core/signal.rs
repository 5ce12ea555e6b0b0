//! Static signals describing a build environment.
//!
//! Signals are read-only facts about the toolchain, target and language
//! level. They are produced by the probe from a predefined-macro dump, or
//! deserialized from a signal file, and are never modified by negotiation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::util::hash::Fingerprint;

/// Well-known `__cplusplus` values.
pub mod cxx {
    pub const CXX11: u32 = 201103;
    pub const CXX14: u32 = 201402;
    pub const CXX17: u32 = 201703;
    pub const CXX20: u32 = 202002;
}

/// Compiler family, as identified by its vendor macros.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// GNU Compiler Collection
    Gcc,
    /// LLVM Clang (including clang-cl)
    Clang,
    /// Apple's Xcode Clang
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
    /// Anything we cannot identify
    #[default]
    Unknown,
}

impl CompilerFamily {
    /// Get the family name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
            CompilerFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CompilerFamily {
    type Err = CompilerFamilyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" | "g++" => Ok(CompilerFamily::Gcc),
            "clang" | "clang++" => Ok(CompilerFamily::Clang),
            "apple-clang" | "appleclang" => Ok(CompilerFamily::AppleClang),
            "msvc" | "cl" => Ok(CompilerFamily::Msvc),
            "unknown" => Ok(CompilerFamily::Unknown),
            _ => Err(CompilerFamilyParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid compiler family.
#[derive(Debug, Clone)]
pub struct CompilerFamilyParseError(pub String);

impl fmt::Display for CompilerFamilyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid compiler family '{}', valid values: gcc, clang, apple-clang, msvc, unknown",
            self.0
        )
    }
}

impl std::error::Error for CompilerFamilyParseError {}

/// Target CPU architecture.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Aarch64,
    Arm,
    Wasm32,
    Powerpc64,
    Riscv64,
    S390x,
    #[default]
    Unknown,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Arm => "arm",
            Arch::Wasm32 => "wasm32",
            Arch::Powerpc64 => "powerpc64",
            Arch::Riscv64 => "riscv64",
            Arch::S390x => "s390x",
            Arch::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Target operating system family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TargetOs {
    Linux,
    Android,
    Macos,
    Ios,
    Tvos,
    Watchos,
    Windows,
    Cygwin,
    Freebsd,
    Fuchsia,
    Solaris,
    Emscripten,
    NativeClient,
    Akaros,
    Asylo,
    #[default]
    Unknown,
}

impl TargetOs {
    /// `__APPLE__` platforms.
    pub fn is_apple(&self) -> bool {
        matches!(
            self,
            TargetOs::Macos | TargetOs::Ios | TargetOs::Tvos | TargetOs::Watchos
        )
    }

    /// Platforms where `TARGET_OS_IPHONE` is set.
    pub fn is_iphone(&self) -> bool {
        matches!(self, TargetOs::Ios | TargetOs::Tvos | TargetOs::Watchos)
    }

    /// Platforms that define `__linux__` (Android included).
    pub fn is_linux(&self) -> bool {
        matches!(self, TargetOs::Linux | TargetOs::Android)
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetOs::Linux => "linux",
            TargetOs::Android => "android",
            TargetOs::Macos => "macos",
            TargetOs::Ios => "ios",
            TargetOs::Tvos => "tvos",
            TargetOs::Watchos => "watchos",
            TargetOs::Windows => "windows",
            TargetOs::Cygwin => "cygwin",
            TargetOs::Freebsd => "freebsd",
            TargetOs::Fuchsia => "fuchsia",
            TargetOs::Solaris => "solaris",
            TargetOs::Emscripten => "emscripten",
            TargetOs::NativeClient => "native-client",
            TargetOs::Akaros => "akaros",
            TargetOs::Asylo => "asylo",
            TargetOs::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// C++ standard library implementation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StdLib {
    /// GNU libstdc++ (`__GLIBCXX__`)
    #[serde(rename = "libstdc++")]
    Libstdcxx,
    /// LLVM libc++ (`_LIBCPP_VERSION`)
    #[serde(rename = "libc++")]
    Libcxx,
    /// Microsoft STL
    MsvcStl,
    /// STLport (`_STLPORT_VERSION`)
    Stlport,
    #[default]
    Unknown,
}

impl fmt::Display for StdLib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StdLib::Libstdcxx => "libstdc++",
            StdLib::Libcxx => "libc++",
            StdLib::MsvcStl => "msvc-stl",
            StdLib::Stlport => "stlport",
            StdLib::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Byte order reported by the compiler's `__BYTE_ORDER__` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

/// Sanitizers enabled by the build invocation (`-DADDRESS_SANITIZER` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sanitizer {
    Address,
    Memory,
    Thread,
    Undefined,
    Cfi,
    SafeStack,
}

impl Sanitizer {
    /// All sanitizers, in declaration order.
    pub const ALL: [Sanitizer; 6] = [
        Sanitizer::Address,
        Sanitizer::Memory,
        Sanitizer::Thread,
        Sanitizer::Undefined,
        Sanitizer::Cfi,
        Sanitizer::SafeStack,
    ];

    /// The switch macro the build defines to announce this sanitizer.
    pub fn switch_macro(&self) -> &'static str {
        match self {
            Sanitizer::Address => "ADDRESS_SANITIZER",
            Sanitizer::Memory => "MEMORY_SANITIZER",
            Sanitizer::Thread => "THREAD_SANITIZER",
            Sanitizer::Undefined => "UNDEFINED_BEHAVIOR_SANITIZER",
            Sanitizer::Cfi => "CONTROL_FLOW_INTEGRITY",
            Sanitizer::SafeStack => "SAFESTACK_SANITIZER",
        }
    }
}

/// SIMD instruction-set extension macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimdExtension {
    Sse2,
    Ssse3,
}

/// Exception-related compiler switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExceptionSwitch {
    /// `__EXCEPTIONS`
    Gnu,
    /// `__cpp_exceptions`
    Cpp,
    /// `_CPPUNWIND`
    MsvcUnwind,
}

/// MSVC version macros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsvcVersion {
    /// `_MSC_VER`, e.g. 1916
    pub ver: u32,
    /// `_MSC_FULL_VER`, e.g. 191627051
    pub full: u64,
    /// `_MSVC_LANG`, when reported
    #[serde(default)]
    pub lang: Option<u32>,
}

/// Compiler identity signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSignals {
    /// Compiler family
    pub family: CompilerFamily,

    /// Vendor version of the compiler
    #[serde(with = "version_serde")]
    pub version: Version,

    /// `__GNUC__.__GNUC_MINOR__.__GNUC_PATCHLEVEL__` when defined
    /// (Clang reports 4.2.1 here)
    #[serde(with = "version_serde::option")]
    pub gnuc: Option<Version>,

    /// `__apple_build_version__`
    pub apple_build: Option<u64>,

    /// MSVC version macros (also set for clang-cl)
    pub msvc: Option<MsvcVersion>,

    /// CUDA compiler version when compiling under `__CUDACC__`
    #[serde(with = "version_serde::option")]
    pub cuda: Option<Version>,
}

impl Default for CompilerSignals {
    fn default() -> Self {
        CompilerSignals {
            family: CompilerFamily::Unknown,
            version: Version::new(0, 0, 0),
            gnuc: None,
            apple_build: None,
            msvc: None,
            cuda: None,
        }
    }
}

/// Target platform signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSignals {
    /// CPU architecture
    pub arch: Arch,

    /// Operating system family
    pub os: TargetOs,

    /// `__IPHONE_OS_VERSION_MIN_REQUIRED` on iOS-family targets
    #[serde(with = "version_serde::option")]
    pub ios_min: Option<Version>,

    /// `__ENVIRONMENT_MAC_OS_X_VERSION_MIN_REQUIRED__` on macOS
    #[serde(with = "version_serde::option")]
    pub macos_min: Option<Version>,

    /// `__NDK_MAJOR__.__NDK_MINOR__` on Android
    #[serde(with = "version_serde::option")]
    pub android_ndk: Option<Version>,

    /// `__BYTE_ORDER__` predicate, when the compiler provides one
    pub byte_order: Option<ByteOrder>,

    /// `CHAR_BIT`
    pub char_bits: u32,

    /// Width of `int` in bits
    pub int_bits: u32,

    /// SIMD extension macros
    pub simd: BTreeSet<SimdExtension>,

    /// `_M_IX86_FP` on 32-bit MSVC targets
    pub ix86_fp: Option<u32>,
}

impl Default for TargetSignals {
    fn default() -> Self {
        TargetSignals {
            arch: Arch::Unknown,
            os: TargetOs::Unknown,
            ios_min: None,
            macos_min: None,
            android_ndk: None,
            byte_order: None,
            char_bits: 8,
            int_bits: 32,
            simd: BTreeSet::new(),
            ix86_fp: None,
        }
    }
}

/// Standard and C library signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySignals {
    /// C++ standard library vendor
    pub stdlib: StdLib,

    /// `_GLIBCXX_HAVE_TLS`
    pub glibcxx_tls: bool,

    /// glibc version (`__GLIBC__.__GLIBC_MINOR__`)
    #[serde(with = "version_serde::option")]
    pub glibc: Option<Version>,

    /// Whether `__GLIBC_PREREQ` is available
    pub glibc_prereq: bool,
}

/// Language-level signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSignals {
    /// `__cplusplus`; `None` when not compiling C++
    pub cplusplus: Option<u32>,

    /// Whether `__has_include` is available
    pub has_include: bool,

    /// Standard headers that `__has_include` reports present
    pub headers: BTreeSet<String>,

    /// `__has_feature` results that evaluate true
    pub features: BTreeSet<String>,

    /// `__has_attribute` results; `None` when the predicate is missing
    pub attributes: Option<BTreeSet<String>>,

    /// `__has_cpp_attribute` results; `None` when the predicate is missing
    pub cpp_attributes: Option<BTreeSet<String>>,

    /// `__has_builtin` results; `None` when the predicate is missing
    pub builtins: Option<BTreeSet<String>>,

    /// `__SIZEOF_INT128__`
    pub int128: bool,

    /// Exception switches that are defined
    pub exceptions: BTreeSet<ExceptionSwitch>,
}

/// Switches supplied by the build invocation itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSignals {
    /// Sanitizers announced on the command line
    pub sanitizers: BTreeSet<Sanitizer>,

    /// `_DEBUG`
    pub debug: bool,

    /// Opt-out switch for XRay instrumentation attributes
    pub no_xray: bool,

    /// Configuration names already defined before negotiation, without
    /// prefix, mapped to their value
    pub predefined: BTreeMap<String, String>,
}

/// The complete signal set for one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signals {
    pub compiler: CompilerSignals,
    pub target: TargetSignals,
    pub library: LibrarySignals,
    pub language: LanguageSignals,
    pub build: BuildSignals,
}

impl Signals {
    /// Whether `__clang__` is defined.
    pub fn is_clang(&self) -> bool {
        matches!(
            self.compiler.family,
            CompilerFamily::Clang | CompilerFamily::AppleClang
        )
    }

    /// The GNU-compat version `__GNUC__` would report.
    ///
    /// Signal files may leave `gnuc` out; GCC then reports its own version
    /// and Clang reports 4.2.1, except clang-cl which defines no `__GNUC__`.
    pub fn gnuc(&self) -> Option<Version> {
        if let Some(v) = &self.compiler.gnuc {
            return Some(v.clone());
        }
        match self.compiler.family {
            CompilerFamily::Gcc => Some(self.compiler.version.clone()),
            CompilerFamily::Clang if self.compiler.msvc.is_some() => None,
            CompilerFamily::Clang | CompilerFamily::AppleClang => Some(Version::new(4, 2, 1)),
            CompilerFamily::Msvc | CompilerFamily::Unknown => None,
        }
    }

    /// Set the compiler version, keeping the GNU-compat version in step for GCC.
    pub fn set_compiler_version(&mut self, version: Version) {
        if self.compiler.family == CompilerFamily::Gcc {
            self.compiler.gnuc = Some(version.clone());
        }
        self.compiler.version = version;
    }

    /// Stable fingerprint of the whole signal set.
    pub fn fingerprint(&self) -> String {
        // Collections are ordered, so the JSON form is canonical.
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut fp = Fingerprint::new();
        fp.update_str(&canonical);
        fp.finish_short()
    }
}

/// Parse a version that may omit minor or patch components ("4", "4.8").
pub fn lenient_version(s: &str) -> Option<Version> {
    let s = s.trim();
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    let mut parts = s.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = match parts.next() {
        Some(p) => p.ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(p) => p.ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(Version::new(major, minor, patch))
}

/// Serde adapters accepting short versions in signal files.
pub mod version_serde {
    use semver::Version;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Version, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Version, D::Error> {
        let raw = String::deserialize(d)?;
        super::lenient_version(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid version '{}'", raw)))
    }

    pub mod option {
        use semver::Version;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &Option<Version>, s: S) -> Result<S::Ok, S::Error> {
            match v {
                Some(v) => s.collect_str(v),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Version>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.map(|r| {
                super::super::lenient_version(&r)
                    .ok_or_else(|| de::Error::custom(format!("invalid version '{}'", r)))
            })
            .transpose()
        }
    }
}
