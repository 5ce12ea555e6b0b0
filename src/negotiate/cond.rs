//! Predicates over signals.
//!
//! Conditions are plain data so rule tables can be listed, explained and
//! extended by appending entries. Every leaf reads raw signals only; no
//! condition looks at another flag's result.

use std::fmt;

use semver::Version;

use crate::core::signal::{Arch, ByteOrder, ExceptionSwitch, Sanitizer, Signals, SimdExtension, StdLib, TargetOs};

/// A predicate over a signal set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    /// Always true; used by unconditional rules.
    Always,
    /// `defined(__clang__)`
    Clang,
    /// `defined(__GNUC__)`
    Gnuc,
    /// GNU-compat version at least `major.minor`
    GnucAtLeast(u64, u64),
    /// GNU-compat version below `major.minor`
    GnucBelow(u64, u64),
    /// `defined(_MSC_VER)`
    Msvc,
    /// `_MSC_VER >= n`
    MsvcAtLeast(u32),
    /// `_MSC_FULL_VER < n`
    MsvcFullBelow(u64),
    /// `_MSVC_LANG > n`
    MsvcLangAbove(u32),
    /// `__apple_build_version__ < n`
    AppleBuildBelow(u64),
    /// `defined(__CUDACC__)`
    Cuda,
    /// CUDA compiler version at least `major.minor`
    CudaAtLeast(u64, u64),
    /// Target operating system
    Os(TargetOs),
    /// `defined(__APPLE__)`
    Apple,
    /// `TARGET_OS_IPHONE`
    IPhone,
    /// `defined(__linux__)`
    Linux,
    /// `defined(_WIN32)`
    Windows,
    /// Target architecture
    Arch(Arch),
    /// iOS deployment minimum below `major.minor`
    IosMinBelow(u64, u64),
    /// macOS deployment minimum below `major.minor`
    MacosMinBelow(u64, u64),
    /// Android NDK below `major.minor`
    NdkBelow(u64, u64),
    /// Standard library vendor
    StdLib(StdLib),
    /// `defined(_GLIBCXX_HAVE_TLS)`
    GlibcxxTls,
    /// glibc with `__GLIBC_PREREQ` and a version below `major.minor`
    GlibcBelow(u64, u64),
    /// `defined(__cplusplus) && __cplusplus < n`
    CxxBelow(u32),
    /// `__cplusplus >= n`
    CxxAtLeast(u32),
    /// `__cplusplus > n`
    CxxAbove(u32),
    /// `__has_include(<h>)`
    HasInclude(&'static str),
    /// `__has_feature(x)`
    HasFeature(&'static str),
    /// `__has_attribute(x)`
    HasAttribute(&'static str),
    /// `__has_cpp_attribute(x)`
    HasCppAttribute(&'static str),
    /// `defined(__SIZEOF_INT128__)`
    Int128,
    /// `__BYTE_ORDER__` predicate
    ByteOrder(ByteOrder),
    /// `CHAR_BIT != n`
    CharBitsNot(u32),
    /// `int` narrower than `n` bits
    IntBitsBelow(u32),
    /// SIMD extension macro
    Simd(SimdExtension),
    /// `_M_IX86_FP >= n`
    Ix86FpAtLeast(u32),
    /// Exception switch macro
    Exceptions(ExceptionSwitch),
    /// Sanitizer switch from the build invocation
    Sanitizer(Sanitizer),
    /// `defined(_DEBUG)`
    Debug,
    /// XRay attribute opt-out switch
    XrayOptOut,
    All(Vec<Cond>),
    Any(Vec<Cond>),
    Not(Box<Cond>),
}

impl Cond {
    pub fn all(conds: impl IntoIterator<Item = Cond>) -> Cond {
        Cond::All(conds.into_iter().collect())
    }

    pub fn any(conds: impl IntoIterator<Item = Cond>) -> Cond {
        Cond::Any(conds.into_iter().collect())
    }

    pub fn not(cond: Cond) -> Cond {
        Cond::Not(Box::new(cond))
    }

    /// GCC proper: `defined(__GNUC__) && !defined(__clang__)`.
    pub fn gcc() -> Cond {
        Cond::all([Cond::Gnuc, Cond::not(Cond::Clang)])
    }

    /// `HAVE_ATTRIBUTE(name) || gcc`
    pub fn attribute_or_gcc(name: &'static str) -> Cond {
        Cond::any([Cond::HasAttribute(name), Cond::gcc()])
    }

    /// Evaluate against a signal set.
    pub fn eval(&self, s: &Signals) -> bool {
        match self {
            Cond::Always => true,
            Cond::Clang => s.is_clang(),
            Cond::Gnuc => s.gnuc().is_some(),
            Cond::GnucAtLeast(major, minor) => s
                .gnuc()
                .is_some_and(|v| v >= Version::new(*major, *minor, 0)),
            Cond::GnucBelow(major, minor) => s
                .gnuc()
                .is_some_and(|v| v < Version::new(*major, *minor, 0)),
            Cond::Msvc => s.compiler.msvc.is_some(),
            Cond::MsvcAtLeast(n) => s.compiler.msvc.as_ref().is_some_and(|m| m.ver >= *n),
            Cond::MsvcFullBelow(n) => s.compiler.msvc.as_ref().is_some_and(|m| m.full < *n),
            Cond::MsvcLangAbove(n) => s
                .compiler
                .msvc
                .as_ref()
                .and_then(|m| m.lang)
                .is_some_and(|lang| lang > *n),
            Cond::AppleBuildBelow(n) => s.compiler.apple_build.is_some_and(|b| b < *n),
            Cond::Cuda => s.compiler.cuda.is_some(),
            Cond::CudaAtLeast(major, minor) => s
                .compiler
                .cuda
                .as_ref()
                .is_some_and(|v| *v >= Version::new(*major, *minor, 0)),
            Cond::Os(os) => s.target.os == *os,
            Cond::Apple => s.target.os.is_apple(),
            Cond::IPhone => s.target.os.is_iphone(),
            Cond::Linux => s.target.os.is_linux(),
            Cond::Windows => s.target.os == TargetOs::Windows,
            Cond::Arch(arch) => s.target.arch == *arch,
            Cond::IosMinBelow(major, minor) => s
                .target
                .ios_min
                .as_ref()
                .is_some_and(|v| *v < Version::new(*major, *minor, 0)),
            Cond::MacosMinBelow(major, minor) => s
                .target
                .macos_min
                .as_ref()
                .is_some_and(|v| *v < Version::new(*major, *minor, 0)),
            Cond::NdkBelow(major, minor) => s
                .target
                .android_ndk
                .as_ref()
                .is_some_and(|v| *v < Version::new(*major, *minor, 0)),
            Cond::StdLib(lib) => s.library.stdlib == *lib,
            Cond::GlibcxxTls => s.library.glibcxx_tls,
            Cond::GlibcBelow(major, minor) => {
                s.library.glibc_prereq
                    && s
                        .library
                        .glibc
                        .as_ref()
                        .is_some_and(|v| *v < Version::new(*major, *minor, 0))
            }
            Cond::CxxBelow(n) => s.language.cplusplus.is_some_and(|c| c < *n),
            Cond::CxxAtLeast(n) => s.language.cplusplus.is_some_and(|c| c >= *n),
            Cond::CxxAbove(n) => s.language.cplusplus.is_some_and(|c| c > *n),
            Cond::HasInclude(h) => s.language.has_include && s.language.headers.contains(*h),
            Cond::HasFeature(f) => s.language.features.contains(*f),
            Cond::HasAttribute(a) => s
                .language
                .attributes
                .as_ref()
                .is_some_and(|set| set.contains(*a)),
            Cond::HasCppAttribute(a) => {
                s.language.cplusplus.is_some()
                    && s
                        .language
                        .cpp_attributes
                        .as_ref()
                        .is_some_and(|set| set.contains(*a))
            }
            Cond::Int128 => s.language.int128,
            Cond::ByteOrder(order) => s.target.byte_order == Some(*order),
            Cond::CharBitsNot(n) => s.target.char_bits != *n,
            Cond::IntBitsBelow(n) => s.target.int_bits < *n,
            Cond::Simd(ext) => s.target.simd.contains(ext),
            Cond::Ix86FpAtLeast(n) => s.target.ix86_fp.is_some_and(|fp| fp >= *n),
            Cond::Exceptions(sw) => s.language.exceptions.contains(sw),
            Cond::Sanitizer(san) => s.build.sanitizers.contains(san),
            Cond::Debug => s.build.debug,
            Cond::XrayOptOut => s.build.no_xray,
            Cond::All(conds) => conds.iter().all(|c| c.eval(s)),
            Cond::Any(conds) => conds.iter().any(|c| c.eval(s)),
            Cond::Not(cond) => !cond.eval(s),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, conds: &[Cond], sep: &str) -> fmt::Result {
    for (i, c) in conds.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        match c {
            Cond::All(_) | Cond::Any(_) => write!(f, "({})", c)?,
            _ => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::Always => write!(f, "always"),
            Cond::Clang => write!(f, "defined(__clang__)"),
            Cond::Gnuc => write!(f, "defined(__GNUC__)"),
            Cond::GnucAtLeast(a, b) => write!(f, "__GNUC__ >= {}.{}", a, b),
            Cond::GnucBelow(a, b) => write!(f, "__GNUC__ < {}.{}", a, b),
            Cond::Msvc => write!(f, "defined(_MSC_VER)"),
            Cond::MsvcAtLeast(n) => write!(f, "_MSC_VER >= {}", n),
            Cond::MsvcFullBelow(n) => write!(f, "_MSC_FULL_VER < {}", n),
            Cond::MsvcLangAbove(n) => write!(f, "_MSVC_LANG > {}", n),
            Cond::AppleBuildBelow(n) => write!(f, "__apple_build_version__ < {}", n),
            Cond::Cuda => write!(f, "defined(__CUDACC__)"),
            Cond::CudaAtLeast(a, b) => write!(f, "__CUDACC_VER__ >= {}.{}", a, b),
            Cond::Os(os) => write!(f, "os == {}", os),
            Cond::Apple => write!(f, "defined(__APPLE__)"),
            Cond::IPhone => write!(f, "TARGET_OS_IPHONE"),
            Cond::Linux => write!(f, "defined(__linux__)"),
            Cond::Windows => write!(f, "defined(_WIN32)"),
            Cond::Arch(arch) => write!(f, "arch == {}", arch),
            Cond::IosMinBelow(a, b) => write!(f, "ios-min < {}.{}", a, b),
            Cond::MacosMinBelow(a, b) => write!(f, "macos-min < {}.{}", a, b),
            Cond::NdkBelow(a, b) => write!(f, "ndk < {}.{}", a, b),
            Cond::StdLib(lib) => write!(f, "stdlib == {}", lib),
            Cond::GlibcxxTls => write!(f, "defined(_GLIBCXX_HAVE_TLS)"),
            Cond::GlibcBelow(a, b) => write!(f, "!__GLIBC_PREREQ({}, {})", a, b),
            Cond::CxxBelow(n) => write!(f, "__cplusplus < {}", n),
            Cond::CxxAtLeast(n) => write!(f, "__cplusplus >= {}", n),
            Cond::CxxAbove(n) => write!(f, "__cplusplus > {}", n),
            Cond::HasInclude(h) => write!(f, "__has_include(<{}>)", h),
            Cond::HasFeature(x) => write!(f, "__has_feature({})", x),
            Cond::HasAttribute(x) => write!(f, "__has_attribute({})", x),
            Cond::HasCppAttribute(x) => write!(f, "__has_cpp_attribute({})", x),
            Cond::Int128 => write!(f, "defined(__SIZEOF_INT128__)"),
            Cond::ByteOrder(ByteOrder::Little) => {
                write!(f, "__BYTE_ORDER__ == __ORDER_LITTLE_ENDIAN__")
            }
            Cond::ByteOrder(ByteOrder::Big) => write!(f, "__BYTE_ORDER__ == __ORDER_BIG_ENDIAN__"),
            Cond::CharBitsNot(n) => write!(f, "CHAR_BIT != {}", n),
            Cond::IntBitsBelow(n) => write!(f, "int bits < {}", n),
            Cond::Simd(SimdExtension::Sse2) => write!(f, "defined(__SSE2__)"),
            Cond::Simd(SimdExtension::Ssse3) => write!(f, "defined(__SSSE3__)"),
            Cond::Ix86FpAtLeast(n) => write!(f, "_M_IX86_FP >= {}", n),
            Cond::Exceptions(ExceptionSwitch::Gnu) => write!(f, "defined(__EXCEPTIONS)"),
            Cond::Exceptions(ExceptionSwitch::Cpp) => write!(f, "defined(__cpp_exceptions)"),
            Cond::Exceptions(ExceptionSwitch::MsvcUnwind) => write!(f, "defined(_CPPUNWIND)"),
            Cond::Sanitizer(san) => write!(f, "defined({})", san.switch_macro()),
            Cond::Debug => write!(f, "defined(_DEBUG)"),
            Cond::XrayOptOut => write!(f, "xray opt-out"),
            Cond::All(conds) => join(f, conds, "&&"),
            Cond::Any(conds) => join(f, conds, "||"),
            Cond::Not(cond) => match cond.as_ref() {
                Cond::All(_) | Cond::Any(_) => write!(f, "!({})", cond),
                _ => write!(f, "!{}", cond),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::presets;

    #[test]
    fn test_gcc_excludes_clang() {
        let gcc = presets::linux_gcc(Version::new(9, 0, 0));
        let clang = presets::linux_clang(Version::new(16, 0, 0));
        assert!(Cond::gcc().eval(&gcc));
        assert!(!Cond::gcc().eval(&clang));
        // Clang still advertises GNU compatibility.
        assert!(Cond::Gnuc.eval(&clang));
    }

    #[test]
    fn test_version_boundaries_are_exact() {
        let gcc47 = presets::linux_gcc(Version::new(4, 7, 0));
        let gcc48 = presets::linux_gcc(Version::new(4, 8, 0));
        assert!(!Cond::GnucAtLeast(4, 8).eval(&gcc47));
        assert!(Cond::GnucAtLeast(4, 8).eval(&gcc48));
        assert!(Cond::GnucBelow(4, 8).eval(&gcc47));
        assert!(!Cond::GnucBelow(4, 8).eval(&gcc48));
    }

    #[test]
    fn test_missing_predicates_are_false() {
        let s = presets::unknown_toolchain();
        assert!(!Cond::HasAttribute("always_inline").eval(&s));
        assert!(!Cond::HasCppAttribute("clang::reinitializes").eval(&s));
        assert!(!Cond::NdkBelow(12, 1).eval(&s));
        assert!(!Cond::GnucBelow(5, 0).eval(&s));
    }

    #[test]
    fn test_combinators() {
        let s = presets::linux_gcc(Version::new(9, 0, 0));
        assert!(Cond::all([]).eval(&s));
        assert!(!Cond::any([]).eval(&s));
        assert!(Cond::not(Cond::Windows).eval(&s));
        assert!(Cond::any([Cond::Windows, Cond::Linux]).eval(&s));
    }

    #[test]
    fn test_display() {
        let c = Cond::all([
            Cond::Gnuc,
            Cond::not(Cond::Clang),
            Cond::any([Cond::StdLib(StdLib::Libcxx), Cond::GnucAtLeast(5, 1)]),
        ]);
        assert_eq!(
            c.to_string(),
            "defined(__GNUC__) && !defined(__clang__) && (stdlib == libc++ || __GNUC__ >= 5.1)"
        );
    }
}
