//! Named signal sets for common toolchains.
//!
//! Presets describe what a typical installation of each toolchain reports,
//! so the gate and resolver can be exercised without a compiler at hand.

use std::collections::BTreeSet;

use semver::Version;

use crate::core::signal::{
    cxx, Arch, ByteOrder, CompilerFamily, ExceptionSwitch, MsvcVersion, Signals, SimdExtension,
    StdLib, TargetOs,
};
use crate::negotiate::probe::fill_predicates;

/// Names accepted by [`preset`].
pub const PRESET_NAMES: &[&str] = &[
    "linux-gcc",
    "linux-clang",
    "macos-apple-clang",
    "ios-clang",
    "android-clang",
    "windows-msvc",
    "unknown",
];

/// Look up a preset by name.
pub fn preset(name: &str) -> Option<Signals> {
    match name {
        "linux-gcc" => Some(linux_gcc(Version::new(11, 4, 0))),
        "linux-clang" => Some(linux_clang(Version::new(16, 0, 0))),
        "macos-apple-clang" => Some(macos_apple_clang(Version::new(10, 15, 0))),
        "ios-clang" => Some(ios_clang(Version::new(12, 0, 0))),
        "android-clang" => Some(android_clang(Version::new(25, 2, 0))),
        "windows-msvc" => Some(windows_msvc(1929)),
        "unknown" => Some(unknown_toolchain()),
        _ => None,
    }
}

fn headers(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

const CXX17_HEADERS: &[&str] = &["any", "optional", "variant", "string_view"];

/// GCC with libstdc++ on x86_64 Linux, C++17.
pub fn linux_gcc(version: Version) -> Signals {
    let mut s = Signals::default();
    s.compiler.family = CompilerFamily::Gcc;
    s.set_compiler_version(version);

    s.target.arch = Arch::X86_64;
    s.target.os = TargetOs::Linux;
    s.target.byte_order = Some(ByteOrder::Little);
    s.target.simd.insert(SimdExtension::Sse2);

    s.library.stdlib = StdLib::Libstdcxx;
    s.library.glibcxx_tls = true;
    s.library.glibc = Some(Version::new(2, 31, 0));
    s.library.glibc_prereq = true;

    s.language.cplusplus = Some(cxx::CXX17);
    s.language.has_include = true;
    s.language.headers = headers(CXX17_HEADERS);
    s.language.int128 = true;
    s.language.exceptions = [ExceptionSwitch::Gnu, ExceptionSwitch::Cpp].into();
    fill_predicates(&mut s);
    s
}

/// Upstream Clang with libstdc++ on x86_64 Linux, C++17.
pub fn linux_clang(version: Version) -> Signals {
    let mut s = linux_gcc(Version::new(4, 2, 1));
    s.compiler.family = CompilerFamily::Clang;
    s.compiler.version = version;
    fill_predicates(&mut s);
    s
}

/// Apple Clang with libc++ on macOS, given the deployment minimum.
pub fn macos_apple_clang(macos_min: Version) -> Signals {
    let mut s = Signals::default();
    s.compiler.family = CompilerFamily::AppleClang;
    s.compiler.version = Version::new(15, 0, 0);
    s.compiler.gnuc = Some(Version::new(4, 2, 1));
    s.compiler.apple_build = Some(15_000_040);

    s.target.arch = Arch::Aarch64;
    s.target.os = TargetOs::Macos;
    s.target.macos_min = Some(macos_min);
    s.target.byte_order = Some(ByteOrder::Little);

    s.library.stdlib = StdLib::Libcxx;

    s.language.cplusplus = Some(cxx::CXX17);
    s.language.has_include = true;
    s.language.headers = headers(CXX17_HEADERS);
    s.language.int128 = true;
    s.language.exceptions = [ExceptionSwitch::Gnu, ExceptionSwitch::Cpp].into();
    fill_predicates(&mut s);
    s
}

/// Apple Clang targeting iOS, given the deployment minimum.
pub fn ios_clang(ios_min: Version) -> Signals {
    let mut s = macos_apple_clang(Version::new(10, 15, 0));
    s.target.os = TargetOs::Ios;
    s.target.macos_min = None;
    s.target.ios_min = Some(ios_min);
    s
}

/// NDK Clang targeting Android, given the NDK version.
pub fn android_clang(ndk: Version) -> Signals {
    let mut s = linux_clang(Version::new(17, 0, 2));
    s.target.arch = Arch::Aarch64;
    s.target.os = TargetOs::Android;
    s.target.android_ndk = Some(ndk);
    s.target.simd.clear();
    s.library.stdlib = StdLib::Libcxx;
    s.library.glibcxx_tls = false;
    s.library.glibc = None;
    s.library.glibc_prereq = false;
    s
}

/// MSVC on x64 Windows, given `_MSC_VER`.
pub fn windows_msvc(msc_ver: u32) -> Signals {
    let mut s = Signals::default();
    s.compiler.family = CompilerFamily::Msvc;
    s.compiler.version = Version::new(u64::from(msc_ver / 100), u64::from(msc_ver % 100), 0);
    s.compiler.msvc = Some(MsvcVersion {
        ver: msc_ver,
        full: u64::from(msc_ver) * 100_000 + 30_133,
        lang: Some(cxx::CXX17),
    });

    s.target.arch = Arch::X86_64;
    s.target.os = TargetOs::Windows;

    s.library.stdlib = StdLib::MsvcStl;

    // MSVC keeps __cplusplus at 199711 unless /Zc:__cplusplus is given.
    s.language.cplusplus = Some(199711);
    s.language.has_include = true;
    s.language.headers = headers(CXX17_HEADERS);
    s.language.exceptions = [ExceptionSwitch::MsvcUnwind].into();
    fill_predicates(&mut s);
    s
}

/// A compiler nothing recognizes, on a little-endian Windows-like target.
///
/// Every shim resolves to its fallback for this set.
pub fn unknown_toolchain() -> Signals {
    let mut s = Signals::default();
    s.target.os = TargetOs::Windows;
    s.language.cplusplus = Some(cxx::CXX11);
    s
}
