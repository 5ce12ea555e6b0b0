//! Capability flag resolver.
//!
//! One rule chain per flag and per derived constant. Flags are present or
//! absent, never defined false; constants are always defined, to 0 or 1.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::catalog::{CapabilityFlag, ConstantPolicy, DerivedConstant};
use crate::core::macros::parse_c_integer;
use crate::core::resolved::{FlagDecision, ResolvedConstant};
use crate::core::signal::{
    cxx, Arch, ByteOrder, ExceptionSwitch, Signals, SimdExtension, StdLib, TargetOs,
};
use crate::negotiate::cond::Cond;
use crate::negotiate::error::NegotiationError;
use crate::negotiate::registry::{Origin, Registry};
use crate::negotiate::rule::RuleChain;

/// What a flag rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagAction {
    Define,
    Absent,
}

/// Apple with libc++ and a macOS deployment target older than 10.14.
pub fn macos_cxx17_window() -> Cond {
    Cond::all([
        Cond::Apple,
        Cond::StdLib(StdLib::Libcxx),
        Cond::MacosMinBelow(10, 14),
    ])
}

fn old_android_ndk() -> Cond {
    Cond::all([Cond::Os(TargetOs::Android), Cond::Clang, Cond::NdkBelow(12, 1)])
}

fn std_header(header: &'static str, respect_macos_window: bool) -> Cond {
    let mut conds = vec![Cond::HasInclude(header), Cond::CxxAtLeast(cxx::CXX17)];
    if respect_macos_window {
        conds.push(Cond::not(macos_cxx17_window()));
    }
    Cond::All(conds)
}

fn msvc_cxx17() -> Cond {
    Cond::all([
        Cond::MsvcAtLeast(1910),
        Cond::any([Cond::MsvcLangAbove(201402), Cond::CxxAbove(201402)]),
    ])
}

fn trivially_constructible() -> Cond {
    Cond::any([
        Cond::all([Cond::Clang, Cond::StdLib(StdLib::Libcxx)]),
        Cond::all([
            Cond::gcc(),
            Cond::GnucAtLeast(5, 1),
            Cond::any([
                Cond::StdLib(StdLib::Libcxx),
                Cond::StdLib(StdLib::Libstdcxx),
            ]),
        ]),
        Cond::all([Cond::Msvc, Cond::not(Cond::Cuda)]),
    ])
}

/// The rule chain deciding `flag`.
pub fn flag_chain(flag: CapabilityFlag) -> RuleChain<FlagAction> {
    use FlagAction::{Absent, Define};

    let name = flag.name();
    match flag {
        CapabilityFlag::StdIsTriviallyDestructible => RuleChain::new(name, Absent).rule(
            Cond::any([
                Cond::StdLib(StdLib::Libcxx),
                Cond::all([
                    Cond::gcc(),
                    Cond::StdLib(StdLib::Libstdcxx),
                    Cond::GnucAtLeast(4, 8),
                ]),
                Cond::Msvc,
            ]),
            Define,
        ),
        CapabilityFlag::StdIsTriviallyConstructible | CapabilityFlag::StdIsTriviallyAssignable => {
            RuleChain::new(name, Absent).rule(trivially_constructible(), Define)
        }
        CapabilityFlag::ThreadLocal => RuleChain::new(name, Define)
            .rule(old_android_ndk(), Absent)
            .rule(
                Cond::all([
                    Cond::Apple,
                    Cond::HasFeature("cxx_thread_local"),
                    Cond::not(Cond::all([Cond::IPhone, Cond::IosMinBelow(9, 0)])),
                ]),
                Define,
            )
            .rule(Cond::Apple, Absent),
        CapabilityFlag::Tls => RuleChain::new(name, Absent)
            .rule(old_android_ndk(), Absent)
            .rule(
                Cond::all([
                    Cond::Linux,
                    Cond::any([Cond::Clang, Cond::GlibcxxTls]),
                ]),
                Define,
            ),
        CapabilityFlag::IntrinsicInt128 => RuleChain::new(name, Absent)
            .rule(
                Cond::all([
                    Cond::Int128,
                    Cond::any([
                        Cond::all([
                            Cond::Clang,
                            Cond::not(Cond::Windows),
                            Cond::not(Cond::Arch(Arch::Aarch64)),
                        ]),
                        Cond::CudaAtLeast(9, 0),
                        Cond::all([Cond::gcc(), Cond::not(Cond::Cuda)]),
                    ]),
                ]),
                Define,
            )
            .rule(Cond::all([Cond::Int128, Cond::CudaAtLeast(7, 0)]), Define),
        CapabilityFlag::Exceptions => RuleChain::new(name, Define)
            .rule(
                Cond::all([
                    Cond::Clang,
                    Cond::Exceptions(ExceptionSwitch::Gnu),
                    Cond::HasFeature("cxx_exceptions"),
                ]),
                Define,
            )
            .rule(Cond::Clang, Absent)
            .rule(
                Cond::all([
                    Cond::Gnuc,
                    Cond::GnucBelow(5, 0),
                    Cond::not(Cond::Exceptions(ExceptionSwitch::Gnu)),
                ]),
                Absent,
            )
            .rule(
                Cond::all([
                    Cond::Gnuc,
                    Cond::GnucAtLeast(5, 0),
                    Cond::not(Cond::Exceptions(ExceptionSwitch::Cpp)),
                ]),
                Absent,
            )
            .rule(
                Cond::all([
                    Cond::Msvc,
                    Cond::not(Cond::Exceptions(ExceptionSwitch::MsvcUnwind)),
                ]),
                Absent,
            ),
        CapabilityFlag::Mmap => RuleChain::new(name, Absent).rule(
            Cond::any([
                Cond::Linux,
                Cond::Apple,
                Cond::Os(TargetOs::Freebsd),
                Cond::Os(TargetOs::Akaros),
                Cond::Os(TargetOs::NativeClient),
                Cond::Os(TargetOs::Emscripten),
                Cond::Arch(Arch::Wasm32),
                Cond::Os(TargetOs::Fuchsia),
                Cond::Os(TargetOs::Solaris),
                Cond::Os(TargetOs::Asylo),
            ]),
            Define,
        ),
        CapabilityFlag::IsLittleEndian => RuleChain::new(name, Absent)
            .rule(Cond::ByteOrder(ByteOrder::Little), Define)
            .rule(Cond::ByteOrder(ByteOrder::Big), Absent)
            .rule(Cond::Windows, Define),
        CapabilityFlag::IsBigEndian => {
            RuleChain::new(name, Absent).rule(Cond::ByteOrder(ByteOrder::Big), Define)
        }
        CapabilityFlag::StdAny => RuleChain::new(name, Absent).rule(std_header("any", true), Define),
        CapabilityFlag::StdOptional => RuleChain::new(name, Absent)
            .rule(std_header("optional", true), Define)
            .rule(msvc_cxx17(), Define),
        CapabilityFlag::StdVariant => RuleChain::new(name, Absent)
            .rule(std_header("variant", true), Define)
            .rule(msvc_cxx17(), Define),
        CapabilityFlag::StdStringView => RuleChain::new(name, Absent)
            .rule(std_header("string_view", false), Define)
            .rule(msvc_cxx17(), Define),
        CapabilityFlag::InternalMsvc2017DbgMode => RuleChain::new(name, Absent)
            .rule(Cond::all([Cond::MsvcAtLeast(1700), Cond::Debug]), Define),
    }
}

/// The rule chain deriving `constant`.
pub fn constant_chain(constant: DerivedConstant) -> RuleChain<u32> {
    let name = constant.name();
    match constant {
        DerivedConstant::InternalMacosCxx17TypesUnavailable => {
            RuleChain::new(name, 0).rule(macos_cxx17_window(), 1)
        }
        DerivedConstant::HaveSse2 => RuleChain::new(name, 0).rule(
            Cond::any([
                Cond::Simd(SimdExtension::Sse2),
                Cond::all([
                    Cond::Msvc,
                    Cond::any([
                        Cond::Arch(Arch::X86_64),
                        Cond::all([Cond::Arch(Arch::X86), Cond::Ix86FpAtLeast(2)]),
                    ]),
                ]),
            ]),
            1,
        ),
        DerivedConstant::HaveSsse3 => {
            RuleChain::new(name, 0).rule(Cond::Simd(SimdExtension::Ssse3), 1)
        }
        DerivedConstant::RequireStackAlignTrampoline => RuleChain::new(name, 0).rule(
            Cond::all([
                Cond::attribute_or_gcc("force_align_arg_pointer"),
                Cond::Arch(Arch::X86_64),
            ]),
            1,
        ),
    }
}

/// Resolve every capability flag.
///
/// All flag names are checked against existing definitions before any is
/// defined.
pub fn resolve(
    signals: &Signals,
    registry: &mut Registry<'_>,
) -> Result<BTreeMap<CapabilityFlag, FlagDecision>, NegotiationError> {
    for flag in CapabilityFlag::ALL {
        registry.ensure_undefined(flag.name(), &Origin::Flag)?;
    }

    let mut decisions = BTreeMap::new();
    for flag in CapabilityFlag::ALL {
        let chain = flag_chain(flag);
        let (action, hit) = chain.evaluate(signals);
        let present = *action == FlagAction::Define;
        if present {
            registry.define(flag.name(), Origin::Flag)?;
        }
        decisions.insert(flag, FlagDecision { present, hit });
    }

    let endian_known = [CapabilityFlag::IsLittleEndian, CapabilityFlag::IsBigEndian]
        .iter()
        .any(|f| decisions.get(f).is_some_and(|d| d.present));
    if !endian_known {
        return Err(NegotiationError::unsupported(
            "byte order is known (__BYTE_ORDER__ or a Windows target)",
        ));
    }

    debug!(
        "flags: {} of {} present",
        decisions.values().filter(|d| d.present).count(),
        decisions.len()
    );
    Ok(decisions)
}

/// Interpret an external definition the way `#if NAME` would.
fn external_truth(value: &str) -> u32 {
    match parse_c_integer(value) {
        Some(v) if v != 0 => 1,
        _ => 0,
    }
}

/// Resolve every derived constant, honoring overrides where allowed.
pub fn resolve_constants(
    signals: &Signals,
    registry: &mut Registry<'_>,
) -> Result<BTreeMap<DerivedConstant, ResolvedConstant>, NegotiationError> {
    let mut constants = BTreeMap::new();
    for constant in DerivedConstant::ALL {
        let chain = constant_chain(constant);
        let (value, hit) = chain.evaluate(signals);
        let mut resolved = ResolvedConstant {
            value: *value,
            overridden: false,
            hit,
        };

        match constant.policy() {
            ConstantPolicy::Derived => registry.define(constant.name(), Origin::Constant)?,
            ConstantPolicy::Overridable => {
                if let Some(external) = registry.adopt(constant.name(), Origin::Constant)? {
                    debug!("{}: overridden to `{}`", constant, external);
                    resolved.value = external_truth(external);
                    resolved.overridden = true;
                }
            }
        }
        constants.insert(constant, resolved);
    }

    let value = |c: DerivedConstant| constants.get(&c).map(|r| r.value).unwrap_or(0);
    if value(DerivedConstant::HaveSsse3) == 1 && value(DerivedConstant::HaveSse2) == 0 {
        return Err(NegotiationError::unsupported(
            "SSSE3 implies SSE2 (bad SIMD configuration)",
        ));
    }

    Ok(constants)
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::*;
    use crate::core::presets;

    fn flags(s: &Signals) -> BTreeMap<CapabilityFlag, FlagDecision> {
        let mut reg = Registry::new("PORTCFG", &s.build.predefined);
        resolve(s, &mut reg).unwrap()
    }

    fn has(s: &Signals, flag: CapabilityFlag) -> bool {
        flags(s)[&flag].present
    }

    fn constants(s: &Signals) -> Result<BTreeMap<DerivedConstant, ResolvedConstant>, NegotiationError> {
        let mut reg = Registry::new("PORTCFG", &s.build.predefined);
        resolve_constants(s, &mut reg)
    }

    #[test]
    fn test_gcc_trivially_destructible_threshold() {
        let gcc47 = presets::linux_gcc(Version::new(4, 7, 0));
        let gcc48 = presets::linux_gcc(Version::new(4, 8, 0));
        assert!(!has(&gcc47, CapabilityFlag::StdIsTriviallyDestructible));
        assert!(has(&gcc48, CapabilityFlag::StdIsTriviallyDestructible));
        // Constructible and assignable need GCC 5.1.
        assert!(!has(&gcc48, CapabilityFlag::StdIsTriviallyConstructible));
        assert!(!has(&gcc48, CapabilityFlag::StdIsTriviallyAssignable));
    }

    #[test]
    fn test_constructible_and_assignable_move_together() {
        for s in [
            presets::linux_gcc(Version::new(5, 1, 0)),
            presets::macos_apple_clang(Version::new(10, 15, 0)),
            presets::windows_msvc(1929),
            presets::linux_clang(Version::new(16, 0, 0)),
        ] {
            let f = flags(&s);
            assert_eq!(
                f[&CapabilityFlag::StdIsTriviallyConstructible].present,
                f[&CapabilityFlag::StdIsTriviallyAssignable].present
            );
        }
        // Clang with libstdc++ is not covered.
        assert!(!has(
            &presets::linux_clang(Version::new(16, 0, 0)),
            CapabilityFlag::StdIsTriviallyConstructible
        ));
    }

    #[test]
    fn test_msvc_under_nvcc_loses_constructible() {
        let mut s = presets::windows_msvc(1929);
        s.compiler.cuda = Some(Version::new(11, 0, 0));
        assert!(!has(&s, CapabilityFlag::StdIsTriviallyConstructible));
    }

    #[test]
    fn test_ios_thread_local_threshold() {
        let ios8 = presets::ios_clang(Version::new(8, 0, 0));
        let ios9 = presets::ios_clang(Version::new(9, 0, 0));
        assert!(!has(&ios8, CapabilityFlag::ThreadLocal));
        assert!(has(&ios9, CapabilityFlag::ThreadLocal));
        assert!(has(
            &presets::macos_apple_clang(Version::new(10, 9, 0)),
            CapabilityFlag::ThreadLocal
        ));
    }

    #[test]
    fn test_apple_without_feature_has_no_thread_local() {
        let mut s = presets::macos_apple_clang(Version::new(10, 15, 0));
        s.language.features.clear();
        assert!(!has(&s, CapabilityFlag::ThreadLocal));
    }

    #[test]
    fn test_old_ndk_disables_tls_pair() {
        let old = presets::android_clang(Version::new(12, 0, 0));
        let f = flags(&old);
        assert!(!f[&CapabilityFlag::ThreadLocal].present);
        assert!(!f[&CapabilityFlag::Tls].present);

        let new = presets::android_clang(Version::new(12, 1, 0));
        let f = flags(&new);
        assert!(f[&CapabilityFlag::ThreadLocal].present);
        assert!(f[&CapabilityFlag::Tls].present);

        let mut unknown_ndk = presets::android_clang(Version::new(12, 0, 0));
        unknown_ndk.target.android_ndk = None;
        assert!(has(&unknown_ndk, CapabilityFlag::ThreadLocal));
    }

    #[test]
    fn test_tls_needs_linux() {
        assert!(has(&presets::linux_gcc(Version::new(9, 0, 0)), CapabilityFlag::Tls));
        assert!(!has(&presets::windows_msvc(1929), CapabilityFlag::Tls));

        let mut s = presets::linux_gcc(Version::new(9, 0, 0));
        s.library.glibcxx_tls = false;
        assert!(!has(&s, CapabilityFlag::Tls));

        let mut asylo = presets::linux_clang(Version::new(16, 0, 0));
        asylo.target.os = TargetOs::Asylo;
        assert!(!has(&asylo, CapabilityFlag::Tls));
    }

    #[test]
    fn test_int128() {
        assert!(has(
            &presets::linux_gcc(Version::new(9, 0, 0)),
            CapabilityFlag::IntrinsicInt128
        ));
        assert!(has(
            &presets::linux_clang(Version::new(16, 0, 0)),
            CapabilityFlag::IntrinsicInt128
        ));
        // Clang on aarch64 is excluded.
        assert!(!has(
            &presets::macos_apple_clang(Version::new(10, 15, 0)),
            CapabilityFlag::IntrinsicInt128
        ));

        let mut nvcc8 = presets::linux_gcc(Version::new(9, 0, 0));
        nvcc8.compiler.cuda = Some(Version::new(8, 0, 0));
        assert!(has(&nvcc8, CapabilityFlag::IntrinsicInt128));
        nvcc8.compiler.cuda = Some(Version::new(6, 5, 0));
        assert!(!has(&nvcc8, CapabilityFlag::IntrinsicInt128));

        let mut no_int128 = presets::linux_gcc(Version::new(9, 0, 0));
        no_int128.language.int128 = false;
        assert!(!has(&no_int128, CapabilityFlag::IntrinsicInt128));
    }

    #[test]
    fn test_exceptions() {
        assert!(has(&presets::linux_gcc(Version::new(9, 0, 0)), CapabilityFlag::Exceptions));
        assert!(has(&presets::windows_msvc(1929), CapabilityFlag::Exceptions));

        let mut clang = presets::linux_clang(Version::new(16, 0, 0));
        clang.language.exceptions.clear();
        clang.language.features.remove("cxx_exceptions");
        assert!(!has(&clang, CapabilityFlag::Exceptions));

        let mut gcc9 = presets::linux_gcc(Version::new(9, 0, 0));
        gcc9.language.exceptions.remove(&ExceptionSwitch::Cpp);
        assert!(!has(&gcc9, CapabilityFlag::Exceptions));

        let mut gcc48 = presets::linux_gcc(Version::new(4, 8, 0));
        gcc48.language.exceptions.remove(&ExceptionSwitch::Cpp);
        assert!(has(&gcc48, CapabilityFlag::Exceptions));

        let mut msvc = presets::windows_msvc(1929);
        msvc.language.exceptions.clear();
        assert!(!has(&msvc, CapabilityFlag::Exceptions));
    }

    #[test]
    fn test_byte_order() {
        let little = presets::linux_gcc(Version::new(9, 0, 0));
        let f = flags(&little);
        assert!(f[&CapabilityFlag::IsLittleEndian].present);
        assert!(!f[&CapabilityFlag::IsBigEndian].present);

        let mut big = little.clone();
        big.target.byte_order = Some(ByteOrder::Big);
        let f = flags(&big);
        assert!(!f[&CapabilityFlag::IsLittleEndian].present);
        assert!(f[&CapabilityFlag::IsBigEndian].present);

        // No predicate, but Windows is always little-endian.
        assert!(has(&presets::windows_msvc(1929), CapabilityFlag::IsLittleEndian));

        let mut unknown = little;
        unknown.target.byte_order = None;
        let mut reg = Registry::new("PORTCFG", &unknown.build.predefined);
        let err = resolve(&unknown, &mut reg).unwrap_err();
        assert!(matches!(err, NegotiationError::UnsupportedEnvironment { .. }));
    }

    #[test]
    fn test_std_types_and_macos_window() {
        let gcc = presets::linux_gcc(Version::new(9, 0, 0));
        for flag in [
            CapabilityFlag::StdAny,
            CapabilityFlag::StdOptional,
            CapabilityFlag::StdVariant,
            CapabilityFlag::StdStringView,
        ] {
            assert!(has(&gcc, flag), "{} missing", flag);
        }

        let mut cxx14 = gcc.clone();
        cxx14.language.cplusplus = Some(cxx::CXX14);
        assert!(!has(&cxx14, CapabilityFlag::StdOptional));

        let old_macos = presets::macos_apple_clang(Version::new(10, 13, 0));
        let f = flags(&old_macos);
        assert!(!f[&CapabilityFlag::StdAny].present);
        assert!(!f[&CapabilityFlag::StdOptional].present);
        assert!(!f[&CapabilityFlag::StdVariant].present);
        assert!(f[&CapabilityFlag::StdStringView].present);

        let c = constants(&old_macos).unwrap();
        assert_eq!(c[&DerivedConstant::InternalMacosCxx17TypesUnavailable].value, 1);
        let c = constants(&presets::macos_apple_clang(Version::new(10, 14, 0))).unwrap();
        assert_eq!(c[&DerivedConstant::InternalMacosCxx17TypesUnavailable].value, 0);
    }

    #[test]
    fn test_msvc_forces_cxx17_types_except_any() {
        let mut s = presets::windows_msvc(1916);
        s.language.has_include = false;
        let f = flags(&s);
        assert!(!f[&CapabilityFlag::StdAny].present);
        assert!(f[&CapabilityFlag::StdOptional].present);
        assert!(f[&CapabilityFlag::StdVariant].present);
        assert!(f[&CapabilityFlag::StdStringView].present);
        assert_eq!(f[&CapabilityFlag::StdOptional].hit.index, Some(1));
    }

    #[test]
    fn test_msvc_debug_mode() {
        let mut s = presets::windows_msvc(1916);
        assert!(!has(&s, CapabilityFlag::InternalMsvc2017DbgMode));
        s.build.debug = true;
        assert!(has(&s, CapabilityFlag::InternalMsvc2017DbgMode));
    }

    #[test]
    fn test_mmap() {
        assert!(has(&presets::linux_gcc(Version::new(9, 0, 0)), CapabilityFlag::Mmap));
        assert!(has(&presets::ios_clang(Version::new(12, 0, 0)), CapabilityFlag::Mmap));
        assert!(!has(&presets::windows_msvc(1929), CapabilityFlag::Mmap));
    }

    #[test]
    fn test_predefined_flag_conflicts_even_when_absent() {
        let mut s = presets::windows_msvc(1929);
        s.build
            .predefined
            .insert("HAVE_MMAP".to_string(), "1".to_string());
        let mut reg = Registry::new("PORTCFG", &s.build.predefined);
        let err = resolve(&s, &mut reg).unwrap_err();
        match err {
            NegotiationError::ConfigurationConflict { name, .. } => {
                assert_eq!(name, "PORTCFG_HAVE_MMAP")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sse_constants() {
        let c = constants(&presets::linux_gcc(Version::new(9, 0, 0))).unwrap();
        assert_eq!(c[&DerivedConstant::HaveSse2].value, 1);
        assert_eq!(c[&DerivedConstant::HaveSsse3].value, 0);
        assert_eq!(c[&DerivedConstant::RequireStackAlignTrampoline].value, 1);

        let c = constants(&presets::windows_msvc(1929)).unwrap();
        assert_eq!(c[&DerivedConstant::HaveSse2].value, 1);

        let mut x86 = presets::windows_msvc(1929);
        x86.target.arch = Arch::X86;
        x86.target.ix86_fp = Some(1);
        let c = constants(&x86).unwrap();
        assert_eq!(c[&DerivedConstant::HaveSse2].value, 0);
    }

    #[test]
    fn test_sse_override() {
        let mut s = presets::linux_gcc(Version::new(9, 0, 0));
        s.build
            .predefined
            .insert("HAVE_SSE2".to_string(), "0".to_string());
        let c = constants(&s).unwrap();
        assert_eq!(c[&DerivedConstant::HaveSse2].value, 0);
        assert!(c[&DerivedConstant::HaveSse2].overridden);

        s.build
            .predefined
            .insert("HAVE_SSSE3".to_string(), "1".to_string());
        let err = constants(&s).unwrap_err();
        assert!(err.to_string().contains("SSSE3"));
    }

    #[test]
    fn test_derived_constant_predefinition_conflicts() {
        let mut s = presets::linux_gcc(Version::new(9, 0, 0));
        s.build.predefined.insert(
            "REQUIRE_STACK_ALIGN_TRAMPOLINE".to_string(),
            "0".to_string(),
        );
        assert!(matches!(
            constants(&s),
            Err(NegotiationError::ConfigurationConflict { .. })
        ));
    }
}
