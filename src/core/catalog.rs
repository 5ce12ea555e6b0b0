//! The catalog of names negotiation may define.
//!
//! Every name here is defined at most once per compilation unit. Names are
//! stored without a prefix; the emitter prepends the configured one
//! (`PORTCFG_HAVE_MMAP`).

use std::fmt;

use serde::Serialize;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "PORTCFG";

/// A derived boolean capability. Present or absent, never defined false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityFlag {
    StdIsTriviallyDestructible,
    StdIsTriviallyConstructible,
    StdIsTriviallyAssignable,
    ThreadLocal,
    Tls,
    IntrinsicInt128,
    Exceptions,
    Mmap,
    IsLittleEndian,
    IsBigEndian,
    StdAny,
    StdOptional,
    StdVariant,
    StdStringView,
    InternalMsvc2017DbgMode,
}

impl CapabilityFlag {
    pub const ALL: [CapabilityFlag; 15] = [
        CapabilityFlag::StdIsTriviallyDestructible,
        CapabilityFlag::StdIsTriviallyConstructible,
        CapabilityFlag::StdIsTriviallyAssignable,
        CapabilityFlag::ThreadLocal,
        CapabilityFlag::Tls,
        CapabilityFlag::IntrinsicInt128,
        CapabilityFlag::Exceptions,
        CapabilityFlag::Mmap,
        CapabilityFlag::IsLittleEndian,
        CapabilityFlag::IsBigEndian,
        CapabilityFlag::StdAny,
        CapabilityFlag::StdOptional,
        CapabilityFlag::StdVariant,
        CapabilityFlag::StdStringView,
        CapabilityFlag::InternalMsvc2017DbgMode,
    ];

    /// Unprefixed macro name.
    pub fn name(&self) -> &'static str {
        match self {
            CapabilityFlag::StdIsTriviallyDestructible => "HAVE_STD_IS_TRIVIALLY_DESTRUCTIBLE",
            CapabilityFlag::StdIsTriviallyConstructible => "HAVE_STD_IS_TRIVIALLY_CONSTRUCTIBLE",
            CapabilityFlag::StdIsTriviallyAssignable => "HAVE_STD_IS_TRIVIALLY_ASSIGNABLE",
            CapabilityFlag::ThreadLocal => "HAVE_THREAD_LOCAL",
            CapabilityFlag::Tls => "HAVE_TLS",
            CapabilityFlag::IntrinsicInt128 => "HAVE_INTRINSIC_INT128",
            CapabilityFlag::Exceptions => "HAVE_EXCEPTIONS",
            CapabilityFlag::Mmap => "HAVE_MMAP",
            CapabilityFlag::IsLittleEndian => "IS_LITTLE_ENDIAN",
            CapabilityFlag::IsBigEndian => "IS_BIG_ENDIAN",
            CapabilityFlag::StdAny => "HAVE_STD_ANY",
            CapabilityFlag::StdOptional => "HAVE_STD_OPTIONAL",
            CapabilityFlag::StdVariant => "HAVE_STD_VARIANT",
            CapabilityFlag::StdStringView => "HAVE_STD_STRING_VIEW",
            CapabilityFlag::InternalMsvc2017DbgMode => "INTERNAL_MSVC_2017_DBG_MODE",
        }
    }
}

impl fmt::Display for CapabilityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a derived constant treats an existing definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantPolicy {
    /// Pre-definition is a configuration conflict.
    Derived,
    /// Pre-definition replaces the derived value.
    Overridable,
}

/// A numeric value that is always defined (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DerivedConstant {
    InternalMacosCxx17TypesUnavailable,
    HaveSse2,
    HaveSsse3,
    RequireStackAlignTrampoline,
}

impl DerivedConstant {
    pub const ALL: [DerivedConstant; 4] = [
        DerivedConstant::InternalMacosCxx17TypesUnavailable,
        DerivedConstant::HaveSse2,
        DerivedConstant::HaveSsse3,
        DerivedConstant::RequireStackAlignTrampoline,
    ];

    /// Unprefixed macro name.
    pub fn name(&self) -> &'static str {
        match self {
            DerivedConstant::InternalMacosCxx17TypesUnavailable => {
                "INTERNAL_MACOS_CXX17_TYPES_UNAVAILABLE"
            }
            DerivedConstant::HaveSse2 => "HAVE_SSE2",
            DerivedConstant::HaveSsse3 => "HAVE_SSSE3",
            DerivedConstant::RequireStackAlignTrampoline => "REQUIRE_STACK_ALIGN_TRAMPOLINE",
        }
    }

    pub fn policy(&self) -> ConstantPolicy {
        match self {
            DerivedConstant::HaveSse2 | DerivedConstant::HaveSsse3 => ConstantPolicy::Overridable,
            _ => ConstantPolicy::Derived,
        }
    }
}

impl fmt::Display for DerivedConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a shim's companion "have" marker is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    /// Defined to 1 when the shim is active, otherwise left undefined.
    PresentOnly,
    /// Always defined, to 1 or 0.
    ZeroOrOne,
}

/// A companion marker announcing whether a shim resolved to a real attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub name: &'static str,
    pub style: MarkerStyle,
    /// Whether an existing definition of the marker is a conflict.
    pub guarded: bool,
}

/// A portable attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShimId {
    PrintfAttribute,
    ScanfAttribute,
    AlwaysInline,
    NoInline,
    NoTailCall,
    Weak,
    NonNull,
    NoReturn,
    NoSanitizeAddress,
    NoSanitizeMemory,
    NoSanitizeThread,
    NoSanitizeUndefined,
    NoSanitizeCfi,
    NoSanitizeSafeStack,
    ReturnsNonNull,
    Section,
    SectionVariable,
    DeclareSectionVars,
    StackAlignForOldLibc,
    MustUseResult,
    Hot,
    Cold,
    XrayAlwaysInstrument,
    XrayNeverInstrument,
    XrayLogArgs,
    Reinitializes,
    Unused,
    InitialExec,
    Packed,
    FuncAlign,
    ConstInit,
}

impl ShimId {
    pub const ALL: [ShimId; 31] = [
        ShimId::PrintfAttribute,
        ShimId::ScanfAttribute,
        ShimId::AlwaysInline,
        ShimId::NoInline,
        ShimId::NoTailCall,
        ShimId::Weak,
        ShimId::NonNull,
        ShimId::NoReturn,
        ShimId::NoSanitizeAddress,
        ShimId::NoSanitizeMemory,
        ShimId::NoSanitizeThread,
        ShimId::NoSanitizeUndefined,
        ShimId::NoSanitizeCfi,
        ShimId::NoSanitizeSafeStack,
        ShimId::ReturnsNonNull,
        ShimId::Section,
        ShimId::SectionVariable,
        ShimId::DeclareSectionVars,
        ShimId::StackAlignForOldLibc,
        ShimId::MustUseResult,
        ShimId::Hot,
        ShimId::Cold,
        ShimId::XrayAlwaysInstrument,
        ShimId::XrayNeverInstrument,
        ShimId::XrayLogArgs,
        ShimId::Reinitializes,
        ShimId::Unused,
        ShimId::InitialExec,
        ShimId::Packed,
        ShimId::FuncAlign,
        ShimId::ConstInit,
    ];

    /// Unprefixed macro name.
    pub fn name(&self) -> &'static str {
        match self {
            ShimId::PrintfAttribute => "PRINTF_ATTRIBUTE",
            ShimId::ScanfAttribute => "SCANF_ATTRIBUTE",
            ShimId::AlwaysInline => "ATTRIBUTE_ALWAYS_INLINE",
            ShimId::NoInline => "ATTRIBUTE_NOINLINE",
            ShimId::NoTailCall => "ATTRIBUTE_NO_TAIL_CALL",
            ShimId::Weak => "ATTRIBUTE_WEAK",
            ShimId::NonNull => "ATTRIBUTE_NONNULL",
            ShimId::NoReturn => "ATTRIBUTE_NORETURN",
            ShimId::NoSanitizeAddress => "ATTRIBUTE_NO_SANITIZE_ADDRESS",
            ShimId::NoSanitizeMemory => "ATTRIBUTE_NO_SANITIZE_MEMORY",
            ShimId::NoSanitizeThread => "ATTRIBUTE_NO_SANITIZE_THREAD",
            ShimId::NoSanitizeUndefined => "ATTRIBUTE_NO_SANITIZE_UNDEFINED",
            ShimId::NoSanitizeCfi => "ATTRIBUTE_NO_SANITIZE_CFI",
            ShimId::NoSanitizeSafeStack => "ATTRIBUTE_NO_SANITIZE_SAFESTACK",
            ShimId::ReturnsNonNull => "ATTRIBUTE_RETURNS_NONNULL",
            ShimId::Section => "ATTRIBUTE_SECTION",
            ShimId::SectionVariable => "ATTRIBUTE_SECTION_VARIABLE",
            ShimId::DeclareSectionVars => "DECLARE_ATTRIBUTE_SECTION_VARS",
            ShimId::StackAlignForOldLibc => "ATTRIBUTE_STACK_ALIGN_FOR_OLD_LIBC",
            ShimId::MustUseResult => "MUST_USE_RESULT",
            ShimId::Hot => "ATTRIBUTE_HOT",
            ShimId::Cold => "ATTRIBUTE_COLD",
            ShimId::XrayAlwaysInstrument => "XRAY_ALWAYS_INSTRUMENT",
            ShimId::XrayNeverInstrument => "XRAY_NEVER_INSTRUMENT",
            ShimId::XrayLogArgs => "XRAY_LOG_ARGS",
            ShimId::Reinitializes => "ATTRIBUTE_REINITIALIZES",
            ShimId::Unused => "ATTRIBUTE_UNUSED",
            ShimId::InitialExec => "ATTRIBUTE_INITIAL_EXEC",
            ShimId::Packed => "ATTRIBUTE_PACKED",
            ShimId::FuncAlign => "ATTRIBUTE_FUNC_ALIGN",
            ShimId::ConstInit => "CONST_INIT",
        }
    }

    /// Macro parameters; empty for object-like shims.
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            ShimId::PrintfAttribute | ShimId::ScanfAttribute => {
                &["string_index", "first_to_check"]
            }
            ShimId::NonNull => &["arg_index"],
            ShimId::Section | ShimId::SectionVariable | ShimId::DeclareSectionVars => &["name"],
            ShimId::XrayLogArgs => &["N"],
            ShimId::FuncAlign => &["bytes"],
            _ => &[],
        }
    }

    /// Companion marker, for the shims that have one.
    pub fn marker(&self) -> Option<Marker> {
        let (name, style, guarded) = match self {
            ShimId::AlwaysInline => (
                "HAVE_ATTRIBUTE_ALWAYS_INLINE",
                MarkerStyle::PresentOnly,
                false,
            ),
            ShimId::NoInline => ("HAVE_ATTRIBUTE_NOINLINE", MarkerStyle::PresentOnly, false),
            ShimId::NoTailCall => ("HAVE_ATTRIBUTE_NO_TAIL_CALL", MarkerStyle::ZeroOrOne, false),
            ShimId::Weak => ("HAVE_ATTRIBUTE_WEAK", MarkerStyle::ZeroOrOne, false),
            ShimId::Section => ("HAVE_ATTRIBUTE_SECTION", MarkerStyle::ZeroOrOne, true),
            _ => return None,
        };
        Some(Marker {
            name,
            style,
            guarded,
        })
    }
}

impl fmt::Display for ShimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Any catalog entry, for lookups by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEntry {
    Flag(CapabilityFlag),
    Constant(DerivedConstant),
    Shim(ShimId),
}

/// Look up a catalog entry by its unprefixed name, case-insensitively.
///
/// A leading `<prefix>_` is stripped when given.
pub fn lookup(name: &str, prefix: &str) -> Option<CatalogEntry> {
    let upper = name.trim().to_uppercase().replace('-', "_");
    let prefixed = format!("{}_", prefix.to_uppercase());
    let bare = upper.strip_prefix(&prefixed).unwrap_or(&upper);

    if let Some(flag) = CapabilityFlag::ALL.iter().find(|f| f.name() == bare) {
        return Some(CatalogEntry::Flag(*flag));
    }
    if let Some(c) = DerivedConstant::ALL.iter().find(|c| c.name() == bare) {
        return Some(CatalogEntry::Constant(*c));
    }
    ShimId::ALL
        .iter()
        .find(|s| s.name() == bare)
        .map(|s| CatalogEntry::Shim(*s))
}
