//! Attribute shim generator.
//!
//! Each portable attribute name gets exactly one expansion: the first
//! matching rule's body, or the empty expansion. An unsupported attribute
//! degrades silently to a no-op.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::catalog::{MarkerStyle, ShimId};
use crate::core::resolved::{Expansion, ResolvedShim};
use crate::core::signal::{Arch, Sanitizer, Signals};
use crate::negotiate::cond::Cond;
use crate::negotiate::error::NegotiationError;
use crate::negotiate::registry::{Origin, Registry};
use crate::negotiate::rule::RuleChain;

/// `HAVE_ATTRIBUTE(weak) || gcc`, minus LLVM on Windows.
fn weak_supported() -> Cond {
    Cond::all([
        Cond::attribute_or_gcc("weak"),
        Cond::not(Cond::all([Cond::Clang, Cond::Windows])),
    ])
}

/// Whether named sections (and their start/stop symbols) are usable.
pub fn section_supported() -> Cond {
    Cond::all([
        Cond::attribute_or_gcc("section"),
        Cond::not(Cond::Apple),
        weak_supported(),
    ])
}

fn sanitizer(san: Sanitizer) -> Cond {
    Cond::all([Cond::Gnuc, Cond::Sanitizer(san)])
}

fn xray() -> Cond {
    Cond::all([
        Cond::HasCppAttribute("clang::xray_always_instrument"),
        Cond::not(Cond::XrayOptOut),
    ])
}

fn attribute(id: ShimId, attr: &'static str, body: &'static str) -> RuleChain<&'static str> {
    RuleChain::new(id.name(), "").rule(Cond::attribute_or_gcc(attr), body)
}

/// The rule chain selecting `id`'s expansion body.
pub fn shim_chain(id: ShimId) -> RuleChain<&'static str> {
    let name = id.name();
    match id {
        ShimId::PrintfAttribute => attribute(
            id,
            "format",
            "__attribute__((__format__(__printf__, string_index, first_to_check)))",
        ),
        ShimId::ScanfAttribute => attribute(
            id,
            "format",
            "__attribute__((__format__(__scanf__, string_index, first_to_check)))",
        ),
        ShimId::AlwaysInline => {
            attribute(id, "always_inline", "__attribute__((always_inline))")
        }
        ShimId::NoInline => attribute(id, "noinline", "__attribute__((noinline))"),
        ShimId::NoTailCall => RuleChain::new(name, "")
            .rule(
                Cond::HasAttribute("disable_tail_calls"),
                "__attribute__((disable_tail_calls))",
            )
            .rule(
                Cond::gcc(),
                "__attribute__((optimize(\"no-optimize-sibling-calls\")))",
            ),
        ShimId::Weak => RuleChain::new(name, "").rule(weak_supported(), "__attribute__((weak))"),
        ShimId::NonNull => attribute(id, "nonnull", "__attribute__((nonnull(arg_index)))"),
        ShimId::NoReturn => RuleChain::new(name, "")
            .rule(Cond::attribute_or_gcc("noreturn"), "__attribute__((noreturn))")
            .rule(Cond::Msvc, "__declspec(noreturn)"),
        ShimId::NoSanitizeAddress => RuleChain::new(name, "").rule(
            sanitizer(Sanitizer::Address),
            "__attribute__((no_sanitize_address))",
        ),
        ShimId::NoSanitizeMemory => RuleChain::new(name, "").rule(
            sanitizer(Sanitizer::Memory),
            "__attribute__((no_sanitize_memory))",
        ),
        ShimId::NoSanitizeThread => RuleChain::new(name, "").rule(
            sanitizer(Sanitizer::Thread),
            "__attribute__((no_sanitize_thread))",
        ),
        ShimId::NoSanitizeUndefined => RuleChain::new(name, "").rule(
            Cond::all([
                Cond::Gnuc,
                Cond::any([
                    Cond::Sanitizer(Sanitizer::Undefined),
                    Cond::Sanitizer(Sanitizer::Address),
                ]),
            ]),
            "__attribute__((no_sanitize(\"undefined\")))",
        ),
        ShimId::NoSanitizeCfi => RuleChain::new(name, "").rule(
            sanitizer(Sanitizer::Cfi),
            "__attribute__((no_sanitize(\"cfi\")))",
        ),
        ShimId::NoSanitizeSafeStack => RuleChain::new(name, "").rule(
            sanitizer(Sanitizer::SafeStack),
            "__attribute__((no_sanitize(\"safe-stack\")))",
        ),
        // GCC 5.x is excluded; the version test reads `> 5 || == 4.9+`.
        ShimId::ReturnsNonNull => RuleChain::new(name, "").rule(
            Cond::any([
                Cond::HasAttribute("returns_nonnull"),
                Cond::all([
                    Cond::gcc(),
                    Cond::any([
                        Cond::GnucAtLeast(6, 0),
                        Cond::all([Cond::GnucAtLeast(4, 9), Cond::GnucBelow(5, 0)]),
                    ]),
                ]),
            ]),
            "__attribute__((returns_nonnull))",
        ),
        ShimId::Section => RuleChain::new(name, "").rule(
            section_supported(),
            "__attribute__((section(#name))) __attribute__((noinline))",
        ),
        ShimId::SectionVariable => RuleChain::new(name, "")
            .rule(section_supported(), "__attribute__((section(#name)))"),
        ShimId::DeclareSectionVars => RuleChain::new(name, "").rule(
            section_supported(),
            "extern char __start_##name[] __attribute__((weak)); \
             extern char __stop_##name[] __attribute__((weak))",
        ),
        ShimId::StackAlignForOldLibc => RuleChain::new(name, "").rule(
            Cond::all([
                Cond::attribute_or_gcc("force_align_arg_pointer"),
                Cond::Arch(Arch::X86),
            ]),
            "__attribute__((force_align_arg_pointer))",
        ),
        ShimId::MustUseResult => RuleChain::new(name, "")
            .rule(Cond::HasAttribute("nodiscard"), "[[nodiscard]]")
            .rule(
                Cond::all([Cond::Clang, Cond::HasAttribute("warn_unused_result")]),
                "__attribute__((warn_unused_result))",
            ),
        ShimId::Hot => attribute(id, "hot", "__attribute__((hot))"),
        ShimId::Cold => attribute(id, "cold", "__attribute__((cold))"),
        ShimId::XrayAlwaysInstrument => {
            RuleChain::new(name, "").rule(xray(), "[[clang::xray_always_instrument]]")
        }
        ShimId::XrayNeverInstrument => {
            RuleChain::new(name, "").rule(xray(), "[[clang::xray_never_instrument]]")
        }
        ShimId::XrayLogArgs => RuleChain::new(name, "")
            .rule(
                Cond::all([xray(), Cond::HasCppAttribute("clang::xray_log_args")]),
                "[[clang::xray_always_instrument, clang::xray_log_args(N)]]",
            )
            .rule(xray(), "[[clang::xray_always_instrument]]"),
        ShimId::Reinitializes => RuleChain::new(name, "").rule(
            Cond::HasCppAttribute("clang::reinitializes"),
            "[[clang::reinitializes]]",
        ),
        ShimId::Unused => attribute(id, "unused", "__attribute__((__unused__))"),
        ShimId::InitialExec => attribute(
            id,
            "tls_model",
            "__attribute__((tls_model(\"initial-exec\")))",
        ),
        ShimId::Packed => attribute(id, "packed", "__attribute__((__packed__))"),
        ShimId::FuncAlign => attribute(id, "aligned", "__attribute__((aligned(bytes)))"),
        ShimId::ConstInit => RuleChain::new(name, "").rule(
            Cond::HasCppAttribute("clang::require_constant_initialization"),
            "[[clang::require_constant_initialization]]",
        ),
    }
}

/// Resolve every shim and its companion marker.
pub fn resolve(
    signals: &Signals,
    registry: &mut Registry<'_>,
) -> Result<BTreeMap<ShimId, ResolvedShim>, NegotiationError> {
    let mut shims = BTreeMap::new();
    for id in ShimId::ALL {
        let chain = shim_chain(id);
        let (body, hit) = chain.evaluate(signals);
        let expansion = Expansion::new(id.params(), *body);
        registry.define_unguarded(id.name(), Origin::Shim)?;

        let marker = match id.marker() {
            Some(marker) => {
                let active = !expansion.is_empty();
                let emitted = active || marker.style == MarkerStyle::ZeroOrOne;
                if marker.guarded {
                    registry.ensure_undefined(marker.name, &Origin::Marker)?;
                }
                if emitted {
                    registry.define_unguarded(marker.name, Origin::Marker)?;
                }
                Some(active)
            }
            None => None,
        };

        shims.insert(
            id,
            ResolvedShim {
                expansion,
                hit,
                marker,
            },
        );
    }

    debug!(
        "shims: {} of {} active",
        shims.values().filter(|s| !s.expansion.is_empty()).count(),
        shims.len()
    );
    Ok(shims)
}
