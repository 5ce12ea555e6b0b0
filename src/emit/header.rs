//! C/C++ configuration header rendering.

use std::fmt::Write;

use crate::core::catalog::{DerivedConstant, MarkerStyle, ShimId};
use crate::core::resolved::ResolvedConfig;
use crate::emit::EmitOptions;

struct Writer<'a> {
    out: String,
    prefix: &'a str,
}

impl Writer<'_> {
    fn name(&self, bare: &str) -> String {
        if self.prefix.is_empty() {
            bare.to_string()
        } else {
            format!("{}_{}", self.prefix, bare)
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn section(&mut self, title: &str) {
        self.line(format!("// {}", title));
    }

    fn define(&mut self, bare: &str, value: impl std::fmt::Display) {
        let name = self.name(bare);
        let _ = writeln!(self.out, "#define {} {}", name, value);
    }
}

/// Render the configuration header.
pub fn render(config: &ResolvedConfig, opts: &EmitOptions) -> String {
    let guard = opts.guard();
    let mut w = Writer {
        out: String::new(),
        prefix: &opts.prefix,
    };

    w.line("// Generated by portcfg. Do not edit.");
    w.line(format!("// Signals fingerprint: {}", config.fingerprint()));
    w.line(format!("#ifndef {}", guard));
    w.line(format!("#define {}", guard));
    w.blank();

    render_predicates(&mut w, config);
    render_flags(&mut w, config);
    render_constants(&mut w, config);
    render_shims(&mut w, config);
    render_section_helpers(&mut w, config);
    render_simd_includes(&mut w, config);

    w.line(format!("#endif  // {}", guard));
    w.out
}

fn render_predicates(w: &mut Writer<'_>, config: &ResolvedConfig) {
    let p = config.predicates();
    w.section("Feature-test predicates");
    for (bare, probe, available) in [
        ("HAVE_ATTRIBUTE", "__has_attribute", p.has_attribute),
        ("HAVE_CPP_ATTRIBUTE", "__has_cpp_attribute", p.has_cpp_attribute),
        ("HAVE_BUILTIN", "__has_builtin", p.has_builtin),
    ] {
        let name = w.name(bare);
        if available {
            w.line(format!("#define {}(x) {}(x)", name, probe));
        } else {
            w.line(format!("#define {}(x) 0", name));
        }
    }
    w.blank();
}

fn render_flags(w: &mut Writer<'_>, config: &ResolvedConfig) {
    w.section("Capability flags");
    for flag in config.present_flags() {
        w.define(flag.name(), 1);
    }
    w.blank();
}

fn render_constants(w: &mut Writer<'_>, config: &ResolvedConfig) {
    w.section("Derived constants");
    for (constant, resolved) in config.constants() {
        if resolved.overridden {
            let name = w.name(constant.name());
            w.line(format!("// {} is supplied by the build ({})", name, resolved.value));
        } else {
            w.define(constant.name(), resolved.value);
        }
    }
    w.blank();
}

/// How a shim line treats a definition made before the header.
enum PriorDefinition {
    Redefine,
    /// `#undef` first; the resolved expansion wins
    Replace,
    /// `#ifndef` guard; the existing definition wins
    Keep,
}

fn prior_definition(id: ShimId) -> PriorDefinition {
    match id {
        ShimId::Weak | ShimId::Unused => PriorDefinition::Replace,
        ShimId::Section | ShimId::SectionVariable | ShimId::DeclareSectionVars => {
            PriorDefinition::Keep
        }
        _ => PriorDefinition::Redefine,
    }
}

fn render_shims(w: &mut Writer<'_>, config: &ResolvedConfig) {
    w.section("Attribute shims");
    for (id, shim) in config.shims() {
        let name = w.name(id.name());
        let define = shim.expansion.define_line(&name);
        match prior_definition(id) {
            PriorDefinition::Redefine => w.line(define),
            PriorDefinition::Replace => {
                w.line(format!("#undef {}", name));
                w.line(define);
            }
            PriorDefinition::Keep => {
                w.line(format!("#ifndef {}", name));
                w.line(define);
                w.line("#endif");
            }
        }

        let (Some(marker), Some(active)) = (id.marker(), shim.marker) else {
            continue;
        };
        match (marker.style, active) {
            (MarkerStyle::PresentOnly, false) => {}
            (_, active) => w.define(marker.name, u8::from(active)),
        }
    }
    w.blank();
}

fn render_section_helpers(w: &mut Writer<'_>, config: &ResolvedConfig) {
    let enabled = config
        .shim(ShimId::Section)
        .and_then(|s| s.marker)
        .unwrap_or(false);

    w.section("Section start/stop helpers");
    let guard = w.name("DEFINE_ATTRIBUTE_SECTION_VARS");
    w.line(format!("#ifndef {}", guard));
    for bare in ["INIT_ATTRIBUTE_SECTION_VARS", "DEFINE_ATTRIBUTE_SECTION_VARS"] {
        let name = w.name(bare);
        w.line(format!("#define {}(name)", name));
    }
    w.line("#endif");
    for (bare, symbol) in [
        ("ATTRIBUTE_SECTION_START", "__start_##name"),
        ("ATTRIBUTE_SECTION_STOP", "__stop_##name"),
    ] {
        let name = w.name(bare);
        let target = if enabled { symbol } else { "0" };
        w.line(format!(
            "#define {}(name) (reinterpret_cast<void *>({}))",
            name, target
        ));
    }
    w.blank();
}

fn render_simd_includes(w: &mut Writer<'_>, config: &ResolvedConfig) {
    let sse2 = config.constant(DerivedConstant::HaveSse2) == 1;
    let ssse3 = config.constant(DerivedConstant::HaveSsse3) == 1;
    if !sse2 && !ssse3 {
        return;
    }
    w.section("SIMD intrinsics");
    if sse2 {
        w.line("#include <emmintrin.h>");
    }
    if ssse3 {
        w.line("#include <tmmintrin.h>");
    }
    w.blank();
}
