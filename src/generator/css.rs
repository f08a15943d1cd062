//! The `<style>` block: custom properties from the model plus a fixed base sheet

use crate::model::{px, trim_number, LayoutModel};
use std::fmt::Write;

/// Hand-authored rules shared by every generated document. Layout uses flex
/// and grid only; everything page-specific comes in through the `:root`
/// custom properties or inline styles.
pub const BASE_CSS: &str = r#"*, *::before, *::after { box-sizing: border-box; }
html { scroll-behavior: smooth; }
body {
  margin: 0;
  background: var(--page-background);
  color: var(--page-color);
  font-family: var(--font-family);
  font-size: var(--body-size);
  font-weight: var(--body-weight);
  line-height: var(--line-height);
}
header, main, section, footer { display: block; width: 100%; }
.container {
  width: 100%;
  max-width: var(--section-max-width, var(--content-max-width));
  margin: 0 auto;
}
h1 { font-size: var(--h1-size); font-weight: var(--h1-weight); line-height: var(--h1-line-height); margin: 0 0 var(--h1-margin); }
h2 { font-size: var(--h2-size); font-weight: var(--h2-weight); line-height: var(--h2-line-height); margin: 0 0 var(--h2-margin); }
h3 { font-size: var(--h3-size); font-weight: var(--h3-weight); line-height: var(--h3-line-height); margin: 0 0 var(--h3-margin); }
h4, h5, h6 { font-size: var(--h4-size); font-weight: var(--h4-weight); line-height: var(--h4-line-height); margin: 0 0 var(--h4-margin); }
p { margin: 0 0 var(--body-margin); line-height: var(--body-line-height); }
small, .small { font-size: var(--small-size); line-height: var(--small-line-height); }
a { color: var(--color-primary); text-decoration: none; }
img { display: block; max-width: 100%; height: auto; }
ul { margin: 0 0 var(--body-margin); padding-left: 1.25em; }
hr { border: 0; border-top: 1px solid var(--color-border); margin: var(--space-md) 0; }
.btn {
  display: inline-flex;
  align-items: center;
  justify-content: center;
  padding: var(--space-sm) var(--space-md);
  border-radius: 6px;
  font-weight: 600;
}
.btn-primary { background: var(--color-primary); color: var(--color-background); }
.header { background: var(--color-background); border-bottom: 1px solid var(--color-border); }
.hero { background: var(--color-surface); text-align: center; }
div.offer-card {
  display: flex;
  flex-direction: column;
  gap: var(--space-sm);
  padding: var(--space-lg);
  background: var(--color-background);
  border: 1px solid var(--color-border);
  border-radius: 8px;
}
.cta { background: var(--color-surface); text-align: center; }
.footer { background: var(--color-surface); color: var(--color-text-muted); font-size: var(--small-size); }
@media (max-width: 640px) {
  .header .container { flex-direction: column; }
  .features .container, .testimonials .container { grid-template-columns: 1fr; }
}
"#;

/// Fixed spacing scale exposed as `--space-*`
const SPACING_SCALE: [(&str, f64); 4] = [("xs", 4.0), ("sm", 8.0), ("md", 16.0), ("lg", 24.0)];

/// Strip characters that could end a declaration or the style element early
pub fn css_value(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '<' | '>' | '{' | '}' | ';')).collect()
}

/// `:root { ... }` with one custom property per color, typography and
/// spacing value of the model, in a fixed order.
pub fn root_variables(model: &LayoutModel) -> String {
    let mut out = String::from(":root {\n");
    let mut decl = |name: &str, value: &str| {
        let _ = writeln!(out, "  --{}: {};", name, value);
    };

    for (role, color) in model.color_scheme.roles() {
        decl(&format!("color-{}", role), &css_value(color));
    }

    let g = &model.global_styles;
    decl("page-background", &css_value(&g.background));
    decl("page-color", &css_value(&g.color));
    decl("font-family", &css_value(&g.font_family));
    decl("line-height", &trim_number(g.line_height));
    decl("content-max-width", &px(g.max_width));

    for (name, level) in model.typography.levels() {
        decl(&format!("{}-size", name), &px(level.size));
        decl(&format!("{}-weight", name), &level.weight.to_string());
        decl(&format!("{}-line-height", name), &trim_number(level.line_height));
        decl(&format!("{}-margin", name), &px(level.margin_bottom));
    }

    for (name, value) in SPACING_SCALE {
        decl(&format!("space-{}", name), &px(value));
    }

    out.push_str("}\n");
    out
}

/// Complete stylesheet text for the `<style>` element
pub fn stylesheet(model: &LayoutModel) -> String {
    let mut out = root_variables(model);
    out.push_str(BASE_CSS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::sample_model;

    #[test]
    fn root_variables_cover_every_role_and_level() {
        let css = root_variables(&sample_model());
        for role in ["primary", "secondary", "accent", "background", "surface", "text", "text-muted", "border"] {
            assert!(css.contains(&format!("--color-{}:", role)), "missing {}", role);
        }
        assert!(css.contains("--h1-size: 48px;"));
        assert!(css.contains("--body-line-height: 1.6;"));
        assert!(css.contains("--small-margin: 8px;"));
        assert!(css.contains("--content-max-width: 1200px;"));
    }

    #[test]
    fn base_sheet_never_positions_absolutely() {
        assert!(!BASE_CSS.contains("position: absolute"));
        assert!(!BASE_CSS.contains("position:absolute"));
    }

    #[test]
    fn css_value_cannot_close_style_block() {
        assert_eq!(css_value("Inter</style><script>"), "Inter/stylescript");
        assert_eq!(css_value("red; } body {"), "red  body ");
    }
}
