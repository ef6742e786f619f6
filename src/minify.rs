//! Template source minification.
//!
//! Uses minify-html with template syntax preserved, so `{{ ... }}`,
//! `{% ... %}` and `{# ... #}` reach the engine untouched.

/// Compacts template markup without changing what it renders.
pub trait Minifier: Send + Sync + 'static {
    fn minify(&self, source: &[u8]) -> Vec<u8>;
}

/// HTML minifier backed by `minify-html`.
pub struct HtmlMinifier {
    cfg: minify_html::Cfg,
}

impl HtmlMinifier {
    pub fn new() -> Self {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.keep_comments = false;
        cfg.minify_css = true;
        cfg.minify_js = true;
        cfg.remove_bangs = false;
        cfg.remove_processing_instructions = true;
        cfg.preserve_brace_template_syntax = true;
        cfg.preserve_chevron_percent_template_syntax = true;
        Self { cfg }
    }
}

impl Default for HtmlMinifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Minifier for HtmlMinifier {
    fn minify(&self, source: &[u8]) -> Vec<u8> {
        minify_html::minify(source, &self.cfg)
    }
}
