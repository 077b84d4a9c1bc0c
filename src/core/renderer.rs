//! Template rendering into HTML document bodies.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::domain::templates::{find_template, Template};

/// Field set by the orchestrator when a watermark operation is selected
pub const WATERMARK_FLAG: &str = "hasWatermark";

/// Renders a template and its fields into an HTML document body
pub trait DocumentRenderer: Send + Sync {
    /// Render `template_id` with `fields`.
    ///
    /// Extra flags (such as [`WATERMARK_FLAG`]) may be present in `fields`.
    /// Unknown templates should produce a minimal fallback document.
    fn render(&self, template_id: &str, fields: &BTreeMap<String, String>) -> Result<String>;
}

/// Renderer backed by the built-in template catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl DocumentRenderer for TemplateRenderer {
    fn render(&self, template_id: &str, fields: &BTreeMap<String, String>) -> Result<String> {
        let html = match find_template(template_id) {
            Some(template) => render_template(template, fields),
            None => render_fallback(template_id, fields),
        };
        Ok(html)
    }
}

fn flag_set(fields: &BTreeMap<String, String>, name: &str) -> bool {
    fields
        .get(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn render_template(template: &Template, fields: &BTreeMap<String, String>) -> String {
    let mut body = String::new();

    if flag_set(fields, WATERMARK_FLAG) {
        body.push_str(&format!(
            "<div class=\"watermark\">{}</div>\n",
            escape_html(template.watermark_text)
        ));
    }

    body.push_str(&format!(
        "<div class=\"header\"><div class=\"logo\">SENTINEL <span>PRO</span></div>\
         <h1>{}</h1><div class=\"ref-code\">REF: {}</div></div>\n",
        escape_html(template.title),
        escape_html(template.id)
    ));

    // Schema fields in display order; blanks fall back to the template default
    body.push_str("<table class=\"terms\">\n");
    for (key, default) in template.fields {
        let value = fields
            .get(*key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default);
        body.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape_html(&field_label(key)),
            escape_html(value)
        ));
    }
    body.push_str("</table>\n");

    body.push_str(
        "<div class=\"signature-block\"><div class=\"signature-line\"></div>\
         <div class=\"signature-label\">Authorized Signature</div></div>\n",
    );

    wrap_document(template.title, &body)
}

fn render_fallback(template_id: &str, fields: &BTreeMap<String, String>) -> String {
    let mut body = format!("<h1>Document {}</h1>\n<ul>\n", escape_html(template_id));
    for (key, value) in fields.iter().filter(|(k, _)| k.as_str() != WATERMARK_FLAG) {
        body.push_str(&format!(
            "<li><strong>{}</strong>: {}</li>\n",
            escape_html(&field_label(key)),
            escape_html(value)
        ));
    }
    body.push_str("</ul>\n");
    wrap_document("Document", &body)
}

fn wrap_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        STYLESHEET,
        body
    )
}

const STYLESHEET: &str = "@page { margin: 2.5cm; } \
body { font-family: 'Times New Roman', serif; line-height: 1.6; color: #1f2937; } \
.header { border-bottom: 2px solid #fc6408; margin-bottom: 40px; } \
.terms th { text-align: left; padding-right: 24px; } \
.signature-line { border-top: 1px solid #374151; margin-top: 60px; } \
.watermark { position: fixed; top: 50%; left: 50%; transform: translate(-50%, -50%) rotate(-45deg); \
font-size: 120px; color: rgba(252, 100, 8, 0.08); font-weight: 900; z-index: -1; }";

/// "governingLaw" -> "Governing Law"
fn field_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            label.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            label.push(' ');
            label.push(c);
        } else {
            label.push(c);
        }
    }
    label
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
