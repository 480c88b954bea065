// HTML output helpers

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Embed a complete HTML document in a fixed-height, scrollable frame.
///
/// Trust boundary: `markup` is emitted as-is inside the frame, with scripts
/// enabled and no sanitizing. Only pass documents produced by the same pipeline
/// that produced the models. The markup goes through `srcdoc`, so it is
/// attribute-escaped here and the browser decodes it back to the original bytes.
pub fn embed_trusted_markup(markup: &str, height: u32) -> String {
    format!(
        r#"<iframe class="dashboard-frame" srcdoc="{}" height="{}" scrolling="yes" style="width: 100%; height: {}px; overflow-y: auto; border: none;"></iframe>"#,
        escape(markup),
        height,
        height
    )
}
