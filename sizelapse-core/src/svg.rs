use crate::config::ViewConfig;
use crate::scene::Frame;

/// Render a frame as a standalone SVG document.
pub fn render_svg(frame: &Frame, config: &ViewConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
         viewBox=\"-{m} -{m} {w} {h}\" style=\"max-width: 100%; height: auto;\">\n",
        w = config.width,
        h = config.height,
        m = config.margin,
    ));

    for circle in &frame.circles {
        let style = circle.style();
        output.push_str(&format!(
            "  <circle cx=\"{:.3}\" cy=\"{:.3}\" r=\"{:.6}\" fill=\"{}\" fill-opacity=\"{}\" \
             stroke=\"{}\" stroke-width=\"{}\"><title>{}</title></circle>\n",
            circle.x,
            circle.y,
            circle.r,
            style.fill,
            style.fill_opacity,
            style.stroke,
            style.stroke_width,
            escape(&circle.title),
        ));
    }

    for label in &frame.labels {
        output.push_str(&format!(
            "  <text x=\"{:.3}\" y=\"{:.3}\" text-anchor=\"middle\" dominant-baseline=\"middle\" \
             font-size=\"10px\" font-family=\"sans-serif\" fill=\"white\" fill-opacity=\"{:.3}\" \
             pointer-events=\"none\">{}</text>\n",
            label.x,
            label.y,
            label.opacity,
            escape(&label.text),
        ));
    }

    output.push_str("</svg>\n");
    output
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
