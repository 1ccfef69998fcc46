//! HTML output for [`Page`]
//!
//! The map surface is a Leaflet map initialized from an inline script.

use std::fmt::Write;

use super::{Block, Layout, Page, StatusLevel};
use crate::connector::Notice;
use crate::map::{MapSize, MapView};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

const STYLE: &str = r#"
      * { box-sizing: border-box; }
      body { margin: 0; font-family: "Source Sans Pro", system-ui, sans-serif; color: #31333f; background: #fff; }
      .shell { display: flex; min-height: 100vh; }
      aside { width: 300px; flex-shrink: 0; background: #f0f2f6; padding: 2rem 1.25rem; }
      main { flex: 1; padding: 2rem 3rem; }
      main.centered { max-width: 736px; margin: 0 auto; }
      h1 { font-size: 2.5rem; margin: 0 0 1rem; }
      h2, h3 { margin: 1rem 0 0.75rem; }
      .box { border-radius: 0.5rem; padding: 1rem; margin: 0.75rem 0; }
      .info { background: #e8f0fe; color: #0b3d91; }
      .warning { background: #fffbe6; color: #7a5c00; }
      .success { background: #e6f6ea; color: #17663a; }
      .caption { font-size: 0.875rem; color: #808495; margin-top: 1rem; }
      #map { border-radius: 0.5rem; }
"#;

/// Render the full document
pub(super) fn render(page: &Page) -> String {
    let mut out = String::with_capacity(4096);
    let main_class = match page.config.layout {
        Layout::Wide => "wide",
        Layout::Centered => "centered",
    };

    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{title}</title>
    <link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>{icon}</text></svg>" />
    <link rel="stylesheet" href="{css}" crossorigin="" />
    <style>{style}</style>
  </head>
  <body>
    <div class="shell">
"#,
        title = escape(&page.config.title),
        icon = escape(&page.config.icon),
        css = LEAFLET_CSS,
        style = STYLE,
    );

    if let Some(sidebar) = &page.sidebar {
        let _ = write!(
            out,
            "      <aside>\n        <h2>{}</h2>\n        <div class=\"box info\">{}</div>\n      </aside>\n",
            escape(&sidebar.header),
            escape(&sidebar.info)
        );
    }

    let _ = writeln!(out, "      <main class=\"{}\">", main_class);

    let mut map_script = None;
    for block in &page.blocks {
        match block {
            Block::Title { text } => {
                let _ = writeln!(out, "        <h1>{}</h1>", escape(text));
            }
            Block::Subheading { text } => {
                let _ = writeln!(out, "        <h3>{}</h3>", escape(text));
            }
            Block::Notice { notice } => {
                let class = match notice {
                    Notice::Info(_) => "info",
                    Notice::Warning(_) => "warning",
                };
                let _ = writeln!(
                    out,
                    "        <div class=\"box {}\" role=\"alert\">{}</div>",
                    class,
                    escape(notice.text())
                );
            }
            Block::Map { view, size } => {
                let _ = writeln!(out, "        {}", map_container(*size));
                map_script = Some(map_script_for(view));
            }
            Block::Status { status } => {
                let class = match status.level {
                    StatusLevel::Success => "success",
                    StatusLevel::Info => "info",
                };
                let _ = writeln!(
                    out,
                    "        <div class=\"box {}\" id=\"status\">{}</div>",
                    class,
                    escape(&status.text)
                );
            }
            Block::Caption { text } => {
                let _ = writeln!(out, "        <p class=\"caption\">{}</p>", escape(text));
            }
        }
    }

    out.push_str("      </main>\n    </div>\n");

    if let Some(script) = map_script {
        let _ = write!(
            out,
            "    <script src=\"{}\" crossorigin=\"\"></script>\n    <script>\n{}    </script>\n",
            LEAFLET_JS, script
        );
    }

    out.push_str("  </body>\n</html>\n");
    out
}

fn map_container(size: MapSize) -> String {
    format!(
        "<div id=\"map\" style=\"width: {}; height: {};\"></div>",
        size.css_width(),
        size.css_height()
    )
}

fn map_script_for(view: &MapView) -> String {
    format!(
        "      const map = L.map('map').setView([{lat}, {lng}], {zoom});\n      L.tileLayer({url}, {{ maxZoom: {max_zoom}, attribution: {attribution} }}).addTo(map);\n",
        lat = view.center.lat,
        lng = view.center.lng,
        zoom = view.zoom_level,
        url = js_string(view.tile_source.url_template()),
        max_zoom = view.tile_source.max_zoom(),
        attribution = js_string(&view.attribution),
    )
}

/// JSON string literal safe to embed in a `<script>` element
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{Dashboard, DashboardOptions};

    #[test]
    fn test_escape() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape("© OpenStreetMap"), "© OpenStreetMap");
    }

    #[test]
    fn test_js_string() {
        assert_eq!(js_string("it's"), "\"it's\"");
        assert_eq!(js_string("</script>"), "\"<\\/script>\"");
    }

    #[test]
    fn test_map_script() {
        let script = map_script_for(&MapView::fixed());
        assert!(script.contains("setView([37.7749, -122.4194], 13)"));
        assert!(script.contains("\"https://tile.openstreetmap.org/{z}/{x}/{y}.png\""));
        assert!(script.contains("attribution: \"© OpenStreetMap contributors\""));
    }

    #[tokio::test]
    async fn test_informational_document() {
        let page = Dashboard::new(DashboardOptions::informational(), None)
            .render_page()
            .await;
        let html = render(&page);

        assert!(html.contains("<title>FlowLine Prototype</title>"));
        assert!(html.contains("<h1>FlowLine Prototype</h1>"));
        assert!(html.contains("<aside>"));
        assert!(html.contains("Firebase/Firestore integration can be added here"));
        assert!(html.contains("width: 100%; height: 600px;"));
        assert!(html.contains("<p class=\"caption\">© OpenStreetMap contributors</p>"));
        assert!(!html.contains("id=\"status\""));
    }

    #[tokio::test]
    async fn test_connected_document_size() {
        let page = Dashboard::new(DashboardOptions::connected(), None)
            .render_page()
            .await;
        let html = render(&page);

        assert!(html.contains("width: 700px; height: 500px;"));
        assert!(html.contains("id=\"status\""));
        assert!(!html.contains("<aside>"));
    }
}
