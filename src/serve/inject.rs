// src/serve/inject.rs

use super::EVENTS_PATH;

/// Browser side of live reload: listen on the event stream, reload on
/// `reload`, show a transient banner on `notify`.
pub fn client_script() -> String {
    format!(
        r#"<script>
(function () {{
  if (!window.EventSource) return;
  var source = new EventSource("{EVENTS_PATH}");
  source.addEventListener("reload", function () {{ window.location.reload(); }});
  source.addEventListener("notify", function (e) {{
    var el = document.getElementById("__sitewatch_notify");
    if (!el) {{
      el = document.createElement("div");
      el.id = "__sitewatch_notify";
      el.style.cssText = "position:fixed;top:0;right:0;z-index:9999;padding:12px 16px;" +
        "background:#1b1b1b;color:#fff;font:14px sans-serif;border-bottom-left-radius:6px";
      document.body.appendChild(el);
    }}
    el.textContent = e.data;
    el.style.display = "block";
    clearTimeout(el.__timer);
    el.__timer = setTimeout(function () {{ el.style.display = "none"; }}, 3000);
  }});
}})();
</script>"#
    )
}

/// Insert the client script before the last `</body>`, or append it when the
/// page has no body tag.
pub fn inject_client(html: &[u8]) -> Vec<u8> {
    let script = client_script();
    let needle = b"</body>";

    let position = html
        .windows(needle.len())
        .rposition(|w| w.eq_ignore_ascii_case(needle));

    let mut out = Vec::with_capacity(html.len() + script.len());
    match position {
        Some(idx) => {
            out.extend_from_slice(&html[..idx]);
            out.extend_from_slice(script.as_bytes());
            out.extend_from_slice(&html[idx..]);
        }
        None => {
            out.extend_from_slice(html);
            out.extend_from_slice(script.as_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let page = b"<html><body><p>x</p></BODY></html>";
        let out = String::from_utf8(inject_client(page)).unwrap();

        let script_at = out.find("<script>").unwrap();
        let body_at = out.find("</BODY>").unwrap();
        assert!(script_at < body_at);
        assert!(out.contains(EVENTS_PATH));
        assert!(out.ends_with("</BODY></html>"));
    }

    #[test]
    fn fragment_without_body_gets_script_appended() {
        let out = String::from_utf8(inject_client(b"<p>partial</p>")).unwrap();
        assert!(out.starts_with("<p>partial</p><script>"));
    }
}
