//! HTML result pages for the public unsubscribe link.

/// Render the unsubscribe outcome as a small standalone page.
pub fn result_page(site_name: &str, message: &str, success: bool) -> String {
    let title = if success { "Unsubscribed" } else { "Error" };
    let heading = if success { "Unsubscribed" } else { "Oops" };
    let heading_color = if success { "#a78bfa" } else { "#f87171" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title} - {site_name}</title>
  <style>
    body {{
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      background: #1a1a2e;
      color: #e0e0e0;
      display: flex;
      justify-content: center;
      align-items: center;
      min-height: 100vh;
      margin: 0;
    }}
    .card {{
      background: rgba(255, 255, 255, 0.08);
      border-radius: 12px;
      padding: 2rem;
      max-width: 500px;
      text-align: center;
    }}
    h1 {{ color: {heading_color}; }}
    a {{ color: #a78bfa; }}
  </style>
</head>
<body>
  <div class="card">
    <h1>{heading}</h1>
    <p>{message}</p>
    <p style="margin-top: 1.5rem; font-size: 0.875rem; opacity: 0.6;">
      <a href="/">{site_name}</a>
    </p>
  </div>
</body>
</html>"#
    )
}
