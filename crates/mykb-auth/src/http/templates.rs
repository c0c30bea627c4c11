//! HTML templates for the consent flow.
//!
//! Server-rendered consent and error pages. Every interpolated value goes
//! through [`html_escape`].

use crate::oauth::authorize::ConsentPage;

/// Shared CSS for all pages.
const STYLES: &str = r#"
:root {
    --accent: #2f6fed;
    --accent-hover: #4a84f5;
    --danger: #d64541;
    --danger-bg: rgba(214, 69, 65, 0.12);
    --surface: #ffffff;
    --surface-muted: #f3f5f9;
    --border: #dde2ec;
    --text: #1d2330;
    --text-muted: #5f6b7f;
    --radius: 8px;
}

* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: var(--surface-muted);
    min-height: 100vh;
    display: flex;
    justify-content: center;
    align-items: center;
    color: var(--text);
    line-height: 1.5;
}

.container { width: 100%; max-width: 420px; padding: 1rem; }

.card {
    background: var(--surface);
    border: 1px solid var(--border);
    border-radius: var(--radius);
    padding: 1.5rem;
}

.card-title { font-size: 1.25rem; font-weight: 600; margin-bottom: 1rem; }

.client-info {
    background: var(--surface-muted);
    border-radius: var(--radius);
    padding: 0.75rem 1rem;
    margin-bottom: 1rem;
}

.client-name { font-weight: 600; }

.client-redirect {
    font-size: 0.75rem;
    color: var(--text-muted);
    word-break: break-all;
}

.form-group { margin-bottom: 1rem; }

.form-label {
    display: block;
    font-size: 0.875rem;
    color: var(--text-muted);
    margin-bottom: 0.25rem;
}

.form-input {
    width: 100%;
    padding: 0.625rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: var(--radius);
    font-size: 0.875rem;
}

.form-input:focus { outline: none; border-color: var(--accent); }

.btn {
    width: 100%;
    padding: 0.625rem 1rem;
    border: none;
    border-radius: var(--radius);
    background: var(--accent);
    color: white;
    font-size: 0.875rem;
    font-weight: 500;
    cursor: pointer;
}

.btn:hover { background: var(--accent-hover); }

.hint {
    font-size: 0.75rem;
    color: var(--text-muted);
    text-align: center;
    margin-top: 1rem;
}

.error-title { font-size: 1.125rem; font-weight: 600; color: var(--danger); margin-bottom: 0.5rem; }

.error-code {
    display: inline-block;
    margin-top: 0.75rem;
    padding: 0.125rem 0.5rem;
    border-radius: var(--radius);
    background: var(--danger-bg);
    color: var(--danger);
    font-family: monospace;
    font-size: 0.75rem;
}
"#;

/// Base HTML template wrapper.
fn html_page(title: &str, content: &str) -> String {
    let mut html = String::with_capacity(content.len() + STYLES.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <meta name=\"robots\" content=\"noindex\">\n");
    html.push_str("    <title>");
    html.push_str(&html_escape(title));
    html.push_str(" - MyKB</title>\n");
    html.push_str("    <style>");
    html.push_str(STYLES);
    html.push_str("</style>\n</head>\n<body>\n    <div class=\"container\">\n");
    html.push_str(content);
    html.push_str("\n    </div>\n</body>\n</html>");
    html
}

fn hidden_field(content: &mut String, name: &str, value: &str) {
    content.push_str("<input type=\"hidden\" name=\"");
    content.push_str(name);
    content.push_str("\" value=\"");
    content.push_str(&html_escape(value));
    content.push_str("\">\n");
}

/// Renders the consent form.
///
/// The CSRF token and every validated authorization parameter are carried
/// as hidden fields so the submission is self-contained.
pub fn render_consent_form(page: &ConsentPage) -> String {
    let mut content = String::with_capacity(2048);

    content.push_str("<div class=\"card\">\n");
    content.push_str("<div class=\"card-title\">Authorize Access</div>\n\n");

    content.push_str("<div class=\"client-info\">\n<div class=\"client-name\">");
    content.push_str(&html_escape(page.display_name()));
    content.push_str("</div>\n<div class=\"client-redirect\">");
    content.push_str(&html_escape(&page.redirect_uri));
    content.push_str("</div>\n</div>\n\n");

    content.push_str("<p class=\"form-label\">This application is requesting access to your knowledge base.</p>\n\n");

    content.push_str("<form method=\"POST\" action=\"/authorize\">\n");
    hidden_field(&mut content, "csrf_token", &page.csrf_token);
    hidden_field(&mut content, "client_id", &page.client_id);
    hidden_field(&mut content, "redirect_uri", &page.redirect_uri);
    hidden_field(&mut content, "response_type", "code");
    hidden_field(&mut content, "code_challenge", &page.code_challenge);
    hidden_field(
        &mut content,
        "code_challenge_method",
        page.code_challenge_method.as_str(),
    );
    if let Some(state) = &page.state {
        hidden_field(&mut content, "state", state);
    }

    content.push_str("\n<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"password\">Password</label>\n");
    content.push_str(
        "<input type=\"password\" id=\"password\" name=\"password\" class=\"form-input\" ",
    );
    content.push_str("required autofocus autocomplete=\"current-password\">\n");
    content.push_str("</div>\n\n");

    content.push_str("<button type=\"submit\" class=\"btn\">Authorize</button>\n");
    content.push_str("</form>\n\n");
    content.push_str("<div class=\"hint\">This page expires in a few minutes</div>\n");
    content.push_str("</div>");

    html_page("Authorize", &content)
}

/// Renders an error page for failed authorization requests.
///
/// # Arguments
///
/// * `error_code` - Machine-readable code (e.g., "invalid_client")
/// * `error_description` - Human-readable description
pub fn render_error_page(error_code: &str, error_description: &str) -> String {
    let mut content = String::with_capacity(512);
    content.push_str("<div class=\"card\" style=\"text-align: center;\">\n");
    content.push_str("<div class=\"error-title\">Authorization Error</div>\n");
    content.push_str("<div>");
    content.push_str(&html_escape(error_description));
    content.push_str("</div>\n");
    content.push_str("<div class=\"error-code\">");
    content.push_str(&html_escape(error_code));
    content.push_str("</div>\n</div>");
    html_page("Error", &content)
}

/// Escapes text for HTML element content and double-quoted attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
