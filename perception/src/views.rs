//! HTML for the shell pages.

use crate::login::LoginForm;
use crate::routes::{self, View, NAV_LINKS};

/// Minimal HTML escaping for text and attribute values
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

fn navigation() -> String {
    let links: String = NAV_LINKS
        .iter()
        .map(|(label, href)| format!(r#"<a href="{}" class="nav-link">{}</a>"#, href, label))
        .collect::<Vec<_>>()
        .join("\n        ");

    format!(
        r#"<nav class="nav">
      <a href="/" class="brand">Perception</a>
      <div class="nav-links">
        {}
      </div>
      <form method="post" action="/logout">
        <button type="submit" class="nav-signout">Sign Out</button>
      </form>
    </nav>"#,
        links
    )
}

/// Wrap page content in the document shell. `path` decides whether the nav bar shows.
pub fn layout(path: &str, title: &str, body: &str) -> String {
    let nav = if routes::shows_navigation(path) {
        navigation()
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{}</title>
  </head>
  <body>
    {}
    <main>
{}
    </main>
  </body>
</html>
"#,
        escape(title),
        nav,
        body
    )
}

/// Shown while the session gate is still waiting on the provider
pub fn loading(path: &str) -> String {
    layout(
        path,
        "Perception",
        r#"      <div class="loading">Loading...</div>"#,
    )
}

pub fn about() -> String {
    layout(
        routes::HOME_PATH,
        View::About.title(),
        r#"      <section class="hero">
        <span class="badge">AI-Powered News Intelligence</span>
        <h1>Stop drowning in news.<br><span>Start seeing what matters.</span></h1>
        <p>Perception cuts through the noise with 8 specialized AI agents that monitor, analyze,
          and deliver strategic intelligence from any source, automatically.</p>
        <a href="/login" class="cta">Sign In</a>
      </section>
      <section class="stats">
        <div><strong>8</strong> AI Agents</div>
        <div><strong>Any Source</strong> RSS, APIs, Custom</div>
        <div><strong>&lt; 30s</strong> Analysis Time</div>
        <div><strong>24/7</strong> Automated Monitoring</div>
      </section>"#,
    )
}

pub fn login(form: &LoginForm) -> String {
    let error = form
        .error
        .as_deref()
        .map(|e| format!(r#"<div class="error" role="alert">{}</div>"#, escape(e)))
        .unwrap_or_default();

    let body = format!(
        r#"      <div class="login">
        <h1>Perception</h1>
        <p>AI-powered news intelligence</p>
        <div class="card">
          <h2>{heading}</h2>
          {error}
          <form method="post" action="/login">
            <input type="hidden" name="mode" value="{mode}">
            <label for="email">Email</label>
            <input type="email" id="email" name="email" value="{email}" required placeholder="you@example.com">
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required minlength="6">
            <button type="submit">{submit}</button>
          </form>
          <a href="/login?mode={other}" class="toggle">{toggle}</a>
        </div>
        <a href="/" class="back">&larr; Back to home</a>
      </div>"#,
        heading = form.heading(),
        error = error,
        mode = form.mode.as_param(),
        email = escape(&form.email),
        submit = form.submit_label(),
        other = form.mode.toggled().as_param(),
        toggle = form.toggle_label(),
    );

    layout(routes::LOGIN_PATH, View::Login.title(), &body)
}

/// Protected pages. Their data comes from the document store on the client side; the
/// shell only frames them.
pub fn protected(path: &str, view: View) -> String {
    let intro = match view {
        View::Dashboard => "Today's signal across your sources, topics and briefs.",
        View::Topics => "Topics and keywords Perception watches for you.",
        View::DailyBriefs => "Executive briefs generated from each day's articles.",
        View::About | View::Login => "",
    };

    let body = format!(
        r#"      <section class="page" data-view="{view:?}">
        <h1>{title}</h1>
        <p>{intro}</p>
      </section>"#,
        view = view,
        title = view.title(),
        intro = intro,
    );
    layout(path, view.title(), &body)
}

pub fn not_found(path: &str) -> String {
    layout(
        path,
        "Not Found",
        r#"      <section class="page"><h1>Not Found</h1></section>"#,
    )
}
