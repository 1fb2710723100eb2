use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::figment::Figment;
use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, post, routes, Build, FromForm, Request, Rocket, State};
use serde::Serialize;

use common::Config;

use crate::gate::{GateOutcome, SessionGate};
use crate::identity::session::{AuthClient, PersistedSession, SessionEvent};
use crate::identity::IdentityProvider;
use crate::login::{AuthMode, LoginForm, LoginOutcome};
use crate::routes::{self, BRIEFS_PATH, DASHBOARD_PATH, HOME_PATH, TOPICS_PATH};
use crate::views;

/// Private cookie holding the provider id and refresh tokens between page loads
pub const SESSION_COOKIE: &str = "perception_session";

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Option<Arc<Config>>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Bound on waiting for the first session notification; `None` waits indefinitely
    pub gate_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityProvider>, config: Option<Arc<Config>>) -> Self {
        let gate_timeout = config
            .as_ref()
            .and_then(|c| c.gate_timeout_seconds())
            .map(Duration::from_secs);
        Self {
            started_at: Utc::now(),
            config,
            identity,
            gate_timeout,
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    project_id: Option<String>,
    gate_timeout_seconds: Option<u64>,
}

type Page = Result<RawHtml<String>, Redirect>;

fn session_cookie(session: &PersistedSession) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session.to_cookie_value());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie
}

/// Render a routed page, running the session gate for protected routes.
///
/// Every page load gets a fresh auth instance; the persisted id token is resolved in the
/// background while the gate waits for its first notification.
async fn render_route(path: &str, state: &AppState, jar: &CookieJar<'_>) -> Page {
    let route = match routes::resolve(path) {
        Some(route) => route,
        None => return Ok(RawHtml(views::not_found(path))),
    };

    if !route.protected {
        return Ok(RawHtml(match route.view {
            routes::View::Login => views::login(&LoginForm::default()),
            routes::View::About => views::about(),
            view => views::protected(route.path, view),
        }));
    }

    let auth = AuthClient::new(state.identity.clone());
    let mut gate = SessionGate::mount(&auth);

    let persisted = jar
        .get_private(SESSION_COOKIE)
        .map(|c| PersistedSession::from_cookie_value(c.value()));
    let had_cookie = persisted.is_some();
    let restorer = auth.clone();
    let restoring = persisted.clone();
    tokio::spawn(async move {
        restorer.restore(restoring).await;
    });

    match state.gate_timeout {
        Some(limit) => gate.resolve_within(limit).await,
        None => gate.resolve().await,
    };

    match gate.outcome(|| views::protected(route.path, route.view)) {
        GateOutcome::Placeholder => Ok(RawHtml(views::loading(route.path))),
        GateOutcome::Render(html) => {
            // The id token may have been renewed while restoring
            if let Some(SessionEvent::SignedIn(user)) = auth.current() {
                let current = PersistedSession::from_user(&user);
                if persisted.as_ref() != Some(&current) {
                    jar.add_private(session_cookie(&current));
                }
            }
            Ok(RawHtml(html))
        }
        GateOutcome::Redirect(to) => {
            if had_cookie {
                // The persisted session is no longer accepted
                jar.remove_private(Cookie::from(SESSION_COOKIE));
            }
            Err(Redirect::to(to))
        }
    }
}

#[get("/")]
async fn home(state: &State<AppState>, jar: &CookieJar<'_>) -> Page {
    render_route(HOME_PATH, state, jar).await
}

#[get("/login?<mode>")]
async fn login_page(mode: Option<&str>) -> RawHtml<String> {
    RawHtml(views::login(&LoginForm::new(AuthMode::from_param(mode))))
}

#[get("/dashboard")]
async fn dashboard(state: &State<AppState>, jar: &CookieJar<'_>) -> Page {
    render_route(DASHBOARD_PATH, state, jar).await
}

#[get("/topics")]
async fn topics(state: &State<AppState>, jar: &CookieJar<'_>) -> Page {
    render_route(TOPICS_PATH, state, jar).await
}

#[get("/briefs")]
async fn briefs(state: &State<AppState>, jar: &CookieJar<'_>) -> Page {
    render_route(BRIEFS_PATH, state, jar).await
}

/// Request body for the login form.
#[derive(FromForm)]
struct LoginSubmission {
    email: String,
    password: String,
    mode: Option<String>,
}

/// Login endpoint: sign in or create the account, then go to the dashboard.
/// On failure the form comes back with the provider's message.
#[post("/login", data = "<body>")]
async fn login_submit(
    state: &State<AppState>,
    jar: &CookieJar<'_>,
    body: Form<LoginSubmission>,
) -> Result<Redirect, RawHtml<String>> {
    let auth = AuthClient::new(state.identity.clone());
    let body = body.into_inner();
    let mut form = LoginForm::new(AuthMode::from_param(body.mode.as_deref()));
    form.email = body.email;
    form.password = body.password;

    match form.submit(&auth).await {
        LoginOutcome::Navigate(to) => {
            if let Some(SessionEvent::SignedIn(user)) = auth.current() {
                jar.add_private(session_cookie(&PersistedSession::from_user(&user)));
            }
            Ok(Redirect::to(to))
        }
        LoginOutcome::Stay => {
            form.password.clear();
            Err(RawHtml(views::login(&form)))
        }
    }
}

/// Sign out, then a full page load of `/`.
#[post("/logout")]
async fn logout(state: &State<AppState>, jar: &CookieJar<'_>) -> Result<Redirect, Status> {
    let auth = AuthClient::new(state.identity.clone());
    match auth.sign_out().await {
        Ok(()) => {
            jar.remove_private(Cookie::from(SESSION_COOKIE));
            Ok(Redirect::to(HOME_PATH))
        }
        Err(e) => {
            tracing::error!("Logout failed: {}", e);
            Err(Status::InternalServerError)
        }
    }
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and basic config info.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        project_id: state.config.as_ref().map(|c| c.firebase.project_id()),
        gate_timeout_seconds: state.gate_timeout.map(|d| d.as_secs()),
    })
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> RawHtml<String> {
    RawHtml(views::not_found(req.uri().path().as_str()))
}

/// Assemble the Rocket instance without launching it (tests drive it through a local client).
pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                home,
                login_page,
                login_submit,
                logout,
                dashboard,
                topics,
                briefs,
                health,
                status,
            ],
        )
        .register("/", catchers![not_found])
}

/// Rocket figment with `[server]` bind, port and secret key applied from configuration.
pub fn figment_from_config(config: Option<&Config>) -> Figment {
    let mut fig = rocket::Config::figment();
    if let Some(server) = config.and_then(|c| c.server.as_ref()) {
        if let Some(bind) = &server.bind {
            fig = fig.merge(("address", bind.clone()));
        }
        if let Some(port) = server.port {
            fig = fig.merge(("port", port));
        }
        if let Some(env_name) = &server.secret_key_env {
            match std::env::var(env_name) {
                Ok(key) => fig = fig.merge(("secret_key", key)),
                Err(_) => tracing::warn!("secret key env var '{}' not set", env_name),
            }
        }
    }
    fig
}

/// Build and launch the Rocket server.
///
/// This function blocks until the Rocket server shuts down and returns an error if
/// Rocket fails to start.
pub async fn launch_rocket(state: AppState) -> Result<()> {
    let figment = figment_from_config(state.config.as_deref());
    let rocket = build_rocket(state, figment);

    tracing::info!("Starting Rocket HTTP server");
    rocket
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
