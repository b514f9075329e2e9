use axum::http::{header, HeaderMap, HeaderValue};
use shared::domain::{Theme, View};

pub const THEME_COOKIE: &str = "theme";
/// 400 days, the longest lifetime browsers honour.
pub const THEME_COOKIE_MAX_AGE_SECS: u64 = 34_560_000;

/// Reads the `theme` cookie from every `Cookie` header. Missing or invalid
/// values resolve to [`Theme::System`].
pub fn resolve_theme(headers: &HeaderMap) -> Theme {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == THEME_COOKIE)
        .and_then(|(_, value)| Theme::parse(value.trim_matches('"')))
        .unwrap_or_default()
}

pub fn theme_cookie(theme: Theme, secure: bool) -> HeaderValue {
    let mut cookie = format!(
        "{THEME_COOKIE}={}; Path=/; Max-Age={THEME_COOKIE_MAX_AGE_SECS}; SameSite=Lax; HttpOnly",
        theme.as_str()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .unwrap_or_else(|_| HeaderValue::from_static("theme=system; Path=/"))
}

/// Only the list page, optionally with a known `view`, is accepted as a
/// post-toggle redirect target. Anything else falls back to `/`.
pub fn safe_redirect_target(raw: Option<&str>) -> String {
    let view = raw
        .and_then(|target| target.strip_prefix("/?view="))
        .and_then(|value| View::ALL.into_iter().find(|view| view.as_str() == value));
    match view {
        Some(view) => format!("/?view={view}"),
        None => "/".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/theme_tests.rs"]
mod tests;
