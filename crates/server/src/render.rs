use std::fmt::Write as _;

use shared::{
    domain::{Task, Theme, View, MAX_DESCRIPTION_CHARS},
    protocol::{Intent, TaskList},
};

const STYLES: &str = "\
:root{color-scheme:light dark;font-family:Inter,system-ui,sans-serif}\
body{margin:0;background:#f9fafb;color:#111827}\
html.dark body{background:#111827;color:#f9fafb}\
header,main,footer{max-width:32rem;margin:0 auto;padding:1.5rem}\
header{display:flex;align-items:center;justify-content:space-between}\
.panel{border:1px solid #e5e7eb;border-radius:1.5rem;padding:.5rem 1rem;margin-bottom:2rem}\
ul{list-style:none;margin:0;padding:0}\
li{display:flex;align-items:center;gap:.5rem;padding:.5rem 0}\
li.completed .description{text-decoration:line-through;opacity:.5}\
.description{flex:1}\
form{display:inline}\
nav{display:flex;justify-content:center;gap:3rem}\
nav a{opacity:.5;color:inherit;text-decoration:none}\
nav a.current{opacity:1;font-weight:700}\
.actions{display:flex;justify-content:space-between;align-items:center}";

const SYSTEM_THEME_SCRIPT: &str = "<script>\
if(window.matchMedia('(prefers-color-scheme: dark)').matches)\
{document.documentElement.classList.add('dark')}</script>";

/// Full page for `list`, which is already filtered to `list.view`.
pub fn render_page(list: &TaskList, theme: Theme) -> String {
    let html_class = match theme {
        Theme::Dark => "dark",
        Theme::Light | Theme::System => "",
    };
    let theme_script = match theme {
        Theme::System => SYSTEM_THEME_SCRIPT,
        Theme::Light | Theme::Dark => "",
    };
    let action = action_url(list.view);

    format!(
        "<!doctype html><html lang=\"en\" class=\"{html_class}\"><head>{theme_script}\
<meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>Welcome to Todo App</title>\
<meta name=\"description\" content=\"A minimal server-rendered todo app\">\
<style>{STYLES}</style></head><body>\
<header><h1>Todo</h1>{switcher}</header>\
<main>\
<form method=\"post\" action=\"{action}\" class=\"panel\">\
<input type=\"text\" name=\"description\" placeholder=\"Create a new todo...\" required autofocus maxlength=\"{max}\">\
<button name=\"intent\" value=\"{create}\">Add</button></form>\
<div class=\"panel\"><ul>{items}</ul></div>\
<div class=\"panel actions\">{actions}</div>\
<div class=\"panel\">{filters}</div>\
</main>\
<footer><p>Built with Rust. Everything lives in one SQLite file.</p></footer>\
</body></html>",
        switcher = render_theme_switcher(theme, list.view),
        max = MAX_DESCRIPTION_CHARS,
        create = Intent::CREATE_TASK,
        items = render_items(list),
        actions = render_actions(list),
        filters = render_filters(list.view),
    )
}

fn render_items(list: &TaskList) -> String {
    if list.tasks.is_empty() {
        let message = match list.view {
            View::All => "Nothing to do yet.",
            View::Active => "No active tasks.",
            View::Completed => "No completed tasks.",
        };
        return format!("<li class=\"empty\">{message}</li>");
    }

    let action = action_url(list.view);
    let mut items = String::new();
    for task in &list.tasks {
        render_item(&mut items, task, &action);
    }
    items
}

fn render_item(out: &mut String, task: &Task, action: &str) {
    let id = task.id;
    let class = if task.completed { "completed" } else { "active" };
    let (mark, label) = if task.completed {
        ("&#9745;", "Mark as incomplete")
    } else {
        ("&#9744;", "Mark as complete")
    };

    let _ = write!(
        out,
        "<li class=\"{class}\" data-task-id=\"{id}\">\
<form method=\"post\" action=\"{action}\">\
<input type=\"hidden\" name=\"id\" value=\"{id}\">\
<input type=\"hidden\" name=\"completed\" value=\"{completed}\">\
<button name=\"intent\" value=\"{toggle}\" aria-label=\"{label}\">{mark}</button></form>",
        completed = task.completed,
        toggle = Intent::TOGGLE_COMPLETION,
    );

    let description = escape_html(&task.description);
    if task.editing {
        let _ = write!(
            out,
            "<form method=\"post\" action=\"{action}\" class=\"description\">\
<input type=\"hidden\" name=\"id\" value=\"{id}\">\
<input type=\"text\" name=\"description\" value=\"{description}\" required autofocus maxlength=\"{max}\">\
<button name=\"intent\" value=\"{save}\">Save</button></form>",
            max = MAX_DESCRIPTION_CHARS,
            save = Intent::SAVE_TASK,
        );
    } else {
        let completed_at = task
            .completed_at
            .map(|at| {
                format!(
                    " <time datetime=\"{}\">{}</time>",
                    at.to_rfc3339(),
                    at.format("%b %-d, %H:%M")
                )
            })
            .unwrap_or_default();
        let _ = write!(
            out,
            "<span class=\"description\">{description}{completed_at}</span>\
<form method=\"post\" action=\"{action}\">\
<input type=\"hidden\" name=\"id\" value=\"{id}\">\
<button name=\"intent\" value=\"{edit}\">Edit</button></form>",
            edit = Intent::EDIT_TASK,
        );
    }

    let _ = write!(
        out,
        "<form method=\"post\" action=\"{action}\">\
<input type=\"hidden\" name=\"id\" value=\"{id}\">\
<button name=\"intent\" value=\"{delete}\" aria-label=\"Delete task\">&times;</button></form></li>",
        delete = Intent::DELETE_TASK,
    );
}

fn render_actions(list: &TaskList) -> String {
    let active = list.counts.active;
    let noun = if active == 1 { "item" } else { "items" };
    format!(
        "<p>{active} {noun} left</p>\
<form method=\"post\" action=\"{action}\">\
<button name=\"intent\" value=\"{clear}\" \
onclick=\"return confirm('Are you sure you want to clear all completed tasks?')\">Clear completed</button>\
<button name=\"intent\" value=\"{delete_all}\" \
onclick=\"return confirm('Are you sure you want to delete all tasks?')\">Delete all</button></form>",
        action = action_url(list.view),
        clear = Intent::CLEAR_COMPLETED,
        delete_all = Intent::DELETE_ALL,
    )
}

fn render_filters(current: View) -> String {
    let mut nav = String::from("<nav>");
    for view in View::ALL {
        let class = if view == current { "current" } else { "" };
        let _ = write!(
            nav,
            "<a href=\"/?view={view}\" class=\"{class}\" aria-label=\"View {view} tasks\">{label}</a>",
            label = view.label(),
        );
    }
    nav.push_str("</nav>");
    nav
}

fn render_theme_switcher(current: Theme, view: View) -> String {
    let mut form = format!(
        "<form method=\"post\" action=\"/theme\" class=\"theme-switcher\">\
<input type=\"hidden\" name=\"redirect_to\" value=\"/?view={view}\">"
    );
    for theme in Theme::ALL {
        let _ = write!(
            form,
            "<button name=\"theme\" value=\"{theme}\" aria-pressed=\"{pressed}\">{theme}</button>",
            pressed = theme == current,
        );
    }
    form.push_str("</form>");
    form
}

fn action_url(view: View) -> String {
    format!("/?view={view}")
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
