//! HTML pages. Every dynamic value goes through [`escape`].

use std::fmt::Write;

use crate::{
    accounts::dto::{FormErrors, ProfileProjection, SignupForm},
    config::AppConfig,
};

pub const TEST_FRAGMENT: &str = "<h2>Test</h2>";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn error_list(errors: &FormErrors, field: &str) -> String {
    let messages = errors.field(field);
    if messages.is_empty() {
        return String::new();
    }
    let mut out = format!("<ul class=\"errorlist\" data-field=\"{}\">", escape(field));
    for m in messages {
        let _ = write!(out, "<li>{}</li>", escape(m));
    }
    out.push_str("</ul>");
    out
}

fn input(label: &str, name: &str, kind: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        "<p>{errs}<label for=\"id_{name}\">{label}</label> \
         <input type=\"{kind}\" name=\"{name}\" id=\"id_{name}\" value=\"{value}\"></p>\n",
        errs = error_list(errors, name),
        label = escape(label),
        value = escape(value),
    )
}

pub fn index_page(config: &AppConfig) -> String {
    let body = format!(
        "<h1>Welcome</h1>\n<p>This is the index page.</p>\n<nav>\
         <a href=\"{signup}\">Sign up</a> | <a href=\"{login}\">Log in</a> | \
         <a href=\"{dashboard}\">Dashboard</a></nav>",
        signup = escape(&config.account_path("signup")),
        login = escape(&config.account_path("login")),
        dashboard = escape(&config.account_path("dashboard")),
    );
    layout("Home", &body)
}

pub fn signup_page(config: &AppConfig, form: &SignupForm, errors: &FormErrors) -> String {
    let mut body = String::from("<h2>Sign up</h2>\n");
    body.push_str(&error_list(errors, FormErrors::NON_FIELD));
    let _ = write!(
        body,
        "<form method=\"post\" action=\"{}\">\n",
        escape(&config.account_path("signup"))
    );
    body.push_str(&input("Username", "username", "text", &form.username, errors));
    body.push_str(&input("Email", "email", "email", &form.email, errors));
    body.push_str(&input(
        "Date of birth",
        "date_of_birth",
        "date",
        &form.date_of_birth,
        errors,
    ));
    // passwords are never echoed back
    body.push_str(&input("Password", "password1", "password", "", errors));
    body.push_str(&input(
        "Password confirmation",
        "password2",
        "password",
        "",
        errors,
    ));
    body.push_str("<button type=\"submit\">Sign up</button>\n</form>");
    layout("Sign up", &body)
}

pub fn login_page(config: &AppConfig, username: &str, next: &str, errors: &FormErrors) -> String {
    let mut body = String::from("<h2>Log in</h2>\n");
    body.push_str(&error_list(errors, FormErrors::NON_FIELD));
    let _ = write!(
        body,
        "<form method=\"post\" action=\"{}\">\n",
        escape(&config.account_path("login"))
    );
    body.push_str(&input("Username", "username", "text", username, errors));
    body.push_str(&input("Password", "password", "password", "", errors));
    let _ = write!(
        body,
        "<input type=\"hidden\" name=\"next\" value=\"{}\">\n\
         <button type=\"submit\">Log in</button>\n</form>\n\
         <p><a href=\"{}\">Create an account</a></p>",
        escape(next),
        escape(&config.account_path("signup")),
    );
    layout("Log in", &body)
}

pub fn logged_out_page(config: &AppConfig) -> String {
    let body = format!(
        "<h2>Logged out</h2>\n<p>You have been logged out.</p>\n\
         <p><a href=\"{}\">Log in again</a></p>",
        escape(&config.account_path("login"))
    );
    layout("Logged out", &body)
}

pub fn dashboard_page(config: &AppConfig, profile: &ProfileProjection) -> String {
    let mut body = format!("<h2>Dashboard</h2>\n<p>Hello, {}.</p>\n<dl>\n", escape(&profile.username));
    for e in &profile.entries {
        let _ = writeln!(
            body,
            "<dt>{}</dt><dd id=\"{}\">{}</dd>",
            escape(e.label),
            e.key,
            escape(&e.value)
        );
    }
    let _ = write!(
        body,
        "</dl>\n<form method=\"post\" action=\"{}\"><button type=\"submit\">Log out</button></form>",
        escape(&config.account_path("logout"))
    );
    layout("Dashboard", &body)
}
