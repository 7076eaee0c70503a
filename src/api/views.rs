//! Page rendering.
//!
//! Handlers only decide *what* to show; a [`ViewRenderer`] decides how it looks.
//! [`HtmlRenderer`] renders the pages under `templates/` with minijinja, with
//! HTML auto-escaping on for every template.

use crate::auth::AuthUser;
use crate::error::Result;
use crate::ml::PredictionResult;
use minijinja::{context, AutoEscape, Environment};

/// Templates compiled into the binary, by name
const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("intro.html", include_str!("../../templates/intro.html")),
    ("signup.html", include_str!("../../templates/signup.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("analyze.html", include_str!("../../templates/analyze.html")),
];

/// State of the login and signup forms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormView {
    pub error: Option<String>,
    pub success: Option<String>,
    /// Email to pre-fill after a failed attempt
    pub email: Option<String>,
}

impl FormView {
    pub fn error(message: impl Into<String>, email: Option<String>) -> Self {
        Self {
            error: Some(message.into()),
            success: None,
            email,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            error: None,
            success: Some(message.into()),
            email: None,
        }
    }
}

/// State of the analyze page
#[derive(Debug, Clone, Copy)]
pub struct AnalyzeView<'a> {
    pub user: &'a AuthUser,
    /// Text to keep in the textarea
    pub review: &'a str,
    pub result: Option<&'a PredictionResult>,
}

pub trait ViewRenderer: Send + Sync {
    fn intro(&self, user: Option<&AuthUser>) -> Result<String>;
    fn signup(&self, view: &FormView) -> Result<String>;
    fn login(&self, view: &FormView) -> Result<String>;
    fn analyze(&self, view: &AnalyzeView<'_>) -> Result<String>;
}

/// Self-contained HTML pages without external assets
pub struct HtmlRenderer {
    env: Environment<'static>,
}

impl HtmlRenderer {
    pub fn new() -> std::result::Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    fn form_page(&self, name: &str, view: &FormView) -> Result<String> {
        let html = self.env.get_template(name)?.render(context! {
            user => None::<&AuthUser>,
            error => view.error.as_deref(),
            success => view.success.as_deref(),
            email => view.email.as_deref().unwrap_or(""),
        })?;
        Ok(html)
    }
}

impl ViewRenderer for HtmlRenderer {
    fn intro(&self, user: Option<&AuthUser>) -> Result<String> {
        let html = self
            .env
            .get_template("intro.html")?
            .render(context! { user => user })?;
        Ok(html)
    }

    fn signup(&self, view: &FormView) -> Result<String> {
        self.form_page("signup.html", view)
    }

    fn login(&self, view: &FormView) -> Result<String> {
        self.form_page("login.html", view)
    }

    fn analyze(&self, view: &AnalyzeView<'_>) -> Result<String> {
        let result = view.result;
        let html = self.env.get_template("analyze.html")?.render(context! {
            user => view.user,
            review => view.review,
            sentiment => result.map(PredictionResult::sentiment),
            label => result.map(|r| r.label().code()),
            color => result.and_then(PredictionResult::color),
            confidence => result
                .and_then(PredictionResult::confidence)
                .map(|c| format!("{:.2}", c)),
        })?;
        Ok(html)
    }
}
