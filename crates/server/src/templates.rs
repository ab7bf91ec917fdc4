//! Page templates, embedded in the binary.
//!
//! Dashboard pages come in two theme directories (`default`, `beta`); the
//! beta variants extend the default ones and restyle them. Which directory
//! a user renders from is their `set_path` column.

use std::sync::OnceLock;

use axum::response::Html;
use tera::Tera;

use flagboard_api::Theme;

use crate::error::PageError;

static TEMPLATES: OnceLock<Tera> = OnceLock::new();

fn tera() -> &'static Tera {
    TEMPLATES.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("home.html", include_str!("../templates/home.html")),
            ("auth/login.html", include_str!("../templates/auth/login.html")),
            (
                "auth/register.html",
                include_str!("../templates/auth/register.html"),
            ),
            (
                "default/index.html",
                include_str!("../templates/default/index.html"),
            ),
            (
                "default/exp.html",
                include_str!("../templates/default/exp.html"),
            ),
            (
                "default/operation.html",
                include_str!("../templates/default/operation.html"),
            ),
            (
                "default/dataexport.html",
                include_str!("../templates/default/dataexport.html"),
            ),
            (
                "default/release.html",
                include_str!("../templates/default/release.html"),
            ),
            (
                "default/profile.html",
                include_str!("../templates/default/profile.html"),
            ),
            (
                "default/people.html",
                include_str!("../templates/default/people.html"),
            ),
            (
                "default/settings.html",
                include_str!("../templates/default/settings.html"),
            ),
            (
                "beta/index.html",
                include_str!("../templates/beta/index.html"),
            ),
            ("beta/exp.html", include_str!("../templates/beta/exp.html")),
            (
                "beta/operation.html",
                include_str!("../templates/beta/operation.html"),
            ),
            (
                "beta/dataexport.html",
                include_str!("../templates/beta/dataexport.html"),
            ),
            (
                "beta/release.html",
                include_str!("../templates/beta/release.html"),
            ),
        ])
        .expect("embedded templates are valid");
        tera
    })
}

/// Render a template to an HTML response.
pub fn render(name: &str, ctx: &tera::Context) -> Result<Html<String>, PageError> {
    tera().render(name, ctx).map(Html).map_err(|e| {
        tracing::error!("template {name}: {e}");
        PageError::internal("template rendering failed")
    })
}

/// Base context every page gets.
pub fn page_context(title: &str, flashes: &[String]) -> tera::Context {
    let mut ctx = tera::Context::new();
    ctx.insert("title", title);
    ctx.insert("flashes", flashes);
    ctx
}

/// Themed template path, e.g. `beta/index.html`.
pub fn themed(theme: Theme, page: &str) -> String {
    format!("{}/{}", theme.as_str(), page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_render() {
        let mut ctx = page_context("Test", &["hello".to_string()]);
        ctx.insert("trial_duration", &14);
        ctx.insert("show_beta", &true);
        ctx.insert("show_nps", &false);
        ctx.insert("show_data_export", &false);
        ctx.insert("random_user", &flagboard_api::FlagContext::anonymous());
        ctx.insert("embed_url", &Option::<String>::None);
        ctx.insert(
            "user",
            &flagboard_api::User {
                id: "u-1".into(),
                email: "a@example.com".into(),
                set_path: Theme::Default,
                plan_id: Some(1),
                created_at: "2024-01-01 00:00:00".into(),
            },
        );
        ctx.insert("users", &Vec::<flagboard_api::User>::new());
        ctx.insert("plans", &Vec::<flagboard_api::Plan>::new());
        ctx.insert("next_url", &Option::<String>::None);
        ctx.insert("prev_url", &Option::<String>::None);

        for name in [
            "home.html",
            "auth/login.html",
            "auth/register.html",
            "default/index.html",
            "default/exp.html",
            "default/operation.html",
            "default/dataexport.html",
            "default/release.html",
            "default/profile.html",
            "default/people.html",
            "default/settings.html",
            "beta/index.html",
            "beta/exp.html",
            "beta/operation.html",
            "beta/dataexport.html",
            "beta/release.html",
        ] {
            if let Err(e) = render(name, &ctx) {
                let _ = e; // render already logged the template name
                panic!("template {name} failed to render");
            }
        }
    }

    #[test]
    fn themed_paths() {
        assert_eq!(themed(Theme::Beta, "index.html"), "beta/index.html");
        assert_eq!(themed(Theme::Default, "exp.html"), "default/exp.html");
    }
}
