use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use crate::error::AppResult;

/// Loads every template under `templates/`.
pub fn load_templates() -> tera::Result<tera::Tera> {
    tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))
}

pub fn render(tera: &tera::Tera, name: &str, ctx: &tera::Context) -> AppResult<HttpResponse> {
    render_with_status(tera, StatusCode::OK, name, ctx)
}

pub fn render_with_status(
    tera: &tera::Tera,
    status: StatusCode,
    name: &str,
    ctx: &tera::Context,
) -> AppResult<HttpResponse> {
    let body = tera.render(name, ctx)?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// The generic error page.
pub fn error_page(tera: &tera::Tera, status: StatusCode, message: &str) -> AppResult<HttpResponse> {
    let mut ctx = tera::Context::new();
    ctx.insert("status", &status.as_u16());
    ctx.insert("message", message);
    render_with_status(tera, status, "error.html", &ctx)
}
