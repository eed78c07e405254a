//! Login page (public).

use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;

use parking_security_core::http::security::SecurityFilterChain;

/// Social login buttons shown on the login page.
#[derive(Debug, Clone, Default)]
pub struct SocialLogins {
    links: Vec<(String, String)>,
}

impl SocialLogins {
    /// One link per registered OAuth2 client, pointing at the authorization endpoint.
    pub fn from_chain(chain: &SecurityFilterChain) -> Self {
        let links = chain
            .oauth2_login()
            .map(|oauth2| {
                let base = oauth2.config().get_authorization_base_uri();
                oauth2
                    .config()
                    .clients()
                    .registrations()
                    .map(|r| (format!("{}/{}", base, r.registration_id()), r.get_client_name().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Self { links }
    }

    pub fn links(&self) -> &[(String, String)] {
        &self.links
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    error: Option<String>,
    logout: Option<String>,
}

/// The form posts to `/loginProc`, which the security middleware handles.
#[get("/login")]
pub async fn login_page(query: web::Query<LoginPageQuery>, social: web::Data<SocialLogins>) -> impl Responder {
    let mut notice = String::new();
    if query.error.is_some() {
        notice.push_str(r#"<p class="error">Invalid username or password.</p>"#);
    }
    if query.logout.is_some() {
        notice.push_str(r#"<p class="info">You have been logged out.</p>"#);
    }

    let providers: String = social
        .links()
        .iter()
        .map(|(href, name)| format!(r#"<li><a href="{}">Login with {}</a></li>"#, href, name))
        .collect();

    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Honors Parking - Login</title></head>
<body>
    <h1>Login</h1>
    {}
    <form method="post" action="/loginProc">
        <input type="text" name="username" placeholder="Username" required>
        <input type="password" name="password" placeholder="Password" required>
        <button type="submit">Login</button>
    </form>
    <ul>{}</ul>
</body>
</html>"#,
        notice, providers
    ))
}
