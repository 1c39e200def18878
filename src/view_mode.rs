//! List/card layout preference.
//!
//! The mode is a plain value: handlers read it from the request cookie, pass
//! it to the renderer, and write the toggled value back as a cookie.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use serde::Serialize;

pub const COOKIE_NAME: &str = "view_mode";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    List,
    #[default]
    Card,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Card => "card",
        }
    }

    /// Unset or unrecognised values mean the default mode.
    pub fn parse(raw: Option<&str>) -> ViewMode {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("list") => ViewMode::List,
            _ => ViewMode::Card,
        }
    }

    pub fn toggle(self) -> ViewMode {
        match self {
            ViewMode::List => ViewMode::Card,
            ViewMode::Card => ViewMode::List,
        }
    }

    pub fn current(req: &HttpRequest) -> ViewMode {
        let cookie = req.cookie(COOKIE_NAME);
        ViewMode::parse(cookie.as_ref().map(Cookie::value))
    }

    pub fn cookie(self) -> Cookie<'static> {
        Cookie::build(COOKIE_NAME, self.as_str())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn toggle_flips_and_is_an_involution() {
        assert_eq!(ViewMode::Card.toggle(), ViewMode::List);
        assert_eq!(ViewMode::List.toggle(), ViewMode::Card);
        for mode in [ViewMode::List, ViewMode::Card] {
            assert_eq!(mode.toggle().toggle(), mode);
        }
    }

    #[test]
    fn parse_defaults_to_card() {
        assert_eq!(ViewMode::parse(None), ViewMode::Card);
        assert_eq!(ViewMode::parse(Some("grid")), ViewMode::Card);
        assert_eq!(ViewMode::parse(Some(" LIST ")), ViewMode::List);
    }

    #[test]
    fn current_reads_cookie() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(ViewMode::current(&req), ViewMode::Card);

        let req = TestRequest::default()
            .cookie(ViewMode::List.cookie())
            .to_http_request();
        assert_eq!(ViewMode::current(&req), ViewMode::List);
    }
}
