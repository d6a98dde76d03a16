//! Platform URL construction.
//!
//! Every builder takes the base URL as an argument so tests can point the
//! client at a mock server.

/// Production site root.
pub const BASE_URL: &str = "https://www.instagram.com";

pub fn home_url(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

pub fn login_url(base: &str) -> String {
    format!("{}/accounts/login/ajax/", base.trim_end_matches('/'))
}

/// The machine id is no longer present in the home-page cookies, so it is
/// fetched from this dedicated endpoint.
pub fn mid_url(base: &str) -> String {
    format!("{}/web/__mid/", base.trim_end_matches('/'))
}

pub fn account_page_url(base: &str, username: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(username)
    )
}
