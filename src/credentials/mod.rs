//! Credential and session storage.
//!
//! Login cookies are cached locally so repeated runs can reuse a session
//! instead of re-authenticating. The cache handle is passed explicitly into
//! the scrape client at construction; there is no process-wide singleton, so
//! multiple accounts can be scraped from one process safely.

mod session;

pub use session::{SessionCache, SessionData, CSRF_COOKIE, MID_KEY, SESSION_ID_COOKIE};
