pub mod guard;

pub use guard::{
    browser_session, end_browser_session, require_session, safe_next, session_cookie, Operator,
};
