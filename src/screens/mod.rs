//! Per-page controllers. Each owns the state its page renders and talks to
//! the backend through the [`Gateway`](crate::gateway::Gateway) trait. A screen
//! lives for one request: it is mounted (`activate`), takes the operator's
//! action, and is then rendered.

pub mod dashboard;
pub mod login;
pub mod roles;
pub mod users;

pub use dashboard::DashboardScreen;
pub use login::LoginScreen;
pub use roles::RolesScreen;
pub use users::UsersScreen;
