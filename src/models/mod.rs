pub mod user;
pub mod role;
pub mod rbac;

pub use user::{SessionUser, SignedIn, UserWithRoles};
pub use role::{NewRole, NewRoleRow, Role, RoleWithPermissions};
pub use rbac::{Permission, RolePermissionRow};
