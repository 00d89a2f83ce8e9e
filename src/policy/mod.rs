//! Access decisions. Everything here is pure: callers load the principal and
//! the target resource, these functions only answer yes or no.

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Role, User};

/// The authenticated caller, fixed for the lifetime of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self { id: user.id, role: user.role }
    }
}

/// Anything with exactly one owner.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for crate::models::Bootcamp {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for crate::models::Course {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for crate::models::Review {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Admins may mutate anything; everyone else only what they own.
pub fn can_mutate(principal: &Principal, resource: &impl Owned) -> bool {
    principal.is_admin() || resource.owner_id() == principal.id
}

/// Admins are exempt from the one-bootcamp limit.
pub fn can_create_bootcamp(principal: &Principal, owned_count: u64) -> bool {
    principal.is_admin() || owned_count == 0
}

/// `Forbidden` unless `principal` may perform `action` on `resource`.
pub fn ensure_can_mutate(principal: &Principal, resource: &impl Owned, action: &str) -> Result<(), ApiError> {
    if can_mutate(principal, resource) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User with the ID {} is not authorized to {}",
            principal.id, action
        )))
    }
}

/// A route's role allow-list, expressed as a type so handlers state it in
/// their signature.
pub trait RouteScope: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

/// Bootcamp and course mutations.
pub struct Publishers;

/// Review mutations.
pub struct Reviewers;

/// User management.
pub struct Admins;

impl RouteScope for Publishers {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Publisher];
}

impl RouteScope for Reviewers {
    const ROLES: &'static [Role] = &[Role::Admin, Role::User];
}

impl RouteScope for Admins {
    const ROLES: &'static [Role] = &[Role::Admin];
}

pub fn role_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

pub fn ensure_role<S: RouteScope>(principal: &Principal) -> Result<(), ApiError> {
    if role_allowed(principal.role, S::ROLES) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            principal.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing(Uuid);

    impl Owned for Thing {
        fn owner_id(&self) -> Uuid {
            self.0
        }
    }

    fn principal(role: Role) -> Principal {
        Principal { id: Uuid::new_v4(), role }
    }

    #[test]
    fn owner_or_admin_may_mutate() {
        for role in [Role::User, Role::Publisher, Role::Admin] {
            let p = principal(role);
            let own = Thing(p.id);
            let other = Thing(Uuid::new_v4());
            assert!(can_mutate(&p, &own), "{} owner", role);
            assert_eq!(can_mutate(&p, &other), role == Role::Admin, "{} non-owner", role);
        }
    }

    #[test]
    fn one_bootcamp_unless_admin() {
        let publisher = principal(Role::Publisher);
        assert!(can_create_bootcamp(&publisher, 0));
        assert!(!can_create_bootcamp(&publisher, 1));
        assert!(can_create_bootcamp(&principal(Role::Admin), 5));
    }

    #[test]
    fn forbidden_message_names_principal_and_action() {
        let p = principal(Role::Publisher);
        let err = ensure_can_mutate(&p, &Thing(Uuid::new_v4()), "update this bootcamp").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(
            err.message(),
            format!("User with the ID {} is not authorized to update this bootcamp", p.id)
        );
    }

    #[test]
    fn scopes_gate_roles() {
        assert!(ensure_role::<Publishers>(&principal(Role::Publisher)).is_ok());
        assert!(ensure_role::<Publishers>(&principal(Role::User)).is_err());
        assert!(ensure_role::<Reviewers>(&principal(Role::User)).is_ok());
        assert!(ensure_role::<Reviewers>(&principal(Role::Publisher)).is_err());
        assert!(ensure_role::<Admins>(&principal(Role::Admin)).is_ok());
        let err = ensure_role::<Admins>(&principal(Role::Publisher)).unwrap_err();
        assert_eq!(err.message(), "User role publisher is not authorized to access this route");
    }
}
