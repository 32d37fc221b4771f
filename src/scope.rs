//! Tenant isolation.
//!
//! Every ingest, analytics and campaign operation works on a [`ScopedBusiness`],
//! which can only be obtained by resolving a business slug for a user who owns
//! the business or holds an active membership in it.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Business, MemberRole, User};

/// A business the acting user has been verified to have access to.
#[derive(Debug, Clone)]
pub struct ScopedBusiness {
    business: Business,
    user_id: String,
    role: MemberRole,
}

impl ScopedBusiness {
    /// Resolves `slug` for `user`.
    ///
    /// Returns `NotFound` when no such business exists and `Forbidden` when the
    /// user is neither the owner nor an active member.
    pub fn resolve(store: &dyn Store, user: &User, slug: &str) -> Result<Self> {
        let business = store.get_business_by_slug(slug)?.ok_or(Error::NotFound)?;

        let role = if business.owner_id == user.id {
            MemberRole::Owner
        } else {
            match store.get_member(&business.id, &user.id)? {
                Some(member) if member.active => member.role,
                _ => return Err(Error::Forbidden),
            }
        };

        Ok(Self {
            business,
            user_id: user.id.clone(),
            role,
        })
    }

    /// Narrows the scope to owners only.
    pub fn require_owner(self) -> Result<Self> {
        if self.role == MemberRole::Owner {
            Ok(self)
        } else {
            Err(Error::Forbidden)
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.business.id
    }

    #[must_use]
    pub fn business(&self) -> &Business {
        &self.business
    }

    /// The user the scope was resolved for.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn role(&self) -> MemberRole {
        self.role
    }

    /// Builds a scope without an acting user, for trusted local tooling such
    /// as the `import` command.
    pub fn trusted(store: &dyn Store, slug: &str) -> Result<Self> {
        let business = store.get_business_by_slug(slug)?.ok_or(Error::NotFound)?;
        Ok(Self {
            user_id: business.owner_id.clone(),
            business,
            role: MemberRole::Owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::store::SqliteStore;
    use crate::types::BusinessMember;

    fn user(store: &SqliteStore, id: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: id.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();
        user
    }

    fn setup() -> (TempDir, SqliteStore, User, Business) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("scope.db")).unwrap();
        store.initialize().unwrap();

        let owner = user(&store, "owner");
        let business = Business {
            id: "biz-1".to_string(),
            owner_id: owner.id.clone(),
            name: "Mama Mboga".to_string(),
            slug: "mama-mboga".to_string(),
            industry: "grocery".to_string(),
            location: "Nairobi".to_string(),
            created_at: Utc::now(),
        };
        store.create_business(&business).unwrap();

        (temp, store, owner, business)
    }

    #[test]
    fn test_owner_resolves_with_owner_role() {
        let (_temp, store, owner, business) = setup();

        let scope = ScopedBusiness::resolve(&store, &owner, "mama-mboga").unwrap();
        assert_eq!(scope.id(), business.id);
        assert_eq!(scope.role(), MemberRole::Owner);
        assert!(scope.require_owner().is_ok());
    }

    #[test]
    fn test_unknown_slug_is_not_found() {
        let (_temp, store, owner, _) = setup();

        let result = ScopedBusiness::resolve(&store, &owner, "missing");
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_outsider_is_forbidden() {
        let (_temp, store, _, _) = setup();
        let stranger = user(&store, "stranger");

        let result = ScopedBusiness::resolve(&store, &stranger, "mama-mboga");
        assert!(matches!(result, Err(Error::Forbidden)));
    }

    #[test]
    fn test_staff_access_follows_membership_state() {
        let (_temp, store, _, business) = setup();
        let staff = user(&store, "staff");

        let mut member = BusinessMember {
            business_id: business.id.clone(),
            user_id: staff.id.clone(),
            role: MemberRole::Staff,
            active: true,
            joined_at: Utc::now(),
        };
        store.upsert_member(&member).unwrap();

        let scope = ScopedBusiness::resolve(&store, &staff, "mama-mboga").unwrap();
        assert_eq!(scope.role(), MemberRole::Staff);
        assert!(matches!(scope.require_owner(), Err(Error::Forbidden)));

        member.active = false;
        store.upsert_member(&member).unwrap();
        let result = ScopedBusiness::resolve(&store, &staff, "mama-mboga");
        assert!(matches!(result, Err(Error::Forbidden)));
    }
}
