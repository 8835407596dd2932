use async_trait::async_trait;

use super::{Credential, RoleFactBundle};
use crate::repository::{OrgMemberRepository, TeamMemberRepository, UserRepository};
use crate::validators::normalize_email;
use crate::{AccessError, PrincipalId};

/// Computes a principal's role facts from the source of truth.
///
/// [`RoleFactCache`](super::RoleFactCache) refills through this trait.
#[async_trait]
pub trait RoleFactSource: Send + Sync {
    async fn resolve_role_facts(&self, principal: PrincipalId) -> Result<RoleFactBundle, AccessError>;
}

/// Maps credentials onto user rows and derives role facts from memberships.
#[derive(Clone)]
pub struct SessionResolver<U, O, T>
where
    U: UserRepository,
    O: OrgMemberRepository,
    T: TeamMemberRepository,
{
    users: U,
    org_members: O,
    team_members: T,
}

impl<U, O, T> SessionResolver<U, O, T>
where
    U: UserRepository,
    O: OrgMemberRepository,
    T: TeamMemberRepository,
{
    pub fn new(users: U, org_members: O, team_members: T) -> Self {
        Self {
            users,
            org_members,
            team_members,
        }
    }

    /// Returns the user id behind a verified credential, provisioning the
    /// user on first sight.
    ///
    /// Repeated calls for the same email or subject return the same id.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "resolve_principal", skip_all, err))]
    pub async fn resolve_principal(&self, credential: &Credential) -> Result<PrincipalId, AccessError> {
        let user = match credential {
            Credential::Anonymous => return Err(AccessError::Unauthenticated),
            Credential::Local { email } => {
                let email = normalize_email(email).map_err(|_| AccessError::Unauthenticated)?;
                self.users.provision_by_email(&email).await?
            }
            Credential::External { subject, email } => {
                let subject = subject.trim();
                if subject.is_empty() {
                    return Err(AccessError::Unauthenticated);
                }
                let email = normalize_email(email).map_err(|_| AccessError::Unauthenticated)?;
                self.users.provision_by_subject(subject, &email).await?
            }
        };

        log::debug!(target: "tenantry", "msg=\"principal resolved\", user_id={}", user.id);
        Ok(user.id)
    }
}

#[async_trait]
impl<U, O, T> RoleFactSource for SessionResolver<U, O, T>
where
    U: UserRepository,
    O: OrgMemberRepository,
    T: TeamMemberRepository,
{
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "resolve_role_facts", skip(self), err))]
    async fn resolve_role_facts(&self, principal: PrincipalId) -> Result<RoleFactBundle, AccessError> {
        let user = self
            .users
            .find_user_by_id(principal)
            .await?
            .ok_or(AccessError::Unauthenticated)?;

        let org_member = self.org_members.find_by_user(principal).await?;

        let mut team_ids: Vec<i64> = self
            .team_members
            .find_by_user(principal)
            .await?
            .into_iter()
            .map(|m| m.team_id)
            .collect();
        team_ids.sort_unstable();
        team_ids.dedup();

        Ok(RoleFactBundle {
            org_id: org_member.as_ref().map(|m| m.org_id),
            org_role: org_member.as_ref().and_then(|m| m.parse_role()),
            team_ids,
            onboarding_complete: user.onboarding_complete,
            account_type: user.account_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockAccessStore, OrgRole, TeamRole};

    fn resolver(store: &MockAccessStore) -> SessionResolver<MockAccessStore, MockAccessStore, MockAccessStore> {
        SessionResolver::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthenticated() {
        let store = MockAccessStore::new();
        let result = resolver(&store).resolve_principal(&Credential::Anonymous).await;
        assert_eq!(result, Err(AccessError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_local_provisioning_is_idempotent() {
        let store = MockAccessStore::new();
        let resolver = resolver(&store);
        let first = resolver
            .resolve_principal(&Credential::Local {
                email: "Alice@Acme.io".into(),
            })
            .await
            .unwrap();
        let second = resolver
            .resolve_principal(&Credential::Local {
                email: " alice@acme.io ".into(),
            })
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_external_found_by_subject() {
        let store = MockAccessStore::new();
        let resolver = resolver(&store);
        let credential = Credential::External {
            subject: "google|42".into(),
            email: "bob@example.com".into(),
        };
        let first = resolver.resolve_principal(&credential).await.unwrap();
        let second = resolver.resolve_principal(&credential).await.unwrap();
        assert_eq!(first, second);

        let blank = Credential::External {
            subject: "  ".into(),
            email: "bob@example.com".into(),
        };
        assert_eq!(resolver.resolve_principal(&blank).await, Err(AccessError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_role_facts_without_memberships() {
        let store = MockAccessStore::new();
        let user = store.insert_user("solo@example.com").unwrap();
        let facts = resolver(&store).resolve_role_facts(user.id).await.unwrap();
        assert_eq!(facts.org_id, None);
        assert_eq!(facts.org_role, None);
        assert!(facts.team_ids.is_empty());
        assert!(facts.onboarding_complete);
    }

    #[tokio::test]
    async fn test_role_facts_collects_memberships() {
        let store = MockAccessStore::new();
        let user = store.insert_user("admin@acme.io").unwrap();
        let org = store.insert_organization("Acme", "acme-x1y2z3").unwrap();
        store.add_org_member(org.id, user.id, OrgRole::TeamAdmin).unwrap();
        let a = store.insert_team("A", Some(org.id)).unwrap();
        let b = store.insert_team("B", None).unwrap();
        store.add_team_member(b.id, user.id, TeamRole::Member).unwrap();
        store.add_team_member(a.id, user.id, TeamRole::Admin).unwrap();

        let facts = resolver(&store).resolve_role_facts(user.id).await.unwrap();
        assert_eq!(facts.org_id, Some(org.id));
        assert_eq!(facts.org_role, Some(OrgRole::TeamAdmin));
        assert_eq!(facts.team_ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_role_facts_for_missing_user() {
        let store = MockAccessStore::new();
        let result = resolver(&store).resolve_role_facts(404).await;
        assert_eq!(result, Err(AccessError::Unauthenticated));
    }
}
