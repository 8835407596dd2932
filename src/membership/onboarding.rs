use std::sync::Arc;

use crate::events::{AccessEvent, dispatch};
use crate::repository::{AccountType, User, UserRepository};
use crate::session::{RoleFactCache, Session};
use crate::AccessError;

/// Records the end of onboarding, which the route gate reads from the token.
pub struct OnboardingService<U: UserRepository> {
    users: U,
    cache: Arc<RoleFactCache>,
}

impl<U: UserRepository> OnboardingService<U> {
    pub fn new(users: U, cache: Arc<RoleFactCache>) -> Self {
        Self { users, cache }
    }

    pub async fn complete_onboarding(&self, session: &Session, account_type: AccountType) -> Result<User, AccessError> {
        let principal = session.require()?;

        let user = match self.users.complete_onboarding(principal, account_type).await {
            Err(AccessError::NotFound) => return Err(AccessError::Unauthenticated),
            other => other?,
        };

        self.cache.invalidate(principal)?;

        log::info!(
            target: "tenantry",
            "msg=\"onboarding completed\", user_id={principal}, account_type=\"{account_type}\""
        );

        dispatch(AccessEvent::OnboardingCompleted {
            user_id: principal,
            at: user.updated_at,
        })
        .await;

        Ok(user)
    }
}
