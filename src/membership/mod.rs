//! Membership mutations: creating teams and organizations, changing roles,
//! removing members and finishing onboarding.
//!
//! Each service invalidates the role-fact cache for every principal whose
//! facts changed before it returns.

mod onboarding;
mod organization;
mod team;

pub use onboarding::OnboardingService;
pub use organization::OrganizationService;
pub use team::TeamMembershipService;
