//! Test factories for generating test data
//!
//! Factories create randomized data, useful when a test needs unique
//! addresses that cannot collide with the fixtures.

use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use quota_console::models::{EnterpriseMember, MemberUser};

/// Factory for registered-looking email addresses
pub struct EmailFactory;

impl EmailFactory {
    /// A syntactically valid address
    pub fn one() -> String {
        SafeEmail().fake()
    }

    /// `count` distinct valid addresses
    pub fn many(count: usize) -> Vec<String> {
        let mut emails: Vec<String> = Vec::with_capacity(count);
        while emails.len() < count {
            let email = Self::one();
            if !emails.contains(&email) {
                emails.push(email);
            }
        }
        emails
    }
}

/// Builder for enterprise roster rows
pub struct MemberBuilder {
    member: EnterpriseMember,
}

impl MemberBuilder {
    pub fn new(email: &str) -> Self {
        Self {
            member: EnterpriseMember {
                user_id: format!("u-{}", email.split('@').next().unwrap_or(email)),
                user: MemberUser {
                    email: email.to_string(),
                    avatar: None,
                },
                is_enterprise_admin: false,
                timezone: None,
                account_quota: None,
                used_quota: None,
                effective_at: None,
                expire_at: None,
            },
        }
    }

    pub fn admin(mut self) -> Self {
        self.member.is_enterprise_admin = true;
        self
    }

    pub fn build(self) -> EnterpriseMember {
        self.member
    }
}
