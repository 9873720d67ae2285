//! User registration.

use crate::{Error, Result, Role, User, UserId};
use chrono::{DateTime, Utc};

impl User {
    /// Validate and build a new user, enforcing unique username and email
    pub fn register(
        username: &str,
        email: &str,
        role: Role,
        existing: &[User],
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let username = username.trim();
        let len = username.chars().count();
        if !(4..=64).contains(&len) {
            return Err(Error::Validation(format!(
                "Username must be 4 to 64 characters, got {}",
                len
            )));
        }

        let email = email.trim().to_lowercase();
        let valid_email = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.'),
            None => false,
        };
        if !valid_email {
            return Err(Error::Validation(format!("Invalid email address: {}", email)));
        }

        if existing.iter().any(|u| u.username == username) {
            return Err(Error::Duplicate(format!("username {}", username)));
        }
        if existing.iter().any(|u| u.email == email) {
            return Err(Error::Duplicate(format!("email {}", email)));
        }

        Ok(User {
            id: UserId::new(),
            username: username.to_string(),
            email,
            role,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_normalizes_email() {
        let user = User::register("alice", " Alice@Example.org ", Role::Donor, &[], Utc::now())
            .unwrap();
        assert_eq!(user.email, "alice@example.org");
        assert_eq!(user.role, Role::Donor);
    }

    #[test]
    fn test_register_rejects_short_username_and_bad_email() {
        assert!(matches!(
            User::register("bob", "bob@example.org", Role::Donor, &[], Utc::now()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            User::register("bobby", "bob.example.org", Role::Donor, &[], Utc::now()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let first = User::register("carol", "carol@example.org", Role::Recipient, &[], Utc::now())
            .unwrap();
        let existing = vec![first];

        assert!(matches!(
            User::register("carol", "other@example.org", Role::Donor, &existing, Utc::now()),
            Err(Error::Duplicate(_))
        ));
        assert!(matches!(
            User::register("carol2", "CAROL@example.org", Role::Donor, &existing, Utc::now()),
            Err(Error::Duplicate(_))
        ));
    }
}
