use std::collections::BTreeMap;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;

use crate::accounts::{password::mask_password_hash, repo_types::User};

/// Form body for account creation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub date_of_birth: String, // YYYY-MM-DD, may be empty
    pub password1: String,
    pub password2: String,
}

/// Form body for login.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Field-level validation messages, keyed by form field name.
/// Messages not tied to a field go under [`FormErrors::NON_FIELD`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One labelled, display-ready entry of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// Read-only view of a user for the dashboard. Every field has an explicit
/// fallback, so an unset optional value never fails the page.
#[derive(Debug, Clone)]
pub struct ProfileProjection {
    pub username: String,
    pub entries: Vec<ProfileEntry>,
}

impl ProfileProjection {
    pub fn from_user(user: &User) -> Self {
        let entries = vec![
            entry("user_id", "ID", user.id.to_string()),
            entry("user_password", "Password", mask_password_hash(&user.password_hash)),
            entry(
                "user_last_login",
                "Last login",
                user.last_login
                    .and_then(|t| t.format(&Rfc3339).ok())
                    .unwrap_or_else(|| "Never".into()),
            ),
            entry("user_is_superuser", "Superuser", yes_no(user.is_superuser)),
            entry("user_name", "Username", user.username.clone()),
            entry("user_first_name", "First name", or_dash(&user.first_name)),
            entry("user_last_name", "Last name", or_dash(&user.last_name)),
            entry("user_email", "Email", or_dash(&user.email)),
            entry("user_is_staff", "Staff", yes_no(user.is_staff)),
            entry("user_is_active", "Active", yes_no(user.is_active)),
            entry(
                "user_date_joined",
                "Date joined",
                user.date_joined
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| "—".into()),
            ),
            entry(
                "user_date_of_birth",
                "Date of birth",
                user.date_of_birth
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "Not provided".into()),
            ),
        ];
        Self {
            username: user.username.clone(),
            entries,
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

fn entry(key: &'static str, label: &'static str, value: String) -> ProfileEntry {
    ProfileEntry { key, label, value }
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "—".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNo".into(),
            last_login: None,
            is_superuser: false,
            username: "dana".into(),
            first_name: String::new(),
            last_name: String::new(),
            email: "dana@example.com".into(),
            is_staff: true,
            is_active: true,
            date_joined: OffsetDateTime::UNIX_EPOCH,
            date_of_birth: None,
            session_epoch: 0,
        }
    }

    #[test]
    fn projection_defaults_unset_fields() {
        let p = ProfileProjection::from_user(&user());
        assert_eq!(p.get("user_last_login"), Some("Never"));
        assert_eq!(p.get("user_date_of_birth"), Some("Not provided"));
        assert_eq!(p.get("user_first_name"), Some("—"));
        assert_eq!(p.get("user_is_staff"), Some("Yes"));
        assert_eq!(p.get("user_is_superuser"), Some("No"));
        assert_eq!(p.get("user_date_joined"), Some("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn projection_lists_every_profile_field_in_order() {
        let p = ProfileProjection::from_user(&user());
        let keys: Vec<_> = p.entries.iter().map(|e| e.key).collect();
        assert_eq!(
            keys,
            [
                "user_id",
                "user_password",
                "user_last_login",
                "user_is_superuser",
                "user_name",
                "user_first_name",
                "user_last_name",
                "user_email",
                "user_is_staff",
                "user_is_active",
                "user_date_joined",
                "user_date_of_birth",
            ]
        );
    }

    #[test]
    fn projection_masks_password_and_formats_birth_date() {
        let mut u = user();
        u.date_of_birth = Some(date!(1990 - 04 - 12));
        let p = ProfileProjection::from_user(&u);
        assert_eq!(p.get("user_password"), Some("argon2id ********"));
        assert!(p.entries.iter().all(|e| !e.value.contains("aGFzaGhhc2hoYXNo")));
        assert_eq!(p.get("user_date_of_birth"), Some("1990-04-12"));
    }

    #[test]
    fn form_errors_collect_per_field() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());
        errors.add("username", "taken");
        errors.add("username", "too long");
        assert!(errors.has("username"));
        assert!(!errors.has("email"));
        assert_eq!(errors.field("username").len(), 2);
    }
}
