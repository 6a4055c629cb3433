use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::accounts::{
    dto::{FormErrors, SignupForm},
    password::{hash_password, verify_password, DUMMY_HASH},
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

const REQUIRED: &str = "This field is required.";
const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "letmein1", "admin123", "trustno1", "passw0rd",
];

pub enum SignupOutcome {
    Created(User),
    Invalid(FormErrors),
}

pub enum LoginOutcome {
    Authenticated(User),
    Rejected(FormErrors),
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Create an account from a submitted signup form.
///
/// Validation problems come back as [`SignupOutcome::Invalid`]; `Err` is
/// reserved for infrastructure failures.
#[instrument(skip(store, form), fields(username = %form.username.trim()))]
pub async fn signup(store: &dyn UserStore, form: &SignupForm) -> anyhow::Result<SignupOutcome> {
    let today = OffsetDateTime::now_utc().date();
    let mut errors = FormErrors::default();

    let username = clean_username(&form.username, &mut errors);
    let email = clean_email(&form.email, &mut errors);
    let date_of_birth = clean_date_of_birth(&form.date_of_birth, today, &mut errors);
    clean_passwords(&form.password1, &form.password2, &username, &mut errors);

    if !errors.has("username") && store.find_by_username(&username).await?.is_some() {
        warn!("username already registered");
        errors.add("username", DUPLICATE_USERNAME);
    }
    if !errors.is_empty() {
        return Ok(SignupOutcome::Invalid(errors));
    }

    let password_hash = hash_password(&form.password1)?;
    let new_user = NewUser {
        username,
        email,
        password_hash,
        date_of_birth,
    };

    match store.create(new_user).await {
        Ok(user) => {
            info!(user_id = %user.id, "user registered");
            Ok(SignupOutcome::Created(user))
        }
        Err(StoreError::DuplicateUsername) => {
            // lost a race with a concurrent signup
            warn!("username taken at insert");
            errors.add("username", DUPLICATE_USERNAME);
            Ok(SignupOutcome::Invalid(errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check credentials and stamp `last_login` on success.
///
/// Unknown users, wrong passwords and inactive accounts get the same message.
#[instrument(skip(store, password))]
pub async fn authenticate(
    store: &dyn UserStore,
    username: &str,
    password: &str,
) -> anyhow::Result<LoginOutcome> {
    let mut errors = FormErrors::default();
    let username = username.trim();
    if username.is_empty() {
        errors.add("username", REQUIRED);
    }
    if password.is_empty() {
        errors.add("password", REQUIRED);
    }
    if !errors.is_empty() {
        return Ok(LoginOutcome::Rejected(errors));
    }

    let Some(mut user) = store.find_by_username(username).await? else {
        // result ignored; only the hashing cost matters here
        let _ = verify_password(password, DUMMY_HASH);
        warn!("login unknown username");
        errors.add(FormErrors::NON_FIELD, INVALID_LOGIN);
        return Ok(LoginOutcome::Rejected(errors));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        errors.add(FormErrors::NON_FIELD, INVALID_LOGIN);
        return Ok(LoginOutcome::Rejected(errors));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login inactive user");
        errors.add(FormErrors::NON_FIELD, INVALID_LOGIN);
        return Ok(LoginOutcome::Rejected(errors));
    }

    let now = OffsetDateTime::now_utc();
    store.record_login(user.id, now).await?;
    user.last_login = Some(now);

    info!(user_id = %user.id, "user logged in");
    Ok(LoginOutcome::Authenticated(user))
}

/// Accepts only same-site absolute paths as a post-login target.
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    let ok = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    ok.then_some(next)
}

fn clean_username(raw: &str, errors: &mut FormErrors) -> String {
    let username = raw.trim().to_string();
    if username.is_empty() {
        errors.add("username", REQUIRED);
    } else if username.chars().count() > USERNAME_MAX_CHARS {
        errors.add(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_CHARS} characters."),
        );
    } else if !is_valid_username(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    username
}

fn clean_email(raw: &str, errors: &mut FormErrors) -> String {
    let email = raw.trim().to_lowercase();
    if !email.is_empty() && !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    email
}

fn clean_date_of_birth(raw: &str, today: Date, errors: &mut FormErrors) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        Ok(date) if date > today => {
            errors.add("date_of_birth", "Date of birth cannot be in the future.");
            None
        }
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("date_of_birth", "Enter a valid date.");
            None
        }
    }
}

fn clean_passwords(password1: &str, password2: &str, username: &str, errors: &mut FormErrors) {
    if password1.is_empty() {
        errors.add("password1", REQUIRED);
    } else {
        if password1.chars().count() < PASSWORD_MIN_CHARS {
            errors.add(
                "password1",
                format!(
                    "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
                ),
            );
        }
        if password1.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password1", "This password is entirely numeric.");
        }
        if username.chars().count() >= 3
            && password1.to_lowercase().contains(&username.to_lowercase())
        {
            errors.add("password1", "The password is too similar to the username.");
        }
        if COMMON_PASSWORDS.contains(&password1.to_lowercase().as_str()) {
            errors.add("password1", "This password is too common.");
        }
    }

    if password2.is_empty() {
        errors.add("password2", REQUIRED);
    } else if !password1.is_empty() && password1 != password2 {
        errors.add("password2", "The two password fields didn't match.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::repo::MemoryUserStore;
    use time::macros::date;

    fn form(username: &str, password1: &str, password2: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: format!("{username}@example.com"),
            date_of_birth: String::new(),
            password1: password1.into(),
            password2: password2.into(),
        }
    }

    async fn created(store: &MemoryUserStore, f: &SignupForm) -> User {
        match signup(store, f).await.expect("signup") {
            SignupOutcome::Created(user) => user,
            SignupOutcome::Invalid(errors) => panic!("unexpected errors: {errors:?}"),
        }
    }

    async fn invalid(store: &MemoryUserStore, f: &SignupForm) -> FormErrors {
        match signup(store, f).await.expect("signup") {
            SignupOutcome::Created(user) => panic!("unexpected user {}", user.username),
            SignupOutcome::Invalid(errors) => errors,
        }
    }

    #[tokio::test]
    async fn valid_signup_creates_exactly_one_user() {
        let store = MemoryUserStore::new();
        let mut f = form("erin", "Tr1cky-Pass", "Tr1cky-Pass");
        f.date_of_birth = "1994-02-28".into();
        let user = created(&store, &f).await;

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(user.username, "erin");
        assert_eq!(user.email, "erin@example.com");
        assert_eq!(user.date_of_birth, Some(date!(1994 - 02 - 28)));
        assert_ne!(user.password_hash, "Tr1cky-Pass");
        assert!(verify_password("Tr1cky-Pass", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_username_error() {
        let store = MemoryUserStore::new();
        created(&store, &form("frank", "Tr1cky-Pass", "Tr1cky-Pass")).await;

        let errors = invalid(&store, &form("FRANK", "Other-Pass9", "Other-Pass9")).await;
        assert_eq!(errors.field("username"), [DUPLICATE_USERNAME.to_string()]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let store = MemoryUserStore::new();
        let errors = invalid(&store, &form("gina", "Tr1cky-Pass", "Tr1cky-Pas")).await;
        assert!(errors.has("password2"));
        assert!(!errors.has("username"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected() {
        let store = MemoryUserStore::new();
        let short = invalid(&store, &form("hank", "Ab1!", "Ab1!")).await;
        assert!(short.field("password1")[0].contains("too short"));

        let numeric = invalid(&store, &form("hank", "1234509876", "1234509876")).await;
        assert!(numeric
            .field("password1")
            .iter()
            .any(|m| m.contains("entirely numeric")));

        let similar = invalid(&store, &form("hankster", "myhankster1", "myhankster1")).await;
        assert!(similar
            .field("password1")
            .iter()
            .any(|m| m.contains("too similar")));

        let common = invalid(&store, &form("hank", "Password123", "Password123")).await;
        assert!(common.field("password1").iter().any(|m| m.contains("too common")));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bad_username_email_and_birth_date_are_field_errors() {
        let store = MemoryUserStore::new();
        let mut f = form("no spaces!", "Tr1cky-Pass", "Tr1cky-Pass");
        f.email = "not-an-email".into();
        f.date_of_birth = "31/12/1990".into();
        let errors = invalid(&store, &f).await;
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert_eq!(errors.field("date_of_birth"), ["Enter a valid date.".to_string()]);

        let mut future = form("ivy", "Tr1cky-Pass", "Tr1cky-Pass");
        future.date_of_birth = "2999-01-01".into();
        let errors = invalid(&store, &future).await;
        assert!(errors.field("date_of_birth")[0].contains("future"));

        let long = form(&"x".repeat(151), "Tr1cky-Pass", "Tr1cky-Pass");
        let errors = invalid(&store, &long).await;
        assert!(errors.field("username")[0].contains("at most 150"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_form_reports_required_fields() {
        let store = MemoryUserStore::new();
        let errors = invalid(&store, &SignupForm::default()).await;
        for field in ["username", "password1", "password2"] {
            assert_eq!(errors.field(field), [REQUIRED.to_string()], "{field}");
        }
        assert!(!errors.has("email"));
        assert!(!errors.has("date_of_birth"));
    }

    #[tokio::test]
    async fn authenticate_success_stamps_last_login() {
        let store = MemoryUserStore::new();
        let user = created(&store, &form("jack", "Tr1cky-Pass", "Tr1cky-Pass")).await;
        assert!(user.last_login.is_none());

        let LoginOutcome::Authenticated(logged_in) =
            authenticate(&store, " jack ", "Tr1cky-Pass").await.unwrap()
        else {
            panic!("expected login to succeed");
        };
        assert_eq!(logged_in.id, user.id);
        assert!(logged_in.last_login.is_some());
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login, logged_in.last_login);
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password_unknown_user_and_inactive() {
        let store = MemoryUserStore::new();
        let user = created(&store, &form("kate", "Tr1cky-Pass", "Tr1cky-Pass")).await;

        for (name, pass) in [("kate", "wrong-pass"), ("nobody", "Tr1cky-Pass")] {
            let LoginOutcome::Rejected(errors) = authenticate(&store, name, pass).await.unwrap()
            else {
                panic!("expected rejection for {name}");
            };
            assert_eq!(errors.field(FormErrors::NON_FIELD), [INVALID_LOGIN.to_string()]);
        }

        store.set_active(user.id, false).await;
        let LoginOutcome::Rejected(errors) =
            authenticate(&store, "kate", "Tr1cky-Pass").await.unwrap()
        else {
            panic!("inactive user must not log in");
        };
        assert_eq!(errors.field(FormErrors::NON_FIELD), [INVALID_LOGIN.to_string()]);
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_none());
    }

    #[test]
    fn safe_next_accepts_only_local_paths() {
        assert_eq!(safe_next("/accounts/dashboard"), Some("/accounts/dashboard"));
        assert_eq!(safe_next(" /x?y=1 "), Some("/x?y=1"));
        assert_eq!(safe_next(""), None);
        assert_eq!(safe_next("https://evil.example"), None);
        assert_eq!(safe_next("//evil.example"), None);
        assert_eq!(safe_next("/\\evil.example"), None);
        assert_eq!(safe_next("dashboard"), None);
    }

    #[test]
    fn email_and_username_patterns() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(is_valid_username("user.name+tag@x-y_z"));
        assert!(!is_valid_username("has space"));
    }
}
