//! Staff user management.

use maktaba_core::Email;

use maktaba_api::db::UserRepository;
use maktaba_api::services::passwords::hash_password;

use super::CommandError;

/// Create a staff user with the given credentials.
///
/// # Errors
///
/// Returns `CommandError::Invalid` for a bad email or short password, and
/// database errors (including duplicate email) otherwise.
pub async fn create_staff(email: &str, name: &str, password: &str) -> Result<(), CommandError> {
    let email = Email::parse(email.trim())
        .map_err(|e| CommandError::Invalid(format!("invalid email: {e}")))?;
    if name.trim().is_empty() {
        return Err(CommandError::Invalid("name must not be empty".to_owned()));
    }
    if password.len() < 8 {
        return Err(CommandError::Invalid(
            "password must be at least 8 characters".to_owned(),
        ));
    }

    let password_hash =
        hash_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let pool = super::connect().await?;
    let user = UserRepository::new(&pool)
        .create(name.trim(), &email, &password_hash, None, true)
        .await
        .map_err(|e| CommandError::Invalid(e.to_string()))?;

    tracing::info!(user_id = %user.id, email = %user.email, "Staff user created");
    Ok(())
}
