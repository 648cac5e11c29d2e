use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated passwords
pub const GENERATED_LENGTH: usize = 7;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash on the blocking pool, away from the request workers.
pub async fn hash(password: &str) -> Result<String, PasswordError> {
    hash_with_cost(password, HASH_COST).await
}

async fn hash_with_cost(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// Check a password against a stored hash. Malformed hashes never match.
pub async fn verify(password: &str, hashed: &str) -> bool {
    let password = password.to_owned();
    let hashed = hashed.to_owned();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await {
        Ok(result) => result.unwrap_or(false),
        Err(e) => {
            tracing::error!("Password check task failed: {}", e);
            false
        }
    }
}

/// Random alphanumeric password.
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_LENGTH)
        .map(char::from)
        .collect()
}
