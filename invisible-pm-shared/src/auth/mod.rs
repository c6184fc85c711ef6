/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the length policy
/// - [`jwt`]: HS256 access/refresh tokens bound to a workspace
/// - [`middleware`]: Bearer-token authentication producing an `AuthContext`
/// - [`authorization`]: Role → permission table and permission checks
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::auth::jwt::issue_token_pair;
/// use invisible_pm_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), Uuid::new_v4(), "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
