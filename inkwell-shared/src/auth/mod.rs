/// Authentication and authorization for the admin dashboard
///
/// Public readers are anonymous (see [`crate::identity`]). Everything here is
/// about dashboard users:
///
/// - [`password`]: Argon2id hashing and the password policy
/// - [`jwt`]: HS256 token validation
/// - [`context`]: turning request credentials into an [`context::AuthContext`]
/// - [`authorization`]: role checks
///
/// # Example
///
/// ```no_run
/// use inkwell_shared::auth::context::{authenticate, extract_token};
/// use inkwell_shared::auth::authorization::require_editor;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, header: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let token = extract_token(Some(header), None)?;
/// let auth = authenticate(&pool, token, "jwt-secret").await?;
/// require_editor(&auth)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod context;
pub mod jwt;
pub mod password;
