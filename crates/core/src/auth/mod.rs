mod api_key;
mod none;
mod resolve;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use resolve::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    let acting_as = ActingAs::from_config(config.acting_user_email.as_deref());
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new(acting_as))),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.as_deref().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "api_key must be set when using ApiKey auth method".to_string(),
                )
            })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key, acting_as)))
        }
    }
}
