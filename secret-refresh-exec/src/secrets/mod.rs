mod error;
mod provider;
mod value;

pub use error::SecretError;
pub use provider::{EnvSecretsProvider, FileSecretsProvider, SecretsProvider, StaticSecretsProvider};
pub use value::SecretValue;
