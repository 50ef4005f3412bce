use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidUrl(String),
    MissingApiKey,
    BadPath(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidUrl(e) => write!(f, "URL error: {}", e),
            ConfigError::MissingApiKey => write!(f, "Identity provider API key is missing"),
            ConfigError::BadPath(e) => write!(f, "Path error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    ReadFailed,
    WriteFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ReadFailed => write!(f, "Storage read failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Failure reported by an identity provider adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider answered and refused the request. Carries the provider's error code.
    Rejected(String),
    /// The provider could not be reached.
    Transport(String),
    /// The provider answered with something that could not be decoded.
    MalformedResponse(String),
    /// The operation needs a signed-in user and there is none (or a different one).
    NoCurrentUser,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Rejected(code) => write!(f, "Identity provider rejected request: {}", code),
            ProviderError::Transport(e) => write!(f, "Identity provider unreachable: {}", e),
            ProviderError::MalformedResponse(e) => {
                write!(f, "Malformed identity provider response: {}", e)
            }
            ProviderError::NoCurrentUser => write!(f, "No signed-in user"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Classified authentication failures, each with a fixed user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    AccountExists,
    WeakCredential,
    MalformedInput,
    ProviderUnavailable,
    SessionExchangeFailed,
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::AccountExists => "Email already registered",
            AuthError::WeakCredential => "Password should be at least 6 characters",
            AuthError::MalformedInput => "Invalid email address",
            AuthError::ProviderUnavailable => {
                "Authentication service unavailable, please try again"
            }
            AuthError::SessionExchangeFailed => "Authentication error occurred",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AuthError {}

impl From<&ProviderError> for AuthError {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::Rejected(code) => {
                // Identity Toolkit appends detail after " : " (e.g. "WEAK_PASSWORD : Password should be ...")
                let code = code.split(':').next().unwrap_or_default().trim();
                match code {
                    "EMAIL_EXISTS" => AuthError::AccountExists,
                    "EMAIL_NOT_FOUND"
                    | "INVALID_PASSWORD"
                    | "INVALID_LOGIN_CREDENTIALS"
                    | "USER_DISABLED" => AuthError::InvalidCredentials,
                    "WEAK_PASSWORD" => AuthError::WeakCredential,
                    "INVALID_EMAIL" | "MISSING_PASSWORD" | "MISSING_EMAIL" => {
                        AuthError::MalformedInput
                    }
                    _ => AuthError::ProviderUnavailable,
                }
            }
            ProviderError::NoCurrentUser => AuthError::InvalidCredentials,
            ProviderError::Transport(_) | ProviderError::MalformedResponse(_) => {
                AuthError::ProviderUnavailable
            }
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        AuthError::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionExchangeError {
    IdentityToken(ProviderError),
    Transport(String),
    Rejected(u16),
    MalformedResponse(String),
    Storage(StorageError),
}

impl fmt::Display for SessionExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionExchangeError::IdentityToken(e) => write!(f, "Identity token error: {}", e),
            SessionExchangeError::Transport(e) => write!(f, "Session exchange transport error: {}", e),
            SessionExchangeError::Rejected(status) => {
                write!(f, "Session exchange rejected with HTTP {}", status)
            }
            SessionExchangeError::MalformedResponse(e) => {
                write!(f, "Malformed session exchange response: {}", e)
            }
            SessionExchangeError::Storage(e) => write!(f, "Session token storage error: {}", e),
        }
    }
}

impl std::error::Error for SessionExchangeError {}

impl From<StorageError> for SessionExchangeError {
    fn from(err: StorageError) -> Self {
        SessionExchangeError::Storage(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(&'static str),
    InvalidEmail,
    PasswordTooShort { min: usize },
    InvalidAvatarUrl,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "{} is required", field),
            ValidationError::InvalidEmail => write!(f, "Please enter a valid email address"),
            ValidationError::PasswordTooShort { min } => {
                write!(f, "Password must be at least {} characters", min)
            }
            ValidationError::InvalidAvatarUrl => write!(f, "Photo URL must be an http(s) URL"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
pub enum SessionError {
    AlreadyInitialized,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyInitialized => write!(f, "Session manager already initialized"),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    SessionError(SessionError),
    AuthError(AuthError),
    ValidationError(ValidationError),
    InitializationFailed(String),
    Timeout(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::SessionError(e) => write!(f, "Session error: {}", e),
            ControllerError::AuthError(e) => write!(f, "Authentication error: {}", e),
            ControllerError::ValidationError(e) => write!(f, "Validation error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
            ControllerError::Timeout(e) => write!(f, "Timed out: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<SessionError> for ControllerError {
    fn from(err: SessionError) -> Self {
        ControllerError::SessionError(err)
    }
}

impl From<AuthError> for ControllerError {
    fn from(err: AuthError) -> Self {
        ControllerError::AuthError(err)
    }
}

impl From<ValidationError> for ControllerError {
    fn from(err: ValidationError) -> Self {
        ControllerError::ValidationError(err)
    }
}
