use std::future::Future;
use std::sync::Arc;

use clap::Subcommand;
use log::{debug, info};

use crate::configuration::Config;
use crate::error_handling::types::*;
use crate::identity::{FederatedCredential, FirebaseIdentityProvider, FirebaseSettings, Principal};
use crate::network::{ApiClient, HttpSessionBackend};
use crate::notification::ConsoleNotifier;
use crate::routing::{GuardDecision, RouteGuard, RouteTable};
use crate::session_management::{SessionManager, SessionState};
use crate::storage::FileTokenStore;
use crate::validation::{validate_sign_in, validate_sign_up, SignInForm, SignUpForm};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the current session state
    Status,
    /// Create an account, then establish a session for it
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        photo_url: String,
    },
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with a Google OAuth id token
    SignInGoogle {
        #[arg(long)]
        id_token: String,
    },
    /// Sign out and forget the stored session token
    SignOut,
    /// Run the session exchange again after a failure
    Retry,
    /// Evaluate the route guard for a path
    Guard { path: String },
}

pub struct Controller {
    pub config: Config,
    manager: SessionManager,
    guard: RouteGuard,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        debug!("called `new()` function in Controller");
        config.validate()?;

        let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;
        let token_store = FileTokenStore::new(&config.data_dir, &config.token_slot).map_err(|e| {
            ControllerError::InitializationFailed(format!("token store: {}", e))
        })?;
        let provider = FirebaseIdentityProvider::new(FirebaseSettings {
            api_key: config.identity.api_key.clone(),
            identity_endpoint: config.identity.identity_endpoint.clone(),
            securetoken_endpoint: config.identity.securetoken_endpoint.clone(),
            user_file: config.user_file(),
            timeout: config.request_timeout(),
        })
        .map_err(|e| ControllerError::InitializationFailed(format!("identity provider: {}", e)))?;
        let backend = HttpSessionBackend::new(api.clone());

        let manager = SessionManager::new(
            Arc::new(provider),
            Arc::new(backend),
            Arc::new(token_store),
            api,
            Arc::new(ConsoleNotifier),
        );
        Ok(Self::with_manager(config, manager))
    }

    /// Builds a controller around an already wired session manager.
    pub fn with_manager(config: Config, manager: SessionManager) -> Self {
        let guard = RouteGuard::new(RouteTable::marathon_hub(), config.sign_in_path.clone());
        Self {
            config,
            manager,
            guard,
        }
    }

    /// Mounts the session manager, runs `command` and returns a one-line summary.
    pub async fn run(&self, command: Command) -> Result<String, ControllerError> {
        info!("Running {:?}", CommandName(&command));
        if !self.manager.is_mounted() {
            self.manager.init()?;
        }
        let store = self.manager.store().clone();
        let exchanger = self.manager.exchanger().clone();

        let initial = self.bounded("initial identity check", store.resolved()).await?;

        let state = match command {
            Command::Status => initial,
            Command::SignUp {
                email,
                password,
                name,
                photo_url,
            } => {
                let form = SignUpForm {
                    email,
                    password,
                    display_name: name,
                    avatar_url: photo_url,
                };
                validate_sign_up(&form)?;
                let avatar = Some(form.avatar_url.trim()).filter(|s| !s.is_empty());
                let principal = exchanger
                    .sign_up(form.email.trim(), &form.password, Some(form.display_name.trim()), avatar)
                    .await?;
                self.settled_for(&principal).await?
            }
            Command::SignIn { email, password } => {
                let form = SignInForm { email, password };
                validate_sign_in(&form)?;
                let principal = exchanger.sign_in(form.email.trim(), &form.password).await?;
                self.settled_for(&principal).await?
            }
            Command::SignInGoogle { id_token } => {
                if id_token.trim().is_empty() {
                    return Err(ValidationError::MissingField("Id token").into());
                }
                let principal = exchanger
                    .sign_in_with_federated(&FederatedCredential::google(id_token.trim()))
                    .await?;
                self.settled_for(&principal).await?
            }
            Command::SignOut => {
                exchanger.sign_out().await?;
                self.bounded(
                    "sign-out",
                    store.wait_for(|s| *s == SessionState::Unauthenticated),
                )
                .await?
            }
            Command::Retry => match exchanger.retry() {
                Some(_) => {
                    // Skip past the Loading entered by the retry itself
                    self.bounded("retry", store.resolved()).await?
                }
                None => initial,
            },
            Command::Guard { path } => {
                let decision = self.guard.check(&initial, &path);
                let title = self.guard.routes().document_title(&path);
                return Ok(describe_decision(&path, title, &decision));
            }
        };
        Ok(describe_state(&state))
    }

    pub fn shutdown(&self) {
        debug!("called `shutdown()` function in Controller");
        self.manager.teardown();
    }

    /// Waits for the exchange triggered by signing in `principal` to settle.
    async fn settled_for(&self, principal: &Principal) -> Result<SessionState, ControllerError> {
        let exchanger = self.manager.exchanger().clone();
        self.bounded("session exchange", exchanger.settled_for(principal))
            .await
    }

    async fn bounded<F, T>(&self, what: &str, fut: F) -> Result<T, ControllerError>
    where
        F: Future<Output = T>,
    {
        // Covers the id token request plus the exchange round trip
        let limit = self.config.request_timeout() * 3;
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ControllerError::Timeout(format!("{} after {:?}", what, limit)))
    }
}

struct CommandName<'a>(&'a Command);

impl std::fmt::Debug for CommandName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log credentials
        let name = match self.0 {
            Command::Status => "status",
            Command::SignUp { .. } => "sign-up",
            Command::SignIn { .. } => "sign-in",
            Command::SignInGoogle { .. } => "sign-in-google",
            Command::SignOut => "sign-out",
            Command::Retry => "retry",
            Command::Guard { .. } => "guard",
        };
        write!(f, "{}", name)
    }
}

pub fn describe_state(state: &SessionState) -> String {
    match state {
        SessionState::Loading => "Checking identity...".to_string(),
        SessionState::Unauthenticated => "Not signed in".to_string(),
        SessionState::Authenticated(session) => format!(
            "Signed in as {} <{}> (session issued {})",
            session.principal.label(),
            session.principal.email,
            session.issued_at.to_rfc3339()
        ),
        SessionState::Error(reason) => format!("Session error: {}", reason),
    }
}

pub fn describe_decision(path: &str, title: &str, decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Placeholder => format!("{} [{}]: waiting for identity check", path, title),
        GuardDecision::Render => format!("{} [{}]: render", path, title),
        GuardDecision::Redirect(r) => format!("{} [{}]: redirect to {} (return to {})", path, title, r.to, r.from),
    }
}
