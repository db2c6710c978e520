//! Account Directory
//!
//! Registration, credential checks, password change and admin lookup.

use std::sync::Arc;

use kernel::id::AccountId;
use platform::deadline::within;
use platform::password::{ClearTextPassword, CredentialStore};

use crate::application::config::AuthConfig;
use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

/// Stand-in hash verified when the email is unknown, so a miss costs
/// the same as a wrong password.
const DUMMY_HASH: &str = "AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Registration input
pub struct RegisterInput {
    pub email: String,
    pub password: String,
}

/// Account CRUD component
pub struct AccountDirectory<A>
where
    A: AccountRepository,
{
    account_repo: Arc<A>,
    config: Arc<AuthConfig>,
    credentials: CredentialStore,
}

impl<A> AccountDirectory<A>
where
    A: AccountRepository,
{
    pub fn new(account_repo: Arc<A>, config: Arc<AuthConfig>) -> AuthResult<Self> {
        let credentials = config.credential_store()?;
        Ok(Self {
            account_repo,
            config,
            credentials,
        })
    }

    /// Create an account; the email must not be registered yet
    pub async fn register(&self, input: RegisterInput) -> AuthResult<Account> {
        let email = Email::new(&input.email)?;
        let password = ClearTextPassword::new(input.password)?;

        let password_hash = self
            .credentials
            .hash(password.as_bytes(), self.config.pepper())?;
        let account = Account::new(email, password_hash);

        let inserted = within(
            self.config.store_timeout,
            self.account_repo.insert_if_absent(&account),
        )
        .await?;

        if !inserted {
            return Err(AuthError::EmailTaken);
        }

        tracing::info!(account_id = %account.account_id, "Account registered");

        Ok(account)
    }

    /// Check email and password, returning the account
    ///
    /// Every failure is `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, password: String) -> AuthResult<Account> {
        let password = ClearTextPassword::unchecked(password);

        let account = match Email::new(email) {
            Ok(email) => {
                within(
                    self.config.store_timeout,
                    self.account_repo.find_by_email(&email),
                )
                .await?
            }
            Err(_) => None,
        };

        let Some(account) = account else {
            let _ = self
                .credentials
                .verify(password.as_bytes(), self.config.pepper(), DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.verify(
            password.as_bytes(),
            self.config.pepper(),
            account.password_hash.as_str(),
        ) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Replace the password after checking the current one
    ///
    /// Existing sessions stay valid.
    pub async fn change_password(
        &self,
        account_id: &AccountId,
        old_password: String,
        new_password: String,
    ) -> AuthResult<()> {
        let new_password = ClearTextPassword::new(new_password)?;
        let old_password = ClearTextPassword::unchecked(old_password);

        let account = self.find(account_id).await?;

        if !self.credentials.verify(
            old_password.as_bytes(),
            self.config.pepper(),
            account.password_hash.as_str(),
        ) {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self
            .credentials
            .hash(new_password.as_bytes(), self.config.pepper())?;

        let updated = within(
            self.config.store_timeout,
            self.account_repo.update_password_hash(account_id, &new_hash),
        )
        .await?;

        if !updated {
            return Err(AuthError::AccountNotFound);
        }

        tracing::info!(account_id = %account_id, "Password changed");

        Ok(())
    }

    pub async fn find(&self, account_id: &AccountId) -> AuthResult<Account> {
        within(
            self.config.store_timeout,
            self.account_repo.find_by_id(account_id),
        )
        .await?
        .ok_or(AuthError::AccountNotFound)
    }

    /// Fail with `NotAdmin` unless the account exists and is an admin
    pub async fn require_admin(&self, account_id: &AccountId) -> AuthResult<Account> {
        let account = within(
            self.config.store_timeout,
            self.account_repo.find_by_id(account_id),
        )
        .await?;

        match account {
            Some(account) if account.is_admin => Ok(account),
            _ => Err(AuthError::NotAdmin),
        }
    }

    /// Remove the account row. Returns `false` if it was already gone.
    pub async fn delete(&self, account_id: &AccountId) -> AuthResult<bool> {
        within(
            self.config.store_timeout,
            self.account_repo.delete(account_id),
        )
        .await
    }
}
