use anyhow::Result;
use zeroize::Zeroize;

use crate::cli::PasswordSource;
use crate::config::Config;
use crate::db::{Account, Target, UserStore};
use crate::error::ResetError;
use crate::function::Console;
use crate::password::{self, hash_password, verify_password, HashScheme};

/// What a reset did (or, for a dry run, would do).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    pub email: String,
    pub role: String,
    pub scheme: HashScheme,
    /// false when the account had no password (OAuth-only) before the reset
    pub previous_password_set: bool,
    pub verified: bool,
    pub dry_run: bool,
}

/// Look the account up and make sure it is the one we are allowed to touch.
pub fn preflight(store: &mut dyn UserStore, target: &Target) -> Result<Account> {
    let account = store
        .find_account(&target.email)?
        .ok_or_else(|| ResetError::AccountNotFound { email: target.email.clone() })?;

    // exact match, the column holds an enum value
    if account.role != target.role {
        return Err(ResetError::RoleMismatch {
            email: target.email.clone(),
            expected: target.role.clone(),
            found: account.role,
        }
        .into());
    }
    Ok(account)
}

/// Hash `password` and store it on the target row, then read it back and verify.
pub fn run(
    store: &mut dyn UserStore,
    target: &Target,
    password: &str,
    scheme: HashScheme,
    dry_run: bool,
) -> Result<ResetOutcome> {
    let account = preflight(store, target)?;
    let previous_password_set = account.password_hash.is_some();
    if !previous_password_set {
        log::warn!("Account has no password yet (OAuth-only); the reset will add one");
    }

    if dry_run {
        log::info!("Dry run: {} account on {} would be updated", target.role, store.backend());
        return Ok(ResetOutcome {
            email: account.email,
            role: account.role,
            scheme,
            previous_password_set,
            verified: false,
            dry_run: true,
        });
    }

    let hashed = hash_password(password, scheme)?;
    log::debug!("Hashed new password with {scheme}");

    let rows = store.replace_password(target, &hashed)?;
    if rows != 1 {
        return Err(ResetError::UpdateRejected { rows }.into());
    }

    let stored = store
        .find_account(&target.email)?
        .and_then(|a| a.password_hash)
        .unwrap_or_default();
    if stored != hashed || !verify_password(password, &stored)? {
        return Err(ResetError::VerificationFailed { email: target.email.clone() }.into());
    }

    Ok(ResetOutcome {
        email: account.email,
        role: account.role,
        scheme,
        previous_password_set,
        verified: true,
        dry_run: false,
    })
}

/// The operator flow around [`run`]: check the account before asking for
/// anything, obtain the password from `source`, enforce the policy, confirm,
/// then reset. Dry runs never touch the console.
pub fn execute(
    store: &mut dyn UserStore,
    config: &Config,
    source: PasswordSource,
    console: &mut dyn Console,
) -> Result<ResetOutcome> {
    let target = Target::from_config(config);
    log::info!("Connected to {} database", store.backend());

    // fail fast before asking for a password
    preflight(store, &target)?;

    if config.dry_run {
        return run(store, &target, "", config.scheme, true);
    }

    let mut new_password = match source {
        PasswordSource::Prompt => console.prompt_new_password()?,
        PasswordSource::Stdin => console.piped_password()?,
        PasswordSource::Generate(len) => password::generate_password(len),
    };

    // generated passwords are alphanumeric and long enough by construction
    if !matches!(source, PasswordSource::Generate(_)) {
        let problems = password::check_policy(&new_password, &target.email, config.scheme);
        if !problems.is_empty() {
            new_password.zeroize();
            return Err(ResetError::WeakPassword(problems).into());
        }
    }

    let question = format!("Overwrite the password of {} ({})?", target.email, target.role);
    if !config.assume_yes && !console.confirm(&question) {
        new_password.zeroize();
        return Err(ResetError::Aborted.into());
    }

    let outcome = run(store, &target, &new_password, config.scheme, false);
    if outcome.is_ok() && matches!(source, PasswordSource::Generate(_)) {
        console.show_generated(&new_password);
    }
    new_password.zeroize();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    // Store that accepts the UPDATE but never persists it.
    struct LossyStore {
        account: Account,
    }

    impl UserStore for LossyStore {
        fn backend(&self) -> &'static str {
            "lossy"
        }

        fn find_account(&mut self, email: &str) -> Result<Option<Account>> {
            Ok((email == self.account.email).then(|| self.account.clone()))
        }

        fn replace_password(&mut self, _target: &Target, _hash: &str) -> Result<u64> {
            Ok(1)
        }
    }

    #[test]
    fn test_lost_write_is_reported() {
        let mut store = LossyStore {
            account: Account {
                email: "admin@sportsfest.com".into(),
                role: "ADMIN".into(),
                password_hash: Some("$2b$04$old".into()),
            },
        };
        let target = Target { email: "admin@sportsfest.com".into(), role: "ADMIN".into() };

        let err = run(&mut store, &target, "Fresh-Pass-9", HashScheme::Bcrypt { cost: 4 }, false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResetError>(),
            Some(ResetError::VerificationFailed { .. })
        ));
    }
}
