use std::process::ExitCode;

/// Outcomes of a reset that the operator needs to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    InvalidConfig(Vec<String>),

    #[error("Password rejected:\n  - {}", .0.join("\n  - "))]
    WeakPassword(Vec<String>),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("No account found with email '{email}'")]
    AccountNotFound { email: String },

    #[error("Account '{email}' has role '{found}', expected '{expected}'")]
    RoleMismatch {
        email: String,
        expected: String,
        found: String,
    },

    #[error("Update matched {rows} row(s) instead of exactly one; transaction rolled back")]
    UpdateRejected { rows: u64 },

    #[error(
        "Stored hash for '{email}' does not verify against the new password \
         (update was committed)"
    )]
    VerificationFailed { email: String },

    #[error("Aborted by operator")]
    Aborted,
}

impl ResetError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidConfig(_) | Self::WeakPassword(_) | Self::PasswordMismatch => {
                ExitCode::from(2)
            }
            Self::AccountNotFound { .. } | Self::RoleMismatch { .. } => ExitCode::from(3),
            Self::UpdateRejected { .. } | Self::VerificationFailed { .. } => ExitCode::from(4),
            Self::Aborted => ExitCode::from(5),
        }
    }
}

/// Exit code for any error, falling back to 1 when it is not a [`ResetError`].
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<ResetError>()
        .map(ResetError::exit_code)
        .unwrap_or(ExitCode::FAILURE)
}
