use anyhow::{Context, Result};
use chrono::Utc;
use env_logger::{Builder, Env, WriteStyle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::db::Target;
use crate::reset::ResetOutcome;

// ------------------ DIAGNOSTIC LOG ------------------

/// Initialize stderr logging. `RUST_LOG` wins over the configured level.
pub fn init(level: &str) {
    let installed = Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .format_module_path(false)
        .write_style(WriteStyle::Auto)
        .try_init();
    // tests and embedders may have installed a logger already
    if let Err(e) = installed {
        log::debug!("Logger already initialized: {e}");
    }
}

/// Mask all but the first and last two characters.
pub fn mask(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}

// ------------------ AUDIT FILE ------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    ResetSucceeded,
    ResetFailed,
    DryRun,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::ResetSucceeded => "RESET_SUCCESS",
            AuditEvent::ResetFailed => "RESET_FAILURE",
            AuditEvent::DryRun => "RESET_DRY_RUN",
        }
    }
}

/// Append one line to the audit file: `timestamp | event | email | detail`.
/// Every occurrence of `email` in `detail` is masked as well.
/// Callers must never pass a password or hash in `detail`.
pub fn audit(path: impl AsRef<Path>, event: AuditEvent, email: &str, detail: &str) -> Result<()> {
    let path = path.as_ref();
    let timestamp = Utc::now().to_rfc3339();
    let mut detail = detail.replace(['\n', '\r'], " ");
    if !email.is_empty() {
        detail = detail.replace(email, &mask(email));
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open audit log {}", path.display()))?;
    writeln!(file, "{} | {} | {} | {}", timestamp, event.as_str(), mask(email), detail)
        .context("Failed to write audit log")?;

    match event {
        AuditEvent::ResetFailed => log::warn!("{} {} {}", event.as_str(), mask(email), detail),
        _ => log::info!("{} {} {}", event.as_str(), mask(email), detail),
    }
    Ok(())
}

/// Record the result of one run. Failures record the error chain, with the
/// target email masked like everywhere else in the file.
pub fn audit_result(
    path: impl AsRef<Path>,
    target: &Target,
    backend: &str,
    result: &Result<ResetOutcome>,
) -> Result<()> {
    match result {
        Ok(outcome) if outcome.dry_run => audit(
            path,
            AuditEvent::DryRun,
            &target.email,
            &format!("role {} on {}", target.role, backend),
        ),
        Ok(outcome) => audit(
            path,
            AuditEvent::ResetSucceeded,
            &target.email,
            &format!(
                "role {} on {} with {}, verified={}",
                outcome.role, backend, outcome.scheme, outcome.verified
            ),
        ),
        Err(e) => audit(path, AuditEvent::ResetFailed, &target.email, &format!("{e:#}")),
    }
}
