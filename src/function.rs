use anyhow::{Context, Result};
use rpassword::read_password;
use std::io::{self, BufRead, Write};
use zeroize::Zeroize;

use crate::error::ResetError;
use crate::ui;

/// Everything the reset flow asks of the operator.
pub trait Console {
    /// Hidden entry, typed twice.
    fn prompt_new_password(&mut self) -> Result<String>;

    /// First line of the piped input.
    fn piped_password(&mut self) -> Result<String>;

    fn confirm(&mut self, question: &str) -> bool;

    /// Show a generated password once.
    fn show_generated(&mut self, password: &str);
}

/// The real terminal: rpassword for hidden entry, stdin for everything else.
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn prompt_new_password(&mut self) -> Result<String> {
        read_new_password()
    }

    fn piped_password(&mut self) -> Result<String> {
        read_password_from(&mut io::stdin().lock())
    }

    fn confirm(&mut self, question: &str) -> bool {
        confirm(question)
    }

    fn show_generated(&mut self, password: &str) {
        ui::generated_password(password);
    }
}

/// ==============================================
/// Helper: Ask a yes/no question, default no
/// ==============================================
pub fn confirm(question: &str) -> bool {
    print!("{question} [y/N]: ");
    if io::stdout().flush().is_err() {
        eprintln!("Error flushing stdout.");
        return false;
    }
    confirm_from(&mut io::stdin().lock())
}

pub fn confirm_from(input: &mut impl BufRead) -> bool {
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) => false, // EOF
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            eprintln!("Error reading input: {e}");
            false
        }
    }
}

/// ==============================================
/// Helper: Hidden password entry, typed twice
/// ==============================================
pub fn read_new_password() -> Result<String> {
    print!("New password: ");
    io::stdout().flush().context("Failed to flush stdout")?;
    let password = read_password().context("Failed to read password input")?;

    print!("Confirm password: ");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut repeated = read_password().context("Failed to read confirmation input")?;

    let matched = repeated == password;
    repeated.zeroize();
    if !matched {
        let mut p = password;
        p.zeroize();
        return Err(ResetError::PasswordMismatch.into());
    }
    Ok(password)
}

/// Read the password from the first line of input (for piping from a secret store).
pub fn read_password_from(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    // only the line terminator is stripped, policy rejects other padding
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    line.zeroize();
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm_from() {
        assert!(confirm_from(&mut Cursor::new("y\n")));
        assert!(confirm_from(&mut Cursor::new("YES\n")));
        assert!(!confirm_from(&mut Cursor::new("\n")));
        assert!(!confirm_from(&mut Cursor::new("nope\n")));
        assert!(!confirm_from(&mut Cursor::new("")));
    }

    #[test]
    fn test_read_password_from_keeps_inner_spaces() {
        let mut input = Cursor::new("correct horse battery\r\nnext line");
        assert_eq!(read_password_from(&mut input).unwrap(), "correct horse battery");
        assert_eq!(read_password_from(&mut Cursor::new("")).unwrap(), "");
    }
}
