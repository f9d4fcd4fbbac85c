use clap::{value_parser, Arg, ArgAction, ArgGroup, Command};

use crate::password::{BCRYPT_MAX_COST, BCRYPT_MIN_COST};

/// Command-line definition. Every value flag overrides its environment variable.
pub fn build() -> Command {
    Command::new("reset_admin")
        .about("Reset the password of one admin account in the users table")
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .value_name("URL")
                .help("postgres://... or sqlite:<path> (env: DATABASE_URL)"),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .value_name("EMAIL")
                .help("Email of the account to reset (env: RESET_TARGET_EMAIL)"),
        )
        .arg(
            Arg::new("role")
                .long("role")
                .value_name("ROLE")
                .help("Role the account must have (env: RESET_TARGET_ROLE)"),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .value_name("TABLE")
                .help("Users table name (env: RESET_USERS_TABLE)"),
        )
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .value_name("SCHEME")
                .help("bcrypt or argon2 (env: RESET_HASH_SCHEME)"),
        )
        .arg(
            Arg::new("cost")
                .long("cost")
                .value_name("COST")
                .value_parser(
                    value_parser!(u32).range(BCRYPT_MIN_COST as i64..=BCRYPT_MAX_COST as i64),
                )
                .help("bcrypt cost factor (env: RESET_BCRYPT_COST)"),
        )
        .arg(
            Arg::new("password-stdin")
                .long("password-stdin")
                .action(ArgAction::SetTrue)
                .help("Read the new password from the first line of stdin"),
        )
        .arg(
            Arg::new("generate")
                .long("generate")
                .value_name("LEN")
                .num_args(0..=1)
                .default_missing_value("20")
                .value_parser(value_parser!(usize))
                .help("Generate a random password of LEN characters (default 20)"),
        )
        .group(
            ArgGroup::new("password-source")
                .args(["password-stdin", "generate"])
                .multiple(false),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Check the account but do not change anything"),
        )
        .arg(
            Arg::new("yes")
                .long("yes")
                .short('y')
                .action(ArgAction::SetTrue)
                .help("Do not ask for confirmation"),
        )
        .arg(
            Arg::new("audit-log")
                .long("audit-log")
                .value_name("PATH")
                .help("Append-only audit file (env: RESET_AUDIT_LOG)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
}

/// How the operator wants to supply the new password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    Prompt,
    Stdin,
    Generate(usize),
}

impl PasswordSource {
    pub fn from_matches(matches: &clap::ArgMatches) -> Self {
        if matches.get_flag("password-stdin") {
            PasswordSource::Stdin
        } else if let Some(len) = matches.get_one::<usize>("generate") {
            PasswordSource::Generate(*len)
        } else {
            PasswordSource::Prompt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        build().debug_assert();
    }

    #[test]
    fn test_password_source() {
        let m = build().try_get_matches_from(["reset_admin"]).unwrap();
        assert_eq!(PasswordSource::from_matches(&m), PasswordSource::Prompt);

        let m = build().try_get_matches_from(["reset_admin", "--generate"]).unwrap();
        assert_eq!(PasswordSource::from_matches(&m), PasswordSource::Generate(20));

        let m = build().try_get_matches_from(["reset_admin", "--generate", "32"]).unwrap();
        assert_eq!(PasswordSource::from_matches(&m), PasswordSource::Generate(32));

        let m = build().try_get_matches_from(["reset_admin", "--password-stdin"]).unwrap();
        assert_eq!(PasswordSource::from_matches(&m), PasswordSource::Stdin);
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        assert!(build()
            .try_get_matches_from(["reset_admin", "--password-stdin", "--generate"])
            .is_err());
    }

    #[test]
    fn test_cost_range_enforced() {
        assert!(build().try_get_matches_from(["reset_admin", "--cost", "3"]).is_err());
        assert!(build().try_get_matches_from(["reset_admin", "--cost", "14"]).is_ok());
    }
}
