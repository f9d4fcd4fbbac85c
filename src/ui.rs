use colored::*;

use crate::config::Config;
use crate::reset::ResetOutcome;

pub fn banner(config: &Config) {
    let bar_color = Color::Red;
    let menu_bar = "=".repeat(46);
    let menu_spc = " ".repeat(12);
    let spacing = " ".repeat(4);

    println!("{}", menu_bar.color(bar_color));
    println!("{}{}", menu_spc, "ADMIN PASSWORD RESET".bold().color(Color::BrightYellow));
    println!("{}", menu_bar.color(bar_color));

    println!("{}{:<10} {:?}", spacing, "Database:", config.database);
    println!("{}{:<10} \"{}\"", spacing, "Table:", config.users_table);
    println!("{}{:<10} {}", spacing, "Account:", config.target_email.color(Color::BrightWhite));
    println!("{}{:<10} {}", spacing, "Role:", config.target_role);
    println!("{}{:<10} {}", spacing, "Hash:", config.scheme);
    if config.dry_run {
        println!("{}{}", spacing, "DRY RUN: nothing will be written".bold().color(Color::Cyan));
    }
    println!();
}

pub fn summary(outcome: &ResetOutcome) {
    if outcome.dry_run {
        println!(
            "{} {} ({}) found, would be updated with {}.",
            "✔".color(Color::Cyan),
            outcome.email,
            outcome.role,
            outcome.scheme
        );
        return;
    }

    println!(
        "{} Password for {} ({}) reset with {}.",
        "✔".bold().color(Color::BrightGreen),
        outcome.email.bold(),
        outcome.role,
        outcome.scheme
    );
    if outcome.verified {
        println!("  Stored hash verified against the new password.");
    }
    if !outcome.previous_password_set {
        let note = "Account previously had no password (OAuth sign-in only).";
        println!("  {}", note.color(Color::Yellow));
    }
}

/// Shown once on stdout, never logged.
pub fn generated_password(password: &str) {
    println!();
    let heading = "Generated password (store it now, it is not shown again):";
    println!("{}", heading.bold().color(Color::BrightYellow));
    println!("    {password}");
    println!();
}

pub fn failure(err: &anyhow::Error) {
    eprintln!("{} {:#}", "✘ Reset failed:".bold().color(Color::Red), err);
}
