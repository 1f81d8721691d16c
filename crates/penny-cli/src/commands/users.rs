//! `penny user`: user management

use penny_core::models::UserRole;

use crate::cli::{UserArgs, UserCommands};
use crate::commands::open_database;

pub fn run(args: UserArgs) -> anyhow::Result<()> {
    let db = open_database()?;

    match args.command {
        UserCommands::Add { email, name, admin } => {
            let role = if admin { UserRole::Admin } else { UserRole::User };
            let user = db.create_user(&email, &name, role)?;
            println!("Created user #{} {} ({})", user.id, user.email, user.role.as_str());
        }
        UserCommands::List => {
            let users = db.list_users()?;
            if users.is_empty() {
                println!("No users.");
                return Ok(());
            }
            for user in users {
                println!(
                    "#{:<4} {:<30} {:<20} {}",
                    user.id,
                    user.email,
                    user.name,
                    user.role.as_str()
                );
            }
        }
    }
    Ok(())
}
