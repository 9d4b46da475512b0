//! Manage the local user directory
//!
//! Usage:
//!   manage_users add <username>     register an unconfirmed user
//!   manage_users token <username>   issue an access token

use portfolio_backend::config::Config;
use portfolio_backend::db::Database;
use std::env;

fn usage() -> anyhow::Error {
    anyhow::anyhow!("usage: manage_users <add|token> <username>")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let (command, username) = match args.as_slice() {
        [command, username] => (command.as_str(), username.as_str()),
        _ => return Err(usage()),
    };

    let config = Config::from_env();
    let db = Database::new(&config.database.path).await?;

    match command {
        "add" => {
            let user = db.create_user(username).await?;
            println!("Created user {} ({})", user.username, user.user_id);
            println!("Confirm with POST /api/users/confirm before issuing tokens");
        }
        "token" => {
            let token = db.create_session(username).await?;
            println!("{}", token);
        }
        _ => return Err(usage()),
    }

    Ok(())
}
