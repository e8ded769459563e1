//! Applies or reverts the database migrations.
//!
//! ```text
//! migrate up            apply every pending migration
//! migrate up --to ID    apply pending migrations up to and including ID
//! migrate down          revert every applied migration, newest first
//! migrate down --to ID  revert applied migrations newer than ID
//! ```
//!
//! Connects with the same environment the server uses.

use noticeboard::config::Config;
use noticeboard::db::Store;
use noticeboard::migrations;

enum Action {
    Up,
    Down,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let (action, to) = match parse_arguments() {
        Some(arguments) => arguments,
        None => {
            eprintln!("usage: migrate <up|down> [--to <id>]");
            std::process::exit(2);
        }
    };

    if let Err(error) = run(&action, to.as_deref()).await {
        log::error!("Migration run failed: {}", error);
        std::process::exit(1);
    }
}

async fn run(action: &Action, to: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let store = Store::connect(&config).await?;

    match action {
        Action::Up => {
            let applied = migrations::up(store.database(), to).await?;
            log::info!("Applied {} migration(s)", applied);
        }
        Action::Down => {
            let reverted = migrations::down(store.database(), to).await?;
            log::info!("Reverted {} migration(s)", reverted);
        }
    }
    Ok(())
}

fn parse_arguments() -> Option<(Action, Option<String>)> {
    let mut arguments = std::env::args().skip(1);
    let action = match arguments.next()?.as_str() {
        "up" => Action::Up,
        "down" => Action::Down,
        _ => return None,
    };
    let to = match arguments.next() {
        Some(flag) if flag == "--to" => Some(arguments.next()?),
        Some(_) => return None,
        None => None,
    };
    if arguments.next().is_some() {
        return None;
    }
    Some((action, to))
}
