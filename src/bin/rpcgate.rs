use anyhow::Result;
use rpcgate::cli::{actions, actions::Action, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let action = start()?;

    // Handle the action
    match action {
        Action::Server(config) => actions::server::execute(config).await?,
    }

    Ok(())
}
