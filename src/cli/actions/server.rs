use crate::cli::actions::Action;
use crate::gatehouse;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, globals } => {
            gatehouse::new(port, globals).await?;
        }
    }

    Ok(())
}
