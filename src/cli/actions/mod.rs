pub mod server;

/// What the CLI resolved to after parsing. One variant per subcommand-shaped
/// unit of work.
#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}

impl Action {
    /// Run the action to completion.
    /// # Errors
    /// Propagates whatever the underlying action fails with.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
        }
    }
}
