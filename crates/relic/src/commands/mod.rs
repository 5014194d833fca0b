pub mod idx;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle paired index/data archives
    Idx {
        #[command(subcommand)]
        command: idx::IdxCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Idx { command } => command.handle(),
        }
    }
}
