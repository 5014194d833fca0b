use clap::Args;
use miette::{miette, Result};

use super::ArchiveArgs;

#[derive(Args)]
pub struct LookupArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// The path to resolve
    #[arg(short, long)]
    path: String,
}

impl LookupArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = self.archive.open()?;

        let file = archive
            .lookup(&self.path)
            .ok_or(miette!("{} is not in the archive", self.path))?;

        println!("{file}");
        Ok(())
    }
}
