pub mod extract;
pub mod extract_all;
pub mod list;
pub mod lookup;

use clap::Args;
use miette::{Context, Result};
use relic_idx::{Archive, ArchiveOptions};
use std::{fs::File, path::PathBuf};

#[derive(clap::Subcommand)]
pub enum IdxCommands {
    /// List the entries of an archive
    List(list::ListArgs),
    /// Resolve a path to its file id
    Lookup(lookup::LookupArgs),
    /// Extract an archive into a directory
    Extract(extract::ExtractArgs),
    /// Extract every archive found under a directory
    ExtractAll(extract_all::ExtractAllArgs),
}

impl IdxCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            IdxCommands::List(list) => list.handle(),
            IdxCommands::Lookup(lookup) => lookup.handle(),
            IdxCommands::Extract(extract) => extract.handle(),
            IdxCommands::ExtractAll(extract_all) => extract_all.handle(),
        }
    }
}

/// Arguments locating one archive
#[derive(Args)]
pub struct ArchiveArgs {
    /// The index file of the archive
    #[arg(short, long, value_name = "FILE")]
    index: PathBuf,

    /// The data file paired with the index
    #[arg(long, value_name = "FILE")]
    data: PathBuf,

    #[command(flatten)]
    options: OptionArgs,
}

/// Arguments shaping how archives are read
#[derive(Args)]
pub struct OptionArgs {
    /// Bytes of sub-header before each block-compressed payload
    #[arg(long, value_name = "BYTES", default_value_t = ArchiveOptions::DEFAULT_BLOCK_HEADER_LEN)]
    block_header_len: u64,
}

impl OptionArgs {
    pub fn options(&self) -> ArchiveOptions {
        ArchiveOptions::builder()
            .block_header_len(self.block_header_len)
            .build()
    }
}

impl ArchiveArgs {
    pub fn open(&self) -> Result<Archive<File>> {
        Archive::open_with_options(&self.index, &self.data, self.options.options()).context(
            format!(
                "opening {} with {}",
                self.index.display(),
                self.data.display()
            ),
        )
    }
}
