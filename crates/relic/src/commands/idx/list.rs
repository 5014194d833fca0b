use clap::Args;
use itertools::Itertools;
use miette::Result;
use owo_colors::OwoColorize;
use relic_idx::FileDescriptor;

use super::ArchiveArgs;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// Sort entries by name instead of file table order
    #[arg(long, default_value_t = false)]
    sorted: bool,
}

fn codec_label(file: &FileDescriptor) -> String {
    match file.codec() {
        Ok(codec) => format!("{codec:?}").to_lowercase(),
        Err(_) => format!("type {}", file.codec_type),
    }
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = self.archive.open()?;

        let files: Vec<&FileDescriptor> = if self.sorted {
            archive
                .list_files()
                .iter()
                .sorted_by(|a, b| a.name().cmp(&b.name()))
                .collect()
        } else {
            archive.list_files().iter().collect()
        };

        for file in files {
            let name = file.name();
            let name = if file.filename.is_some() {
                name.to_string()
            } else {
                name.yellow().to_string()
            };
            println!(
                "{:>6}  {:<8} {:>10} {:>10}  {}",
                file.index,
                codec_label(file),
                file.compressed_size,
                file.uncompressed_size,
                name
            );
        }

        if let Some(total) = archive.decompressed_size() {
            println!("{} files, {} bytes", archive.len(), total);
        }

        Ok(())
    }
}
