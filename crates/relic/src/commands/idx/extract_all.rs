use clap::Args;
use miette::{miette, IntoDiagnostic, Result};
use relic_idx::Archive;
use std::path::PathBuf;
use tracing::{error, info};
use walkdir::WalkDir;

use super::{extract::extract_archive, OptionArgs};

#[derive(Args)]
pub struct ExtractAllArgs {
    /// A directory searched for `.idx` files with a `.dat` companion
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target directory, each archive is extracted into a folder named after it
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    #[command(flatten)]
    options: OptionArgs,
}

impl ExtractAllArgs {
    pub fn handle(&self) -> Result<()> {
        let pairs = WalkDir::new(&self.directory)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("idx")))
            .map(|p| {
                let data = p.with_extension("dat");
                (p, data)
            })
            .filter(|(_, data)| data.is_file())
            .collect::<Vec<_>>();

        if pairs.is_empty() {
            return Err(miette!("no archives found in {}", self.directory.display()));
        }

        let mut failed = 0;
        for (index, data) in &pairs {
            let relative = index
                .strip_prefix(&self.directory)
                .into_diagnostic()?
                .with_extension("");
            let target = self.output.join(relative);
            info!("extracting {} into {}", index.display(), target.display());

            let summary = Archive::open_with_options(index, data, self.options.options())
                .map_err(miette::Report::from)
                .and_then(|mut archive| extract_archive(&mut archive, &target, self.overwrite));

            match summary {
                Ok(summary) if summary.failed == 0 => {}
                Ok(summary) => {
                    error!("{}: {} entries failed", index.display(), summary.failed);
                    failed += 1;
                }
                Err(err) => {
                    error!("{}: {:?}", index.display(), err);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(miette!("{} of {} archives had errors", failed, pairs.len()));
        }
        Ok(())
    }
}
