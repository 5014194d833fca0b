use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use relic_idx::{Archive, FileDescriptor};
use std::{
    collections::HashSet,
    fs::File,
    io::{Read, Seek, Write},
    path::{Component, Path, PathBuf},
};
use tracing::{info, warn};

use super::ArchiveArgs;

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut archive = self.archive.open()?;
        let summary = extract_archive(&mut archive, &self.directory, self.overwrite)?;

        if summary.failed > 0 {
            return Err(miette!(
                "{} of {} entries could not be extracted",
                summary.failed,
                summary.failed + summary.written
            ));
        }
        Ok(())
    }
}

/// Counts of the entries handled for one archive
#[derive(Debug, Default, Clone, Copy)]
pub struct Summary {
    pub written: usize,
    pub failed: usize,
}

/// Relative output path for an entry, dropping components that would leave the target directory
fn output_path(file: &FileDescriptor) -> PathBuf {
    let name = file.name();
    let path: PathBuf = Path::new(&*name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if path.as_os_str().is_empty() {
        PathBuf::from(format!("unknown_{}", file.index))
    } else {
        path
    }
}

/// Claim `path` in `taken`, appending `.<index>` until the name is free
fn unique_path(taken: &mut HashSet<PathBuf>, mut path: PathBuf, index: usize) -> PathBuf {
    while !taken.insert(path.clone()) {
        path.as_mut_os_string().push(format!(".{index}"));
    }
    path
}

fn write_entry(path: &Path, data: &[u8], overwrite: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .into_diagnostic()
            .context(format!("creating {}", parent.display()))?;
    }

    let mut out = if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))?
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))?
    };

    out.write_all(data).into_diagnostic()
}

/// Extract every entry of `archive` below `directory`.
///
/// A failing entry is logged and counted; the remaining entries are still extracted.
pub fn extract_archive<R: Read + Seek>(
    archive: &mut Archive<R>,
    directory: &Path,
    overwrite: bool,
) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut taken = HashSet::new();

    for file in archive.list_files().to_vec() {
        let relative = unique_path(&mut taken, output_path(&file), file.index);
        let p = directory.join(&relative);

        let result = archive
            .extract(&file)
            .map_err(miette::Report::from)
            .and_then(|data| write_entry(&p, &data, overwrite));

        match result {
            Ok(()) => {
                info!("writing {}", p.display());
                summary.written += 1;
            }
            Err(err) => {
                warn!("skipping {}: {:?}", file.name(), err);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use relic_idx::FileDescriptor;

    use super::{output_path, unique_path};

    #[test]
    fn output_paths_stay_inside_target() {
        let mut file = FileDescriptor {
            index: 3,
            ..Default::default()
        };
        assert_eq!(output_path(&file), PathBuf::from("unknown_3"));

        file.filename = Some("textures/sky.dds".into());
        assert_eq!(output_path(&file), PathBuf::from("textures/sky.dds"));

        file.filename = Some("../../etc/passwd".into());
        assert_eq!(output_path(&file), PathBuf::from("etc/passwd"));

        file.filename = Some("/".into());
        assert_eq!(output_path(&file), PathBuf::from("unknown_3"));
    }

    #[test]
    fn colliding_names_get_distinct_paths() {
        let mut taken = HashSet::new();

        let first = unique_path(&mut taken, PathBuf::from("a.bin"), 0);
        let renamed = unique_path(&mut taken, PathBuf::from("a.bin.2"), 1);
        let second = unique_path(&mut taken, PathBuf::from("a.bin"), 2);
        let third = unique_path(&mut taken, PathBuf::from("a.bin"), 2);

        assert_eq!(first, PathBuf::from("a.bin"));
        assert_eq!(renamed, PathBuf::from("a.bin.2"));
        assert_eq!(second, PathBuf::from("a.bin.2.2"));
        assert_eq!(third, PathBuf::from("a.bin.2.2.2"));
    }
}
