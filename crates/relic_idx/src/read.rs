//! Types for reading paired archives
//!

use bon::Builder;
use indexmap::IndexMap;
use std::{
    fs::File,
    io::{self, Read, Seek},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument};

use crate::{
    cipher,
    codec::{self, Extent},
    error::{Error, FileNotFoundError, Result},
    table::{self, Tables},
    trie::TrieIndex,
    types::{ArchiveHeader, FileDescriptor, FileId},
};

/// Options for how an archive should be read
#[derive(Debug, Clone, Copy, Builder)]
pub struct ArchiveOptions {
    /// Bytes of codec sub-header preceding every block-compressed payload
    #[builder(default = ArchiveOptions::DEFAULT_BLOCK_HEADER_LEN)]
    pub block_header_len: u64,
}

impl ArchiveOptions {
    /// Sub-header length observed in shipped archives
    pub const DEFAULT_BLOCK_HEADER_LEN: u64 = 0x30;
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Decrypted, immutable index of an archive
#[derive(Debug)]
pub(crate) struct Shared {
    header: ArchiveHeader,
    files: Vec<FileDescriptor>,
    trie: TrieIndex,
    options: ArchiveOptions,
    data_path: Option<PathBuf>,
}

impl Shared {
    fn new(index: Vec<u8>, options: ArchiveOptions) -> Result<Self> {
        let header = table::parse_header(&index)?;
        let index = cipher::decrypt(index);

        let Tables {
            strings,
            nodes,
            mut files,
        } = table::parse_tables(&index, &header)?;

        let trie = TrieIndex::new(nodes, strings, files.len());
        for (file, name) in trie.enumerate_all() {
            files[file].filename = Some(name);
        }

        let unnamed = files.iter().filter(|f| f.filename.is_none()).count();
        debug!(files = files.len(), unnamed, "index loaded");

        Ok(Shared {
            header,
            files,
            trie,
            options,
            data_path: None,
        })
    }
}

/// Paired archive reader
///
/// The index file is decrypted once when the archive is opened. Every lookup afterwards is
/// read-only; extraction seeks and reads the data source owned by this instance.
///
/// ```no_run
/// fn list_contents() -> relic_idx::error::Result<()> {
///     let mut archive = relic_idx::Archive::open("assets.idx", "assets.dat")?;
///
///     for file in archive.list_files().to_vec() {
///         let data = archive.extract(&file)?;
///         println!("{}: {} bytes", file.name(), data.len());
///     }
///
///     Ok(())
/// }
/// ```
pub struct Archive<R> {
    reader: R,
    data_len: u64,
    shared: Arc<Shared>,
}

impl<R> std::fmt::Debug for Archive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("header", &self.shared.header)
            .field("files", &self.shared.files.len())
            .field("data_len", &self.data_len)
            .finish()
    }
}

impl Archive<File> {
    /// Open an index file and its companion data file.
    pub fn open(index_path: impl AsRef<Path>, data_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(index_path, data_path, ArchiveOptions::default())
    }

    /// Open an index file and its companion data file with explicit options.
    #[instrument(skip_all, fields(index = %index_path.as_ref().display()), err)]
    pub fn open_with_options(
        index_path: impl AsRef<Path>,
        data_path: impl AsRef<Path>,
        options: ArchiveOptions,
    ) -> Result<Self> {
        let index = std::fs::read(index_path.as_ref())?;
        let data = File::open(data_path.as_ref())?;

        let mut shared = Shared::new(index, options)?;
        shared.data_path = Some(data_path.as_ref().to_path_buf());

        info!(files = shared.files.len(), "opened archive");
        Self::from_shared(data, Arc::new(shared))
    }

    /// Open a second handle on the data file, sharing the decrypted index.
    ///
    /// Each handle owns its own file cursor, so handles may extract concurrently.
    pub fn reopen(&self) -> Result<Self> {
        let path = self
            .shared
            .data_path
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "archive has no data path"))?;
        self.with_reader(File::open(path)?)
    }
}

impl<R> Archive<R> {
    /// The fixed header fields of the index file
    pub fn header(&self) -> &ArchiveHeader {
        &self.shared.header
    }

    /// Options the archive was opened with
    pub fn options(&self) -> &ArchiveOptions {
        &self.shared.options
    }

    /// Number of entries contained in this archive.
    pub fn len(&self) -> usize {
        self.shared.files.len()
    }

    /// Whether this archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every file descriptor, with names recovered from the trie
    pub fn list_files(&self) -> &[FileDescriptor] {
        &self.shared.files
    }

    /// Returns an iterator over all file names, using `unknown_<id>` for unnamed entries.
    pub fn file_names(&self) -> impl Iterator<Item = std::borrow::Cow<'_, str>> {
        self.shared.files.iter().map(FileDescriptor::name)
    }

    /// Get the descriptor of a file by id
    pub fn descriptor(&self, file: FileId) -> Option<&FileDescriptor> {
        self.shared.files.get(file)
    }

    /// Resolve a path to a file id through the trie.
    pub fn lookup(&self, path: &str) -> Option<FileId> {
        self.shared.trie.lookup(path)
    }

    /// Recompute the id to path mapping from the trie
    pub fn enumerate_all(&self) -> IndexMap<FileId, String> {
        self.shared.trie.enumerate_all()
    }

    /// The trie over the node table
    pub fn trie(&self) -> &TrieIndex {
        &self.shared.trie
    }

    /// Total declared size of the files in the archive once decoded, if it can be known.
    pub fn decompressed_size(&self) -> Option<u128> {
        let mut total = 0u128;
        for file in &self.shared.files {
            total = total.checked_add(u128::try_from(file.uncompressed_size).ok()?)?;
        }
        Some(total)
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Read an archive from an in-memory index buffer and a data source.
    pub fn new(index: Vec<u8>, reader: R, options: ArchiveOptions) -> Result<Self> {
        let shared = Shared::new(index, options)?;
        Self::from_shared(reader, Arc::new(shared))
    }

    fn from_shared(mut reader: R, shared: Arc<Shared>) -> Result<Self> {
        let data_len = reader.seek(io::SeekFrom::End(0))?;
        Ok(Archive {
            reader,
            data_len,
            shared,
        })
    }

    /// Create a handle over another data source sharing this archive's index.
    pub fn with_reader<S: Read + Seek>(&self, reader: S) -> Result<Archive<S>> {
        Archive::from_shared(reader, Arc::clone(&self.shared))
    }

    /// Materialize the payload of a file.
    ///
    /// Fails with [`Error::OutOfRange`] if the stored bytes lie outside the data file,
    /// [`Error::UnsupportedCodec`] for an unknown codec tag and [`Error::SizeMismatch`] if a
    /// compressed payload does not decode to its declared size.
    #[instrument(skip(self, desc), fields(file = %desc.name()), err)]
    pub fn extract(&mut self, desc: &FileDescriptor) -> Result<Vec<u8>> {
        let codec = desc.codec()?;
        let extent = Extent::resolve(
            desc,
            codec,
            self.shared.options.block_header_len,
            self.data_len,
        )?;
        codec::materialize(&mut self.reader, desc, codec, extent)
    }

    /// Get the contents of a file by id
    pub fn by_index(&mut self, file: FileId) -> Result<Vec<u8>> {
        let shared = Arc::clone(&self.shared);
        let desc = shared
            .files
            .get(file)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(file)))?;
        self.extract(desc)
    }

    /// Search for a file by path and get its contents
    pub fn by_name(&mut self, path: &str) -> Result<Vec<u8>> {
        let Some(file) = self.lookup(path) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                path.to_owned(),
            )));
        };
        self.by_index(file)
    }
}
