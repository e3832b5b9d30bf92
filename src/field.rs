use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::dev_print;
use crate::errors::{Error, Result};

/// Where uploaded file parts keep their bytes. Selected once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Memory,
    Filesystem,
}

static UPLOAD_STORAGE: OnceLock<StorageMode> = OnceLock::new();

/// Select the process-wide upload storage mode (once).
pub fn init_upload_storage(mode: StorageMode) -> std::result::Result<(), &'static str> {
    UPLOAD_STORAGE
        .set(mode)
        .map_err(|_| "Upload storage already selected")
}

pub fn upload_storage() -> StorageMode {
    *UPLOAD_STORAGE.get_or_init(|| {
        #[cfg(feature = "env")]
        {
            use std::env;
            if let Ok(data) = env::var("UPLOAD_STORAGE") {
                match data.to_ascii_lowercase().as_str() {
                    "memory" => return StorageMode::Memory,
                    "filesystem" => return StorageMode::Filesystem,
                    _ => {}
                }
            }
        }
        StorageMode::Filesystem
    })
}

// Name sequence for temp files. The pid plus a process-wide counter makes
// names unique among live fields without a cross-connection lock;
// `create_new` still guards against files left behind by anyone else.
static TEMP_FILE_SEQ: AtomicU64 = AtomicU64::new(1);

enum FileBacking {
    Memory(Vec<u8>),
    Unopened,
    Disk { file: File, path: PathBuf },
}

enum FieldKind {
    Unset,
    Text(Vec<u8>),
    File(FileBacking),
}

/// One part of a `multipart/form-data` body.
///
/// The boundary parser creates a field per part header, sets the kind,
/// then streams body bytes in through [`accept`](Field::accept). A field
/// backed by a temp file deletes that file when the field is dropped, on
/// every exit path.
pub struct Field {
    kind: FieldKind,
    storage: StorageMode,
    temp_dir: Option<PathBuf>,
    file_name: String,
    content_type: String,
}

impl Field {
    pub fn new() -> Field {
        let mut _field = Field::with_storage(upload_storage());
        #[cfg(feature = "env")]
        if let Ok(dir) = std::env::var("UPLOAD_TEMP_DIR") {
            _field.temp_dir = Some(PathBuf::from(dir));
        }
        _field
    }

    /// Build a field with an explicit storage mode instead of the
    /// process-wide one.
    pub fn with_storage(storage: StorageMode) -> Field {
        Field {
            kind: FieldKind::Unset,
            storage,
            temp_dir: None,
            file_name: String::new(),
            content_type: String::new(),
        }
    }

    pub fn set_text_kind(&mut self) -> Result<()> {
        match self.kind {
            FieldKind::Unset => {
                self.kind = FieldKind::Text(Vec::new());
                Ok(())
            }
            FieldKind::Text(_) => Ok(()),
            FieldKind::File(_) => Err(Error::InvalidState("field kind is already file")),
        }
    }

    pub fn set_file_kind(&mut self) -> Result<()> {
        match self.kind {
            FieldKind::Unset => {
                let backing = match self.storage {
                    StorageMode::Memory => FileBacking::Memory(Vec::new()),
                    StorageMode::Filesystem => FileBacking::Unopened,
                };
                self.kind = FieldKind::File(backing);
                Ok(())
            }
            FieldKind::File(_) => Ok(()),
            FieldKind::Text(_) => Err(Error::InvalidState("field kind is already text")),
        }
    }

    pub fn set_temp_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Take the next run of body bytes for this part.
    pub fn accept(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.kind {
            FieldKind::Unset => Err(Error::InvalidState("accept called before a kind was set")),
            FieldKind::Text(content) => append(content, data),
            FieldKind::File(backing) => match backing {
                FileBacking::Memory(content) => append(content, data),
                FileBacking::Unopened => {
                    let dir = self.temp_dir.as_ref().ok_or_else(|| {
                        Error::Io(io::Error::new(
                            io::ErrorKind::NotFound,
                            "upload temp directory is not set",
                        ))
                    })?;
                    let (mut file, path) = create_temp_file(dir)?;
                    file.write_all(data)?;
                    file.flush()?;
                    *backing = FileBacking::Disk { file, path };
                    Ok(())
                }
                FileBacking::Disk { file, .. } => {
                    file.write_all(data)?;
                    file.flush()?;
                    Ok(())
                }
            },
        }
    }

    /// Accumulated content of a text part.
    pub fn text_content(&self) -> Result<String> {
        match &self.kind {
            FieldKind::Text(content) => Ok(String::from_utf8_lossy(content).into_owned()),
            FieldKind::Unset => Err(Error::InvalidState("field kind was never set")),
            FieldKind::File(_) => Err(Error::InvalidState("field is a file upload, not text")),
        }
    }

    /// Bytes of a file part kept in memory.
    pub fn file_content(&self) -> Result<&[u8]> {
        match &self.kind {
            FieldKind::File(FileBacking::Memory(content)) => Ok(content),
            FieldKind::File(_) => Err(Error::InvalidState(
                "file content is stored in the filesystem",
            )),
            FieldKind::Unset => Err(Error::InvalidState("field kind was never set")),
            FieldKind::Text(_) => Err(Error::InvalidState("field is text, not a file upload")),
        }
    }

    pub fn file_size(&self) -> Result<usize> {
        self.file_content().map(|content| content.len())
    }

    /// Path of the temp file backing a filesystem-stored part.
    pub fn temp_file_path(&self) -> Result<&Path> {
        match &self.kind {
            FieldKind::File(FileBacking::Disk { path, .. }) => Ok(path),
            FieldKind::File(FileBacking::Unopened) => {
                Err(Error::InvalidState("no upload bytes were accepted yet"))
            }
            FieldKind::File(FileBacking::Memory(_)) => {
                Err(Error::InvalidState("file content is stored in memory"))
            }
            FieldKind::Unset => Err(Error::InvalidState("field kind was never set")),
            FieldKind::Text(_) => Err(Error::InvalidState("field is text, not a file upload")),
        }
    }

    /// Original file name sent by the client.
    pub fn file_name(&self) -> Result<&str> {
        match &self.kind {
            FieldKind::File(_) => Ok(&self.file_name),
            FieldKind::Unset => Err(Error::InvalidState("field kind was never set")),
            FieldKind::Text(_) => Err(Error::InvalidState("field is text, not a file upload")),
        }
    }

    /// MIME type sent by the client, or a guess from the file name when
    /// none was sent.
    pub fn content_type(&self) -> Result<String> {
        match &self.kind {
            FieldKind::File(_) => {
                if self.content_type.is_empty() {
                    Ok(mime_guess::from_path(&self.file_name)
                        .first_or_octet_stream()
                        .to_string())
                } else {
                    Ok(self.content_type.clone())
                }
            }
            FieldKind::Unset => Err(Error::InvalidState("field kind was never set")),
            FieldKind::Text(_) => Err(Error::InvalidState("field is text, not a file upload")),
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Field {
    fn drop(&mut self) {
        let kind = std::mem::replace(&mut self.kind, FieldKind::Unset);
        if let FieldKind::File(FileBacking::Disk { file, path }) = kind {
            drop(file);
            if let Err(e) = std::fs::remove_file(&path) {
                dev_print!("failed to remove upload temp file {:?}: {}", path, e);
            }
        }
    }
}

fn append(content: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    content
        .try_reserve(data.len())
        .map_err(|_| Error::Allocation(content.len() + data.len()))?;
    content.extend_from_slice(data);
    Ok(())
}

fn create_temp_file(dir: &Path) -> Result<(File, PathBuf)> {
    loop {
        let seq = TEMP_FILE_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("upload_{}_{}", std::process::id(), seq));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                dev_print!("created upload temp file: {:?}", path);
                return Ok((file, path));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

/// The multipart fields of one request, keyed by part name. Filled by the
/// boundary parser, handed to the request context.
#[derive(Default)]
pub struct FormData {
    fields: HashMap<String, Field>,
}

impl FormData {
    pub fn new() -> FormData {
        FormData {
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.fields.insert(name.into(), field);
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
