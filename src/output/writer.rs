use crate::config::{CollectorConfig, ALWAYS_EXCLUDED_EXTENSIONS};
use crate::error::{CollectError, Result};
use crate::resolver::encoding::normalize_newlines;
use crate::types::{AcceptedFile, FolderOutcome, MainFileOutcome};
use chrono::{DateTime, Local};
use log::warn;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Values shown above the file blocks of a dump.
#[derive(Debug, Clone)]
pub struct DumpHeader {
    pub mode: &'static str,
    pub root: PathBuf,
    pub main_file: Option<PathBuf>,
    pub generated: DateTime<Local>,
    /// Only folder mode prunes directories
    pub excluded_dirs: Option<Vec<String>>,
    pub max_file_bytes: Option<u64>,
}

impl DumpHeader {
    pub fn for_main_file(outcome: &MainFileOutcome, config: &CollectorConfig) -> Self {
        Self {
            mode: "Main-File Mode",
            root: outcome.base.clone(),
            main_file: Some(outcome.main_file.clone()),
            generated: Local::now(),
            excluded_dirs: None,
            max_file_bytes: config.max_file_bytes,
        }
    }

    pub fn for_folder(outcome: &FolderOutcome, config: &CollectorConfig) -> Self {
        Self {
            mode: "Folder Mode",
            root: outcome.root.clone(),
            main_file: None,
            generated: Local::now(),
            excluded_dirs: Some(config.excluded_dirs()),
            max_file_bytes: config.max_file_bytes,
        }
    }

    pub fn generated_at(mut self, generated: DateTime<Local>) -> Self {
        self.generated = generated;
        self
    }
}

/// Writes the combined text dump: header, one block per file, manifest.
pub struct DumpWriter<W: Write> {
    out: W,
    written: Vec<PathBuf>,
}

impl DumpWriter<BufWriter<fs::File>> {
    /// Create (or truncate) `path`, creating missing parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        let output_error = |source| CollectError::Output {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(output_error)?;
        }
        let file = fs::File::create(path).map_err(output_error)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> DumpWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            written: Vec::new(),
        }
    }

    pub fn write_header(&mut self, header: &DumpHeader) -> io::Result<()> {
        writeln!(self.out, "=== COMBINED TEXT DUMP ({}) ===", header.mode)?;
        writeln!(self.out, "Root: {}", header.root.display())?;
        if let Some(main_file) = &header.main_file {
            writeln!(self.out, "Main file: {}", main_file.display())?;
        }
        writeln!(self.out, "Generated: {}", header.generated.format("%Y-%m-%dT%H:%M:%S"))?;
        if let Some(dirs) = &header.excluded_dirs {
            let dirs = if dirs.is_empty() { "None".to_string() } else { dirs.join(", ") };
            writeln!(self.out, "Excluded dirs: {dirs}")?;
        }

        let mut extensions = ALWAYS_EXCLUDED_EXTENSIONS.to_vec();
        extensions.sort_unstable();
        writeln!(self.out, "Always-excluded extensions: {}", extensions.join(", "))?;
        match header.max_file_bytes {
            Some(max) => writeln!(self.out, "Max bytes per file: {max}")?,
            None => writeln!(self.out, "Max bytes per file: None")?,
        }
        writeln!(self.out)
    }

    /// Read `file` again and append its block. A file that vanished or
    /// became unreadable since classification is skipped with a warning.
    pub fn write_file(&mut self, file: &AcceptedFile) -> io::Result<()> {
        let data = match fs::read(&file.path) {
            Ok(data) => data,
            Err(err) => {
                warn!("skipping {}: {err}", file.path.display());
                return Ok(());
            }
        };
        let text = file.encoding.decode(&data);
        self.write_block(file, &normalize_newlines(&text))
    }

    pub fn write_block(&mut self, file: &AcceptedFile, text: &str) -> io::Result<()> {
        writeln!(self.out, "===== FILE START =====")?;
        writeln!(self.out, "Path: {}", file.relative.display())?;
        writeln!(self.out, "Absolute: {}", file.path.display())?;
        writeln!(self.out, "Size: {} bytes", file.size)?;
        writeln!(self.out, "Encoding: {}", file.encoding)?;
        writeln!(self.out, "----- BEGIN CONTENT -----")?;
        self.out.write_all(text.as_bytes())?;
        if !text.is_empty() && !text.ends_with('\n') {
            writeln!(self.out)?;
        }
        writeln!(self.out, "----- END CONTENT -----")?;
        writeln!(self.out, "===== FILE END =====")?;
        writeln!(self.out)?;

        self.written.push(file.relative.clone());
        Ok(())
    }

    /// Write the manifest of every block written so far and flush.
    pub fn finish(mut self) -> io::Result<W> {
        writeln!(self.out, "=== MANIFEST (in order) ===")?;
        for path in &self.written {
            writeln!(self.out, "{}", path.display())?;
        }
        self.out.flush()?;
        Ok(self.out)
    }

    pub fn written(&self) -> usize {
        self.written.len()
    }

    fn write_empty(mut self, header: &DumpHeader) -> io::Result<W> {
        writeln!(self.out, "=== COMBINED TEXT DUMP ({}) ===", header.mode)?;
        writeln!(self.out, "Root: {}", header.root.display())?;
        if let Some(main_file) = &header.main_file {
            writeln!(self.out, "Main file: {}", main_file.display())?;
        }
        writeln!(self.out, "No files included.")?;
        self.out.flush()?;
        Ok(self.out)
    }

    /// Write a whole main-file dump. Returns the number of file blocks.
    pub fn write_main_dump(self, outcome: &MainFileOutcome, header: &DumpHeader) -> io::Result<usize> {
        if outcome.accepted.is_empty() {
            self.write_empty(header)?;
            return Ok(0);
        }
        self.write_all_files(&outcome.accepted, header)
    }

    /// Write a whole folder dump. Returns the number of file blocks.
    pub fn write_folder_dump(self, outcome: &FolderOutcome, header: &DumpHeader) -> io::Result<usize> {
        self.write_all_files(&outcome.accepted, header)
    }

    fn write_all_files(mut self, files: &[AcceptedFile], header: &DumpHeader) -> io::Result<usize> {
        self.write_header(header)?;
        for file in files {
            self.write_file(file)?;
        }
        let count = self.written();
        self.finish()?;
        Ok(count)
    }
}
