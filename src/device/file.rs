use ::std::fs::File;
use ::std::io;
use ::std::io::Read;
use ::std::io::Seek;
use ::std::io::SeekFrom;
use ::std::io::Write;
use ::std::path::Path;
use ::std::path::PathBuf;

use super::Device;

/// A real file opened on the local filesystem, the usual underlying device
/// for a base file. REFERENCE: [3.4 Base-file sentinel], [6. EXTERNAL
/// INTERFACES].
#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    file: File,
}

impl FileDevice {
    pub fn open_read(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn create_write(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Device for FileDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn seek(&mut self, offset: u64) -> io::Result<u64> {
        self.file.seek(SeekFrom::Start(offset))
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn bytes_available(&mut self) -> io::Result<u64> {
        let current = self.file.stream_position()?;
        let end = self.file.seek(SeekFrom::End(0))?;
        self.file.seek(SeekFrom::Start(current))?;
        Ok(end.saturating_sub(current))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
