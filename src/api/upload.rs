use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;

use super::RequestError;

/// The server refuses anything larger.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select a file first: {0} does not exist")]
    Missing(PathBuf),

    #[error("File size must not exceed 20MB ({size} bytes)")]
    TooLarge { size: u64 },

    #[error("Only .xlsx files are allowed")]
    WrongExtension,

    #[error("Failed to read file: {0}")]
    Io(std::io::Error),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// A grade spreadsheet that passed the client-side checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl GradeFile {
    pub fn validate(path: &Path) -> Result<Self, UploadError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => UploadError::Missing(path.to_path_buf()),
            _ => UploadError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(UploadError::Missing(path.to_path_buf()));
        }

        let size = metadata.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge { size });
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| n.ends_with(".xlsx"))
            .ok_or(UploadError::WrongExtension)?
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    fn accepts_small_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diem.xlsx");
        fs::write(&path, b"PK\x03\x04").unwrap();

        let file = GradeFile::validate(&path).unwrap();
        assert_eq!(file.name, "diem.xlsx");
        assert_eq!(file.size, 4);
    }

    #[test]
    fn rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["diem.xls", "diem.csv", "diem.XLSX"] {
            let path = dir.path().join(name);
            fs::write(&path, b"x").unwrap();
            assert!(matches!(
                GradeFile::validate(&path),
                Err(UploadError::WrongExtension)
            ));
        }
    }

    #[test]
    fn rejects_files_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.xlsx");
        File::create(&path)
            .unwrap()
            .set_len(MAX_UPLOAD_BYTES + 1)
            .unwrap();

        assert!(matches!(
            GradeFile::validate(&path),
            Err(UploadError::TooLarge { size }) if size == MAX_UPLOAD_BYTES + 1
        ));
    }

    #[test]
    fn limit_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.xlsx");
        File::create(&path).unwrap().set_len(MAX_UPLOAD_BYTES).unwrap();

        assert!(GradeFile::validate(&path).is_ok());
    }

    #[test]
    fn missing_file_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GradeFile::validate(&dir.path().join("nope.xlsx")),
            Err(UploadError::Missing(_))
        ));
        assert!(matches!(
            GradeFile::validate(dir.path()),
            Err(UploadError::Missing(_))
        ));
    }
}
