use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShrinkError>;

#[derive(Debug, Error)]
pub enum ShrinkError {
    #[error("archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    #[error("archive is unreadable: {}", path.display())]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract {}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to stage {}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive {}", path.display())]
    Packing {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ShrinkError {
    pub(crate) fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn packing(
        path: impl Into<PathBuf>,
        source: impl Into<zip::result::ZipError>,
    ) -> Self {
        Self::Packing {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn extraction(
        path: impl Into<PathBuf>,
        source: impl Into<zip::result::ZipError>,
    ) -> Self {
        Self::Extraction {
            path: path.into(),
            source: source.into(),
        }
    }
}
