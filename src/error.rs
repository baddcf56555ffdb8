//! Crate-level error type

use crate::cms::CmsError;
use crate::content::PaginationError;
use crate::helpers::FormatError;
use crate::preview::PreviewError;

/// Any failure of the rendering pipeline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] CmsError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Auth(#[from] PreviewError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl Error {
    /// Whether the failure means the requested content does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Fetch(CmsError::NotFound { .. })
                | Error::Pagination(PaginationError::Fetch(CmsError::NotFound { .. }))
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err: Error = CmsError::NotFound {
            kind: "posts".to_string(),
            uid: "nope".to_string(),
        }
        .into();
        assert!(err.is_not_found());

        let err: Error = FormatError::InvalidTimestamp {
            input: "x".to_string(),
        }
        .into();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "invalid timestamp: \"x\"");
    }
}
