//! Ingress validation: MIME allow-list and size cap.
//!
//! Runs before anything touches the bytes. A rejected upload has no side
//! effects at all.

use crate::error::VaultError;
use tracing::debug;

pub const IMAGE_JPEG: &str = "image/jpeg";
pub const IMAGE_PNG: &str = "image/png";
pub const APPLICATION_PDF: &str = "application/pdf";

/// Content types accepted by the vault.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = [IMAGE_JPEG, IMAGE_PNG, APPLICATION_PDF];

/// What the rest of the pipeline needs to know about an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Jpeg,
    Png,
    Pdf,
}

impl FileKind {
    pub fn is_image(&self) -> bool {
        matches!(self, FileKind::Jpeg | FileKind::Png)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Jpeg => IMAGE_JPEG,
            FileKind::Png => IMAGE_PNG,
            FileKind::Pdf => APPLICATION_PDF,
        }
    }
}

/// Lower-case a declared content type and drop any parameters
/// (`image/JPEG; charset=binary` → `image/jpeg`). `image/jpg` is folded into
/// `image/jpeg`.
pub fn normalize_content_type(declared: &str) -> String {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence == "image/jpg" || essence == "image/pjpeg" {
        IMAGE_JPEG.to_string()
    } else {
        essence
    }
}

/// Content type for a part that did not declare one, guessed from its file name.
pub fn guess_content_type(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Accept an upload only if its type is allow-listed and it fits under `max_bytes`.
pub fn validate_upload(
    declared_content_type: &str,
    size: u64,
    max_bytes: u64,
) -> Result<FileKind, VaultError> {
    let content_type = normalize_content_type(declared_content_type);
    let kind = match content_type.as_str() {
        IMAGE_JPEG => FileKind::Jpeg,
        IMAGE_PNG => FileKind::Png,
        APPLICATION_PDF => FileKind::Pdf,
        _ => {
            return Err(VaultError::InvalidFileType {
                content_type: declared_content_type.to_string(),
            })
        }
    };

    if size > max_bytes {
        return Err(VaultError::FileTooLarge {
            size,
            limit: max_bytes,
        });
    }

    debug!("Accepted {} upload of {} bytes", content_type, size);
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn accepts_allow_listed_types() {
        assert_eq!(validate_upload("image/jpeg", 1, 10 * MIB).unwrap(), FileKind::Jpeg);
        assert_eq!(validate_upload("image/png", 1, 10 * MIB).unwrap(), FileKind::Png);
        assert_eq!(
            validate_upload("application/pdf", 1, 10 * MIB).unwrap(),
            FileKind::Pdf
        );
    }

    #[test]
    fn rejects_other_types() {
        for ct in ["image/gif", "text/plain", "application/octet-stream", ""] {
            let err = validate_upload(ct, 1, 10 * MIB).unwrap_err();
            assert!(matches!(err, VaultError::InvalidFileType { .. }), "{ct}: {err}");
        }
    }

    #[test]
    fn size_cap_is_inclusive() {
        assert!(validate_upload("image/png", 10 * MIB, 10 * MIB).is_ok());
        let err = validate_upload("image/png", 10 * MIB + 1, 10 * MIB).unwrap_err();
        assert!(matches!(err, VaultError::FileTooLarge { .. }));
    }

    #[test]
    fn type_check_wins_over_size_check() {
        let err = validate_upload("image/gif", 20 * MIB, 10 * MIB).unwrap_err();
        assert!(matches!(err, VaultError::InvalidFileType { .. }));
    }

    #[test]
    fn content_type_normalisation() {
        assert_eq!(normalize_content_type("IMAGE/JPG"), "image/jpeg");
        assert_eq!(
            normalize_content_type("application/pdf; name=x.pdf"),
            "application/pdf"
        );
    }

    #[test]
    fn guesses_from_file_name() {
        assert_eq!(guess_content_type(Some("scan.PNG")), "image/png");
        assert_eq!(guess_content_type(Some("policy.pdf")), "application/pdf");
        assert_eq!(guess_content_type(None), "application/octet-stream");
    }
}
