//! Placing attachments next to a file output.

use std::path::Path;

use kiln_input::{Attachment, WriteAttachments};
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::notice::Notice;

/// Applies the attachment policy for an output written into `output_dir`.
///
/// Returns a notice when attachments were skipped.
pub fn apply(
    attachments: &[Attachment],
    output_dir: &Path,
    mode: WriteAttachments,
) -> Result<Option<Notice>, BuildError> {
    if attachments.is_empty() {
        return Ok(None);
    }
    match mode {
        WriteAttachments::Never => Ok(None),
        WriteAttachments::WarnOnly => {
            warn!(
                count = attachments.len(),
                "input has attachments that were not written"
            );
            Ok(Some(Notice::AttachmentsSkipped {
                count: attachments.len(),
            }))
        }
        WriteAttachments::Always => {
            for attachment in attachments {
                let dest = output_dir.join(&attachment.dest);
                debug!(
                    source = %attachment.source.display(),
                    dest = %dest.display(),
                    "writing attachment"
                );
                copy_recursive(&attachment.source, &dest)?;
            }
            Ok(None)
        }
    }
}

/// Copies a file, or a directory tree, to `dest`, overwriting existing files.
fn copy_recursive(source: &Path, dest: &Path) -> Result<(), BuildError> {
    if source.is_dir() {
        std::fs::create_dir_all(dest).map_err(io_err(dest))?;
        for entry in std::fs::read_dir(source).map_err(io_err(source))? {
            let entry = entry.map_err(io_err(source))?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    std::fs::copy(source, dest).map_err(io_err(source))?;
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn attachment(dest: &str, source: &Path) -> Attachment {
        Attachment {
            dest: PathBuf::from(dest),
            source: source.to_path_buf(),
        }
    }

    #[test]
    fn empty_list_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        for mode in [
            WriteAttachments::Always,
            WriteAttachments::Never,
            WriteAttachments::WarnOnly,
        ] {
            assert_eq!(apply(&[], dir.path(), mode).unwrap(), None);
        }
    }

    #[test]
    fn always_copies_files_and_directories() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("logo.svg"), "<svg/>").unwrap();
        let fonts = src.path().join("fonts");
        std::fs::create_dir_all(fonts.join("woff")).unwrap();
        std::fs::write(fonts.join("a.ttf"), "A").unwrap();
        std::fs::write(fonts.join("woff").join("a.woff"), "W").unwrap();

        let out = tempfile::tempdir().unwrap();
        let list = [
            attachment("img/logo.svg", &src.path().join("logo.svg")),
            attachment("fonts", &fonts),
        ];
        assert_eq!(apply(&list, out.path(), WriteAttachments::Always).unwrap(), None);

        let read = |p: &str| std::fs::read_to_string(out.path().join(p)).unwrap();
        assert_eq!(read("img/logo.svg"), "<svg/>");
        assert_eq!(read("fonts/a.ttf"), "A");
        assert_eq!(read("fonts/woff/a.woff"), "W");
    }

    #[test]
    fn always_overwrites() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), "new").unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("a.txt"), "old").unwrap();

        let list = [attachment("a.txt", &src.path().join("a.txt"))];
        apply(&list, out.path(), WriteAttachments::Always).unwrap();
        assert_eq!(std::fs::read_to_string(out.path().join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn missing_source_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let list = [attachment("x", Path::new("/nonexistent/attachment"))];
        let err = apply(&list, out.path(), WriteAttachments::Always).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }

    #[test]
    fn never_writes_nothing() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), "a").unwrap();
        let out = tempfile::tempdir().unwrap();
        let list = [attachment("a.txt", &src.path().join("a.txt"))];
        assert_eq!(apply(&list, out.path(), WriteAttachments::Never).unwrap(), None);
        assert!(!out.path().join("a.txt").exists());
    }

    #[test]
    fn warn_only_reports_and_writes_nothing() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), "a").unwrap();
        let out = tempfile::tempdir().unwrap();
        let list = [attachment("a.txt", &src.path().join("a.txt"))];
        assert_eq!(
            apply(&list, out.path(), WriteAttachments::WarnOnly).unwrap(),
            Some(Notice::AttachmentsSkipped { count: 1 })
        );
        assert!(!out.path().join("a.txt").exists());
    }
}
