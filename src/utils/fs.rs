//! File writing and copying under the run's overwrite policy.
//!
//! Every function here refuses to replace a directory with a file and asks
//! the [`Session`] before replacing an existing file. A declined overwrite is
//! not an error: the file is skipped and the call reports `false`.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{
    debug,
    error::{Error, Result},
    log,
    session::Session,
};

/// Check whether `dst` may be written, creating its parent directory if needed.
fn claim(dst: &Path, session: &Session) -> Result<bool> {
    if dst.is_dir() {
        return Err(Error::DestinationIsDirectory(dst.to_path_buf()));
    }
    if dst.exists() {
        return session.may_overwrite(dst);
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    Ok(true)
}

/// Write `contents` to `path`.
///
/// Returns `false` when an existing file was kept.
pub fn write_file(path: &Path, contents: &[u8], session: &Session) -> Result<bool> {
    debug!(session.verbose(), "write"; "{}", path.display());

    if !claim(path, session)? {
        debug!(session.verbose(), "skip"; "{}", path.display());
        return Ok(false);
    }

    let existed = path.exists();
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(existed)
        .create_new(!existed)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(contents).map_err(|e| Error::io(path, e))?;
    Ok(true)
}

/// Copy `src` to `dst`.
///
/// Returns `false` when an existing file was kept.
pub fn copy_file(src: &Path, dst: &Path, session: &Session) -> Result<bool> {
    if !claim(dst, session)? {
        debug!(session.verbose(), "skip"; "{}", dst.display());
        return Ok(false);
    }

    log!("write"; "{}", dst.display());
    fs::copy(src, dst).map_err(|e| Error::io(src, e))?;
    Ok(true)
}

/// Recursively copy everything under `src` into `dst`.
///
/// Subtrees whose absolute path equals an entry of `exclude` are skipped,
/// including `src` itself.
pub fn copy_tree(src: &Path, dst: &Path, exclude: &[PathBuf], session: &Session) -> Result<()> {
    let src = std::path::absolute(src).map_err(|e| Error::io(src, e))?;
    let dst = std::path::absolute(dst).map_err(|e| Error::io(dst, e))?;
    let exclude = exclude
        .iter()
        .map(|p| std::path::absolute(p).map_err(|e| Error::io(p, e)))
        .collect::<Result<Vec<_>>>()?;

    if exclude.contains(&src) {
        return Ok(());
    }
    fs::create_dir_all(&dst).map_err(|e| Error::io(&dst, e))?;

    let walker = WalkDir::new(&src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !exclude.iter().any(|x| x == e.path()));

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(&src).to_path_buf();
            Error::io(path, err.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(&src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else {
            copy_file(entry.path(), &target, session)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{OverwriteChoice, ScriptedPrompt};
    use tempfile::TempDir;

    fn quiet_session(answers: impl IntoIterator<Item = OverwriteChoice>) -> Session {
        Session::with_prompt(false, ScriptedPrompt::new(answers))
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("post/deep/a.html");
        let session = quiet_session([]);

        assert!(write_file(&path, b"<p>hi</p>", &session).unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"<p>hi</p>");
        assert_eq!(session.prompts_shown(), 0);
    }

    #[test]
    fn test_write_file_declined_keeps_old_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.html");
        fs::write(&path, "old").unwrap();
        let session = quiet_session([OverwriteChoice::No]);

        assert!(!write_file(&path, b"new", &session).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_write_file_accepted_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.html");
        fs::write(&path, "a much longer old content").unwrap();
        let session = quiet_session([OverwriteChoice::Yes]);

        assert!(write_file(&path, b"new", &session).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_file_onto_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tag");
        fs::create_dir(&path).unwrap();
        let session = quiet_session([OverwriteChoice::Yes]);

        let err = write_file(&path, b"x", &session).unwrap_err();
        assert!(matches!(err, Error::DestinationIsDirectory(p) if p == path));
    }

    #[test]
    fn test_copy_file_quit_aborts() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();
        let session = quiet_session([OverwriteChoice::Quit]);

        let err = copy_file(&src, &dst, &session).unwrap_err();
        assert!(matches!(err, Error::QuitRequested));
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    }

    #[test]
    fn test_copy_tree_with_exclusions() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("css")).unwrap();
        fs::create_dir_all(src.path().join("templates/partials")).unwrap();
        fs::write(src.path().join("css/site.css"), "body{}").unwrap();
        fs::write(src.path().join("robots.txt"), "ok").unwrap();
        fs::write(src.path().join("templates/post.html"), "tpl").unwrap();
        fs::write(src.path().join("templates/partials/a.html"), "tpl").unwrap();

        let session = quiet_session([]);
        let exclude = vec![src.path().join("templates")];
        copy_tree(src.path(), dst.path(), &exclude, &session).unwrap();

        assert_eq!(fs::read_to_string(dst.path().join("css/site.css")).unwrap(), "body{}");
        assert_eq!(fs::read_to_string(dst.path().join("robots.txt")).unwrap(), "ok");
        assert!(!dst.path().join("templates").exists());
    }

    #[test]
    fn test_copy_tree_excluded_root_copies_nothing() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();

        let session = quiet_session([]);
        copy_tree(src.path(), &dst.path().join("out"), &[src.path().to_path_buf()], &session)
            .unwrap();
        assert!(!dst.path().join("out").exists());
    }

    #[test]
    fn test_copy_tree_all_answer_covers_remaining_files() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(src.path().join(name), "new").unwrap();
            fs::write(dst.path().join(name), "old").unwrap();
        }

        let session = quiet_session([OverwriteChoice::No, OverwriteChoice::All]);
        copy_tree(src.path(), dst.path(), &[], &session).unwrap();

        // sorted walk: a is declined, b answers "all", c follows the flag
        assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(dst.path().join("b.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.path().join("c.txt")).unwrap(), "new");
        assert_eq!(session.prompts_shown(), 2);
    }
}
