//! Ready-made filesystem actions built on [`ShellCommand`].

use crate::command::{ShellCommand, ShellError};
use arbor_core::Action;
use std::path::Path;

/// List the contents of a directory (long format).
pub fn list_dir(path: impl AsRef<Path>) -> Result<Action, ShellError> {
    let path = path.as_ref();
    let command = ShellCommand::new("ls")?
        .arg("-l")
        .arg(path.to_string_lossy().into_owned());
    Ok(Action::leaf(command).named(format!("list {}", path.display())))
}

/// Copy one file to a new location.
pub fn copy_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<Action, ShellError> {
    let from = from.as_ref();
    let to = to.as_ref();
    let command = ShellCommand::new("cp")?
        .arg(from.to_string_lossy().into_owned())
        .arg(to.to_string_lossy().into_owned());
    Ok(Action::leaf(command).named(format!("copy {} to {}", from.display(), to.display())))
}

/// Remove a file or directory tree. Succeeds when the path is already gone.
pub fn remove_path(path: impl AsRef<Path>) -> Result<Action, ShellError> {
    let path = path.as_ref();
    let command = ShellCommand::new("rm")?
        .arg("-rf")
        .arg(path.to_string_lossy().into_owned());
    Ok(Action::leaf(command).named(format!("remove {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{Context, Performer};

    #[tokio::test]
    async fn test_copy_file_creates_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        let dest = dir.path().join("dest.txt");
        std::fs::write(&source, b"payload").unwrap();

        let action = copy_file(&source, &dest).unwrap();
        Performer::new().perform(&action, &Context::root()).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let action = copy_file(dir.path().join("absent"), dir.path().join("dest")).unwrap();
        let err = Performer::new()
            .perform(&action, &Context::root())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cp"));
    }

    #[tokio::test]
    async fn test_remove_path_deletes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("file"), b"x").unwrap();

        let action = remove_path(dir.path().join("a")).unwrap();
        Performer::new().perform(&action, &Context::root()).await.unwrap();

        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_remove_missing_path_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let action = remove_path(dir.path().join("never-existed")).unwrap();
        Performer::new().perform(&action, &Context::root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_dir_succeeds_on_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("entry"), b"x").unwrap();
        let action = list_dir(dir.path()).unwrap();
        Performer::new().perform(&action, &Context::root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_missing_dir_fails() {
        let action = list_dir("/definitely/not/here").unwrap();
        let err = Performer::new()
            .perform(&action, &Context::root())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ls"));
    }

    #[test]
    fn test_ops_carry_display_names() {
        assert!(list_dir("/tmp").unwrap().label().starts_with("list "));
        assert!(copy_file("/a", "/b").unwrap().label().starts_with("copy "));
        assert!(remove_path("/a").unwrap().label().starts_with("remove "));
    }
}
