//! End-to-end workspace scenarios over a real `NativeStorage` directory,
//! the way `mrcord77-rust_citadel`'s `tests/roundtrip.rs` exercises its
//! envelope crate from outside rather than from a `#[cfg(test)]` module.

use std::sync::Arc;

use witflo_storage::{NativeStorage, StorageBackend};
use witflo_workspace::workspace::{KEYRING_FILE, WORKSPACE_FILE};
use witflo_workspace::{AutoLockDuration, LockCause, Workspace, WorkspaceError, WorkspaceState};
use witflo_primitives::kdf::SecurePassword;

fn native(dir: &std::path::Path) -> Arc<dyn StorageBackend> {
    Arc::new(NativeStorage::new(dir))
}

#[tokio::test]
async fn s1_initialize_then_unlock() {
    let dir = tempfile::tempdir().unwrap();
    let storage = native(dir.path());

    let session = Workspace::init(storage.clone(), SecurePassword::new("correct horse battery staple".into()))
        .await
        .unwrap();
    assert_eq!(session.state(), WorkspaceState::Unlocked);
    assert!(storage.exists(WORKSPACE_FILE).await.unwrap());
    assert!(storage.exists(KEYRING_FILE).await.unwrap());
    drop(session);

    let mut opened = Workspace::open(storage).await.unwrap();
    assert_eq!(opened.state(), WorkspaceState::Locked);
    opened.unlock(SecurePassword::new("correct horse battery staple".into())).await.unwrap();
    assert_eq!(opened.state(), WorkspaceState::Unlocked);
    assert!(opened.list_vaults().is_empty());
}

#[tokio::test]
async fn s2_wrong_password_does_not_modify_any_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage = native(dir.path());
    Workspace::init(storage.clone(), SecurePassword::new("correct horse battery staple".into())).await.unwrap();

    let metadata_before = storage.read(WORKSPACE_FILE).await.unwrap();
    let keyring_before = storage.read(KEYRING_FILE).await.unwrap();

    let mut opened = Workspace::open(storage.clone()).await.unwrap();
    let err = opened.unlock(SecurePassword::new("wrong".into())).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::InvalidMasterPassword));

    assert_eq!(storage.read(WORKSPACE_FILE).await.unwrap(), metadata_before);
    assert_eq!(storage.read(KEYRING_FILE).await.unwrap(), keyring_before);
}

#[tokio::test]
async fn s5_idle_auto_lock_disposes_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let storage = native(dir.path());
    let mut workspace =
        Workspace::init(storage.clone(), SecurePassword::new("correct horse battery staple".into())).await.unwrap();

    let vault_dir = dir.path().join("vaults").join("personal");
    std::fs::create_dir_all(&vault_dir).unwrap();
    let vault_id =
        workspace.add_vault(native(&vault_dir), "Personal".into(), "vaults/personal".into()).await.unwrap();

    workspace.set_auto_lock_duration(AutoLockDuration::FiveMinutes);
    assert_eq!(workspace.poll_auto_lock(), None);

    workspace.backdate_activity_for_test(std::time::Duration::from_secs(301));
    assert_eq!(workspace.poll_auto_lock(), Some(LockCause::IdleExpiry));

    assert_eq!(workspace.state(), WorkspaceState::Locked);
    assert!(workspace.vault_key(&vault_id).is_err());
}

#[tokio::test]
async fn s4_password_rotation_preserves_vault_directory_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let storage = native(dir.path());
    let mut workspace =
        Workspace::init(storage.clone(), SecurePassword::new("correct horse battery staple".into())).await.unwrap();

    let vault_dir = dir.path().join("vaults").join("personal");
    std::fs::create_dir_all(&vault_dir).unwrap();
    let vault_storage = native(&vault_dir);
    let vault_id =
        workspace.add_vault(vault_storage.clone(), "Personal".into(), "vaults/personal".into()).await.unwrap();
    let key_before = workspace.vault_key(&vault_id).unwrap().expose_secret().unwrap().to_vec();

    let header_before = vault_storage.read("vault.header").await.unwrap();
    let vk_before = vault_storage.read("vault.vk").await.unwrap();

    let workspace = workspace
        .change_master_password(
            SecurePassword::new("correct horse battery staple".into()),
            SecurePassword::new("rosebud".into()),
        )
        .await
        .unwrap();
    drop(workspace);

    let mut reopened = Workspace::open(storage.clone()).await.unwrap();
    assert!(reopened.unlock(SecurePassword::new("correct horse battery staple".into())).await.is_err());
    reopened.unlock(SecurePassword::new("rosebud".into())).await.unwrap();
    assert_eq!(reopened.vault_key(&vault_id).unwrap().expose_secret().unwrap().to_vec(), key_before);

    assert_eq!(vault_storage.read("vault.header").await.unwrap(), header_before);
    assert_eq!(vault_storage.read("vault.vk").await.unwrap(), vk_before);
}
