//! Wallet data persistence
//!
//! The exported wallet is kept in a JSON file so the agent keeps its
//! address across restarts. The file holds the raw private key and is
//! written owner-only on unix.

use super::signer::{SecureWallet, WalletData};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Where the key came from on startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletSource {
    Environment,
    File,
    Generated,
}

#[derive(Debug, Clone)]
pub struct WalletStore {
    path: PathBuf,
}

impl WalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` only when no file exists; a file that cannot be parsed is an error
    pub fn load(&self) -> Result<Option<WalletData>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Wallet(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            Error::Wallet(format!(
                "Wallet data at {} is unreadable ({}); fix or remove it to continue",
                self.path.display(),
                e
            ))
        })
    }

    /// Atomically replace the data file
    pub fn save(&self, data: &WalletData) -> Result<()> {
        let file = self.stage(data)?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Write the data file only if none exists yet; `false` when another
    /// process got there first
    pub fn save_new(&self, data: &WalletData) -> Result<bool> {
        let file = self.stage(data)?;
        match file.persist_noclobber(&self.path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::Io(e.error)),
        }
    }

    // Temp file in the target directory so the final rename stays on one filesystem
    fn stage(&self, data: &WalletData) -> Result<NamedTempFile> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        serde_json::to_writer_pretty(file.as_file_mut(), data)?;
        file.as_file_mut().sync_all()?;
        Ok(file)
    }

    /// Resolve the agent wallet: `PRIVATE_KEY`, then the data file, then a new key.
    /// The result is always written back to the data file.
    pub fn load_or_create(&self, network_id: &str) -> Result<(SecureWallet, WalletSource)> {
        self.load_or_create_with(std::env::var(PRIVATE_KEY_ENV).ok(), network_id)
    }

    pub fn load_or_create_with(
        &self,
        env_key: Option<String>,
        network_id: &str,
    ) -> Result<(SecureWallet, WalletSource)> {
        let (wallet, source) = match env_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => (SecureWallet::from_hex(&key)?, WalletSource::Environment),
            None => match self.load()? {
                Some(data) => (data.to_wallet()?, WalletSource::File),
                None => {
                    let wallet = SecureWallet::random();
                    if self.save_new(&wallet.export(network_id))? {
                        info!(address = %wallet.address(), "Generated new wallet");
                        return Ok((wallet, WalletSource::Generated));
                    }
                    // Lost the race with a sibling agent; use its wallet
                    let data = self.load()?.ok_or_else(|| {
                        Error::Wallet(format!("{} vanished while creating it", self.path.display()))
                    })?;
                    (data.to_wallet()?, WalletSource::File)
                }
            },
        };

        self.save(&wallet.export(network_id))?;
        info!(address = %wallet.address(), source = ?source, "Wallet ready");
        Ok((wallet, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn generates_then_reloads_same_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path().join("wallet_data.json"));

        let (first, source) = store.load_or_create_with(None, "base-sepolia").unwrap();
        assert_eq!(source, WalletSource::Generated);

        let (second, source) = store.load_or_create_with(None, "base-sepolia").unwrap();
        assert_eq!(source, WalletSource::File);
        assert_eq!(first.address(), second.address());
    }

    #[test]
    fn env_key_wins_and_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path().join("wallet_data.json"));
        store
            .save(&SecureWallet::random().export("base-sepolia"))
            .unwrap();

        let (wallet, source) = store
            .load_or_create_with(Some(TEST_KEY.to_string()), "optimism-sepolia")
            .unwrap();
        assert_eq!(source, WalletSource::Environment);

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.address, wallet.address_string());
        assert_eq!(saved.network_id, "optimism-sepolia");
    }

    #[test]
    fn corrupt_file_is_an_error_and_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet_data.json");
        let truncated = format!("{{\"address\": \"0xf39F\", \"private_key\": \"{}", TEST_KEY);
        std::fs::write(&path, &truncated).unwrap();

        let err = WalletStore::new(&path)
            .load_or_create_with(None, "base-sepolia")
            .unwrap_err();
        assert!(err.to_string().contains("unreadable"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), truncated);
    }

    #[test]
    fn existing_file_wins_over_a_new_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path().join("wallet_data.json"));
        let first = SecureWallet::from_hex(TEST_KEY).unwrap();

        assert!(store.save_new(&first.export("base-sepolia")).unwrap());
        assert!(!store
            .save_new(&SecureWallet::random().export("optimism-sepolia"))
            .unwrap());
        assert_eq!(store.load().unwrap().unwrap().address, first.address_string());
    }

    #[test]
    fn concurrent_first_runs_agree_on_one_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet_data.json");
        let barrier = std::sync::Barrier::new(4);

        let addresses: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["base-sepolia", "optimism-sepolia"]
                .into_iter()
                .cycle()
                .take(4)
                .map(|network| {
                    let (path, barrier) = (&path, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        let (wallet, _) = WalletStore::new(path)
                            .load_or_create_with(None, network)
                            .unwrap();
                        wallet.address()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path().join("wallet_data.json"));
        store.load_or_create_with(None, "base-sepolia").unwrap();
        store.load_or_create_with(None, "optimism-sepolia").unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn data_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet_data.json");
        WalletStore::new(&path)
            .save(&SecureWallet::random().export("base-sepolia"))
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
