//! A filesystem-backed [`PollDataStore`], one JSON file per account. Grounded in the teacher's
//! own file-based poll data persistence, generalized from a hardcoded `assets/` path under the
//! crate root to a directory the caller supplies.

use std::path::PathBuf;
use async_trait::async_trait;
use futures_lite::io::AsyncWriteExt;
use crate::error::{FileError, Result};
use super::{PollData, PollDataStore};

/// Persists [`PollData`] as one `poll_data_<username>.json` file per account under a configured
/// directory. The directory is not created automatically — callers are expected to have it
/// exist before polling starts.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn filepath(&self, username: &str) -> PathBuf {
        self.dir.join(format!("poll_data_{username}.json"))
    }
}

#[async_trait]
impl PollDataStore for FileStore {
    async fn load(&self, username: &str) -> Result<Option<PollData>> {
        let filepath = self.filepath(username);

        if !filepath.exists() {
            return Ok(None);
        }

        let data = async_fs::read_to_string(&filepath).await.map_err(FileError::from)?;
        let poll_data: PollData = serde_json::from_str(&data).map_err(FileError::from)?;

        Ok(Some(poll_data))
    }

    async fn save(&self, username: &str, data: &PollData) -> Result<()> {
        let filepath = self.filepath(username);
        let json = serde_json::to_string(data).map_err(FileError::from)?;
        let mut file = async_fs::File::create(&filepath).await.map_err(FileError::from)?;

        if let Err(error) = file.write_all(json.as_bytes()).await {
            // Don't leave a truncated file behind for the next load to choke on.
            let _ = async_fs::remove_file(&filepath).await;

            return Err(FileError::from(error).into());
        }

        file.flush().await.map_err(FileError::from)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll_data::Side;

    #[tokio::test]
    async fn round_trips_through_a_file() {
        let dir = std::env::temp_dir();
        let store = FileStore::new(&dir);
        let username = format!("test-{}", std::process::id());
        let mut data = PollData::new();

        data.record(Side::Sent, 1, crate::enums::TradeOfferState::Active, 1000);
        data.set_offers_since(1000);

        store.save(&username, &data).await.unwrap();

        let loaded = store.load(&username).await.unwrap().unwrap();

        assert_eq!(loaded.sent.get(&1), Some(&crate::enums::TradeOfferState::Active));
        assert_eq!(loaded.offers_since, 1000);

        let _ = std::fs::remove_file(dir.join(format!("poll_data_{username}.json")));
    }

    #[tokio::test]
    async fn load_returns_none_when_file_is_absent() {
        let store = FileStore::new(std::env::temp_dir());

        assert!(store.load("no-such-account").await.unwrap().is_none());
    }
}
