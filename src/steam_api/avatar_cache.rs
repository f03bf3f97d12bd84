//! On-disk avatar cache keyed by the account's avatar hash

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use image::RgbaImage;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::client::SteamApiClient;
use super::error::SteamApiError;
use super::pool::Pending;

/// Files untouched for longer than this are removed when the cache is opened
pub const AVATAR_CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Decoded avatar. Empty when nothing was cached and no download was possible.
#[derive(Debug, Clone, Default)]
pub struct AvatarBitmap {
    pub path: Option<PathBuf>,
    pub image: Option<RgbaImage>,
}

impl AvatarBitmap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }

    fn decode(path: &Path, bytes: &[u8]) -> Result<Self, SteamApiError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| SteamApiError::ImageDecode(format!("{}: {}", path.display(), e)))?
            .to_rgba8();

        Ok(Self {
            path: Some(path.to_path_buf()),
            image: Some(image),
        })
    }
}

pub struct AvatarCache {
    dir: PathBuf,
    /// Serializes the exists-then-read and write-then-read sequences
    lock: Mutex<()>,
}

impl AvatarCache {
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir()
            .join("TF2 Bot Detector")
            .join("Steam Avatar Cache")
    }

    pub fn new(dir: PathBuf) -> Result<Self, SteamApiError> {
        fs::create_dir_all(&dir)?;
        delete_old_files(&dir, AVATAR_CACHE_MAX_AGE);

        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name stem for a hash. Plain hex is used as-is, anything else is hashed.
    pub fn cache_key(hash: &str) -> String {
        if !hash.is_empty() && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return hash.to_ascii_lowercase();
        }

        hex::encode(Sha256::digest(hash.as_bytes()))
    }

    pub fn cached_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", Self::cache_key(hash)))
    }

    /// Cached file if present; otherwise download through `client` and store it.
    ///
    /// Without a client a cache miss yields an empty bitmap rather than an error.
    /// Concurrent misses for the same hash may download twice.
    pub fn get_avatar_bitmap(
        self: &Arc<Self>,
        client: Option<&SteamApiClient>,
        url: &str,
        hash: &str,
    ) -> Pending<AvatarBitmap> {
        let cached_path = self.cached_path(hash);

        {
            let _guard = self.lock.lock();
            if cached_path.exists() {
                let result = fs::read(&cached_path)
                    .map_err(SteamApiError::from)
                    .and_then(|bytes| AvatarBitmap::decode(&cached_path, &bytes));
                return Pending::ready(result);
            }
        }

        let Some(client) = client else {
            return Pending::ready(Ok(AvatarBitmap::empty()));
        };

        let cache = Arc::clone(self);
        client.get_with(url, move |bytes| cache.store(&cached_path, &bytes))
    }

    fn store(&self, path: &Path, bytes: &[u8]) -> Result<AvatarBitmap, SteamApiError> {
        {
            let _guard = self.lock.lock();
            // fs::write truncates any partial earlier write
            fs::write(path, bytes)?;
        }

        tracing::debug!("Cached avatar {}", path.display());
        AvatarBitmap::decode(path, bytes)
    }
}

fn delete_old_files(dir: &Path, max_age: Duration) {
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read avatar cache for cleanup: {}", e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        let Ok(metadata) = entry.metadata() else {
            continue;
        };

        if !metadata.is_file() {
            continue;
        }

        let Ok(modified) = metadata.modified() else {
            continue;
        };

        if modified < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove old avatar {:?}: {}", path, e);
            } else {
                tracing::debug!("Removed old avatar: {:?}", path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steam_api::http::HttpClient;
    use std::fs::File;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    const HASH: &str = "fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb";

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([200, 10, 10, 255]));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    struct CountingHttp {
        calls: Arc<AtomicUsize>,
        body: Vec<u8>,
    }

    impl HttpClient for CountingHttp {
        fn get_bytes(&self, _url: &Url) -> Result<Vec<u8>, SteamApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn client(calls: &Arc<AtomicUsize>) -> SteamApiClient {
        SteamApiClient::with_http(Arc::new(CountingHttp {
            calls: Arc::clone(calls),
            body: png_bytes(),
        }))
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(AvatarCache::cache_key("ABCdef01"), "abcdef01");

        let key = AvatarCache::cache_key("../../etc/passwd");
        assert_eq!(key.len(), 64);
        assert!(!key.contains('/'));
    }

    #[test]
    fn test_miss_downloads_once_then_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(AvatarCache::new(dir.path().to_path_buf()).unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let client = client(&calls);
        let url = "https://steamcdn-a.akamaihd.net/steamcommunity/public/images/avatars/fe/x.jpg";

        let first = cache.get_avatar_bitmap(Some(&client), url, HASH).wait().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.cached_path(HASH).exists());
        assert_eq!(first.image.as_ref().map(|i| i.dimensions()), Some((2, 2)));

        let second = cache.get_avatar_bitmap(Some(&client), url, HASH).wait().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!second.is_empty());
    }

    #[test]
    fn test_miss_without_client_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(AvatarCache::new(dir.path().to_path_buf()).unwrap());

        let bitmap = cache
            .get_avatar_bitmap(None, "https://example.invalid/a.jpg", HASH)
            .wait()
            .unwrap();
        assert!(bitmap.is_empty());
        assert!(!cache.cached_path(HASH).exists());
    }

    #[test]
    fn test_old_files_are_purged() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.jpg");
        let fresh = dir.path().join("fresh.jpg");
        fs::write(&old, b"old").unwrap();
        fs::write(&fresh, b"fresh").unwrap();

        let eight_days_ago = SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(eight_days_ago)
            .unwrap();

        let _cache = AvatarCache::new(dir.path().to_path_buf()).unwrap();
        assert!(!old.exists());
        assert!(fresh.exists());
    }
}
