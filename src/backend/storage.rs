//! Public object storage on the local filesystem, one directory per bucket.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{PlatformError, PlatformResult};

pub const MAX_OBJECT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Receipts,
    Avatars,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipts => "receipts",
            Self::Avatars => "avatars",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receipts" => Ok(Self::Receipts),
            "avatars" => Ok(Self::Avatars),
            other => Err(PlatformError::NotFound(format!("bucket '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    public_base_url: String,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, bucket: Bucket, name: &str) -> String {
        format!("{}/api/storage/public/{}/{}", self.public_base_url, bucket, name)
    }

    /// Stores a new object. Names are write-once.
    pub async fn put(&self, bucket: Bucket, name: &str, data: &[u8]) -> PlatformResult<String> {
        let name = sanitize_name(name)?;
        if data.is_empty() {
            return Err(PlatformError::Validation("object is empty".into()));
        }
        if data.len() > MAX_OBJECT_BYTES {
            return Err(PlatformError::Validation(format!(
                "object exceeds {} bytes",
                MAX_OBJECT_BYTES
            )));
        }

        let dir = self.root.join(bucket.as_str());
        fs::create_dir_all(&dir).await?;

        // Written under a hidden staging name first, then linked into place,
        // so a visible object is always complete.
        let path = dir.join(&name);
        let staging = dir.join(format!(".{name}.{}.part", uuid::Uuid::new_v4()));

        let linked = match write_staged(&staging, data).await {
            Ok(()) => fs::hard_link(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(rm) = fs::remove_file(&staging).await {
            if rm.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %staging.display(), error = %rm, "could not remove staged object");
            }
        }
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(PlatformError::Conflict(format!("{bucket}/{name} already exists")));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(%bucket, %name, bytes = data.len(), "object stored");
        Ok(name)
    }

    pub async fn get(&self, bucket: Bucket, name: &str) -> PlatformResult<Vec<u8>> {
        let name = sanitize_name(name)?;
        let path = self.root.join(bucket.as_str()).join(&name);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PlatformError::NotFound(format!("{bucket}/{name}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_staged(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

/// Object names are flat: a single path component of safe characters.
pub fn sanitize_name(name: &str) -> PlatformResult<String> {
    let name = name.trim();
    let ok = !name.is_empty()
        && name.len() <= 200
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(name.to_string())
    } else {
        Err(PlatformError::Validation(format!("invalid object name: {name}")))
    }
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_cannot_escape_the_bucket() {
        assert!(sanitize_name("u1_1700000000000.jpg").is_ok());
        assert!(sanitize_name("../etc/passwd").is_err());
        assert!(sanitize_name("a/b.jpg").is_err());
        assert!(sanitize_name(".hidden").is_err());
        assert!(sanitize_name("").is_err());
    }

    #[test]
    fn unknown_bucket_is_not_found() {
        assert_eq!("avatars".parse::<Bucket>().unwrap(), Bucket::Avatars);
        assert!(matches!(
            "secrets".parse::<Bucket>(),
            Err(PlatformError::NotFound(_))
        ));
    }

    #[test]
    fn public_url_layout() {
        let s = Storage::new("/tmp/x", "http://localhost:3000/");
        assert_eq!(
            s.public_url(Bucket::Receipts, "r.jpg"),
            "http://localhost:3000/api/storage/public/receipts/r.jpg"
        );
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a"), "application/octet-stream");
    }

    #[tokio::test]
    async fn only_complete_objects_become_visible() {
        let dir = tempfile::tempdir().unwrap();
        let s = Storage::new(dir.path(), "http://localhost");
        let bucket_dir = dir.path().join("receipts");

        // leftovers of an interrupted upload neither show up nor block the name
        std::fs::create_dir_all(&bucket_dir).unwrap();
        std::fs::write(bucket_dir.join(".r.jpg.dead.part"), b"trunc").unwrap();
        assert!(s.get(Bucket::Receipts, ".r.jpg.dead.part").await.is_err());

        s.put(Bucket::Receipts, "r.jpg", b"full jpeg").await.unwrap();
        assert_eq!(s.get(Bucket::Receipts, "r.jpg").await.unwrap(), b"full jpeg");

        // no staging file is left next to the stored object or after a conflict
        assert!(s.put(Bucket::Receipts, "r.jpg", b"again").await.is_err());
        let staged = std::fs::read_dir(&bucket_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count();
        assert_eq!(staged, 1);
    }

    #[tokio::test]
    async fn objects_are_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let s = Storage::new(dir.path(), "http://localhost");

        s.put(Bucket::Avatars, "a.jpg", b"jpeg").await.unwrap();
        assert_eq!(s.get(Bucket::Avatars, "a.jpg").await.unwrap(), b"jpeg");
        assert!(matches!(
            s.put(Bucket::Avatars, "a.jpg", b"again").await,
            Err(PlatformError::Conflict(_))
        ));
        assert!(matches!(
            s.get(Bucket::Receipts, "a.jpg").await,
            Err(PlatformError::NotFound(_))
        ));
        assert!(matches!(
            s.put(Bucket::Avatars, "empty.jpg", b"").await,
            Err(PlatformError::Validation(_))
        ));
    }
}
