// Stockage des preuves de paiement.
// La base ne garde qu'une clé opaque; le contenu vit derrière ProofStore
// (répertoire local aujourd'hui, stockage objet possible via une autre impl).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::{AppError, Result};

#[async_trait]
pub trait ProofStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    /// Supprime le fichier; une clé déjà absente n'est pas une erreur
    async fn delete(&self, key: &str) -> Result<()>;
}

pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        // Les clés sont générées par le serveur, on refuse tout ce qui sort du répertoire
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(AppError::Storage(format!("invalid proof key: {}", key)));
        }
        Ok(self.root.join(key))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ProofStore for LocalDiskStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("failed to create upload dir: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write {}: {}", path.display(), e)))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::Storage(format!("failed to read {}: {}", path.display(), e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("failed to delete {}: {}", path.display(), e))),
        }
    }
}

/// Extension de fichier déduite du content-type ("application/pdf" -> "pdf")
pub fn extension_for(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split('/').nth(1))
        .map(|sub| sub.split(';').next().unwrap_or(sub).trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '+'))
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("application/pdf")), "pdf");
        assert_eq!(extension_for(Some("image/PNG")), "png");
        assert_eq!(extension_for(Some("text/plain; charset=utf-8")), "plain");
        assert_eq!(extension_for(None), "bin");
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let root = std::env::temp_dir().join(format!("coachdeck-store-{}", uuid::Uuid::new_v4()));
        let store = LocalDiskStore::new(&root);

        store.put("1-abc.pdf", b"%PDF-1.4").await.unwrap();
        assert_eq!(store.get("1-abc.pdf").await.unwrap(), b"%PDF-1.4");

        store.delete("1-abc.pdf").await.unwrap();
        assert!(store.get("1-abc.pdf").await.is_err());
        // déjà supprimé
        store.delete("1-abc.pdf").await.unwrap();

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let store = LocalDiskStore::new(std::env::temp_dir());
        assert!(store.put("../etc/passwd", b"x").await.is_err());
        assert!(store.get("a/b").await.is_err());
    }
}
