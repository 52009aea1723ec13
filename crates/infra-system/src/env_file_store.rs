// Environment File Store
// KEY=VALUE lines, order-preserving; writes go through a sibling tmp file
// and rename so readers never observe a partial file.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use opsmedic_core::error::Result;
use opsmedic_core::port::EnvFileStore;

pub struct EnvFileStoreImpl {
    path: PathBuf,
}

impl EnvFileStoreImpl {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(content: &str) -> Vec<(String, String)> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                line.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }

    fn render(entries: &[(String, String)]) -> String {
        let mut out = entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl EnvFileStore for EnvFileStoreImpl {
    async fn load(&self) -> Result<Option<Vec<(String, String)>>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(Self::parse(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, entries: &[(String, String)]) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, Self::render(entries)).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
