//! Reads the alias and resource documents from disk

use crate::config::Config;
use crate::error::{FingerError, Result};
use std::path::Path;
use webfinger_store::{assemble, parse_aliases, parse_resources, IdentityTable};

/// Raw contents of the two documents
#[derive(Debug, Clone, Default)]
pub struct FingerFiles {
    pub urns: Vec<u8>,
    pub fingers: Vec<u8>,
}

impl FingerFiles {
    /// Read both documents named in `config`.
    pub async fn read(config: &Config) -> Result<Self> {
        Ok(Self {
            urns: read_file(&config.urn_path).await?,
            fingers: read_file(&config.finger_path).await?,
        })
    }

    /// Parse both documents and assemble the identity table.
    pub fn into_table(self) -> Result<IdentityTable> {
        let aliases = parse_aliases(&self.urns)?;
        let resources = parse_resources(&self.fingers)?;
        Ok(assemble(&resources, &aliases)?)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| FingerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
