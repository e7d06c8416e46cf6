use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use super::RegistryError;

#[derive(Debug, Clone, PartialEq)]
pub struct ItemType {
    pub type_id: i64,
    pub type_name: String,
}

impl FromStr for ItemType {
    type Err = RegistryError;

    /// One catalog line: `<type id> <name words...>`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split_whitespace();
        let id = fields
            .next()
            .ok_or_else(|| RegistryError::Precondition("empty item type line".to_string()))?;
        let type_id = id
            .parse()
            .map_err(|_| RegistryError::Precondition(format!("bad item type id: {}", id)))?;

        Ok(Self {
            type_id,
            type_name: fields.collect::<Vec<_>>().join(" "),
        })
    }
}

/// Type id to display name lookup, in file order.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<ItemType>,
    by_id: HashMap<i64, usize>,
}

impl ItemCatalog {
    /// Lines that do not start with a numeric id (headers, blanks) are skipped.
    pub fn parse(text: &str) -> Self {
        let mut catalog = Self::default();
        for item in text.lines().filter_map(|line| line.parse::<ItemType>().ok()) {
            catalog.by_id.entry(item.type_id).or_insert(catalog.items.len());
            catalog.items.push(item);
        }
        catalog
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub async fn fetch(url: &str) -> Result<Self, RegistryError> {
        let text = reqwest::get(url).await?.error_for_status()?.text().await?;
        Ok(Self::parse(&text))
    }

    /// `source` is either an http(s) URL or a local path.
    pub async fn load(source: &str) -> Result<Self, RegistryError> {
        let catalog = if source.starts_with("http://") || source.starts_with("https://") {
            Self::fetch(source).await?
        } else {
            Self::load_file(source)?
        };
        tracing::info!("Loaded {} item types from {}", catalog.len(), source);
        Ok(catalog)
    }

    pub fn name(&self, type_id: i64) -> Option<&str> {
        self.by_id
            .get(&type_id)
            .map(|&idx| self.items[idx].type_name.as_str())
    }

    pub fn describe(&self, type_id: i64) -> String {
        match self.name(type_id) {
            Some(name) => format!("{}, {}", type_id, name),
            None => format!("unknown ID {}", type_id),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemType> {
        self.items.iter()
    }
}
