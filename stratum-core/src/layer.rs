use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five architectural tiers, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Common,
    Spi,
    Api,
    Core,
    Facade,
}

impl Layer {
    pub const ALL: [Layer; 5] = [Layer::Common, Layer::Spi, Layer::Api, Layer::Core, Layer::Facade];

    pub fn name(&self) -> &'static str {
        match self {
            Layer::Common => "common",
            Layer::Spi => "spi",
            Layer::Api => "api",
            Layer::Core => "core",
            Layer::Facade => "facade",
        }
    }

    /// Artifact-id suffix marking a submodule as this layer, e.g. `-api`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Layer::Common => "-common",
            Layer::Spi => "-spi",
            Layer::Api => "-api",
            Layer::Core => "-core",
            Layer::Facade => "-facade",
        }
    }

    /// Detects the layer of an artifact id (or directory name) from its suffix.
    pub fn from_artifact_id(artifact_id: &str) -> Option<Layer> {
        Layer::ALL
            .iter()
            .copied()
            .find(|layer| artifact_id.ends_with(layer.suffix()) && artifact_id.len() > layer.suffix().len())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "common" => Ok(Layer::Common),
            "spi" => Ok(Layer::Spi),
            "api" => Ok(Layer::Api),
            "core" => Ok(Layer::Core),
            "facade" => Ok(Layer::Facade),
            other => Err(format!("unknown layer '{}'", other)),
        }
    }
}

/// Structural role of a module, either declared in a marker file or inferred from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    #[serde(rename = "leaf")]
    Leaf,
    #[serde(rename = "parent")]
    Parent,
    #[serde(rename = "pure-aggregator", alias = "aggregator")]
    Aggregator,
    #[serde(rename = "library")]
    Library,
}

impl ModuleType {
    /// Whether an inferred type satisfies this declared type.
    pub fn is_satisfied_by(&self, actual: ModuleType) -> bool {
        match self {
            ModuleType::Library => actual == ModuleType::Leaf || actual == ModuleType::Library,
            declared => *declared == actual,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleType::Leaf => "leaf",
            ModuleType::Parent => "parent",
            ModuleType::Aggregator => "pure-aggregator",
            ModuleType::Library => "library",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_from_artifact_id() {
        assert_eq!(Layer::from_artifact_id("billing-api"), Some(Layer::Api));
        assert_eq!(Layer::from_artifact_id("billing-core"), Some(Layer::Core));
        assert_eq!(Layer::from_artifact_id("billing-facade"), Some(Layer::Facade));
        assert_eq!(Layer::from_artifact_id("billing"), None);
        assert_eq!(Layer::from_artifact_id("-api"), None);
    }

    #[test]
    fn test_layer_parse() {
        assert_eq!("SPI".parse::<Layer>().unwrap(), Layer::Spi);
        assert!("domain".parse::<Layer>().is_err());
    }

    #[test]
    fn test_library_satisfied_by_leaf() {
        assert!(ModuleType::Library.is_satisfied_by(ModuleType::Leaf));
        assert!(!ModuleType::Parent.is_satisfied_by(ModuleType::Aggregator));
    }

    #[test]
    fn test_module_type_yaml_names() {
        let parsed: ModuleType = serde_yaml::from_str("pure-aggregator").unwrap();
        assert_eq!(parsed, ModuleType::Aggregator);
        let alias: ModuleType = serde_yaml::from_str("aggregator").unwrap();
        assert_eq!(alias, ModuleType::Aggregator);
    }
}
