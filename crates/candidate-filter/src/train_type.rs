//! Mapping between train-number prefixes and the site's train-type toggles.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum TrainType {
    /// G / GC: high-speed and intercity.
    HighSpeed,
    /// D: EMU.
    Emu,
    /// Z: direct express.
    Direct,
    /// T: express.
    Express,
    /// K: fast.
    Fast,
    /// QT: everything else.
    Other,
}

impl TrainType {
    pub const ALL: [TrainType; 6] = [
        TrainType::HighSpeed,
        TrainType::Emu,
        TrainType::Direct,
        TrainType::Express,
        TrainType::Fast,
        TrainType::Other,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TrainType::HighSpeed => "G",
            TrainType::Emu => "D",
            TrainType::Direct => "Z",
            TrainType::Express => "T",
            TrainType::Fast => "K",
            TrainType::Other => "QT",
        }
    }

    /// Text fragments identifying this type's toggle label.
    pub fn label_keywords(&self) -> &'static [&'static str] {
        match self {
            TrainType::HighSpeed => &["G", "GC", "高铁", "城际"],
            TrainType::Emu => &["D", "动车"],
            TrainType::Direct => &["Z", "直达"],
            TrainType::Express => &["T", "特快"],
            TrainType::Fast => &["K", "快速"],
            TrainType::Other => &["其他"],
        }
    }

    /// Classify a toggle by its label text; first matching type wins.
    pub fn from_label(label: &str) -> Option<TrainType> {
        let upper = label.to_uppercase();
        TrainType::ALL.into_iter().find(|ty| {
            ty.label_keywords()
                .iter()
                .any(|keyword| upper.contains(&keyword.to_uppercase()))
        })
    }

    fn from_prefix(prefix: &str) -> Option<TrainType> {
        match prefix {
            "G" | "GC" => Some(TrainType::HighSpeed),
            "D" => Some(TrainType::Emu),
            "Z" => Some(TrainType::Direct),
            "T" => Some(TrainType::Express),
            "K" => Some(TrainType::Fast),
            "QT" => Some(TrainType::Other),
            _ => None,
        }
    }
}

/// Toggles to enable for the configured prefixes; unknown prefixes are ignored.
pub fn train_types_for_prefixes(prefixes: &[String]) -> Vec<TrainType> {
    let mut types: Vec<TrainType> = prefixes
        .iter()
        .filter_map(|prefix| TrainType::from_prefix(prefix.trim().to_uppercase().as_str()))
        .collect();
    types.sort();
    types.dedup();
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_map_to_types() {
        let prefixes: Vec<String> = ["gc", "G", "d", "X"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            train_types_for_prefixes(&prefixes),
            vec![TrainType::HighSpeed, TrainType::Emu]
        );
        assert!(train_types_for_prefixes(&[]).is_empty());
    }

    #[test]
    fn labels_classify() {
        assert_eq!(TrainType::from_label("GC-高铁/城际"), Some(TrainType::HighSpeed));
        assert_eq!(TrainType::from_label("动车"), Some(TrainType::Emu));
        assert_eq!(TrainType::from_label("其他"), Some(TrainType::Other));
        assert_eq!(TrainType::from_label("全部"), None);
    }
}
