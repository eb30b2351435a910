use std::fmt;

use serde::Serialize;

/// Cognitive status predicted for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Label {
    /// Alzheimer's disease.
    #[serde(rename = "AD")]
    Ad,
    /// Cognitively normal.
    #[serde(rename = "CN")]
    Cn,
    /// Mild cognitive impairment.
    #[serde(rename = "MCI")]
    Mci,
}

/// Output index order of the classification head. The weights were trained
/// against this order, so it must only change together with them.
pub const CLASS_LABELS: [Label; 3] = [Label::Ad, Label::Cn, Label::Mci];

pub const NUM_CLASSES: usize = CLASS_LABELS.len();

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ad => "AD",
            Label::Cn => "CN",
            Label::Mci => "MCI",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_follows_head_order() {
        for (i, label) in CLASS_LABELS.iter().enumerate() {
            assert_eq!(*label as usize, i);
        }
    }

    #[test]
    fn serializes_as_short_name() {
        assert_eq!(serde_json::to_string(&Label::Mci).unwrap(), "\"MCI\"");
        assert_eq!(Label::Cn.to_string(), "CN");
    }
}
