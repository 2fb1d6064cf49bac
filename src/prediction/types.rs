use serde::{Deserialize, Serialize};

/// 预测结果中的一个类别，概率为百分比
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    #[serde(rename = "class")]
    pub class_name: String,
    pub probability: f64,
}

impl PredictionEntry {
    pub fn new(class_name: impl Into<String>, probability: f64) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_frontend_field_names() {
        let entry = PredictionEntry::new("Shoes", 87.5);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"class": "Shoes", "probability": 87.5}));
    }
}
