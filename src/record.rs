use serde::{Deserialize, Serialize};

/// One place row as it appeared in a search result list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// 1-based position in DOM (or API) order.
    pub rank: usize,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub review_count: String,
    #[serde(default)]
    pub phone: String,
    pub search_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_location: Option<String>,
    /// Full text of the matched row before name isolation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
}

impl PlaceRecord {
    /// Identity used to drop the same place seen from several locations.
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.name, self.address)
    }
}

/// Secondary fields probed inside a result row's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Address,
    Category,
    Rating,
    ReviewCount,
    Phone,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Address,
        Field::Category,
        Field::Rating,
        Field::ReviewCount,
        Field::Phone,
    ];

    pub fn slot<'r>(&self, record: &'r mut PlaceRecord) -> &'r mut String {
        match self {
            Field::Address => &mut record.address,
            Field::Category => &mut record.category,
            Field::Rating => &mut record.rating,
            Field::ReviewCount => &mut record.review_count,
            Field::Phone => &mut record.phone,
        }
    }
}
