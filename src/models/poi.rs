use serde::{Deserialize, Serialize};

/// User position resolved by the two-step IP lookup.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LocationInfo {
    pub ip: String,
    /// "longitude,latitude"
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_location: Option<String>,
}

impl LocationInfo {
    /// Short human label for the located area, used in result summaries.
    pub fn area_label(&self) -> &str {
        self.city
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.province.as_deref())
            .unwrap_or("当前位置")
    }
}

/// One point of interest from the nearby search.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Poi {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub poi_type: String,
    #[serde(default)]
    pub typecode: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub location: String,
    /// Distance from the search center in meters, as reported upstream.
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub pname: String,
    #[serde(default)]
    pub cityname: String,
    #[serde(default)]
    pub adname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<PoiBusiness>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<PoiPhoto>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PoiBusiness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opentime_today: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PoiPhoto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Successful nearby-search payload handed to the UI and the model.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SearchResult {
    pub count: u32,
    pub pois: Vec<Poi>,
    pub location: String,
    pub message: String,
}
