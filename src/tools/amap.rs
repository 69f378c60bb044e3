use crate::models::{LocationInfo, Poi, PoiBusiness, PoiPhoto, SearchResult};
use async_trait::async_trait;
use colored::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

pub const SEARCH_NEARBY: &str = "searchNearby";

const IPINFO_URL: &str = "https://ipinfo.io/json";
const IP77_URL: &str = "https://api.ip77.net/ip2/v4/";
const PLACE_AROUND_URL: &str = "https://restapi.amap.com/v5/place/around";

/// Catering services, the default POI type for this assistant.
const DEFAULT_POI_TYPES: &str = "050000";

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct SearchNearbyArgs {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub radius: Option<i64>,
    #[serde(default)]
    pub sortrule: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city_limit: Option<bool>,
    #[serde(default)]
    pub show_fields: Option<String>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub page_num: Option<i64>,
}

/// Tool-level reply: search failures flow back into the conversation as
/// tool results, they are not process errors.
pub enum SearchReply {
    Results(SearchResult),
    Failure(String),
}

impl SearchReply {
    pub fn to_tool_value(&self) -> Value {
        match self {
            SearchReply::Results(result) => json!({
                "success": true,
                "count": result.count,
                "pois": result.pois,
                "location": result.location,
                "message": result.message,
            }),
            SearchReply::Failure(error) => json!({
                "success": false,
                "error": error,
            }),
        }
    }
}

/// Nearby-search collaborator as the finder agent sees it.
#[async_trait]
pub trait PoiSearch: Send + Sync {
    async fn search_nearby(&self, args: SearchNearbyArgs) -> SearchReply;
}

/// Amap place search plus the two-step IP geolocation used when the
/// model does not supply coordinates. The resolved location is cached
/// for the lifetime of the client.
pub struct AmapClient {
    http: reqwest::Client,
    api_key: Option<String>,
    cached_location: Mutex<Option<LocationInfo>>,
    verbose: bool,
}

#[derive(Deserialize)]
struct IpInfoBody {
    ip: Option<String>,
    #[serde(default)]
    bogon: bool,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct Ip77Body {
    code: i64,
    message: Option<String>,
    data: Option<Ip77Data>,
}

#[derive(Deserialize, Default)]
struct Ip77Data {
    ip: Option<String>,
    longitude: Option<Value>,
    latitude: Option<Value>,
    country: Option<String>,
    province: Option<String>,
    city: Option<String>,
    district: Option<String>,
    street: Option<String>,
    isp: Option<String>,
    location: Option<String>,
}

impl AmapClient {
    pub fn new(api_key: Option<String>, verbose: bool) -> Self {
        AmapClient {
            http: reqwest::Client::new(),
            api_key,
            cached_location: Mutex::new(None),
            verbose,
        }
    }

    /// Resolve the caller's position by IP: ipinfo.io for the address,
    /// ip77.net for coordinates. Failures are strings for tool replies.
    pub async fn get_location(&self) -> Result<LocationInfo, String> {
        let ip_response = self
            .http
            .get(IPINFO_URL)
            .send()
            .await
            .map_err(|e| format!("获取IP失败: {}", e))?;
        if !ip_response.status().is_success() {
            return Err(format!("获取IP失败: {}", ip_response.status()));
        }
        let ip_body: IpInfoBody = ip_response
            .json()
            .await
            .map_err(|e| format!("获取IP失败: {}", e))?;
        if ip_body.error.is_some() || ip_body.bogon {
            return Err("无法获取IP：内网IP或无效IP".to_string());
        }
        let user_ip = ip_body.ip.ok_or_else(|| "无法获取IP".to_string())?;

        let ip77_response = self
            .http
            .post(IP77_URL)
            .form(&[("ip", user_ip.as_str())])
            .send()
            .await
            .map_err(|e| format!("精确定位失败: {}", e))?;
        if !ip77_response.status().is_success() {
            return Err(format!("精确定位失败: {}", ip77_response.status()));
        }
        let body: Ip77Body = ip77_response
            .json()
            .await
            .map_err(|e| format!("精确定位失败: {}", e))?;

        if body.code != 0 {
            return Err(format!(
                "精确定位失败: {}",
                body.message.unwrap_or_else(|| "未知错误".to_string())
            ));
        }
        let data = body.data.unwrap_or_default();

        let longitude = coordinate_string(data.longitude.as_ref());
        let latitude = coordinate_string(data.latitude.as_ref());
        let (Some(longitude), Some(latitude)) = (longitude, latitude) else {
            return Err("定位数据不完整，缺少经纬度".to_string());
        };

        let info = LocationInfo {
            ip: data.ip.unwrap_or(user_ip),
            location: format!("{},{}", longitude, latitude),
            country: data.country,
            province: data.province,
            city: data.city,
            district: data.district,
            street: data.street,
            isp: data.isp,
            full_location: data.location,
        };

        if self.verbose {
            eprintln!(
                "{}",
                format!("[tools] Located via IP: {} ({})", info.area_label(), info.location)
                    .dimmed()
            );
        }

        *self.cached_location.lock().await = Some(info.clone());
        Ok(info)
    }

    /// Location to search around: explicit arg, then the cached IP fix,
    /// then a fresh IP lookup. The bool reports whether it came from IP.
    async fn resolve_location(
        &self,
        requested: Option<String>,
    ) -> Result<(String, bool), String> {
        if let Some(location) = requested.filter(|s| !s.trim().is_empty()) {
            return Ok((location, false));
        }

        if let Some(cached) = self.cached_location.lock().await.as_ref() {
            return Ok((cached.location.clone(), true));
        }

        let info = self
            .get_location()
            .await
            .map_err(|e| format!("无法获取位置信息: {}", e))?;
        Ok((info.location, true))
    }
}

#[async_trait]
impl PoiSearch for AmapClient {
    async fn search_nearby(&self, args: SearchNearbyArgs) -> SearchReply {
        let Some(api_key) = self.api_key.as_deref() else {
            return SearchReply::Failure(
                "未配置高德地图 API Key（AMAP_API_KEY），无法搜索附近地点".to_string(),
            );
        };

        let (location, from_ip) = match self.resolve_location(args.location.clone()).await {
            Ok(resolved) => resolved,
            Err(e) => return SearchReply::Failure(e),
        };

        if let Err(e) = validate_coordinates(&location) {
            return SearchReply::Failure(e);
        }

        let mut params: Vec<(&str, String)> = vec![
            ("key", api_key.to_string()),
            ("location", location.clone()),
            (
                "types",
                args.types
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_POI_TYPES.to_string()),
            ),
        ];
        if let Some(keywords) = args.keywords.as_deref().filter(|s| !s.is_empty()) {
            params.push(("keywords", keywords.to_string()));
        }
        if let Some(radius) = args.radius.filter(|r| (0..=50_000).contains(r)) {
            params.push(("radius", radius.to_string()));
        }
        if let Some(sortrule) = args
            .sortrule
            .as_deref()
            .filter(|s| *s == "distance" || *s == "weight")
        {
            params.push(("sortrule", sortrule.to_string()));
        }
        if let Some(region) = args.region.as_deref().filter(|s| !s.is_empty()) {
            params.push(("region", region.to_string()));
        }
        if let Some(city_limit) = args.city_limit {
            params.push(("city_limit", city_limit.to_string()));
        }
        if let Some(show_fields) = args.show_fields.as_deref().filter(|s| !s.is_empty()) {
            params.push(("show_fields", show_fields.to_string()));
        }
        if let Some(page_size) = args.page_size.filter(|p| (1..=25).contains(p)) {
            params.push(("page_size", page_size.to_string()));
        }
        if let Some(page_num) = args.page_num.filter(|p| *p >= 1) {
            params.push(("page_num", page_num.to_string()));
        }

        let response = match self.http.get(PLACE_AROUND_URL).query(&params).send().await {
            Ok(response) => response,
            Err(e) => return SearchReply::Failure(format!("网络请求失败: {}", e)),
        };
        if !response.status().is_success() {
            return SearchReply::Failure(format!("HTTP 请求失败: {}", response.status()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return SearchReply::Failure(format!("网络请求失败: {}", e)),
        };

        if body.get("status").and_then(|s| s.as_str()) != Some("1") {
            return SearchReply::Failure(format!(
                "API 错误: {}",
                body.get("info")
                    .and_then(|i| i.as_str())
                    .unwrap_or("未知错误")
            ));
        }

        let pois: Vec<Poi> = body
            .get("pois")
            .and_then(|p| p.as_array())
            .map(|entries| entries.iter().map(map_poi).collect())
            .unwrap_or_default();
        let count = body
            .get("count")
            .and_then(|c| c.as_str())
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(pois.len() as u32);

        let message = if from_ip {
            let area = self
                .cached_location
                .lock()
                .await
                .as_ref()
                .map(|info| info.area_label().to_string())
                .unwrap_or_else(|| "当前位置".to_string());
            format!("📍 {} - 找到 {} 个附近的地点", area, count)
        } else {
            format!("找到 {} 个附近的地点", count)
        };

        SearchReply::Results(SearchResult {
            count,
            pois,
            location,
            message,
        })
    }
}

fn coordinate_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn validate_coordinates(location: &str) -> Result<(), String> {
    let parts: Vec<&str> = location.split(',').collect();
    if parts.len() != 2 {
        return Err("location 格式错误，应为\"经度,纬度\"".to_string());
    }
    let (Ok(lng), Ok(lat)) = (
        parts[0].trim().parse::<f64>(),
        parts[1].trim().parse::<f64>(),
    ) else {
        return Err("location 包含无效的经纬度值".to_string());
    };
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err("location 经纬度超出有效范围".to_string());
    }
    Ok(())
}

/// Amap returns empty arrays in place of missing string fields, so POIs
/// are mapped field by field rather than deserialized structurally.
fn map_poi(entry: &Value) -> Poi {
    let text = |key: &str| -> String {
        entry
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let business = entry.get("business").filter(|b| b.is_object()).map(|b| {
        let field = |key: &str| -> Option<String> {
            b.get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };
        PoiBusiness {
            tel: field("tel"),
            opentime_today: field("opentime_today"),
            business_area: field("business_area"),
            tag: field("tag"),
            rating: field("rating"),
            cost: field("cost"),
        }
    });

    let photos = entry
        .get("photos")
        .and_then(|p| p.as_array())
        .map(|entries| {
            entries
                .iter()
                .map(|photo| PoiPhoto {
                    title: photo
                        .get("title")
                        .and_then(|t| t.as_str())
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string()),
                    url: photo
                        .get("url")
                        .and_then(|u| u.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Poi {
        id: text("id"),
        name: text("name"),
        poi_type: text("type"),
        typecode: text("typecode"),
        address: text("address"),
        location: text("location"),
        distance: text("distance"),
        pname: text("pname"),
        cityname: text("cityname"),
        adname: text("adname"),
        business,
        photos,
    }
}

/// Parse and schema-check `searchNearby` arguments from the raw JSON
/// string the model produced.
pub fn parse_search_args(arguments: &str) -> Result<SearchNearbyArgs, String> {
    let value: Value =
        serde_json::from_str(arguments).map_err(|e| format!("参数不是有效的 JSON: {}", e))?;
    let tools = tools_definition();
    if let Some(schema) = super::parameters_schema(&tools, SEARCH_NEARBY) {
        super::validate_args(schema, &value)?;
    }
    serde_json::from_value(value).map_err(|e| format!("参数解析失败: {}", e))
}

pub fn tools_definition() -> Vec<Value> {
    vec![json!({
        "type": "function",
        "function": {
            "name": SEARCH_NEARBY,
            "description": "搜索附近的美食或其他地点。会自动通过IP定位识别用户位置，无需用户提供。可以根据关键词、类型、距离等条件筛选，返回名称、地址、电话、评分、人均消费等信息。适用于\"附近有什么好吃的\"、\"周边美食推荐\"等场景。",
            "parameters": {
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "中心点坐标，格式为\"经度,纬度\"。可选，不传则自动通过IP定位获取用户当前位置"
                    },
                    "keywords": {
                        "type": "string",
                        "description": "搜索关键字，如\"火锅\"、\"川菜\"、\"咖啡\"等"
                    },
                    "types": {
                        "type": "string",
                        "description": "地点类型码，默认\"050000\"（餐饮服务）。多个类型用\"|\"分隔"
                    },
                    "radius": {
                        "type": "number",
                        "description": "搜索半径，单位米，取值范围0-50000，默认5000"
                    },
                    "sortrule": {
                        "type": "string",
                        "description": "排序规则：\"distance\"按距离排序（默认），\"weight\"综合排序",
                        "enum": ["distance", "weight"]
                    },
                    "region": {
                        "type": "string",
                        "description": "搜索区划，增加指定区域内数据召回权重"
                    },
                    "city_limit": {
                        "type": "boolean",
                        "description": "是否严格限制召回数据在指定区域内，需配合region参数使用"
                    },
                    "show_fields": {
                        "type": "string",
                        "description": "指定返回的额外字段，如\"business,photos\"。business包含营业时间、电话、评分等"
                    },
                    "page_size": {
                        "type": "number",
                        "description": "每页返回的数据条数，取值1-25，默认10"
                    },
                    "page_num": {
                        "type": "number",
                        "description": "请求第几页，默认1"
                    }
                }
            }
        }
    })]
}
