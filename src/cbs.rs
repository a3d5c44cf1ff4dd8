// 🌐 CBS Data Loader
// Fetches one StatLine dataset from the CBS OData feed and returns it as a RawTable.
//
// Dimension columns arrive as codes ("A047877", "2020MM01"); they are replaced
// with their published titles ("Including VAT", "2020 January") before return.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::table::{RawRecord, RawTable};

pub const DEFAULT_BASE_URL: &str = "https://opendata.cbs.nl/ODataApi/odata";

/// Average energy prices for consumers
pub const DEFAULT_DATASET: &str = "84672ENG";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// DatasetSource - anything that can produce the raw table for an identifier
pub trait DatasetSource {
    fn fetch_dataset(&self, identifier: &str) -> Result<RawTable>;

    /// Short description for logs
    fn describe(&self) -> String;
}

// ============================================================================
// CBS OData CLIENT
// ============================================================================

pub struct CbsClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ODataPage<T> {
    value: Vec<T>,
    #[serde(rename = "odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataProperty {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct DimensionValue {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Title")]
    title: String,
}

impl CbsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, identifier: &str, resource: &str) -> String {
        format!("{}/{}/{}", self.base_url, identifier, resource)
    }

    /// Fetch every page of an OData collection, following `odata.nextLink`
    fn fetch_all<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut request = self.first_page_request(url);
        let mut url = url.to_string();

        loop {
            debug!(%url, "GET");
            let resp = request
                .send()
                .with_context(|| format!("CBS request failed: {url}"))?;

            if !resp.status().is_success() {
                bail!("CBS request failed with status {}: {url}", resp.status());
            }

            let page: ODataPage<T> = resp
                .json()
                .with_context(|| format!("Failed to parse CBS response: {url}"))?;

            out.extend(page.value);
            match page.next_link {
                // nextLink already carries every query option it needs
                Some(next) => {
                    request = self.client.get(&next);
                    url = next;
                }
                None => break,
            }
        }

        Ok(out)
    }

    fn first_page_request(&self, url: &str) -> RequestBuilder {
        self.client.get(url).query(&[("$format", "json")])
    }

    fn dimension_titles(&self, identifier: &str, dimension: &str) -> Result<HashMap<String, String>> {
        let values: Vec<DimensionValue> = self
            .fetch_all(&self.table_url(identifier, dimension))
            .with_context(|| format!("Failed to fetch dimension '{dimension}'"))?;
        Ok(values.into_iter().map(|v| (v.key, v.title)).collect())
    }
}

impl DatasetSource for CbsClient {
    fn fetch_dataset(&self, identifier: &str) -> Result<RawTable> {
        let properties: Vec<DataProperty> = self
            .fetch_all(&self.table_url(identifier, "DataProperties"))
            .context("Failed to fetch data properties")?;

        let mut dimensions = HashMap::new();
        for prop in properties.iter().filter(|p| is_dimension(&p.kind)) {
            let titles = self.dimension_titles(identifier, &prop.key)?;
            dimensions.insert(prop.key.clone(), titles);
        }

        let records: Vec<RawRecord> = self
            .fetch_all(&self.table_url(identifier, "TypedDataSet"))
            .context("Failed to fetch typed data set")?;

        let mut table = RawTable::new(records);
        apply_dimension_titles(&mut table, &dimensions);

        info!(
            dataset = identifier,
            rows = table.len(),
            dimensions = dimensions.len(),
            "fetched CBS dataset"
        );

        Ok(table)
    }

    fn describe(&self) -> String {
        format!("CBS OData feed at {}", self.base_url)
    }
}

fn is_dimension(kind: &str) -> bool {
    matches!(kind, "Dimension" | "TimeDimension" | "GeoDimension" | "GeoDetail")
}

/// Replace coded dimension values with their titles; unknown codes are kept.
///
/// Values are trimmed: CBS pads codes to a fixed width.
pub fn apply_dimension_titles(table: &mut RawTable, dimensions: &HashMap<String, HashMap<String, String>>) {
    for record in &mut table.records {
        for (column, titles) in dimensions {
            if let Some(Value::String(code)) = record.get_mut(column) {
                let key = code.trim().to_string();
                *code = titles.get(&key).cloned().unwrap_or(key);
            }
        }
    }
}

// ============================================================================
// FILE SOURCE (offline snapshot)
// ============================================================================

/// FileSource - reads a JSON snapshot instead of calling the network
///
/// Accepts either a bare array of records or an OData-style `{"value": [...]}`.
/// The snapshot is expected to carry titles, not codes.
pub struct FileSource {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Records(Vec<RawRecord>),
    Page { value: Vec<RawRecord> },
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DatasetSource for FileSource {
    fn fetch_dataset(&self, identifier: &str) -> Result<RawTable> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read dataset snapshot {:?}", self.path))?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse dataset snapshot {:?}", self.path))?;

        let records = match snapshot {
            Snapshot::Records(records) => records,
            Snapshot::Page { value } => value,
        };

        info!(dataset = identifier, rows = records.len(), path = ?self.path, "loaded dataset snapshot");
        Ok(RawTable::new(records))
    }

    fn describe(&self) -> String {
        format!("snapshot file {:?}", self.path)
    }
}
