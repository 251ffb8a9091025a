use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveRecord {
    pub cve_metadata: CveMetadata,
    #[serde(default)]
    pub containers: Containers,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveMetadata {
    pub cve_id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub assigner_short_name: Option<String>,
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Containers {
    #[serde(default)]
    pub cna: Option<CnaContainer>,
    #[serde(default)]
    pub adp: Vec<AdpContainer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CnaContainer {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub affected: Vec<Affected>,
    #[serde(default)]
    pub problem_types: Vec<ProblemType>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// Third-party enrichment (e.g. CISA ADP adds CVSS where the CNA did not).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdpContainer {
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub lang: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Affected {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemType {
    #[serde(default)]
    pub descriptions: Vec<ProblemTypeDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemTypeDescription {
    #[serde(default)]
    pub cwe_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metric {
    #[serde(rename = "cvssV4_0", default)]
    pub cvss_v4_0: Option<CvssData>,
    #[serde(rename = "cvssV3_1", default)]
    pub cvss_v3_1: Option<CvssData>,
    #[serde(rename = "cvssV3_0", default)]
    pub cvss_v3_0: Option<CvssData>,
    #[serde(rename = "cvssV2_0", default)]
    pub cvss_v2_0: Option<CvssData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssData {
    pub base_score: f64,
    #[serde(default)]
    pub base_severity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reference {
    pub url: String,
}

/// Preferred CVSS rating of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Cvss {
    pub score: f64,
    pub severity: Option<String>,
    pub version: &'static str,
}

impl CveRecord {
    pub fn cve_id(&self) -> &str {
        &self.cve_metadata.cve_id
    }

    /// Year component of the CVE id (`CVE-<year>-<n>`).
    pub fn year(&self) -> Option<i32> {
        cve_year(self.cve_id())
    }

    /// First English description, or the first description of any language.
    pub fn description(&self) -> Option<&str> {
        let descriptions = &self.containers.cna.as_ref()?.descriptions;
        descriptions
            .iter()
            .find(|d| d.lang.to_lowercase().starts_with("en"))
            .or_else(|| descriptions.first())
            .map(|d| d.value.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.containers.cna.as_ref()?.title.as_deref()
    }

    /// Highest-version CVSS rating, preferring the CNA over ADP containers.
    ///
    /// Preference: v4.0, v3.1, v3.0, v2.0.
    pub fn cvss(&self) -> Option<Cvss> {
        let cna_metrics = self
            .containers
            .cna
            .as_ref()
            .map(|c| c.metrics.as_slice())
            .unwrap_or_default();

        best_cvss(cna_metrics).or_else(|| {
            self.containers
                .adp
                .iter()
                .find_map(|adp| best_cvss(&adp.metrics))
        })
    }

    /// Distinct `(vendor, product)` pairs, in record order.
    pub fn products(&self) -> Vec<(String, String)> {
        let mut products: Vec<(String, String)> = Vec::new();
        let Some(cna) = &self.containers.cna else {
            return products;
        };

        for affected in &cna.affected {
            let vendor = affected.vendor.clone().unwrap_or_else(|| "n/a".to_string());
            let product = match &affected.product {
                Some(p) => p.clone(),
                None => continue,
            };
            let pair = (vendor, product);
            if !products.contains(&pair) {
                products.push(pair);
            }
        }
        products
    }

    /// Distinct CWE ids, in record order.
    pub fn cwes(&self) -> Vec<String> {
        let mut cwes: Vec<String> = Vec::new();
        let Some(cna) = &self.containers.cna else {
            return cwes;
        };

        for cwe in cna
            .problem_types
            .iter()
            .flat_map(|p| p.descriptions.iter())
            .filter_map(|d| d.cwe_id.as_ref())
        {
            if !cwes.contains(cwe) {
                cwes.push(cwe.clone());
            }
        }
        cwes
    }

    pub fn references(&self) -> Vec<&str> {
        match &self.containers.cna {
            Some(cna) => cna.references.iter().map(|r| r.url.as_str()).collect(),
            None => Vec::new(),
        }
    }
}

/// Parses the year out of a `CVE-YYYY-NNNN` identifier.
pub fn cve_year(cve_id: &str) -> Option<i32> {
    let mut parts = cve_id.split('-');
    if !parts.next()?.eq_ignore_ascii_case("CVE") {
        return None;
    }
    parts.next()?.parse().ok()
}

const CVSS_PREFERENCE: [&str; 4] = ["4.0", "3.1", "3.0", "2.0"];

impl Metric {
    fn by_version(&self, version: &str) -> Option<&CvssData> {
        match version {
            "4.0" => self.cvss_v4_0.as_ref(),
            "3.1" => self.cvss_v3_1.as_ref(),
            "3.0" => self.cvss_v3_0.as_ref(),
            "2.0" => self.cvss_v2_0.as_ref(),
            _ => None,
        }
    }
}

fn best_cvss(metrics: &[Metric]) -> Option<Cvss> {
    CVSS_PREFERENCE.iter().find_map(|&version| {
        metrics
            .iter()
            .find_map(|m| m.by_version(version))
            .map(|data| Cvss {
                score: data.base_score,
                severity: data.base_severity.clone(),
                version,
            })
    })
}
