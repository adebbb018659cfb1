use log::{debug, info};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;
use synthesis::{ItemTemplate, ProductLevel, ReportTemplate, SynthesisErrors};

use crate::synth::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ItemTableConfig {
    pub name: String,
    pub title: Option<String>,
    pub variables: BTreeMap<String, String>,
}

/// The report template, as stored in `synthesis_report_vars.json`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(rename = "districtFactors")]
    pub district_factors: BTreeMap<String, Vec<String>>,
    #[serde(rename = "schoolFactors")]
    pub school_factors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(rename = "commonThemes")]
    pub common_themes: Option<Vec<String>>,
    #[serde(rename = "itemTables")]
    pub item_tables: Option<Vec<ItemTableConfig>>,
    #[serde(rename = "themeBars")]
    pub theme_bars: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

fn by_product_level<V: Clone>(
    m: &BTreeMap<String, V>,
) -> Result<BTreeMap<ProductLevel, V>, SynthesisErrors> {
    let mut res = BTreeMap::new();
    for (k, v) in m.iter() {
        res.insert(k.parse::<ProductLevel>()?, v.clone());
    }
    Ok(res)
}

impl TemplateConfig {
    pub fn validate(&self) -> Result<ReportTemplate, SynthesisErrors> {
        let district_factors = by_product_level(&self.district_factors)?;
        // Schools use the district factors unless told otherwise.
        let school_factors = match &self.school_factors {
            Some(m) => by_product_level(m)?,
            None => district_factors.clone(),
        };
        let common_themes = self.common_themes.clone().unwrap_or_else(|| {
            ["Engagement", "Relationships", "Culture"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        let mut items = Vec::new();
        for it in self.item_tables.clone().unwrap_or_default() {
            items.push(ItemTemplate {
                title: it.title.clone().unwrap_or_else(|| it.name.clone()),
                name: it.name,
                variables: by_product_level(&it.variables)?,
            });
        }
        let mut theme_bars = BTreeMap::new();
        for (name, vars) in self.theme_bars.clone().unwrap_or_default() {
            theme_bars.insert(name, by_product_level(&vars)?);
        }
        Ok(ReportTemplate {
            district_factors,
            school_factors,
            common_themes,
            items,
            theme_bars,
        })
    }
}

pub fn read_template(path: &Path) -> SynthResult<ReportTemplate> {
    let path_s = path.display().to_string();
    info!("read_template: reading {}", path_s);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path_s.clone(),
    })?;
    let config: TemplateConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {
        path: path_s.clone(),
    })?;
    debug!("read_template: {:?}", config);
    config.validate().context(TemplateSnafu { path: path_s })
}

/// Reads the multilevel groups: display name of the combined school, and display
/// names of its members. A missing file means no groups.
pub fn read_multi_dict(path: &Path) -> SynthResult<Option<BTreeMap<String, Vec<String>>>> {
    if !path.is_file() {
        return Ok(None);
    }
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path_s.clone(),
    })?;
    let groups: BTreeMap<String, Vec<String>> =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path: path_s })?;
    Ok(Some(groups))
}

pub fn read_summary(path: &Path) -> SynthResult<JSValue> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path_s.clone(),
    })?;
    debug!("read_summary: {} bytes", contents.len());
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu { path: path_s })?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_defaults() {
        let js = r#"{
            "districtFactors": {"OSE_HS": ["eng_hs", "", "rel_hs"], "fam_es": ["fam_eng_es"]},
            "itemTables": [{"name": "edqual", "variables": {"OSE_HS": "edqual_hs"}}],
            "themeBars": {"eng_theme_bar": {"OSE_HS": "eng_hs"}}
        }"#;
        let config: TemplateConfig = serde_json::from_str(js).unwrap();
        let t = config.validate().unwrap();
        let ose_hs: ProductLevel = "OSE_HS".parse().unwrap();
        let fam_es: ProductLevel = "FAM_ES".parse().unwrap();
        assert_eq!(t.district_factors[&ose_hs], vec!["eng_hs", "", "rel_hs"]);
        assert_eq!(t.school_factors, t.district_factors);
        assert!(t.district_factors.contains_key(&fam_es));
        assert_eq!(t.common_themes, vec!["Engagement", "Relationships", "Culture"]);
        assert_eq!(t.items[0].title, "edqual");
        assert_eq!(t.theme_bars["eng_theme_bar"][&ose_hs], "eng_hs");
    }

    #[test]
    fn template_unknown_product_level() {
        let js = r#"{"districtFactors": {"OSE_XS": ["eng"]}}"#;
        let config: TemplateConfig = serde_json::from_str(js).unwrap();
        assert_eq!(
            config.validate(),
            Err(SynthesisErrors::UnknownProductLevel {
                name: "OSE_XS".to_string()
            })
        );
    }

    #[test]
    fn multi_dict_missing_file() {
        let p = std::env::temp_dir().join("synthrep_no_such_multi_dict.json");
        assert_eq!(read_multi_dict(&p).unwrap(), None);
    }
}
