//! Wikidata entity search and lookup.
use serde_json::Value;
use url::Url;

use crate::crawler::Crawler;
use crate::defaults::WIKI_API;
use crate::errors::{Error, Result};
use crate::types::{WkEntity, WkEntityExtra, WkEntitySearch};

/// Entity types worth recognising in `instance_of`.
pub const ENTS: &[(&str, &str)] = &[
    ("Q5", "Person"),
    ("Q4830453", "Business"),
    ("Q18388277", "Technology Company"),
    ("Q891723", "Public Company"),
    ("Q30748112", "Big Tech (web)"),
    ("Q1110794", "Daily newspaper"),
    ("Q1153191", "Online newspaper"),
    ("Q1331793", "Media company"),
    ("Q19967801", "Online service"),
    ("Q1197685", "Public Holiday"),
    ("Q7278", "Political Party"),
    ("Q6138528", "Political Coalition"),
    ("Q3624078", "Sovereign state"),
    ("Q6256", "Country"),
    ("Q6266", "Nation"),
];

pub const GENDERS: &[(&str, &str)] = &[
    ("Q6581097", "male"),
    ("Q6581072", "female"),
    ("Q1097630", "intersexual"),
    ("Q1052281", "transgender female"),
    ("Q2449503", "transgender male"),
    ("Q48270", "non-binary"),
];

/// Property ids by name.
pub const PROPS: &[(&str, &str)] = &[
    ("instance_of", "P31"),
    ("image", "P18"),
    ("logo", "P154"),
    ("gender", "P21"),
    ("country_citizen", "P27"),
    ("country", "P17"),
    ("twitter", "P2002"),
    ("facebook", "P2013"),
    ("linkedin", "P4264"),
    ("youtube", "P2397"),
    ("ig", "P2003"),
    ("reddit", "P3984"),
    ("spotify", "P11625"),
    ("github", "P2037"),
    ("rss", "P1019"),
    ("websites", "P856"),
    ("native_lang", "P103"),
    ("birth", "P569"),
    ("ideology", "P1142"),
    ("political_party", "P102"),
    ("subclass", "P279"),
    ("industry", "P452"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Human name of a known entity type id.
pub fn entity_type(id: &str) -> Option<&'static str> {
    lookup(ENTS, id)
}

pub fn gender_name(id: &str) -> Option<&'static str> {
    lookup(GENDERS, id)
}

pub fn prop_id(name: &str) -> Option<&'static str> {
    lookup(PROPS, name)
}

/// Client for the Wikidata action API.
#[derive(Debug, Clone)]
pub struct WikidataClient {
    api_url: String,
}

impl Default for WikidataClient {
    fn default() -> Self {
        Self::new(WIKI_API)
    }
}

impl WikidataClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_owned(),
        }
    }

    fn url(&self, params: &[(&str, &str)]) -> Result<String> {
        Url::parse_with_params(&self.api_url, params)
            .map(String::from)
            .map_err(|_| Error::UrlParsing(self.api_url.clone()))
    }

    async fn fetch(&self, crawler: &dyn Crawler, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.url(params)?;
        crawler.get(&url).await?.error_for_status()?.json()
    }

    /// Entities whose label or alias matches `query` (`wbsearchentities`).
    pub async fn search_entities(
        &self,
        query: &str,
        crawler: &dyn Crawler,
        lang: &str,
    ) -> Result<Vec<WkEntitySearch>> {
        let data = self
            .fetch(
                crawler,
                &[
                    ("action", "wbsearchentities"),
                    ("format", "json"),
                    ("search", query),
                    ("language", lang),
                ],
            )
            .await?;

        let hits = data
            .get("search")
            .and_then(Value::as_array)
            .ok_or(Error::MissingField("search"))?;
        let results: Vec<WkEntitySearch> = hits
            .iter()
            .filter_map(|hit| {
                Some(WkEntitySearch {
                    id: str_field(hit, "id")?,
                    pageid: hit.get("pageid").and_then(Value::as_i64),
                    uri: str_field(hit, "concepturi").unwrap_or_default(),
                    label: str_field(hit, "label"),
                    description: str_field(hit, "description"),
                })
            })
            .collect();
        tracing::debug!(query = %query, results = results.len(), "Wikidata search");
        Ok(results)
    }

    /// Full entity document (`wbgetentities`).
    ///
    /// Label, description and aliases use `lang`, falling back to English.
    ///
    /// # Errors
    ///
    /// [`Error::MissingField`] when the API does not return the entity.
    pub async fn get_entity(
        &self,
        id: &str,
        crawler: &dyn Crawler,
        lang: &str,
    ) -> Result<WkEntity> {
        let mut data = self
            .fetch(
                crawler,
                &[
                    ("action", "wbgetentities"),
                    ("format", "json"),
                    ("ids", id),
                    ("languages", &format!("{lang}|en")),
                ],
            )
            .await?;

        let raw = data
            .get_mut("entities")
            .and_then(|e| e.get_mut(id))
            .map(Value::take)
            .filter(|e| e.get("missing").is_none())
            .ok_or(Error::MissingField("entity"))?;
        Ok(entity_from_json(id, lang, raw))
    }
}

fn entity_from_json(id: &str, lang: &str, raw: Value) -> WkEntity {
    let aliases = localized(&raw, "aliases", lang)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| str_field(a, "value"))
                .collect()
        })
        .unwrap_or_default();

    WkEntity {
        id: id.to_owned(),
        pageid: raw.get("pageid").and_then(Value::as_i64),
        instance_of: claim_values(&raw, "P31")
            .iter()
            .filter_map(|v| str_field(v, "id"))
            .collect(),
        label: label(&raw, lang),
        description: localized(&raw, "descriptions", lang).and_then(|d| str_field(d, "value")),
        modified: str_field(&raw, "modified"),
        aliases,
        image: claim_values(&raw, "P18")
            .first()
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        raw,
    }
}

/// Social profiles, websites, gender and country of an entity document.
///
/// Country is the citizenship (P27) for people, else the organisation's
/// country (P17), given as an entity id.
pub fn extract_extra(entity: &Value) -> WkEntityExtra {
    let first_id = |prop: &str| {
        claim_values(entity, prop)
            .first()
            .and_then(|v| str_field(v, "id"))
    };
    let first_str = |prop: &str| {
        claim_values(entity, prop)
            .first()
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    };

    WkEntityExtra {
        id: str_field(entity, "id").unwrap_or_default(),
        label: label(entity, "en"),
        sites: claim_values(entity, "P856")
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        gender: first_id("P21").and_then(|g| gender_name(&g).map(str::to_owned)),
        country: first_id("P27").or_else(|| first_id("P17")),
        ig: first_str("P2003"),
        fb: first_str("P2013"),
        linkedin: first_str("P4264"),
        twitter: first_str("P2002"),
    }
}

/// `datavalue.value` of every claim of `prop` that has one.
fn claim_values<'a>(entity: &'a Value, prop: &str) -> Vec<&'a Value> {
    entity
        .get("claims")
        .and_then(|c| c.get(prop))
        .and_then(Value::as_array)
        .map(|claims| {
            claims
                .iter()
                .filter_map(|c| c.pointer("/mainsnak/datavalue/value"))
                .collect()
        })
        .unwrap_or_default()
}

fn localized<'a>(entity: &'a Value, field: &str, lang: &str) -> Option<&'a Value> {
    let values = entity.get(field)?;
    values.get(lang).or_else(|| values.get("en"))
}

fn label(entity: &Value, lang: &str) -> Option<String> {
    localized(entity, "labels", lang).and_then(|l| str_field(l, "value"))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}
