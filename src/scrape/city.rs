//! city-data.com: state city lists and per-city statistics pages.

use super::html::{Anchor, Document, Extract, Selector, Step};
use super::value::FieldValue;
use crate::states::State;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const CITY_DATA_BASE_URL: &str = "https://www.city-data.com/city";

/// A named statistic and where it lives on a city page.
#[derive(Debug, Clone, Copy)]
pub struct CityField {
    pub name: &'static str,
    pub selector: Selector,
}

const fn following(id: &'static str, steps: &'static [Step]) -> Selector {
    Selector {
        anchor: Anchor::Id(id),
        steps,
        extract: Extract::FollowingText,
    }
}

/// The statistics collected for every city, in export column order.
pub const CITY_FIELDS: &[CityField] = &[
    CityField {
        name: "Population in 2022",
        selector: following("city-population", &[Step::nth("b", 1)]),
    },
    CityField {
        name: "Population change since 2000 (%)",
        selector: following("city-population", &[Step::nth("b", 2)]),
    },
    CityField {
        name: "Median household income in 2022",
        selector: following("median-income", &[Step::nth("b", 1)]),
    },
    CityField {
        name: "Median household income in 2000",
        selector: following("median-income", &[Step::nth("b", 2)]),
    },
    CityField {
        name: "Median condo value in 2022",
        selector: following("median-income", &[Step::nth("b", 7)]),
    },
    CityField {
        name: "Median condo value in 2000",
        selector: following("median-income", &[Step::nth("b", 8)]),
    },
    CityField {
        name: "Median contract rent",
        selector: Selector {
            anchor: Anchor::Id("median-rent"),
            steps: &[Step::nth("p", 1)],
            extract: Extract::OwnText,
        },
    },
    CityField {
        name: "Poverty percentage",
        selector: following("poverty-level", &[Step::nth("b", 1)]),
    },
    CityField {
        name: "Largest ethnicity percentage",
        selector: Selector {
            anchor: Anchor::Id("races-graph"),
            steps: &[
                Step::nth("div", 1),
                Step::nth("ul", 1),
                Step::nth("li", 2),
                Step::nth("ul", 1),
                Step::nth("li", 1),
                Step::nth("span", 2),
            ],
            extract: Extract::OwnText,
        },
    },
    CityField {
        name: "Largest ethnicity slice",
        selector: Selector {
            anchor: Anchor::Id("races-graph"),
            steps: &[
                Step::nth("div", 1),
                Step::nth("ul", 1),
                Step::nth("li", 2),
                Step::nth("ul", 1),
                Step::nth("li", 1),
                Step::nth("b", 1),
            ],
            extract: Extract::OwnText,
        },
    },
    CityField {
        name: "Most recent crime index",
        selector: Selector {
            anchor: Anchor::Id("crimeTab"),
            steps: &[Step::nth("tfoot", 1), Step::nth("tr", 1), Step::last("td")],
            extract: Extract::Text,
        },
    },
    CityField {
        name: "Unemployment rate",
        selector: Selector {
            anchor: Anchor::Id("unemployment"),
            steps: &[Step::nth("div", 1), Step::nth("table", 1), Step::nth("tr", 1), Step::nth("td", 2)],
            extract: Extract::OwnText,
        },
    },
];

/// Scraped values keyed by field name, in field order.
pub type CityValues = Vec<(&'static str, Option<FieldValue>)>;

/// Extract every field from a city page. Missing fields are logged and `None`.
pub fn scrape_fields(html: &str, fields: &[CityField], source: &str) -> CityValues {
    let doc = Document::new(html);
    fields
        .iter()
        .map(|field| {
            let value = field.selector.select(&doc).and_then(|text| FieldValue::parse(&text));
            if value.is_none() {
                warn!(field = field.name, url = source, "field not found");
            }
            (field.name, value)
        })
        .collect()
}

/// Cities listed in the state page's `tabBlue` table with population above
/// `min_population`.
pub fn parse_city_list(html: &str, state_abbrev: &str, min_population: u64) -> BTreeMap<String, u64> {
    let doc = Document::new(html);
    let mut cities = BTreeMap::new();
    let Some(table) = doc.find_by_class("tabBlue") else {
        warn!("city list table not found");
        return cities;
    };

    let suffix = format!(", {}", state_abbrev);

    for row in table.children("tr") {
        let cells = row.children("td");
        if cells.len() < 3 {
            continue;
        }
        let name_text = cells[1].text();
        let name = name_text.replace(&suffix, "");
        let name = name.trim();
        let population = cells[2].text().replace(',', "");
        match population.trim().parse::<u64>() {
            Ok(p) if p > min_population && !name.is_empty() => {
                cities.insert(name.to_string(), p);
            }
            Ok(_) => {}
            Err(_) => debug!(row = %name_text, "skipping row without a population"),
        }
    }
    cities
}

/// `https://www.city-data.com/city/North-Carolina.html`
pub fn city_list_url(base: &str, state: &State) -> String {
    format!("{}/{}.html", base.trim_end_matches('/'), state.slug())
}

/// `https://www.city-data.com/city/Winston-Salem-North-Carolina.html`
pub fn city_page_url(base: &str, city: &str, state: &State) -> String {
    let city = city.replace(' ', "-").replace('\'', "");
    format!("{}/{}-{}.html", base.trim_end_matches('/'), city, state.slug())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::states;

    fn value(values: &CityValues, name: &str) -> Option<FieldValue> {
        values.iter().find(|(n, _)| *n == name).and_then(|(_, v)| v.clone())
    }

    #[test]
    fn test_scrape_all_fields() {
        let values = scrape_fields(CITY_PAGE, CITY_FIELDS, "test");
        assert_eq!(values.len(), 12);

        assert_eq!(value(&values, "Population in 2022"), Some(FieldValue::Number(291928.0)));
        assert_eq!(
            value(&values, "Population change since 2000 (%)"),
            Some(FieldValue::Percentage(54.5))
        );
        assert_eq!(
            value(&values, "Median household income in 2022"),
            Some(FieldValue::Currency(74246.0))
        );
        assert_eq!(
            value(&values, "Median household income in 2000"),
            Some(FieldValue::Currency(37340.0))
        );
        assert_eq!(value(&values, "Median condo value in 2022"), Some(FieldValue::Currency(369590.0)));
        assert_eq!(value(&values, "Median condo value in 2000"), Some(FieldValue::Currency(117000.0)));
        assert_eq!(value(&values, "Median contract rent"), Some(FieldValue::Currency(1341.0)));
        assert_eq!(value(&values, "Poverty percentage"), Some(FieldValue::Percentage(13.8)));
        assert_eq!(
            value(&values, "Largest ethnicity percentage"),
            Some(FieldValue::Percentage(38.9))
        );
        assert_eq!(
            value(&values, "Largest ethnicity slice"),
            Some(FieldValue::Text("White alone".into()))
        );
        assert_eq!(value(&values, "Most recent crime index"), Some(FieldValue::Number(371.4)));
        assert_eq!(value(&values, "Unemployment rate"), Some(FieldValue::Percentage(3.6)));
    }

    #[test]
    fn test_bold_inside_nested_tables_is_not_counted() {
        // The chart's `<b>Durham:</b>` sits in a nested table and never shifts positions.
        let values = scrape_fields(CITY_PAGE, CITY_FIELDS, "test");
        assert_eq!(value(&values, "Median condo value in 2022"), Some(FieldValue::Currency(369590.0)));

        let flat = CITY_PAGE.replace("<b>Mean household income in 2022:</b> $102,310<br>", "");
        let values = scrape_fields(&flat, CITY_FIELDS, "test");
        assert_eq!(value(&values, "Median condo value in 2022"), Some(FieldValue::Currency(117000.0)));
    }

    #[test]
    fn test_missing_sections_are_none() {
        let values = scrape_fields("<html><body><p>404</p></body></html>", CITY_FIELDS, "test");
        assert_eq!(values.len(), CITY_FIELDS.len());
        assert!(values.iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_parse_city_list() {
        let cities = parse_city_list(STATE_PAGE, "NC", 50_000);
        let names: Vec<&str> = cities.keys().map(String::as_str).collect();
        // Apex is exactly at the threshold and excluded.
        assert_eq!(names, vec!["Charlotte", "Durham", "Winston-Salem"]);
        assert_eq!(cities["Durham"], 291_928);
    }

    #[test]
    fn test_parse_city_list_without_table() {
        assert!(parse_city_list("<html></html>", "NC", 0).is_empty());
    }

    #[test]
    fn test_urls() {
        let nc = states::lookup("North Carolina").unwrap();
        assert_eq!(
            city_list_url(CITY_DATA_BASE_URL, nc),
            "https://www.city-data.com/city/North-Carolina.html"
        );
        assert_eq!(
            city_page_url("https://www.city-data.com/city/", "Winston-Salem", nc),
            "https://www.city-data.com/city/Winston-Salem-North-Carolina.html"
        );
        let id = states::lookup("ID").unwrap();
        assert_eq!(
            city_page_url(CITY_DATA_BASE_URL, "Coeur d'Alene", id),
            "https://www.city-data.com/city/Coeur-dAlene-Idaho.html"
        );
    }
}
