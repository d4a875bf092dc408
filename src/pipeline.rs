//! Per-state scan: city list → city pages → nearest metro → BLS job growth.

use crate::error::Result;
use crate::export::{export_csv, DataTable};
use crate::location::{LocationResolver, MetroMatch};
use crate::persist;
use crate::scrape::city::{city_list_url, city_page_url, parse_city_list, scrape_fields, CityValues, CITY_FIELDS};
use crate::scrape::labor::{parse_employment_series, series_id, series_url};
use crate::scrape::Fetch;
use crate::states::State;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

pub const CITY_COLUMN: &str = "City";
pub const METRO_COLUMN: &str = "Closest Metro Area";
pub const DISTANCE_COLUMN: &str = "Distance To Metro (km)";
pub const JOB_GROWTH_COLUMN: &str = "Job Growth (%)";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub min_population: u64,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Read `<state>_cities_population.json` instead of fetching the list page.
    pub reuse_city_list: bool,
    pub city_data_url: String,
    pub bls_url: String,
}

/// One processed city.
#[derive(Debug, Clone)]
pub struct CityRecord {
    pub city: String,
    pub metro: Option<MetroMatch>,
    pub fields: CityValues,
    /// Fractional change, e.g. `0.021` for 2.1%.
    pub job_growth: Option<f64>,
}

impl CityRecord {
    fn to_row(&self) -> Vec<Option<String>> {
        let mut row = Vec::with_capacity(self.fields.len() + 4);
        row.push(Some(self.city.clone()));
        row.push(self.metro.as_ref().map(|m| m.area.name.clone()));
        row.push(self.metro.as_ref().map(|m| format!("{:.1}", m.distance_km)));
        row.extend(self.fields.iter().map(|(_, v)| v.as_ref().map(|v| v.to_string())));
        row.push(self.job_growth.map(|g| format!("{:.2}", g * 100.0)));
        row
    }
}

/// What happened for one state.
#[derive(Debug, Clone)]
pub struct StateReport {
    pub state: &'static str,
    pub listed: usize,
    pub processed: usize,
    pub with_job_growth: usize,
    pub output: Option<PathBuf>,
}

/// Header row: city, metro, distance, every city field, job growth.
pub fn city_table() -> DataTable {
    let mut headers = vec![CITY_COLUMN, METRO_COLUMN, DISTANCE_COLUMN];
    headers.extend(CITY_FIELDS.iter().map(|f| f.name));
    headers.push(JOB_GROWTH_COLUMN);
    DataTable::new(headers)
}

pub struct Pipeline<'a, F: Fetch> {
    fetcher: &'a F,
    resolver: &'a mut LocationResolver,
    options: RunOptions,
}

impl<'a, F: Fetch> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, resolver: &'a mut LocationResolver, options: RunOptions) -> Self {
        Self {
            fetcher,
            resolver,
            options,
        }
    }

    /// Run every state in order. Only file I/O failures abort the run.
    pub fn run(&mut self, states: &[&'static State]) -> Result<Vec<StateReport>> {
        let mut reports = Vec::with_capacity(states.len());
        for &state in states {
            reports.push(self.run_state(state)?);
        }
        info!("scraping complete for all states");
        Ok(reports)
    }

    pub fn run_state(&mut self, state: &'static State) -> Result<StateReport> {
        let mut report = StateReport {
            state: state.name,
            listed: 0,
            processed: 0,
            with_job_growth: 0,
            output: None,
        };

        let Some(cities) = self.city_list(state)? else {
            return Ok(report);
        };
        report.listed = cities.len();

        let mut table = city_table();
        for city in cities.keys() {
            if let Some(record) = self.process_city(city, state) {
                report.processed += 1;
                if record.job_growth.is_some() {
                    report.with_job_growth += 1;
                }
                table.push_row(record.to_row());
            }
        }

        if !table.is_empty() {
            let path = self
                .options
                .output_dir
                .join(format!("scraped_population_and_job_data_{}.csv", state.file_stem()));
            export_csv(&table, &path)?;
            report.output = Some(path);
        }
        info!(
            state = state.name,
            listed = report.listed,
            processed = report.processed,
            "scraping complete for state"
        );
        Ok(report)
    }

    fn city_list_path(&self, state: &State) -> PathBuf {
        self.options
            .data_dir
            .join(format!("{}_cities_population.json", state.file_stem()))
    }

    /// Fetch and store the state's city list, or reuse the stored one.
    /// `None` if the list page could not be fetched.
    fn city_list(&self, state: &State) -> Result<Option<BTreeMap<String, u64>>> {
        let path = self.city_list_path(state);

        if self.options.reuse_city_list {
            if let Some(cities) = persist::read_json::<BTreeMap<String, u64>>(&path)? {
                info!(state = state.name, cities = cities.len(), "reusing stored city list");
                return Ok(Some(cities));
            }
            warn!(path = %path.display(), "no stored city list; fetching");
        }

        let url = city_list_url(&self.options.city_data_url, state);
        let html = match self.fetcher.fetch(&url) {
            Ok(html) => html,
            Err(e) => {
                warn!(state = state.name, error = %e, "failed to retrieve city list");
                return Ok(None);
            }
        };
        let cities = parse_city_list(&html, state.abbrev, self.options.min_population);
        persist::write_json(&path, &cities)?;
        info!(state = state.name, cities = cities.len(), "city list saved");
        Ok(Some(cities))
    }

    /// Scrape one city. `None` if its page could not be fetched.
    pub fn process_city(&mut self, city: &str, state: &State) -> Option<CityRecord> {
        info!("Scraping {}, {}", city, state.name);
        let url = city_page_url(&self.options.city_data_url, city, state);
        let html = match self.fetcher.fetch(&url) {
            Ok(html) => html,
            Err(e) => {
                warn!(city, error = %e, "failed to retrieve city page");
                return None;
            }
        };
        let fields = scrape_fields(&html, CITY_FIELDS, &url);

        let target = format!("{}, {}", city, state.abbrev);
        let found = self.resolver.find_closest_metro_area(&target);
        // Metro and job growth are reported together or not at all.
        let (metro, job_growth) = match found.and_then(|m| self.job_growth(state, &m).map(|g| (m, g))) {
            Some((m, g)) => (Some(m), g),
            None => (None, None),
        };

        Some(CityRecord {
            city: city.to_string(),
            metro,
            fields,
            job_growth,
        })
    }

    /// `Some(growth)` when the series page was read; growth itself is `None`
    /// for a zero base.
    fn job_growth(&self, state: &State, metro: &MetroMatch) -> Option<Option<f64>> {
        let url = series_url(&self.options.bls_url, &series_id(state.fips, &metro.area.area_code));
        let html = match self.fetcher.fetch(&url) {
            Ok(html) => html,
            Err(e) => {
                warn!(metro = %metro.area.name, error = %e, "failed to retrieve employment series");
                return None;
            }
        };
        match parse_employment_series(&html) {
            Some(series) => Some(series.job_growth()),
            None => {
                warn!(url = %url, "failed to extract job data");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::providers::fake::FakeGeocoder;
    use crate::location::{Coordinate, CoordinateCache, MetroArea, MetroRegistry};
    use crate::scrape::city::fixtures::{CITY_PAGE, STATE_PAGE};
    use crate::scrape::fake::FakeFetch;
    use crate::scrape::labor::fixtures::SERIES_PAGE;
    use crate::states;
    use std::fs;
    use tempfile::TempDir;

    const CITY_BASE: &str = "http://city.test/city";
    const BLS_BASE: &str = "http://bls.test/timeseries";

    fn registry() -> MetroRegistry {
        MetroRegistry::from_areas(vec![
            MetroArea {
                name: "Raleigh, NC".into(),
                area_code: "39580".into(),
                coordinate: Some(Coordinate { lat: 35.78, lon: -78.64 }),
            },
            MetroArea {
                name: "Charlotte-Concord-Gastonia, NC-SC".into(),
                area_code: "16740".into(),
                coordinate: Some(Coordinate { lat: 35.23, lon: -80.84 }),
            },
        ])
    }

    fn options(dir: &TempDir, reuse_city_list: bool) -> RunOptions {
        RunOptions {
            min_population: 50_000,
            data_dir: dir.path().join("data"),
            output_dir: dir.path().join("out"),
            reuse_city_list,
            city_data_url: CITY_BASE.into(),
            bls_url: BLS_BASE.into(),
        }
    }

    fn resolver(dir: &TempDir) -> LocationResolver {
        let cache = CoordinateCache::load_from(dir.path().join("data").join("city_data.json")).unwrap();
        let geocoder = FakeGeocoder::new(&[
            ("Charlotte, NC", 35.23, -80.84),
            ("Durham, NC", 35.99, -78.90),
            ("Winston-Salem, NC", 36.10, -80.24),
        ]);
        LocationResolver::new(registry(), cache, Box::new(geocoder))
    }

    #[test]
    fn test_city_table_headers() {
        let table = city_table();
        let headers: Vec<&str> = table.headers().collect();
        assert_eq!(headers.len(), 16);
        assert_eq!(headers[0], CITY_COLUMN);
        assert_eq!(headers[2], DISTANCE_COLUMN);
        assert_eq!(headers[3], "Population in 2022");
        assert_eq!(headers[15], JOB_GROWTH_COLUMN);
    }

    #[test]
    fn test_end_to_end_state() {
        let dir = TempDir::new().unwrap();
        let fetch = FakeFetch::default()
            .with("http://city.test/city/North-Carolina.html", STATE_PAGE)
            .with("http://city.test/city/Charlotte-North-Carolina.html", CITY_PAGE)
            .with("http://city.test/city/Durham-North-Carolina.html", CITY_PAGE)
            // Winston-Salem's page is missing: the city is skipped.
            .with("http://bls.test/timeseries/SMU37395800000000001", SERIES_PAGE);
        let mut resolver = resolver(&dir);
        let nc = states::lookup("NC").unwrap();

        let report = Pipeline::new(&fetch, &mut resolver, options(&dir, false))
            .run_state(nc)
            .unwrap();

        assert_eq!(report.listed, 3);
        assert_eq!(report.processed, 2);
        // Charlotte's series (16740) is not served, so only Durham has growth.
        assert_eq!(report.with_job_growth, 1);

        let list = fs::read_to_string(dir.path().join("data/northcarolina_cities_population.json")).unwrap();
        let list: BTreeMap<String, u64> = serde_json::from_str(&list).unwrap();
        assert_eq!(list.len(), 3);

        let output = report.output.unwrap();
        assert_eq!(output, dir.path().join("out/scraped_population_and_job_data_northcarolina.csv"));

        let mut rdr = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        assert_eq!(&rows[0][0], "Charlotte");
        assert_eq!(&rows[0][1], "");
        assert_eq!(&rows[0][15], "");

        assert_eq!(&rows[1][0], "Durham");
        assert_eq!(&rows[1][1], "Raleigh, NC");
        assert_eq!(&rows[1][3], "291928");
        assert_eq!(&rows[1][15], "5.00");

        // Charlotte and Durham were geocoded; Winston-Salem never got that far.
        assert_eq!(resolver.cache().len(), 2);
    }

    #[test]
    fn test_list_page_failure_skips_state() {
        let dir = TempDir::new().unwrap();
        let fetch = FakeFetch::default();
        let mut resolver = resolver(&dir);

        let report = Pipeline::new(&fetch, &mut resolver, options(&dir, false))
            .run_state(states::lookup("GA").unwrap())
            .unwrap();

        assert_eq!(report.listed, 0);
        assert!(report.output.is_none());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_reuse_city_list_skips_list_page() {
        let dir = TempDir::new().unwrap();
        persist::write_json(
            &dir.path().join("data/northcarolina_cities_population.json"),
            &BTreeMap::from([("Durham".to_string(), 291_928u64)]),
        )
        .unwrap();
        let fetch = FakeFetch::default().with("http://city.test/city/Durham-North-Carolina.html", CITY_PAGE);
        let mut resolver = resolver(&dir);

        let report = Pipeline::new(&fetch, &mut resolver, options(&dir, true))
            .run_state(states::lookup("NC").unwrap())
            .unwrap();

        assert_eq!(report.processed, 1);
        assert!(!fetch
            .requested()
            .iter()
            .any(|u| u == "http://city.test/city/North-Carolina.html"));
    }
}
