//! BLS State and Metro Area Employment (SM) series.
//!
//! Series ids follow the SM layout: `SMU` (not seasonally adjusted), two-digit
//! state FIPS, five-digit area code, then `0000000001` for total nonfarm
//! employment in thousands.

use super::html::Document;

pub const BLS_TIMESERIES_URL: &str = "https://data.bls.gov/timeseries";

pub fn series_id(state_fips: &str, area_code: &str) -> String {
    format!("SMU{}{}0000000001", state_fips, area_code)
}

pub fn series_url(base: &str, series_id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), series_id)
}

/// The two latest values from the first month column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmploymentSeries {
    pub most_recent: f64,
    pub previous_year: f64,
}

impl EmploymentSeries {
    pub fn job_growth(&self) -> Option<f64> {
        job_growth(self.most_recent, self.previous_year)
    }
}

/// Fractional change from `previous_year` to `most_recent`; `None` when the
/// base is zero.
pub fn job_growth(most_recent: f64, previous_year: f64) -> Option<f64> {
    if previous_year == 0.0 {
        return None;
    }
    Some((most_recent - previous_year) / previous_year)
}

/// `"4,512.3(P)"` → `4512.3`. Preliminary markers and footnotes are dropped.
fn series_value(text: &str) -> Option<f64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

/// Read the first data cell of every row in `#table0`.
pub fn parse_employment_series(html: &str) -> Option<EmploymentSeries> {
    let doc = Document::new(html);
    let table = doc.find_by_id("table0")?;

    let values: Vec<f64> = table
        .children("tr")
        .iter()
        .filter_map(|row| row.children("td").first().map(|td| td.own_text()))
        .filter_map(|text| series_value(&text))
        .collect();

    match values.as_slice() {
        [.., previous_year, most_recent] => Some(EmploymentSeries {
            most_recent: *most_recent,
            previous_year: *previous_year,
        }),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::SERIES_PAGE;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_series_id_and_url() {
        let id = series_id("37", "39580");
        assert_eq!(id, "SMU37395800000000001");
        assert_eq!(id.len(), 20);
        assert_eq!(
            series_url(BLS_TIMESERIES_URL, &id),
            "https://data.bls.gov/timeseries/SMU37395800000000001"
        );
    }

    #[test]
    fn test_parse_last_two_rows() {
        let series = parse_employment_series(SERIES_PAGE).unwrap();
        assert_eq!(series.most_recent, 1050.0);
        assert_eq!(series.previous_year, 1000.0);
        assert_relative_eq!(series.job_growth().unwrap(), 0.05, max_relative = 1e-12);
    }

    #[test]
    fn test_parse_needs_two_values() {
        let one_row = r#"<table id="table0"><tbody><tr><th>2024</th><td>5.0</td></tr></tbody></table>"#;
        assert!(parse_employment_series(one_row).is_none());
        assert!(parse_employment_series("<p>Series does not exist</p>").is_none());
    }

    #[test]
    fn test_job_growth_zero_base() {
        assert_eq!(job_growth(10.0, 0.0), None);
        assert_relative_eq!(job_growth(90.0, 100.0).unwrap(), -0.1);
    }
}
