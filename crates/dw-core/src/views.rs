//! Canned analysis views over the fixed company datasets.
//!
//! Four filenames in the data directory carry fixed roles: `companies`
//! (with the `industry` dimension), `prizes` (joined to companies on
//! `company`), `funds` (with `date_added` and `value` for the time series)
//! and `employees`. Each view loads through the store and composes the
//! aggregator; chart drawing stays with the caller.

use crate::aggregate::{filter_eq, group_count, inner_join, to_numeric, unique_values};
use crate::error::{Error, Result};
use crate::store::DatasetStore;
use crate::table::Table;
use chrono::NaiveDate;

/// Dataset name for the companies table
pub const COMPANIES: &str = "companies";
/// Dataset name for the prizes table
pub const PRIZES: &str = "prizes";
/// Dataset name for the funds table
pub const FUNDS: &str = "funds";
/// Dataset name for the employees table
pub const EMPLOYEES: &str = "employees";

/// Join key shared between prizes and companies
const JOIN_KEY: &str = "company";
/// Filter dimension carried by the companies table
const INDUSTRY: &str = "industry";
/// Date column of the funds table
const DATE_ADDED: &str = "date_added";
/// Value column of the funds table
const VALUE: &str = "value";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn load_full(store: &mut DatasetStore, name: &str) -> Result<Table> {
    let dataset = store.dataset(name)?;
    store.load(&dataset, None, None)
}

fn prizes_with_industry(store: &mut DatasetStore) -> Result<Table> {
    let prizes = load_full(store, PRIZES)?;
    let companies = load_full(store, COMPANIES)?;
    inner_join(&prizes, &companies, JOIN_KEY)
}

/// Industries available for the prizes histogram, in first-occurrence order
pub fn industries(store: &mut DatasetStore) -> Result<Vec<String>> {
    let joined = prizes_with_industry(store)?;
    unique_values(&joined, INDUSTRY)
}

/// Prize counts per company within one industry: the data behind the
/// "prizes by industry" histogram.
pub fn prizes_by_industry(
    store: &mut DatasetStore,
    industry: &str,
) -> Result<Vec<(String, usize)>> {
    let joined = prizes_with_industry(store)?;
    let filtered = filter_eq(&joined, INDUSTRY, industry)?;
    group_count(&filtered, JOIN_KEY)
}

/// Coordinate pairs for a scatter plot over two numeric columns of the
/// companies table. Cells that fail numeric coercion drop the whole row;
/// if nothing survives the pair is reported as having no plottable data.
pub fn scatter_points(
    store: &mut DatasetStore,
    x_column: &str,
    y_column: &str,
) -> Result<Vec<(f64, f64)>> {
    let companies = load_full(store, COMPANIES)?;
    let xs = to_numeric(&companies, x_column)?;
    let ys = to_numeric(&companies, y_column)?;

    let points: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| x.zip(y))
        .collect();

    if points.is_empty() {
        return Err(Error::NoPlottableData {
            x: x_column.to_string(),
            y: y_column.to_string(),
        });
    }
    Ok(points)
}

/// Companies available for the funding time series, in first-occurrence order
pub fn fund_companies(store: &mut DatasetStore) -> Result<Vec<String>> {
    let funds = load_full(store, FUNDS)?;
    unique_values(&funds, JOIN_KEY)
}

/// Funding events for one company, ordered by date: the data behind the
/// funding-over-time line. Rows whose date or value does not parse are
/// dropped rather than reported.
pub fn funding_over_time(
    store: &mut DatasetStore,
    company: &str,
) -> Result<Vec<(NaiveDate, f64)>> {
    let funds = load_full(store, FUNDS)?;
    let filtered = filter_eq(&funds, JOIN_KEY, company)?;

    let date_idx = filtered
        .column_index(DATE_ADDED)
        .ok_or_else(|| Error::UnknownColumn {
            column: DATE_ADDED.to_string(),
        })?;
    let values = to_numeric(&filtered, VALUE)?;

    let mut series: Vec<(NaiveDate, f64)> = filtered
        .rows
        .iter()
        .zip(values)
        .filter_map(|(row, value)| {
            let date = row.get(date_idx).and_then(|cell| {
                NaiveDate::parse_from_str(&cell.to_string_value(), DATE_FORMAT).ok()
            })?;
            Some((date, value?))
        })
        .collect();

    if series.is_empty() {
        return Err(Error::NoPlottableData {
            x: DATE_ADDED.to_string(),
            y: VALUE.to_string(),
        });
    }

    series.sort_by_key(|(date, _)| *date);
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_store() -> (tempfile::TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("companies.csv"),
            "company,industry,initial_funds,initial_employees\n\
             Acme,tech,1000,10\n\
             Globex,tech,2000,25\n\
             Initech,bio,n/a,5\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("prizes.csv"),
            "company,prize\nAcme,Best Widget\nAcme,Fastest Growth\nGlobex,Best Widget\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("funds.csv"),
            "company,date_added,value\n\
             Acme,2023-03-01,500\n\
             Acme,2023-01-15,200\n\
             Globex,2023-02-10,900\n\
             Acme,bad-date,100\n",
        )
        .unwrap();
        let store = DatasetStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_industries() {
        let (_dir, mut store) = fixture_store();
        assert_eq!(industries(&mut store).unwrap(), vec!["tech"]);
    }

    #[test]
    fn test_prizes_by_industry() {
        let (_dir, mut store) = fixture_store();
        let counts = prizes_by_industry(&mut store, "tech").unwrap();
        assert_eq!(
            counts,
            vec![("Acme".to_string(), 2), ("Globex".to_string(), 1)]
        );
    }

    #[test]
    fn test_prizes_by_industry_no_matches() {
        let (_dir, mut store) = fixture_store();
        let counts = prizes_by_industry(&mut store, "bio").unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_scatter_points_drops_unparseable_rows() {
        let (_dir, mut store) = fixture_store();
        let points =
            scatter_points(&mut store, "initial_funds", "initial_employees").unwrap();
        // Initech's funds don't coerce, so only two rows survive
        assert_eq!(points, vec![(1000.0, 10.0), (2000.0, 25.0)]);
    }

    #[test]
    fn test_scatter_points_nothing_plottable() {
        let (_dir, mut store) = fixture_store();
        let err = scatter_points(&mut store, "company", "industry").unwrap_err();
        assert!(matches!(err, Error::NoPlottableData { .. }));
    }

    #[test]
    fn test_fund_companies() {
        let (_dir, mut store) = fixture_store();
        assert_eq!(fund_companies(&mut store).unwrap(), vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_funding_over_time_sorted() {
        let (_dir, mut store) = fixture_store();
        let series = funding_over_time(&mut store, "Acme").unwrap();

        // bad-date row drops out, the rest come back in date order
        assert_eq!(
            series,
            vec![
                (NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(), 200.0),
                (NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(), 500.0),
            ]
        );
    }

    #[test]
    fn test_funding_over_time_unknown_company() {
        let (_dir, mut store) = fixture_store();
        let err = funding_over_time(&mut store, "Hooli").unwrap_err();
        assert!(matches!(err, Error::NoPlottableData { .. }));
    }
}
