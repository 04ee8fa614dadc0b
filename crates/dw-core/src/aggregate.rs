//! Cross-dataset aggregation: inner joins, equality filters, group counts
//! and numeric coercion for chart data.

use crate::error::{Error, Result};
use crate::table::{CellValue, Row, Table};
use std::collections::{HashMap, HashSet};

/// Inner-join `left` and `right` on equal values of `join_column`, then keep
/// only rows where `filter_column` equals `filter_value`.
pub fn join_and_filter(
    left: &Table,
    right: &Table,
    join_column: &str,
    filter_column: &str,
    filter_value: &str,
) -> Result<Table> {
    let joined = inner_join(left, right, join_column)?;
    filter_eq(&joined, filter_column, filter_value)
}

/// Inner-join two tables on equal values of `join_column`.
///
/// Every (left row, right row) pair whose join cells match is emitted; rows
/// without a match on either side are dropped, as are rows whose join cell
/// is empty. Output columns are all of `left`'s followed by `right`'s minus
/// the join column; a right column colliding with a left name keeps its data
/// under a `_right` suffix.
pub fn inner_join(left: &Table, right: &Table, join_column: &str) -> Result<Table> {
    let left_key = left
        .column_index(join_column)
        .ok_or_else(|| Error::UnknownColumn {
            column: join_column.to_string(),
        })?;
    let right_key = right
        .column_index(join_column)
        .ok_or_else(|| Error::UnknownColumn {
            column: join_column.to_string(),
        })?;

    let mut names: Vec<String> = left.columns.iter().map(|c| c.name.clone()).collect();
    let mut carried: Vec<usize> = Vec::new();
    for (idx, col) in right.columns.iter().enumerate() {
        if idx == right_key {
            continue;
        }
        carried.push(idx);
        if left.column_index(&col.name).is_some() {
            names.push(format!("{}_right", col.name));
        } else {
            names.push(col.name.clone());
        }
    }

    // Bucket right rows by join value so the pairing pass is one lookup per
    // left row instead of a full scan.
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows.iter().enumerate() {
        let cell = row.get(right_key).unwrap_or(&CellValue::Empty);
        if cell.is_empty() {
            continue;
        }
        buckets.entry(cell.to_string_value()).or_default().push(idx);
    }

    let mut out = Table::with_columns(names);
    for left_row in &left.rows {
        let cell = left_row.get(left_key).unwrap_or(&CellValue::Empty);
        if cell.is_empty() {
            continue;
        }

        let Some(matches) = buckets.get(&cell.to_string_value()) else {
            continue;
        };

        for &right_idx in matches {
            let right_row = &right.rows[right_idx];
            let mut cells = left_row.cells.clone();
            for &col_idx in &carried {
                cells.push(
                    right_row
                        .get(col_idx)
                        .cloned()
                        .unwrap_or(CellValue::Empty),
                );
            }
            out.rows.push(Row::new(cells));
        }
    }

    Ok(out)
}

/// Keep only the rows where `column` equals `value` (display-form equality)
pub fn filter_eq(table: &Table, column: &str, value: &str) -> Result<Table> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| Error::UnknownColumn {
            column: column.to_string(),
        })?;

    let wanted = value.trim();
    let mut out = table.clone();
    out.rows.retain(|row| {
        row.get(idx)
            .is_some_and(|cell| cell.to_string_value() == wanted)
    });
    Ok(out)
}

/// Distinct non-empty display values of `column`, in first-occurrence order
pub fn unique_values(table: &Table, column: &str) -> Result<Vec<String>> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| Error::UnknownColumn {
            column: column.to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in &table.rows {
        let cell = row.get(idx).unwrap_or(&CellValue::Empty);
        if cell.is_empty() {
            continue;
        }
        let value = cell.to_string_value();
        if seen.insert(value.clone()) {
            values.push(value);
        }
    }

    Ok(values)
}

/// Row count per distinct value of `group_column`, in first-occurrence
/// order. Rows with an empty group cell are skipped. The contract is exact
/// counts; presentation order is up to the caller.
pub fn group_count(table: &Table, group_column: &str) -> Result<Vec<(String, usize)>> {
    let idx = table
        .column_index(group_column)
        .ok_or_else(|| Error::UnknownColumn {
            column: group_column.to_string(),
        })?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in &table.rows {
        let cell = row.get(idx).unwrap_or(&CellValue::Empty);
        if cell.is_empty() {
            continue;
        }
        let key = cell.to_string_value();
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    Ok(counts)
}

/// Numeric view of a column: integers, floats and numeric text convert,
/// everything else becomes `None`. Never fails on cell content, only on an
/// unknown column.
pub fn to_numeric(table: &Table, column: &str) -> Result<Vec<Option<f64>>> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| Error::UnknownColumn {
            column: column.to_string(),
        })?;

    Ok(table
        .rows
        .iter()
        .map(|row| row.get(idx).and_then(|cell| cell.as_f64()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn prizes() -> Table {
        parse_csv_str(
            "company,prize\nAcme,Best Widget\nAcme,Fastest Growth\nGlobex,Best Widget\nHooli,Moonshot\n",
        )
        .unwrap()
    }

    fn companies() -> Table {
        parse_csv_str(
            "company,industry\nAcme,tech\nGlobex,tech\nInitech,bio\n",
        )
        .unwrap()
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let joined = inner_join(&prizes(), &companies(), "company").unwrap();

        // Hooli has no company entry and Initech no prizes; both drop out
        assert_eq!(joined.column_names(), vec!["company", "prize", "industry"]);
        assert_eq!(joined.row_count(), 3);
        for row in &joined.rows {
            assert_ne!(row.cells[0], CellValue::Text("Hooli".to_string()));
        }
    }

    #[test]
    fn test_inner_join_emits_all_pairs() {
        let left = parse_csv_str("k,a\n1,x\n1,y\n").unwrap();
        let right = parse_csv_str("k,b\n1,p\n1,q\n").unwrap();

        let joined = inner_join(&left, &right, "k").unwrap();
        assert_eq!(joined.row_count(), 4);
    }

    #[test]
    fn test_inner_join_is_symmetric() {
        let a = inner_join(&prizes(), &companies(), "company").unwrap();
        let b = inner_join(&companies(), &prizes(), "company").unwrap();

        // same joined row set either way, column order aside
        let normalize = |table: &Table| {
            let mut rows: Vec<Vec<String>> = table
                .rows
                .iter()
                .map(|row| {
                    let mut cells: Vec<String> =
                        row.cells.iter().map(|c| c.to_string_value()).collect();
                    cells.sort();
                    cells
                })
                .collect();
            rows.sort();
            rows
        };
        assert_eq!(normalize(&a), normalize(&b));
    }

    #[test]
    fn test_inner_join_suffixes_colliding_columns() {
        let left = parse_csv_str("k,name\n1,left-name\n").unwrap();
        let right = parse_csv_str("k,name\n1,right-name\n").unwrap();

        let joined = inner_join(&left, &right, "k").unwrap();
        assert_eq!(joined.column_names(), vec!["k", "name", "name_right"]);
        assert_eq!(
            joined.rows[0].cells[2],
            CellValue::Text("right-name".to_string())
        );
    }

    #[test]
    fn test_inner_join_skips_empty_keys() {
        let left = parse_csv_str("k,a\n,x\n1,y\n").unwrap();
        let right = parse_csv_str("k,b\n,p\n1,q\n").unwrap();

        let joined = inner_join(&left, &right, "k").unwrap();
        assert_eq!(joined.row_count(), 1);
    }

    #[test]
    fn test_inner_join_unknown_column() {
        let err = inner_join(&prizes(), &companies(), "ticker").unwrap_err();
        assert!(matches!(err, Error::UnknownColumn { .. }));
    }

    #[test]
    fn test_join_and_filter_then_group() {
        // worked example: filter industry == tech, group by company
        let table = parse_csv_str(
            "company,industry\nA,tech\nB,tech\nC,bio\n",
        )
        .unwrap();
        let filtered = filter_eq(&table, "industry", "tech").unwrap();
        let counts = group_count(&filtered, "company").unwrap();

        assert_eq!(
            counts,
            vec![("A".to_string(), 1), ("B".to_string(), 1)]
        );
    }

    #[test]
    fn test_group_count_totals_match_row_count() {
        let joined = join_and_filter(&prizes(), &companies(), "company", "industry", "tech")
            .unwrap();
        let counts = group_count(&joined, "company").unwrap();

        let total: usize = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, joined.row_count());
        assert_eq!(
            counts,
            vec![("Acme".to_string(), 2), ("Globex".to_string(), 1)]
        );
    }

    #[test]
    fn test_filter_eq_numeric_display_match() {
        let table = parse_csv_str("id,name\n1,foo\n2,bar\n").unwrap();
        let filtered = filter_eq(&table, "id", "2").unwrap();

        assert_eq!(filtered.row_count(), 1);
        assert_eq!(filtered.rows[0].cells[1], CellValue::Text("bar".to_string()));
    }

    #[test]
    fn test_unique_values_first_occurrence_order() {
        let table =
            parse_csv_str("company,industry\nA,tech\nB,bio\nC,tech\nD,\nE,media\n").unwrap();
        let values = unique_values(&table, "industry").unwrap();
        assert_eq!(values, vec!["tech", "bio", "media"]);
    }

    #[test]
    fn test_to_numeric_coerces_and_drops() {
        let table = parse_csv_str("id,value\n1,10\n2,2.5\n3,n/a\n4,\n").unwrap();
        let numeric = to_numeric(&table, "value").unwrap();
        assert_eq!(numeric, vec![Some(10.0), Some(2.5), None, None]);
    }
}
