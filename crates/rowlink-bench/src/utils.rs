//! Benchmark utilities and helpers.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowlink_core::native::{Cell, ColumnDescription, ScriptedStatement, SqlDataType};

/// Generates random string data for benchmarks.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates random bytes for benchmarks.
pub fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen()).collect()
}

/// A narrow table of bindable columns:
/// `(id INTEGER, name VARCHAR(32), score DOUBLE, active BIT)`.
pub fn bound_table(rows: usize) -> ScriptedStatement {
    let mut rng = StdRng::seed_from_u64(42);
    let columns = vec![
        ColumnDescription::new("id", SqlDataType::INTEGER, 10),
        ColumnDescription::new("name", SqlDataType::VARCHAR, 32),
        ColumnDescription::new("score", SqlDataType::DOUBLE, 15),
        ColumnDescription::new("active", SqlDataType::BIT, 1),
    ];

    let data = (0..rows).map(|i| {
        let len = rng.gen_range(4..32);
        vec![
            Cell::long(i32::try_from(i).unwrap_or(i32::MAX)),
            Cell::text(&random_string(&mut rng, len)),
            if rng.gen_bool(0.1) {
                Cell::null()
            } else {
                Cell::double(rng.gen_range(0.0..100.0))
            },
            Cell::bit(rng.gen()),
        ]
    });
    ScriptedStatement::new(columns).with_rows(data.collect::<Vec<_>>())
}

/// A table of long columns read in chunks:
/// `(id INTEGER, body LONGVARCHAR, blob LONGVARBINARY)`.
pub fn chunked_table(rows: usize, value_size: usize) -> ScriptedStatement {
    let mut rng = StdRng::seed_from_u64(42);
    let columns = vec![
        ColumnDescription::new("id", SqlDataType::INTEGER, 10),
        ColumnDescription::new("body", SqlDataType::LONGVARCHAR, 0),
        ColumnDescription::new("blob", SqlDataType::LONGVARBINARY, 0),
    ];

    let data = (0..rows).map(|i| {
        vec![
            Cell::long(i32::try_from(i).unwrap_or(i32::MAX)),
            Cell::text(&random_string(&mut rng, value_size)),
            Cell::binary(&random_bytes(&mut rng, value_size)),
        ]
    });
    ScriptedStatement::new(columns).with_rows(data.collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_have_requested_rows() {
        assert_eq!(bound_table(10).row_count(), 10);
        assert_eq!(chunked_table(3, 64).row_count(), 3);
    }

    #[test]
    fn test_random_data_is_deterministic() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(random_string(&mut a, 16), random_string(&mut b, 16));
        assert_eq!(random_bytes(&mut a, 16), random_bytes(&mut b, 16));
    }
}
