//! Arrow schema for the flat conformity table.
//!
//! Money and percentages are `Decimal128(18, 2)`; values are rescaled to
//! cents before conversion so no precision is lost.

use std::sync::Arc;

use arrow::array::{ArrayRef, Decimal128Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use rust_decimal::Decimal;

use crate::money::round2;
use crate::portfolio::ConformityRow;

const PRECISION: u8 = 18;
const SCALE: i8 = 2;

fn money(name: &str) -> Field {
    Field::new(name, DataType::Decimal128(PRECISION, SCALE), false)
}

/// Schema of one [`ConformityRow`].
pub fn conformity_schema() -> Schema {
    Schema::new(vec![
        Field::new("contract_id", DataType::Utf8, false),
        Field::new("number", DataType::Utf8, true),
        Field::new("object_text", DataType::Utf8, false),
        Field::new("type_label", DataType::Utf8, false),
        Field::new("directorate", DataType::Utf8, true),
        Field::new("category", DataType::Utf8, false),
        money("ceiling_percent"),
        money("original_value"),
        money("current_value"),
        money("cumulative_amendment_value"),
        money("cumulative_amendment_percent"),
        Field::new("amendment_count", DataType::UInt32, false),
        Field::new("status", DataType::Utf8, false),
        money("remaining_percent"),
        money("remaining_value"),
    ])
}

fn cents(value: Decimal) -> i128 {
    let mut v = round2(value);
    v.rescale(SCALE as u32);
    v.mantissa()
}

fn decimal_column(
    rows: &[ConformityRow],
    get: impl Fn(&ConformityRow) -> Decimal,
) -> Result<ArrayRef, ArrowError> {
    let array = Decimal128Array::from(rows.iter().map(|r| cents(get(r))).collect::<Vec<_>>())
        .with_precision_and_scale(PRECISION, SCALE)?;
    Ok(Arc::new(array))
}

/// Build a record batch from conformity rows, in the given order.
pub fn conformity_batch(rows: &[ConformityRow]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.contract_id.as_str()),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.number.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.object_text.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.type_label.as_str()),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.directorate.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.category.code()),
        )),
        decimal_column(rows, |r| r.ceiling_percent)?,
        decimal_column(rows, |r| r.original_value)?,
        decimal_column(rows, |r| r.current_value)?,
        decimal_column(rows, |r| r.cumulative_amendment_value)?,
        decimal_column(rows, |r| r.cumulative_amendment_percent)?,
        Arc::new(UInt32Array::from_iter_values(
            rows.iter().map(|r| r.amendment_count),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.status.code()),
        )),
        decimal_column(rows, |r| r.remaining_percent)?,
        decimal_column(rows, |r| r.remaining_value)?,
    ];

    RecordBatch::try_new(Arc::new(conformity_schema()), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformity::ConformityPolicy;
    use crate::contract::NewContract;
    use arrow::array::Array;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn conformity_schema_has_expected_fields() {
        let schema = conformity_schema();
        assert_eq!(schema.fields().len(), 15);
        assert!(schema.field_with_name("status").is_ok());
        assert_eq!(
            schema.field_with_name("original_value").unwrap().data_type(),
            &DataType::Decimal128(18, 2)
        );
    }

    #[test]
    fn batch_preserves_cents() {
        let contract = NewContract {
            id: "10".into(),
            number: Some("045/2024".into()),
            type_label: "obra".into(),
            original_value: dec!(1234.567),
            ..Default::default()
        }
        .into_contract(Utc::now());
        let row = ConformityRow::from_contract(&ConformityPolicy::default(), &contract);

        let batch = conformity_batch(&[row]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 15);

        let original = batch
            .column_by_name("original_value")
            .unwrap()
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .unwrap();
        assert_eq!(original.value(0), 123457);

        let directorate = batch
            .column_by_name("directorate")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(directorate.is_null(0));
    }

    #[test]
    fn empty_batch() {
        let batch = conformity_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
