use std::io::Write;

use geocode_transform::ingestion::{ingest_csv_from_path, ingest_csv_from_reader, rows_from_queries};
use geocode_transform::types::{DataType, Field, Schema, Value};

fn sites_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("Address", DataType::Utf8),
        Field::new("active", DataType::Bool),
    ])
    .with_calculated(vec![
        Field::new("Latitude", DataType::Float64),
        Field::new("Longitude", DataType::Float64),
    ])
}

fn reader(input: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes())
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let path = std::env::temp_dir().join(format!("geocode-sites-{}.csv", std::process::id()));
    {
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "id,Address,active").unwrap();
        writeln!(f, "1,1009 Broad Street St. Joseph MI 49085,true").unwrap();
        writeln!(f, "2,ChIJsxyoG5_GEIgRMN8IWvngddA,no").unwrap();
    }

    let schema = sites_schema();
    let ds = ingest_csv_from_path(&path, &schema).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.rows[0].values(),
        &[
            Value::Int64(1),
            Value::Utf8("1009 Broad Street St. Joseph MI 49085".to_string()),
            Value::Bool(true),
            Value::Null,
            Value::Null,
        ]
    );
    assert_eq!(ds.rows[1].values()[2], Value::Bool(false));
}

#[test]
fn ingest_csv_allows_reordered_and_extra_columns() {
    let schema = sites_schema();
    let mut rdr = reader("notes,active,Address,id\nhq,1,12 Lake Shore Drive,7\n");

    let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();
    assert_eq!(ds.row_count(), 1);
    let row = &ds.rows[0];
    assert_eq!(row[schema.field_id("id").unwrap()], Value::Int64(7));
    assert_eq!(
        row[schema.field_id("Address").unwrap()],
        Value::Utf8("12 Lake Shore Drive".to_string())
    );
}

#[test]
fn calculated_columns_are_not_read() {
    let schema = sites_schema();
    let mut rdr = reader("id,Address,active,Latitude\n1,x y,true,99.0\n");

    let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();
    assert!(ds.rows[0][schema.field_id("Latitude").unwrap()].is_null());
}

#[test]
fn blank_cells_become_null() {
    let schema = sites_schema();
    let mut rdr = reader("id,Address,active\n3,   ,\n");

    let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();
    assert!(ds.rows[0][schema.field_id("Address").unwrap()].is_null());
    assert!(ds.rows[0][schema.field_id("active").unwrap()].is_null());
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let schema = sites_schema();
    let mut rdr = reader("id,Address\n1,x y\n");

    let err = ingest_csv_from_reader(&mut rdr, &schema).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'active'"));
}

#[test]
fn ingest_csv_errors_on_type_parse() {
    let schema = sites_schema();
    let mut rdr = reader("id,Address,active\nnot_an_int,x y,true\n");

    let err = ingest_csv_from_reader(&mut rdr, &schema).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value at row 2"));
    assert!(msg.contains("column 'id'"));
}

#[test]
fn rows_from_queries_fills_only_the_input_field() {
    let schema = sites_schema();
    let rows = rows_from_queries(&schema, "Address", ["a b", "c"]).unwrap();

    assert_eq!(rows.len(), 2);
    let address = schema.field_id("Address").unwrap();
    assert_eq!(rows[1][address], Value::Utf8("c".to_string()));
    assert!(rows[1][schema.field_id("id").unwrap()].is_null());

    assert!(rows_from_queries(&schema, "Nope", ["a"]).is_err());
}
