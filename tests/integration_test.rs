use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;
use wdbc::{DbcError, DbcTable, FieldKind, FieldValue, Row, StringPool, TableLayout, TypedRow};

fn area_layout() -> TableLayout {
    TableLayout::from_kinds(&[
        FieldKind::Int32,
        FieldKind::Int32,
        FieldKind::PackedFlags,
        FieldKind::StrLang,
        FieldKind::Float,
    ])
}

fn area_row(id: i32, parent: i32, name: &str) -> TypedRow {
    let mut row = TypedRow::new();
    row.add_int32(id)
        .add_int32(parent)
        .add_packed_flags(0)
        .add_string_lang(name)
        .add_float(-5000.0)
        .sort_value_1(parent)
        .sort_value_2(id);
    row
}

fn write_area_table(dir: &std::path::Path) -> Vec<u8> {
    let mut table = DbcTable::new("AreaTable.dbc", area_layout());
    table.add_row(area_row(6000, 0, "West Freeport"));
    table.add_row(area_row(6001, 6000, "Freeport Docks"));
    table.add_row(area_row(6002, 0, "Qeynos Hills"));
    let path = table.save(dir).unwrap();
    fs::read(path).unwrap()
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = tempdir().unwrap();
    let original = write_area_table(dir.path());

    let mut table = DbcTable::default();
    table.load(dir.path(), "AreaTable.dbc").unwrap();
    assert!(table.is_loaded());
    assert_eq!(table.len(), 3);
    assert_eq!(table.header().record_size, 4 * 3 + 68 + 4);
    assert_eq!(table.header().field_count, 3 + 17 + 1);

    let out = tempdir().unwrap();
    let path = table.save(out.path()).unwrap();
    assert_eq!(fs::read(path).unwrap(), original);
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempdir().unwrap();
    let mut table = DbcTable::default();
    let err = table.load(dir.path(), "CharStartOutfit.dbc").unwrap_err();
    assert!(err.is_not_found());
    assert!(!table.is_loaded());
}

#[test]
fn test_bad_magic_leaves_table_unloaded() {
    let dir = tempdir().unwrap();
    write_area_table(dir.path());
    let mut table = DbcTable::default();
    table.load(dir.path(), "AreaTable.dbc").unwrap();

    fs::write(dir.path().join("Broken.dbc"), b"WDB5\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0").unwrap();
    let err = table.load(dir.path(), "Broken.dbc").unwrap_err();
    assert!(matches!(err, DbcError::BadMagic { .. }));
    assert!(!table.is_loaded());
    assert!(table.is_empty());
}

#[test]
fn test_loading_twice_matches_loading_once() {
    let dir = tempdir().unwrap();
    write_area_table(dir.path());

    let mut twice = DbcTable::default();
    twice.load(dir.path(), "AreaTable.dbc").unwrap();
    twice.add_row(area_row(7000, 0, "Stray"));
    twice.load(dir.path(), "AreaTable.dbc").unwrap();

    let mut once = DbcTable::default();
    once.load(dir.path(), "AreaTable.dbc").unwrap();

    assert_eq!(twice.rows(), once.rows());
    assert_eq!(twice.header(), once.header());
    assert_eq!(twice.string_block(), once.string_block());
}

#[test]
fn test_declared_string_block_past_end_is_truncated() {
    let dir = tempdir().unwrap();
    let mut bytes = write_area_table(dir.path());
    let declared = u32::from_le_bytes(bytes[16..20].try_into().unwrap()) + 10;
    bytes[16..20].copy_from_slice(&declared.to_le_bytes());
    fs::write(dir.path().join("AreaTable.dbc"), &bytes).unwrap();

    let mut table = DbcTable::default();
    let err = table.load(dir.path(), "AreaTable.dbc").unwrap_err();
    assert!(matches!(err, DbcError::Truncated { .. }));
    assert!(!table.is_loaded());
}

#[test]
fn test_schema_mismatch_writes_nothing() {
    let dir = tempdir().unwrap();
    let mut table = DbcTable::new("AreaTable.dbc", area_layout());
    table.add_row(area_row(1, 0, "Kelethin"));
    let mut short = TypedRow::new();
    short.add_int32(2).add_string_lang("Felwithe");
    table.add_row(short);

    let err = table.save(dir.path()).unwrap_err();
    assert!(matches!(err, DbcError::SchemaMismatch { row: 1, .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_save_replaces_existing_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("AreaTable.dbc"), vec![0xAB; 4096]).unwrap();
    let written = write_area_table(dir.path());
    assert_eq!(fs::read(dir.path().join("AreaTable.dbc")).unwrap(), written);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_read_modify_write_patches_one_column() {
    let dir = tempdir().unwrap();
    write_area_table(dir.path());

    let mut table = DbcTable::default();
    table
        .load_with(dir.path(), "AreaTable.dbc", |r| {
            let id = r.int32()?;
            let parent = r.int32()?;
            r.packed_flags()?;
            r.string_lang()?;
            r.float()?;
            r.sort_value_1(parent);
            r.sort_value_2(id);
            Ok(())
        })
        .unwrap();

    let index = table.find_row_by_id(6002).unwrap();
    let row = table.row_mut(index).unwrap().as_typed_mut().unwrap();
    row.set(4, FieldValue::Float(-250.0));
    table.sort_rows();
    table.save(dir.path()).unwrap();

    let mut reloaded = DbcTable::default();
    reloaded.load(dir.path(), "AreaTable.dbc").unwrap();
    let ids: Vec<i32> = reloaded.rows().iter().filter_map(Row::id).collect();
    assert_eq!(ids, vec![6000, 6002, 6001]);

    let bytes = reloaded.row(1).and_then(Row::raw_bytes).unwrap();
    let mut cursor = 4 * 3;
    let name = wdbc::row::decode_string_lang_at(bytes, &mut cursor, reloaded.string_block()).unwrap();
    assert_eq!(name, "Qeynos Hills");
    assert_eq!(wdbc::row::decode_f32_at(bytes, &mut cursor).unwrap(), -250.0);
}

#[test]
fn test_mixed_raw_and_typed_rows_share_the_string_block() {
    let dir = tempdir().unwrap();
    write_area_table(dir.path());

    let mut table = DbcTable::default();
    table.load(dir.path(), "AreaTable.dbc").unwrap();
    let before = table.string_block().len();
    table.add_row(area_row(6003, 0, "Freeport Docks"));
    table.add_row(area_row(6004, 0, "Nektulos Forest"));
    let path = table.save(dir.path()).unwrap();

    let bytes = fs::read(path).unwrap();
    let header = wdbc::TableHeader::decode(&bytes).unwrap();
    assert_eq!(header.record_count, 5);
    assert_eq!(header.string_block_size as usize, before + "Nektulos Forest\0".len());
}

proptest! {
    #[test]
    fn prop_untouched_tables_round_trip(
        rows in prop::collection::vec((any::<i32>(), "[a-zA-Z ]{0,12}", any::<u64>(), any::<f32>()), 0..20)
    ) {
        let layout = TableLayout::from_kinds(&[
            FieldKind::Int32, FieldKind::Str, FieldKind::UInt64, FieldKind::Float,
        ]);
        let mut table = DbcTable::new("Prop.dbc", layout);
        for (id, name, big, f) in &rows {
            let mut row = TypedRow::new();
            row.add_int32(*id).add_string(name.as_str()).add_uint64(*big).add_float(*f);
            table.add_row(row);
        }
        let image = table.to_bytes().unwrap();
        let loaded = DbcTable::from_bytes("Prop.dbc", &image).unwrap();
        prop_assert_eq!(loaded.len(), rows.len());
        prop_assert_eq!(loaded.to_bytes().unwrap(), image);
    }

    #[test]
    fn prop_interning_is_deduplicated(words in prop::collection::vec("[a-z]{0,6}", 1..40)) {
        let mut pool = StringPool::new();
        let first: Vec<u32> = words.iter().map(|w| pool.intern(w)).collect();
        let second: Vec<u32> = words.iter().map(|w| pool.intern(w)).collect();
        prop_assert_eq!(&first, &second);

        let mut distinct: Vec<&String> = words.iter().collect();
        distinct.sort();
        distinct.dedup();
        let expected: usize = distinct.iter().map(|w| w.len() + 1).sum::<usize>()
            + if distinct.iter().any(|w| w.is_empty()) { 0 } else { 1 };
        prop_assert_eq!(pool.byte_length(), expected);
    }
}
