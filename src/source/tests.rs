use super::*;
use arrow::array::{Array, Int64Array, StringArray};
use chrono::NaiveDate;

fn fixed_time() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn collect_rows(source: impl BatchSource) -> Vec<usize> {
    source
        .batches()
        .map(|b| b.unwrap().num_rows())
        .collect()
}

#[test]
fn test_person_blocks_cover_all_records() {
    let source = PersonSource::new(250, 100, DEFAULT_SEED).unwrap();
    assert_eq!(source.num_blocks(), 3);
    assert_eq!(collect_rows(source), vec![100, 100, 50]);
}

#[test]
fn test_person_schema_has_eighteen_columns() -> Result<(), SourceError> {
    let mut source = PersonSource::new(5, 5, DEFAULT_SEED)?;
    let batch = source.next_batch()?.unwrap();

    assert_eq!(batch.num_columns(), 18);
    assert_eq!(batch.schema(), person_schema());
    assert_eq!(batch.schema().field(0).name(), "id");
    assert_eq!(batch.schema().field(9).name(), "date_of_birth");

    let ids = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.values(), &[0, 1, 2, 3, 4]);

    let text = batch
        .column(17)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert!(text.iter().all(|t| t.is_some_and(|t| t.len() <= 200)));

    assert!(source.next_batch()?.is_none());
    Ok(())
}

#[test]
fn test_person_ids_continue_across_blocks() -> Result<(), SourceError> {
    let mut source = PersonSource::new(7, 3, DEFAULT_SEED)?;
    let mut ids = Vec::new();
    while let Some(batch) = source.next_batch()? {
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        ids.extend(col.values().iter().copied());
    }
    assert_eq!(ids, (0..7).collect::<Vec<i64>>());
    assert_eq!(source.remaining(), 0);
    Ok(())
}

#[test]
fn test_person_same_seed_same_rows() -> Result<(), SourceError> {
    let mut whole = PersonSource::new(10, 10, 7)?;
    let mut split = PersonSource::new(10, 4, 7)?;

    let expected = whole.next_batch()?.unwrap();
    let mut names = Vec::new();
    while let Some(batch) = split.next_batch()? {
        let col = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .clone();
        names.extend(col.iter().map(|v| v.unwrap_or_default().to_string()));
    }

    let expected_names: Vec<String> = expected
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, expected_names);

    let other = PersonSource::new(10, 10, 8)?.next_batch()?.unwrap();
    assert_ne!(other.column(2).as_ref(), expected.column(2).as_ref());
    Ok(())
}

#[test]
fn test_person_zero_block_size_rejected() {
    assert!(matches!(
        PersonSource::new(10, 0, DEFAULT_SEED),
        Err(SourceError::InvalidConfig(_))
    ));
}

#[test]
fn test_person_zero_records_is_exhausted() -> Result<(), SourceError> {
    let mut source = PersonSource::new(0, 10, DEFAULT_SEED)?;
    assert!(source.next_batch()?.is_none());
    Ok(())
}

#[test]
fn test_api_pages_and_ids() -> Result<(), SourceError> {
    let mut api = TransactionApi::new(3, 2, DEFAULT_SEED)?.with_reference_time(fixed_time());
    assert_eq!(api.total_records(), 6);

    let first = api.next_page()?.unwrap();
    assert_eq!(first.page, 1);
    assert!(first.has_more);
    assert_eq!(first.data[0].transaction_id, "TXN00000000");

    let second = api.next_page()?.unwrap();
    assert!(!second.has_more);
    assert_eq!(second.data[2].transaction_id, "TXN00000005");

    assert!(api.next_page()?.is_none());
    Ok(())
}

#[test]
fn test_api_values_within_ranges() -> Result<(), SourceError> {
    let reference = fixed_time();
    let mut api = TransactionApi::new(50, 1, DEFAULT_SEED)?.with_reference_time(reference);
    let page = api.fetch_page(1)?;

    for t in &page.data {
        assert!((10.0..=5000.0).contains(&t.amount));
        assert!(t.user_id.starts_with("USER") && t.user_id.len() == 8);
        assert!(t.timestamp <= reference);
        assert!(reference - t.timestamp <= chrono::TimeDelta::days(365));
        assert!(MERCHANTS_FOR_TEST.contains(&t.merchant));
    }
    Ok(())
}

const MERCHANTS_FOR_TEST: &[&str] = &["Amazon", "Uber", "Netflix", "Starbucks", "Apple"];

#[test]
fn test_api_rejects_out_of_range_page() -> Result<(), SourceError> {
    let mut api = TransactionApi::new(1, 2, DEFAULT_SEED)?;
    assert!(matches!(
        api.fetch_page(0),
        Err(SourceError::Fetch { page: 0, .. })
    ));
    assert!(matches!(
        api.fetch_page(3),
        Err(SourceError::Fetch { page: 3, .. })
    ));
    assert!(TransactionApi::new(0, 1, DEFAULT_SEED).is_err());
    assert!(TransactionApi::new(1, 0, DEFAULT_SEED).is_err());
    Ok(())
}

#[test]
fn test_extractor_flattens_pages() -> Result<(), SourceError> {
    let api = TransactionApi::new(4, 3, DEFAULT_SEED)?;
    let mut extractor = TransactionExtractor::new(api);
    let mut count = 0;
    while let Some(t) = extractor.next_transaction()? {
        assert_eq!(t.transaction_id, format!("TXN{:08}", count));
        count += 1;
    }
    assert_eq!(count, 12);
    Ok(())
}

#[test]
fn test_batcher_yields_remainder() -> Result<(), SourceError> {
    let api = TransactionApi::new(10, 2, DEFAULT_SEED)?;
    let mut batcher = Batcher::new(TransactionExtractor::new(api), 7)?;

    let mut sizes = Vec::new();
    while let Some(group) = batcher.next_group()? {
        sizes.push(group.len());
    }
    assert_eq!(sizes, vec![7, 7, 6]);

    let api = TransactionApi::new(1, 1, DEFAULT_SEED)?;
    assert!(Batcher::new(TransactionExtractor::new(api), 0).is_err());
    Ok(())
}

#[test]
fn test_frames_number_batches() -> Result<(), SourceError> {
    let api = TransactionApi::new(5, 3, DEFAULT_SEED)?;
    let mut frames = TransactionFrames::from_api(api, 6)?;
    assert_eq!(frames.schema(), transaction_schema());

    let mut numbers = Vec::new();
    let mut rows = 0;
    while let Some(batch) = frames.next_batch()? {
        assert_eq!(batch.schema(), transaction_schema());
        let col = batch
            .column_by_name("batch_number")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(col.null_count(), 0);
        numbers.push(col.value(0));
        rows += batch.num_rows();
    }
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(rows, 15);
    Ok(())
}

#[test]
fn test_memory_source_replays_batches() -> Result<(), SourceError> {
    let mut people = PersonSource::new(6, 2, DEFAULT_SEED)?;
    let mut batches = Vec::new();
    while let Some(batch) = people.next_batch()? {
        batches.push(batch);
    }

    let mut source = MemorySource::new(batches)?;
    assert_eq!(source.remaining(), 3);
    assert_eq!(source.schema(), person_schema());
    assert_eq!(collect_rows(&mut source), vec![2, 2, 2]);
    assert!(source.next_batch()?.is_none());

    assert!(MemorySource::new(Vec::new()).is_err());
    assert!(MemorySource::empty(person_schema()).next_batch()?.is_none());
    Ok(())
}
