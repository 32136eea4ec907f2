use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parquet_blocks::source::{BatchSource, PersonSource};
use parquet_blocks::writer::{BlockWriter, CompressionType, LocalBlockWriter};
use tempfile::TempDir;

const TOTAL_RECORDS: usize = 20_000;

/// Generate all blocks up front so only writing is measured
fn person_blocks(block_size: usize) -> Vec<arrow::record_batch::RecordBatch> {
    PersonSource::new(TOTAL_RECORDS, block_size, 42)
        .unwrap()
        .batches()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn benchmark_block_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_block_size");
    group.throughput(Throughput::Elements(TOTAL_RECORDS as u64));
    group.sample_size(10);

    for block_size in [500, 2_000, 10_000] {
        let blocks = person_blocks(block_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &blocks,
            |b, blocks| {
                let temp_dir = TempDir::new().unwrap();
                let path = temp_dir.path().join("bench.parquet");
                let target = path.to_str().unwrap().to_string();
                b.iter(|| {
                    let mut writer = LocalBlockWriter::default();
                    writer.start(&target, CompressionType::Snappy).unwrap();
                    for block in blocks {
                        writer.write_block(block).unwrap();
                    }
                    writer.finish().unwrap()
                });
            },
        );
    }
    group.finish();
}

fn benchmark_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_compression");
    group.throughput(Throughput::Elements(TOTAL_RECORDS as u64));
    group.sample_size(10);

    let blocks = person_blocks(2_000);
    let codecs = [
        CompressionType::Uncompressed,
        CompressionType::Snappy,
        CompressionType::Zstd(3),
        CompressionType::Gzip(6),
    ];

    for codec in codecs {
        group.bench_with_input(BenchmarkId::from_parameter(codec), &codec, |b, &codec| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("bench.parquet");
            let target = path.to_str().unwrap().to_string();
            b.iter(|| {
                let mut writer = LocalBlockWriter::default();
                writer.start(&target, codec).unwrap();
                for block in &blocks {
                    writer.write_block(block).unwrap();
                }
                writer.finish().unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_block_size, benchmark_compression);
criterion_main!(benches);
