//! Performance benchmarks for ferro-uorf
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- annotate

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferro_uorf::conservation::{ConservationSource, Track};
use ferro_uorf::coords::Strand;
use ferro_uorf::kozak::kozak_strength;
use ferro_uorf::pipeline::{AnnotateOptions, AnnotationContext, Annotator};
use ferro_uorf::reference::{GeneConstraints, ReferenceIndex, TranscriptUtr, UorfRecord};
use ferro_uorf::scoring::{RandomForest, ScoringEngine};
use ferro_uorf::uorf::scan_all;
use ferro_uorf::variant::InputRecord;

const MODEL: &str = r#"{
    "feature_names": ["uORF_LENGTH", "5UTR_LENGTH", "uKOZAK_STRENGTH"],
    "classes": ["neutral", "deleterious"],
    "impute": {"uORF_LENGTH": 30.0},
    "trees": [
        {"feature": 0, "threshold": 20.0,
         "left": {"leaf": [2.0, 8.0]},
         "right": {"leaf": [9.0, 1.0]}},
        {"feature": 2, "threshold": 0.5,
         "left": {"leaf": [4.0, 6.0]},
         "right": {"leaf": [7.0, 3.0]}}
    ]
}"#;

/// Flat conservation everywhere
struct Flat;

impl ConservationSource for Flat {
    fn mean_score(&self, _: Track, _: &str, _: u64, _: u64) -> Option<f64> {
        Some(0.5)
    }
}

/// A 306 nt UTR with a handful of uORFs, followed by the CDS
fn utr_sequence() -> String {
    let block = "GCCGCCACCATGGCCAAGTAGGCTGCAGCCATGCCCTGAAGCGGCCG";
    let mut seq: String = block.repeat(7).chars().take(300).collect();
    seq.push_str("GCCACCATGGCGCGCGCGCGCGCGC");
    seq
}

fn context() -> AnnotationContext {
    let seq = utr_sequence();
    let utr = TranscriptUtr::new(
        "NM_BENCH.1",
        "BENCH",
        "chr1",
        Strand::Plus,
        10_001,
        10_306,
        10_307,
        true,
        vec![(10_001, 10_000 + seq.len() as u64)],
        &seq,
    )
    .unwrap();
    let records: Vec<UorfRecord> = scan_all(&utr.sequence, utr.cds_local())
        .into_iter()
        .filter_map(|orf| {
            UorfRecord::new(
                &utr,
                10_001 + orf.start as u64,
                None,
                orf.kind,
                None,
                None,
                Some(true),
                None,
                None,
            )
            .ok()
        })
        .collect();
    let mut index = ReferenceIndex::new();
    index.add_transcript(utr).unwrap();
    for record in records {
        index.add_uorf(record).unwrap();
    }
    AnnotationContext {
        index,
        conservation: Box::new(Flat),
        constraints: GeneConstraints::new(),
        splicing: None,
        scoring: ScoringEngine::new(Box::new(RandomForest::from_json(MODEL).unwrap())),
    }
}

fn rows() -> Vec<(&'static str, InputRecord)> {
    let seq = utr_sequence();
    let at = |pos: u64| seq.as_bytes()[(pos - 10_001) as usize] as char;
    let snv = |pos: u64, alt: &str| format!("chr1\t{}\t.\t{}\t{}", pos, at(pos), alt);
    vec![
        ("snv_no_effect", snv(10_002, "T")),
        ("snv_start", snv(10_010, "C")),
        ("snv_kozak", snv(10_007, "T")),
        ("deletion", format!("chr1\t10020\t.\t{}{}\t{}", at(10_020), at(10_021), at(10_020))),
        ("outside", "chr1\t50\t.\tA\tG".to_string()),
    ]
    .into_iter()
    .map(|(name, text)| (name, InputRecord::new(0, 1, &text)))
    .collect()
}

// =============================================================================
// Annotation benchmarks
// =============================================================================

/// Benchmark single-variant annotation by variant class
fn bench_annotate(c: &mut Criterion) {
    let context = context();
    let annotator = Annotator::new(&context, AnnotateOptions::default());
    let mut group = c.benchmark_group("annotate");

    for (name, record) in rows() {
        group.bench_with_input(BenchmarkId::new("variant", name), &record, |b, r| {
            b.iter(|| annotator.annotate(black_box(r.clone())))
        });
    }

    group.finish();
}

/// Benchmark annotation throughput over a block of rows
fn bench_annotate_throughput(c: &mut Criterion) {
    let context = context();
    let annotator = Annotator::new(&context, AnnotateOptions::default());
    let block: Vec<InputRecord> = rows()
        .into_iter()
        .map(|(_, r)| r)
        .cycle()
        .take(1000)
        .collect();

    let mut group = c.benchmark_group("throughput");
    group.throughput(Throughput::Elements(block.len() as u64));
    group.bench_function("annotate_1000", |b| {
        b.iter(|| {
            block
                .iter()
                .map(|r| annotator.annotate(black_box(r.clone())))
                .count()
        })
    });
    group.finish();
}

// =============================================================================
// Scanning benchmarks
// =============================================================================

fn bench_scan(c: &mut Criterion) {
    let seq = utr_sequence();
    let cds = 306;
    c.bench_function("scan_all", |b| {
        b.iter(|| scan_all(black_box(seq.as_bytes()), black_box(cds)))
    });
    c.bench_function("kozak_strength", |b| {
        b.iter(|| kozak_strength(black_box(b"CACCATGGC")))
    });
}

criterion_group!(benches, bench_annotate, bench_annotate_throughput, bench_scan);

criterion_main!(benches);
