//! Benchmarks for chunking and reassembly.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use condense::{Chunker, PeriodSegmenter, Reassembler, SegmenterKind, WordCounter};

/// News-style paragraphs, with the abbreviations, decimals and quotes that
/// trip the sentence heuristics.
const ARTICLE: &[&str] = &[
    "Shares of Acme Corp. fell 3.5% on Tuesday after the company cut its \
     full-year outlook. ",
    "Dr. Alvarez, the firm's chief economist, said demand in the U.S. had \
     slowed since Q2. ",
    "\"We expected a soft quarter,\" she told analysts. \"Not this soft.\" ",
    "Revenue came in at $4.2 bn, versus a consensus of $4.6 bn! ",
    "Is the slowdown temporary? Analysts at St. James Capital think so.\n\n",
    "The board meets again on Jan. 15 to review the dividend, currently \
     0.75 per share. ",
];

fn sample_text(size: usize) -> String {
    let mut text = String::with_capacity(size + 128);
    for sentence in ARTICLE.iter().cycle() {
        if text.len() >= size {
            break;
        }
        text.push_str(sentence);
    }
    text
}

fn bench_chunker(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunker");

    for kind in [SegmenterKind::Period, SegmenterKind::Regex, SegmenterKind::Unicode] {
        let chunker = Chunker::new(300, Arc::new(WordCounter::default()), kind.build());
        for size in [1_000, 10_000, 100_000] {
            let text = sample_text(size);
            group.throughput(Throughput::Bytes(text.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{kind:?}").to_lowercase(), size),
                &text,
                |b, text| b.iter(|| chunker.chunk(black_box(text))),
            );
        }
    }

    group.finish();
}

fn bench_forced_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("forced_split");

    // One run-on sentence: every chunk comes from the word fallback.
    let chunker = Chunker::new(
        300,
        Arc::new(WordCounter::new(usize::MAX)),
        Arc::new(PeriodSegmenter),
    );
    for words in [1_000, 10_000] {
        let text = "word ".repeat(words);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("run_on", words), &text, |b, text| {
            b.iter(|| chunker.chunk(black_box(text)))
        });
    }

    group.finish();
}

fn bench_reassembler(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembler");
    let reassembler = Reassembler::new(4, Arc::new(PeriodSegmenter));

    for count in [10, 100, 1_000] {
        let summaries: Vec<String> = (0..count)
            .map(|i| format!("Summary number {i} covers one chunk of the article."))
            .collect();
        group.bench_with_input(BenchmarkId::new("assemble", count), &summaries, |b, s| {
            b.iter(|| reassembler.assemble(black_box(s)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chunker, bench_forced_split, bench_reassembler);
criterion_main!(benches);
