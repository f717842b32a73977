use criterion::{black_box, criterion_group, criterion_main, Criterion};
use medical_qa_agent::extraction::{default_schemas, parse_entities, ExtractedEntities};
use medical_qa_agent::integrations::LocalEmbedder;
use medical_qa_agent::retrieval::{Chunker, VectorIndex};
use medical_qa_agent::router::parse_selection;
use medical_qa_agent::templates::TemplateCatalogue;
use std::sync::Arc;

fn chunker_benchmark(c: &mut Criterion) {
    let chunker = Chunker::new(300, 50);
    let text = "感冒是一种常见的急性上呼吸道病毒性感染性疾病，多由鼻病毒、副流感病毒引起。".repeat(64);

    c.bench_function("chunker_split_long_text", |b| {
        b.iter(|| {
            let chunks = chunker.chunk(black_box(text.as_str()), "bench");
            black_box(chunks.len());
        });
    });
}

fn template_fill_benchmark(c: &mut Criterion) {
    let schemas = default_schemas();
    let catalogue = TemplateCatalogue::builtin(&schemas).expect("builtin templates");
    let entities = ExtractedEntities {
        disease: vec!["感冒".into(), "鼻炎".into(), "肺炎".into()],
        symptom: vec!["咳嗽".into(), "发烧".into()],
        drug: vec!["阿莫西林".into()],
    };

    c.bench_function("template_fill_entities", |b| {
        b.iter(|| {
            let filled = catalogue.fill(&schemas, black_box(&entities));
            black_box(filled.len());
        });
    });
}

fn template_rank_benchmark(c: &mut Criterion) {
    let schemas = default_schemas();
    let catalogue = TemplateCatalogue::builtin(&schemas).expect("builtin templates");
    let entities = ExtractedEntities {
        disease: vec!["感冒".into(), "鼻炎".into()],
        symptom: vec![],
        drug: vec!["阿莫西林".into()],
    };
    let items = catalogue
        .fill(&schemas, &entities)
        .into_iter()
        .map(|t| (t.question.clone(), t))
        .collect();
    let embedder = Arc::new(LocalEmbedder::new(256));
    let query = embedder.embed_text("感冒吃什么药好得快？");
    let index = tokio_test::block_on(VectorIndex::build(embedder, items)).expect("index");

    c.bench_function("template_index_rank_top3", |b| {
        b.iter(|| {
            let hits = index.rank(black_box(&query), 3);
            black_box(hits.len());
        });
    });
}

fn parsing_benchmark(c: &mut Criterion) {
    let reply = "```json\n{\"disease\": [\"感冒\"], \"symptom\": [\"咳嗽\", \"发烧\"], \"drug\": []}\n```";

    c.bench_function("parse_entities_fenced", |b| {
        b.iter(|| {
            let entities = parse_entities(black_box(reply)).expect("valid reply");
            black_box(entities.total());
        });
    });

    c.bench_function("parse_selection", |b| {
        b.iter(|| black_box(parse_selection(black_box("  graph_func\n"))));
    });
}

criterion_group!(
    benches,
    chunker_benchmark,
    template_fill_benchmark,
    template_rank_benchmark,
    parsing_benchmark
);
criterion_main!(benches);
