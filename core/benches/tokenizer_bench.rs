use criterion::{criterion_group, criterion_main, Criterion};
use retrieval_core::tokenizer::Normalizer;

const TEXT: &str = "Este trabalho apresenta um estudo sobre organização e recuperação de informação, \
    comparando o modelo booleano com o modelo vetorial baseado em TF-IDF. Os resultados mostram \
    que a similaridade do cosseno ordena melhor os documentos relevantes em 2025.";

fn bench_normalize(c: &mut Criterion) {
    let normalizer = Normalizer::new(["de", "o", "a", "um", "e", "em", "os", "com", "que", "do", "sobre"]);
    let text = TEXT.repeat(50);
    c.bench_function("normalize_abstracts", |b| b.iter(|| normalizer.normalize(&text)));
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
