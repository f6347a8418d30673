use criterion::{black_box, criterion_group, criterion_main, Criterion};

use qwest_core::model::{AcceptedAnswer, AnswerValue, Difficulty, Pair, Prompt, Question};
use qwest_core::profanity::ProfanityFilter;
use qwest_core::scoring;

fn text_question(alternatives: usize) -> Question {
    Question {
        id: "bench".into(),
        prompt: Prompt::Text {
            text: "which animal says meow?".into(),
        },
        accepted: AcceptedAnswer::Text {
            alternatives: (0..alternatives).map(|i| format!("answer-{i}")).collect(),
        },
        category: None,
        difficulty: Difficulty::Medium,
        points: 10,
    }
}

fn pairing_question(pairs: usize) -> Question {
    Question {
        id: "bench".into(),
        prompt: Prompt::Image {
            asset: "animals.png".into(),
            alt: "animals".into(),
        },
        accepted: AcceptedAnswer::Pairing {
            pairs: (0..pairs)
                .map(|i| Pair::new(format!("left-{i}"), format!("right-{i}")))
                .collect(),
        },
        category: None,
        difficulty: Difficulty::Medium,
        points: 10,
    }
}

fn bench_score_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_text");

    for alternatives in [1usize, 8, 64] {
        let question = text_question(alternatives);
        // Worst case: the match is the last alternative.
        let value = AnswerValue::Text {
            text: format!("  Answer-{}  ", alternatives - 1),
        };
        group.bench_function(format!("alternatives={alternatives}"), |b| {
            b.iter(|| scoring::score(black_box(&question), black_box(&value)))
        });
    }

    group.finish();
}

fn bench_score_pairing(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_pairing");

    for pairs in [2usize, 8, 32] {
        let question = pairing_question(pairs);
        let value = AnswerValue::Pairing {
            pairs: (0..pairs)
                .rev()
                .map(|i| Pair::new(format!("left-{i}"), format!("right-{i}")))
                .collect(),
        };
        group.bench_function(format!("pairs={pairs}"), |b| {
            b.iter(|| scoring::score(black_box(&question), black_box(&value)))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("profanity_classify");
    let filter = ProfanityFilter::default();

    group.bench_function("clean_short", |b| {
        b.iter(|| filter.classify(black_box("the quick brown fox")))
    });

    group.bench_function("leetspeak_hit", |b| {
        b.iter(|| filter.classify(black_box("what the h3ll was that")))
    });

    let long: String = "a perfectly ordinary sentence ".repeat(40);
    group.bench_function("clean_long", |b| b.iter(|| filter.classify(black_box(&long))));

    group.finish();
}

criterion_group!(benches, bench_score_text, bench_score_pairing, bench_classify);
criterion_main!(benches);
