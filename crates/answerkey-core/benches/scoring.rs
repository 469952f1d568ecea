use criterion::{black_box, criterion_group, criterion_main, Criterion};

use answerkey_core::model::{Question, QuestionType, StudentAnswers};
use answerkey_core::scorer::grade;
use answerkey_core::similarity::similarity;

const REFERENCE: &str = "Photosynthesis is the process by which green plants use sunlight, \
    water and carbon dioxide to produce glucose and oxygen. It takes place in the chloroplasts, \
    where chlorophyll absorbs light energy and converts it into chemical energy.";

const ANSWER: &str = "Plants take in sunlight and carbon dioxide and water, and the chlorophyll \
    in their chloroplasts turns the light energy into chemical energy stored as glucose. \
    Oxygen is released as a by-product.";

fn make_exam(n: usize) -> (Vec<Question>, StudentAnswers) {
    let types = [
        QuestionType::Choice,
        QuestionType::ShortAnswer,
        QuestionType::LongAnswer,
        QuestionType::Essay,
    ];
    let questions: Vec<Question> = (0..n)
        .map(|i| Question {
            id: format!("q{i}"),
            text: format!("Question {i}"),
            question_type: types[i % types.len()],
            options: vec![],
            reference_answer: REFERENCE.to_string(),
            weight: 10.0,
            explanation: None,
        })
        .collect();
    let answers = questions
        .iter()
        .map(|q| (q.id.clone(), ANSWER.to_string()))
        .collect();
    (questions, answers)
}

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");

    group.bench_function("short", |b| {
        b.iter(|| similarity(black_box("the capital is Jakarta"), black_box("Jakarta")))
    });

    group.bench_function("paragraph", |b| {
        b.iter(|| similarity(black_box(REFERENCE), black_box(ANSWER)))
    });

    group.finish();
}

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade");

    for n in [10, 100] {
        let (questions, answers) = make_exam(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| grade(black_box(&questions), black_box(&answers), "bench", "bench"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_similarity, bench_grade);
criterion_main!(benches);
