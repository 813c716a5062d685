use criterion::{black_box, criterion_group, criterion_main, Criterion};

use api_ast::parser::{parse_file, Mode};
use api_ast::printer;
use api_ast::token::FileSet;

fn sample_source(types: usize) -> String {
    let mut src = String::from("syntax = \"v1\"\n\nimport \"base.api\"\n\n");
    for i in 0..types {
        src.push_str(&format!(
            "type Payload{i} {{\n\tName string `json:\"name\"`\n\tId int64\n\tTags []string\n\tMeta map[string]string\n}}\n\n"
        ));
    }
    src.push_str("service bench-api {\n");
    for i in 0..types {
        src.push_str(&format!(
            "\t@handler handler{i}\n\tget /payload/:id (Payload{i}) returns (Payload{i})\n"
        ));
    }
    src.push_str("}\n");
    src
}

fn bench_parse(c: &mut Criterion) {
    let src = sample_source(50);
    c.bench_function("parse_file", |b| {
        b.iter(|| {
            let mut fset = FileSet::new();
            let (file, errors) =
                parse_file(&mut fset, "bench.api", black_box(&src), Mode::PARSE_COMMENTS);
            assert!(errors.is_empty());
            black_box(file)
        })
    });
}

fn bench_format(c: &mut Criterion) {
    let src = sample_source(50);
    let mut fset = FileSet::new();
    let (file, errors) = parse_file(&mut fset, "bench.api", &src, Mode::PARSE_COMMENTS);
    assert!(errors.is_empty());
    let tf = fset.last().unwrap();
    c.bench_function("format", |b| {
        b.iter(|| printer::format(black_box(tf), black_box(&file)).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_format);
criterion_main!(benches);
