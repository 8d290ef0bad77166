use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xmpcore::{ns, PropertyOptions, SerializeOptions, XmpMeta};

fn build_sample() -> XmpMeta {
    let mut meta = XmpMeta::new();

    meta.set_property(ns::XMP, "CreatorTool", "Benchmark Harness").unwrap();
    meta.set_property(ns::XMP, "CreateDate", "2006-04-25T15:32:01+02:00").unwrap();

    let mut bag = PropertyOptions::new();
    bag.set_array(true);

    for keyword in ["purple", "square", "test", "benchmark"] {
        meta.append_array_item(ns::DC, "subject", bag, keyword).unwrap();
    }

    meta.set_localized_text(ns::DC, "title", None, "x-default", "a test file").unwrap();
    meta.set_localized_text(ns::DC, "title", None, "de", "eine Testdatei").unwrap();

    meta.set_property(ns::XMP_MM, "DerivedFrom/stRef:instanceID", "xmp.iid:1").unwrap();
    meta.set_property(ns::XMP_MM, "DerivedFrom/stRef:documentID", "xmp.did:2").unwrap();

    meta
}

fn bench_serialize_compact(c: &mut Criterion) {
    let meta = build_sample();

    c.bench_function("serialize_compact", |b| {
        b.iter(|| black_box(&meta).serialize(&SerializeOptions::compact()).unwrap())
    });
}

fn bench_serialize_canonical(c: &mut Criterion) {
    let meta = build_sample();

    c.bench_function("serialize_canonical", |b| {
        b.iter(|| black_box(&meta).serialize(&SerializeOptions::canonical()).unwrap())
    });
}

fn bench_serialize_sorted(c: &mut Criterion) {
    let meta = build_sample();

    let options = SerializeOptions {
        sort: true,
        ..SerializeOptions::default()
    };

    c.bench_function("serialize_sorted", |b| {
        b.iter(|| black_box(&meta).serialize(&options).unwrap())
    });
}

criterion_group!(
    benches,
    bench_serialize_compact,
    bench_serialize_canonical,
    bench_serialize_sorted
);
criterion_main!(benches);
