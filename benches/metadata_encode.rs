use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jvmti_stacks::byte_store::GrowableByteStore;
use jvmti_stacks::metadata::PackedMetadataBlob;

const FIELDS: [&str; 4] = ["java/util/concurrent/ThreadPoolExecutor", "runWorker", "(Ljava/util/concurrent/ThreadPoolExecutor$Worker;)V", "0"];

fn build_blob(methods: usize) -> (Vec<u8>, Vec<i32>) {
    let mut store = GrowableByteStore::with_capacity(methods * 40);
    let mut offsets = Vec::with_capacity(methods * 4);
    for _ in 0..methods {
        for field in FIELDS {
            offsets.push(store.append(field.as_bytes()) as i32);
        }
    }
    (store.into_bytes(), offsets)
}

fn bench_byte_store_append(c: &mut Criterion) {
    c.bench_function("byte_store_append_1k_methods", |b| {
        b.iter(|| {
            // deliberately undersized so the store doubles several times
            let mut store = GrowableByteStore::with_capacity(64);
            for _ in 0..1000 {
                for field in FIELDS {
                    black_box(store.append(field.as_bytes()));
                }
            }
            store.into_bytes()
        })
    });
}

fn bench_blob_decode(c: &mut Criterion) {
    let (bytes, offsets) = build_blob(1000);
    c.bench_function("blob_decode_1k_methods", |b| {
        b.iter(|| {
            let blob = PackedMetadataBlob::from_parts(bytes.clone(), offsets.clone()).unwrap();
            blob.records().count()
        })
    });
}

criterion_group!(benches, bench_byte_store_append, bench_blob_decode);
criterion_main!(benches);
