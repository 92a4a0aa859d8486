mod support;

use std::sync::Arc;

use jvmti_stacks::byte_store::GrowableByteStore;
use jvmti_stacks::diagnostics::CountingSink;
use jvmti_stacks::handle::MethodHandle;
use jvmti_stacks::metadata::{
    MetadataField, MethodMetadataEncoder, MethodMetadataRecord, PackedMetadataBlob, ResolutionStage, PLACEHOLDER,
};
use jvmti_stacks::SamplingSession;
use proptest::prelude::*;
use support::FakeRuntime;

fn runtime() -> FakeRuntime {
    FakeRuntime::new()
        .method(0x10, "Ljava/lang/Thread;", "sleep", "(J)V")
        .native_method(0x20, "Ljava/lang/Object;", "wait", "(J)V")
        .method(0x30, "[I", "clone", "()Ljava/lang/Object;")
        .method(0x40, "Lcom/example/Café;", "grüß", "(Ljava/lang/String;)V")
}

fn record(class_name: &str, method_name: &str, signature: &str, is_native: bool) -> MethodMetadataRecord {
    MethodMetadataRecord {
        class_name: class_name.into(),
        method_name: method_name.into(),
        signature: signature.into(),
        is_native,
    }
}

#[test]
fn resolves_each_method_into_four_fields() {
    let session = SamplingSession::new(runtime());
    let blob = session.resolve_method_metadata(&[0x10, 0x20, 0x30, 0x40]);

    assert_eq!(blob.offsets().len(), 16);
    let records: Vec<_> = blob.records().collect();
    assert_eq!(
        records,
        vec![
            record("java/lang/Thread", "sleep", "(J)V", false),
            record("java/lang/Object", "wait", "(J)V", true),
            record("[I", "clone", "()Ljava/lang/Object;", false),
            record("com/example/Café", "grüß", "(Ljava/lang/String;)V", false),
        ]
    );
}

#[test]
fn fields_are_packed_back_to_back() {
    let session = SamplingSession::new(runtime());
    let blob = session.resolve_method_metadata(&[0x10, 0x20]);

    assert_eq!(blob.bytes(), b"java/lang/Threadsleep(J)V0java/lang/Objectwait(J)V1");
    assert_eq!(blob.offsets(), &[0, 16, 21, 25, 26, 42, 46, 50]);
    assert_eq!(blob.field_bytes(1, MetadataField::NativeFlag), Some(&b"1"[..]));
}

#[test]
fn vm_bytes_pass_through_unchanged() {
    // unpaired surrogates have no `String` form
    let session =
        SamplingSession::new(runtime().raw_method(0x50, b"LA\xed\xa0\x80;", b"m\xed\xb0\x80", b"()V"));
    let blob = session.resolve_method_metadata(&[0x10, 0x50]);

    assert_eq!(blob.field_bytes(1, MetadataField::ClassName), Some(&b"A\xed\xa0\x80"[..]));
    assert_eq!(blob.field_bytes(1, MetadataField::MethodName), Some(&b"m\xed\xb0\x80"[..]));
    assert!(blob.bytes().ends_with(b"A\xed\xa0\x80m\xed\xb0\x80()V0"));
    assert_eq!(&blob.offsets()[4..], &[26, 30, 34, 37]);
}

#[test]
fn failing_stage_gets_placeholder_without_touching_neighbors() {
    for stage in ResolutionStage::ALL {
        let sink = Arc::new(CountingSink::new());
        let session = SamplingSession::new(runtime().failing_method(0x99, stage)).with_sink(sink.clone());

        let blob = session.resolve_method_metadata(&[0x10, 0x99, 0x20]);
        assert_eq!(blob.method_count(), 3);
        assert_eq!(blob.record(0).unwrap(), record("java/lang/Thread", "sleep", "(J)V", false));
        assert!(blob.record(1).unwrap().is_placeholder(), "{stage}");
        assert_eq!(blob.record(2).unwrap(), record("java/lang/Object", "wait", "(J)V", true));

        for (field, expected) in [
            MetadataField::ClassName,
            MetadataField::MethodName,
            MetadataField::Signature,
            MetadataField::NativeFlag,
        ]
        .into_iter()
        .zip(PLACEHOLDER)
        {
            assert_eq!(blob.field(1, field).as_deref(), Some(expected));
        }

        assert_eq!(sink.failures_at(stage), 1);
        assert_eq!(sink.total_failures(), 1);
    }
}

#[test]
fn null_declaring_class_counts_as_failure() {
    let sink = Arc::new(CountingSink::new());
    let session = SamplingSession::new(runtime().classless_method(0x77)).with_sink(sink.clone());

    let blob = session.resolve_method_metadata(&[0x77]);
    assert!(blob.record(0).unwrap().is_placeholder());
    assert_eq!(sink.failures_at(ResolutionStage::DeclaringClass), 1);
}

#[test]
fn unknown_handle_gets_placeholder() {
    let sink = CountingSink::new();
    let runtime = runtime();
    let encoder = MethodMetadataEncoder::new(&runtime, &sink);

    let blob = encoder.resolve_batch(&[MethodHandle::from_transport(0xdead)]);
    assert_eq!(
        blob.records().collect::<Vec<_>>(),
        vec![MethodMetadataRecord::placeholder()]
    );
    assert_eq!(sink.failures_at(ResolutionStage::DeclaringClass), 1);
}

#[test]
fn empty_batch_yields_empty_blob() {
    let session = SamplingSession::new(runtime());
    let blob = session.resolve_method_metadata(&[]);
    assert!(blob.bytes().is_empty());
    assert!(blob.offsets().is_empty());
    assert_eq!(blob.method_count(), 0);
}

#[test]
fn received_blob_decodes_like_the_original() {
    let session = SamplingSession::new(runtime());
    let (bytes, offsets) = session.resolve_method_metadata(&[0x30, 0x40]).into_parts();

    let received = PackedMetadataBlob::from_parts(bytes, offsets).unwrap();
    assert_eq!(received.record(1).unwrap().class_name, "com/example/Café");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn byte_store_keeps_every_appended_byte(
        initial in 0usize..64,
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..40), 0..50),
    ) {
        let mut store = GrowableByteStore::with_capacity(initial);
        let mut expected = Vec::new();
        for chunk in &chunks {
            let offset = store.append(chunk);
            prop_assert_eq!(offset, expected.len());
            expected.extend_from_slice(chunk);
            prop_assert!(store.capacity() >= store.len());
        }
        prop_assert_eq!(store.as_bytes(), expected.as_slice());
    }

    #[test]
    fn offsets_are_well_formed(
        picks in proptest::collection::vec(0usize..7, 0..40),
    ) {
        let ids = [0x10i64, 0x20, 0x30, 0x40, 0x50, 0x60, 0xbad];
        let runtime = runtime()
            .failing_method(0x50, ResolutionStage::MethodName)
            .classless_method(0x60);
        let session = SamplingSession::new(runtime).with_sink(Arc::new(CountingSink::new()));
        let batch: Vec<i64> = picks.iter().map(|&i| ids[i]).collect();

        let blob = session.resolve_method_metadata(&batch);
        let offsets = blob.offsets();
        prop_assert_eq!(offsets.len(), 4 * batch.len());
        prop_assert!(offsets.windows(2).all(|w| w[0] <= w[1]));

        let mut total = 0usize;
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).map_or(blob.bytes().len(), |&next| next as usize);
            prop_assert!(end >= start as usize);
            total += end - start as usize;
        }
        prop_assert_eq!(total + offsets.first().map_or(0, |&o| o as usize), blob.bytes().len());
        prop_assert_eq!(blob.records().count(), batch.len());
    }
}
