use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use tokio::runtime::Runtime;

use streambus::bus::MessageStream;
use streambus::message::StreamMessage;

const BATCH_SIZES: &[usize] = &[64, 256, 1024];

async fn publish_and_drain(stream: &MessageStream, batch: usize) {
    let feed = stream.listen();
    for i in 0..batch {
        stream
            .publish(StreamMessage::server("bench", json!({"seq": i})))
            .expect("publish");
    }
    for _ in 0..batch {
        feed.recv().await.expect("drain");
    }
}

fn publish_throughput(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("stream_publish");

    for &batch in BATCH_SIZES {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &size| {
            b.to_async(&runtime).iter(|| async {
                let stream = MessageStream::new();
                publish_and_drain(&stream, size).await;
            });
        });
    }

    group.finish();
}

criterion_group!(benches, publish_throughput);
criterion_main!(benches);
