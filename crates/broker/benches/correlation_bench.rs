use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broker::{
    CorrelationClient, InMemoryBroker, Message, MessageBroker, RequestHandler, Responder,
};
use criterion::{Criterion, criterion_group, criterion_main};

struct Approve;

#[async_trait]
impl RequestHandler for Approve {
    async fn handle(&self, request: Message) -> Option<Message> {
        Some(Message::new(request.key, serde_json::json!({"success": true})))
    }
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let client = rt.block_on(async {
        let broker: Arc<dyn MessageBroker> = Arc::new(InMemoryBroker::with_capacity(4096));
        let client = CorrelationClient::new(Arc::clone(&broker), "bench-request");
        client.spawn_reply_listener("bench-reply");
        Responder::new(broker, "bench-request", "bench-reply").spawn(Arc::new(Approve));
        client
    });

    let mut n = 0u64;
    c.bench_function("broker/correlation_round_trip", |b| {
        b.to_async(&rt).iter(|| {
            n += 1;
            let client = client.clone();
            let key = format!("bench-{n}");
            async move {
                client
                    .send_and_await(key, serde_json::Value::Null, Duration::from_secs(1))
                    .await
                    .unwrap();
            }
        });
    });
}

fn bench_unmatched_reply(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _enter = rt.enter();
    let client = CorrelationClient::new(Arc::new(InMemoryBroker::new()), "bench-request");

    c.bench_function("broker/unmatched_reply", |b| {
        b.iter(|| client.on_reply(Message::new("nobody", serde_json::Value::Null)));
    });
}

criterion_group!(benches, bench_round_trip, bench_unmatched_reply);
criterion_main!(benches);
