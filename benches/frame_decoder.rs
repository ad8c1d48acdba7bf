use agentdeck::core::assembler::TranscriptAssembler;
use agentdeck::core::event::parse_event;
use agentdeck::core::frame::{Frame, FrameDecoder};
use agentdeck::core::message::Message;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn make_body(n_events: usize) -> Vec<u8> {
    let mut body = String::from("data: {\"type\":\"session\",\"sessionId\":\"bench\"}\n");
    for i in 0..n_events {
        if i % 50 == 0 {
            body.push_str(&format!(
                "data: {{\"type\":\"tool_start\",\"toolId\":\"t{i}\",\"toolName\":\"search\"}}\n"
            ));
            body.push_str(&format!(
                "data: {{\"type\":\"tool_end\",\"toolId\":\"t{i}\",\"success\":true}}\n"
            ));
        }
        body.push_str("data: {\"type\":\"text_delta\",\"content\":\"lorem ipsum dolor \"}\n");
    }
    body.push_str("data: [DONE]\n");
    body.into_bytes()
}

fn decode_all(body: &[u8], chunk_size: usize) -> usize {
    let mut decoder = FrameDecoder::new();
    let mut payloads = 0;
    for chunk in body.chunks(chunk_size) {
        payloads += decoder
            .push(chunk)
            .iter()
            .filter(|frame| matches!(frame, Frame::Payload(_)))
            .count();
    }
    payloads
}

fn assemble_all(body: &[u8], chunk_size: usize) -> Message {
    let assembler = TranscriptAssembler::default();
    let mut message = Message::assistant_placeholder();
    let mut decoder = FrameDecoder::new();
    for chunk in body.chunks(chunk_size) {
        for frame in decoder.push(chunk) {
            if let Frame::Payload(payload) = frame {
                if let Some(event) = parse_event(&payload) {
                    assembler.apply(&mut message, event);
                }
            }
        }
    }
    assembler.finish(&mut message);
    message
}

fn bench_frame_decoder(c: &mut Criterion) {
    for &events in &[1_000usize, 10_000usize] {
        let body = make_body(events);

        let mut group = c.benchmark_group(format!("frame_decoder_events{events}"));
        group.throughput(Throughput::Bytes(body.len() as u64));

        // Small chunks stress the partial-line path; large ones the scan loop.
        for &chunk_size in &[7usize, 1024usize, 64 * 1024] {
            group.bench_function(BenchmarkId::new("decode", chunk_size), |b| {
                b.iter(|| decode_all(&body, chunk_size))
            });
        }
        group.bench_function(BenchmarkId::new("decode_and_assemble", 1024), |b| {
            b.iter(|| assemble_all(&body, 1024))
        });

        group.finish();
    }
}

criterion_group!(benches, bench_frame_decoder);
criterion_main!(benches);
