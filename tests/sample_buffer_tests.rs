// SampleBuffer tests: insertion order, drain empties, reuse across windows

mod common;

use hostwatch::models::Sample;
use hostwatch::sample_buffer::SampleBuffer;

fn sample(cpu: f64) -> Sample {
    Sample::new(common::wall_start(), cpu, 10.0)
}

#[test]
fn new_buffer_is_empty() {
    let mut buffer = SampleBuffer::new();
    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
    assert!(buffer.drain().is_empty());
}

#[test]
fn drain_returns_samples_in_insertion_order_and_empties() {
    let mut buffer = SampleBuffer::new();
    for cpu in [30.0, 10.0, 20.0] {
        buffer.add(sample(cpu));
    }
    assert_eq!(buffer.len(), 3);

    let drained = buffer.drain();
    let cpus: Vec<f64> = drained.iter().map(|s| s.cpu_percent).collect();
    assert_eq!(cpus, vec![30.0, 10.0, 20.0]);
    assert!(buffer.is_empty());
}

#[test]
fn samples_do_not_leak_across_drains() {
    let mut buffer = SampleBuffer::new();
    buffer.add(sample(1.0));
    buffer.add(sample(2.0));
    let first = buffer.drain();
    buffer.add(sample(3.0));
    let second = buffer.drain();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].cpu_percent, 3.0);
}
