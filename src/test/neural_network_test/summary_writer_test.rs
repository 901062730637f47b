use super::*;
use std::path::Path;

#[test]
fn histogram_from_values_test() {
    let values: Vec<f32> = (0..=30).map(|i| i as f32).collect();

    let histogram = Histogram::from_values(values).unwrap();

    assert_eq!(histogram.num, 31);
    assert_relative_eq!(histogram.min, 0.0);
    assert_relative_eq!(histogram.max, 30.0);
    assert_relative_eq!(histogram.sum, 465.0);
    assert_eq!(histogram.bucket_limits.len(), HISTOGRAM_BUCKETS);
    assert_eq!(histogram.bucket_counts.len(), HISTOGRAM_BUCKETS);
    assert_eq!(histogram.bucket_counts.iter().sum::<u64>(), 31);
    // the maximum lands in the last bucket
    assert_relative_eq!(*histogram.bucket_limits.last().unwrap(), 30.0);
    assert_eq!(*histogram.bucket_counts.last().unwrap(), 2);
}

#[test]
fn histogram_of_constant_values_test() {
    let histogram = Histogram::from_values(vec![0.0f32; 10]).unwrap();

    assert_eq!(histogram.bucket_counts[0], 10);
    assert_relative_eq!(histogram.sum_squares, 0.0);
}

#[test]
fn histogram_rejects_bad_input_test() {
    assert!(Histogram::from_values(Vec::<f32>::new()).is_err());
    assert!(Histogram::from_values(vec![1.0, f32::NAN]).is_err());
}

#[test]
fn summary_writer_appends_events_test() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SummaryWriter::new(dir.path().join("train")).unwrap();

    writer.add_scalar("epoch_loss", 0.5, 0).unwrap();
    writer.add_scalar("epoch_loss", 0.25, 1).unwrap();
    writer
        .add_histogram("dense/kernel", vec![0.1, -0.1, 0.0], 1)
        .unwrap();

    let events = read_events(writer.events_path()).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].tag, "epoch_loss");
    assert_eq!(events[1].step, 1);
    assert_eq!(events[1].value, SummaryValue::Scalar { value: 0.25 });
    assert!(matches!(events[2].value, SummaryValue::Histogram(ref h) if h.num == 3));
    assert!(events[0].wall_time > 0.0);
}

#[test]
fn summary_writers_share_a_stream_test() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = SummaryWriter::new(dir.path()).unwrap();
    let mut second = SummaryWriter::new(dir.path()).unwrap();
    first.add_scalar("epoch_accuracy", 0.8, 0).unwrap();
    second.add_scalar("epoch_accuracy", 0.9, 1).unwrap();
    first.add_scalar("epoch_accuracy", 0.95, 2).unwrap();

    let events = read_events(dir.path().join(EVENTS_FILE_NAME)).unwrap();
    let steps: Vec<u64> = events.iter().map(|e| e.step).collect();
    assert_eq!(steps, vec![0, 1, 2]);
}

#[test]
fn summary_writer_image_path_is_relative_test() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SummaryWriter::new(dir.path()).unwrap();
    let image = dir.path().join("images").join("cm.png");

    writer.add_image("Confusion Matrix", &image, 10, 20, 3).unwrap();

    let events = read_events(writer.events_path()).unwrap();
    assert_eq!(
        events[0].value,
        SummaryValue::Image {
            path: "images/cm.png".to_string(),
            width: 10,
            height: 20,
        }
    );
    assert_eq!(writer.dir(), dir.path());
}

#[test]
fn summary_event_json_layout_test() {
    let event = SummaryEvent {
        wall_time: 1.5,
        step: 2,
        tag: "epoch_loss".to_string(),
        value: SummaryValue::Scalar { value: 0.5 },
    };

    let json: serde_json::Value = serde_json::to_value(&event).unwrap();

    assert_eq!(json["kind"], "scalar");
    assert_eq!(json["tag"], "epoch_loss");
    assert_eq!(json["value"], 0.5);
}

#[test]
fn read_events_missing_file_test() {
    assert!(read_events(Path::new("no/such/dir/events.jsonl")).is_err());
}
