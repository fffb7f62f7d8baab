use bnn::{
    codec, generate_weights, load_input_rows, load_train_data, predict_rows, Activation, BackendKind, Error, WeightSet,
};

#[test]
fn saved_weights_load_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/weights.txt");
    let weights = generate_weights(4, 6, 2, 1234).unwrap();

    codec::save(&path, &weights).unwrap();
    assert_eq!(codec::load(&path).unwrap(), weights);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("4 6 2\n"));
    assert_eq!(text.lines().count(), 1 + 6 + 2);
    assert!(text.lines().skip(1).take(6).all(|l| l.split('\t').count() == 5));
}

#[test]
fn short_final_row_is_a_format_error() {
    let malformed = "2 2 1\n0.1\t0.2\t0.3\n0.4\t0.5\t0.6\n0.7\t0.8\n";
    match codec::deserialize(malformed) {
        Err(Error::Format { line, message }) => {
            assert_eq!(line, 4);
            assert!(message.contains("expected 3 values"), "{}", message);
        }
        other => panic!("expected a format error, got {:?}", other),
    }
}

#[test]
fn missing_final_cluster_is_a_format_error() {
    assert!(matches!(codec::deserialize("1 2 1\n0.1\t0.2\n0.3\t0.4\n"), Err(Error::Format { line: 4, .. })));
}

#[test]
fn files_drive_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("train.txt");
    std::fs::write(&data_path, "2\n2 1\n0 1 1\n1 1 0\n").unwrap();
    let data = load_train_data(&data_path).unwrap();

    let rows_path = dir.path().join("rows.txt");
    std::fs::write(&rows_path, "0 1\n1 1\n\n").unwrap();
    let rows = load_input_rows(&rows_path).unwrap();

    assert_eq!(rows.len(), data.samples());
    for (row, pair) in rows.iter().zip(data.pairs()) {
        assert_eq!(row, &pair.input);
    }

    let weights = WeightSet::zeroed(2, 3, 1).unwrap();
    let outputs = predict_rows(&weights, Activation::Sigmoid, BackendKind::Sequential, &rows).unwrap();
    assert_eq!(outputs, vec![vec![0.5], vec![0.5]]);
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(codec::load(&dir.path().join("absent.txt")), Err(Error::Io(_))));
    assert!(matches!(load_train_data(&dir.path().join("absent.txt")), Err(Error::Io(_))));
}
