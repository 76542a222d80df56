//! Conversion of a complete (tiny) model directory.

use ner_convert::{ConvertConfig, ConvertError, ModelConfig, convert, expected_tensors};
use ner_format::{Container, ElementType, FormatError, FormatType};
use safetensors::tensor::{Dtype, TensorView};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const CONFIG: &str = r#"{
    "architectures": ["BertForTokenClassification"],
    "model_type": "bert",
    "vocab_size": 2,
    "max_position_embeddings": 8,
    "hidden_size": 4,
    "intermediate_size": 8,
    "num_attention_heads": 2,
    "num_hidden_layers": 1,
    "type_vocab_size": 2,
    "id2label": {"0": "O", "1": "B-PER"}
}"#;

const TOKENIZER: &str = r#"{"model": {"type": "WordPiece", "vocab": {"b": 1, "a": 0}}, "added_tokens": []}"#;

/// Write a safetensors file holding `tensors` in the order given.
fn write_safetensors(path: &Path, tensors: &[(String, Vec<usize>)]) {
    let mut header = serde_json::Map::new();
    let mut data = Vec::new();
    for (i, (name, shape)) in tensors.iter().enumerate() {
        let n: usize = shape.iter().product();
        let start = data.len();
        for k in 0..n {
            data.extend_from_slice(&((i * 100 + k) as f32 * 0.5).to_le_bytes());
        }
        header.insert(
            name.clone(),
            json!({"dtype": "F32", "shape": shape, "data_offsets": [start, data.len()]}),
        );
    }
    let header = serde_json::to_vec(&header).unwrap();
    let mut buffer = (header.len() as u64).to_le_bytes().to_vec();
    buffer.extend_from_slice(&header);
    buffer.extend_from_slice(&data);
    fs::write(path, buffer).unwrap();
}

/// A model directory with every BERT tensor, reversed so that data order
/// differs from both name order and layout order.
fn model_dir() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.json"), CONFIG).unwrap();
    fs::write(dir.path().join("tokenizer.json"), TOKENIZER).unwrap();

    let cfg = ModelConfig::from_json(CONFIG).unwrap();
    let mut tensors: Vec<(String, Vec<usize>)> = expected_tensors(&cfg)
        .into_iter()
        .map(|(name, shape)| (format!("bert.{name}"), shape))
        .collect();
    tensors.push(("bert.embeddings.position_ids".into(), vec![1, 8]));
    tensors.reverse();
    write_safetensors(&dir.path().join("model.safetensors"), &tensors);
    dir
}

/// Write `tensors` the way `safetensors` itself lays out a checkpoint.
fn serialize_checkpoint(path: &Path, tensors: &[(String, Vec<usize>)]) {
    let payloads: Vec<Vec<u8>> = tensors
        .iter()
        .map(|(_, shape)| vec![0u8; shape.iter().product::<usize>() * 4])
        .collect();
    let views: Vec<(&str, TensorView<'_>)> = tensors
        .iter()
        .zip(&payloads)
        .map(|((name, shape), bytes)| {
            (name.as_str(), TensorView::new(Dtype::F32, shape.clone(), bytes).unwrap())
        })
        .collect();
    let data = safetensors::serialize(views.iter().map(|(k, v)| (*k, v)), None).unwrap();
    fs::write(path, data).unwrap();
}

fn config_for(model: &TempDir, out: &TempDir) -> ConvertConfig {
    let mut cfg = ConvertConfig::new(model.path());
    cfg.model_id = Some("org/tiny-ner".into());
    cfg.output_dir = out.path().join("models");
    cfg
}

#[test]
fn converts_with_strict_and_verify() {
    let model = model_dir();
    let out = tempdir().unwrap();
    let mut cfg = config_for(&model, &out);
    cfg.strict = true;
    cfg.verify = true;

    let report = convert(&cfg).unwrap();
    assert_eq!(report.output, out.path().join("models").join("org_tiny-ner_ner.bin"));
    assert!(report.verified);
    assert_eq!(report.summary.tensors_skipped, 1);
    assert_eq!(report.summary.tensors_written, 5 + 16 + 2);

    let container = Container::open(&report.output).unwrap();
    assert_eq!(container.header.vocab_size, 2);
    assert_eq!(container.header.num_labels, 2);
    assert_eq!(container.header.format_type, FormatType::Mixed);
    assert_eq!(container.vocab.tokens(), ["a", "b"]);

    // Data offsets are reversed in the checkpoint; the container follows the model.
    let names: Vec<&str> = container.tensors.iter().map(|t| t.name.as_str()).collect();
    let layout = expected_tensors(&ModelConfig::from_json(CONFIG).unwrap());
    assert_eq!(names, layout.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>());
    assert!(container.tensors.iter().all(|t| t.name != "embeddings.position_ids"));
    assert!(container.tensors.iter().all(|t| !t.name.starts_with("bert.")));

    let weight = container.tensor("classifier.weight").unwrap();
    assert_eq!(weight.element_type, ElementType::F16);
    assert_eq!(weight.disk_dims(), vec![4, 2]);
    let bias = container.tensor("classifier.bias").unwrap();
    assert_eq!(bias.element_type, ElementType::F32);
    assert_eq!(bias.disk_dims(), vec![2]);
    let ln = container.tensor("encoder.layer.0.output.LayerNorm.weight").unwrap();
    assert_eq!(ln.element_type, ElementType::F32);
}

#[test]
fn serialized_checkpoint_is_written_in_layer_order() {
    let model = model_dir();
    let out = tempdir().unwrap();
    let config = CONFIG.replace("\"num_hidden_layers\": 1", "\"num_hidden_layers\": 11");
    fs::write(model.path().join("config.json"), &config).unwrap();

    let cfg = ModelConfig::from_json(&config).unwrap();
    let layout = expected_tensors(&cfg);
    let mut tensors: Vec<(String, Vec<usize>)> = layout
        .iter()
        .map(|(name, shape)| (format!("bert.{name}"), shape.clone()))
        .collect();
    tensors.insert(0, ("bert.embeddings.position_ids".into(), vec![1, 8]));
    serialize_checkpoint(&model.path().join("model.safetensors"), &tensors);

    let mut convert_cfg = config_for(&model, &out);
    convert_cfg.strict = true;
    convert_cfg.verify = true;
    let report = convert(&convert_cfg).unwrap();

    let container = Container::open(&report.output).unwrap();
    let names: Vec<&str> = container.tensors.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, layout.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>());
    let pos = |n: &str| names.iter().position(|&x| x == n).unwrap();
    assert!(pos("encoder.layer.2.output.dense.bias") < pos("encoder.layer.10.output.dense.bias"));
    assert!(pos("classifier.weight") < pos("classifier.bias"));
}

#[test]
fn full_precision_output() {
    let model = model_dir();
    let out = tempdir().unwrap();
    let mut cfg = config_for(&model, &out);
    cfg.format_type = FormatType::Full;

    let report = convert(&cfg).unwrap();
    assert_eq!(report.summary.f16_tensors, 0);
    let container = Container::open(&report.output).unwrap();
    assert_eq!(container.header.format_type, FormatType::Full);
    assert!(container.tensors.iter().all(|t| t.element_type == ElementType::F32));
}

#[test]
fn non_bert_model_writes_nothing() {
    let model = model_dir();
    let out = tempdir().unwrap();
    let config = CONFIG.replace("\"bert\"", "\"distilbert\"");
    fs::write(model.path().join("config.json"), config).unwrap();

    let err = convert(&config_for(&model, &out)).unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedArchitecture { ref found } if found == "distilbert"));
    assert!(!out.path().join("models").exists());
}

#[test]
fn vocab_size_disagreement_writes_nothing() {
    let model = model_dir();
    let out = tempdir().unwrap();
    let config = CONFIG.replace("\"vocab_size\": 2", "\"vocab_size\": 3");
    fs::write(model.path().join("config.json"), config).unwrap();

    let err = convert(&config_for(&model, &out)).unwrap_err();
    assert!(
        matches!(err, ConvertError::Format(FormatError::VocabSizeMismatch { expected: 3, actual: 2 })),
        "got {err:?}"
    );
    assert!(!out.path().join("models").exists());
}

#[test]
fn strict_mode_rejects_incomplete_checkpoint() {
    let model = model_dir();
    let out = tempdir().unwrap();
    write_safetensors(
        &model.path().join("model.safetensors"),
        &[("bert.classifier.weight".into(), vec![2, 4]), ("bert.classifier.bias".into(), vec![2])],
    );
    let mut cfg = config_for(&model, &out);
    cfg.strict = true;

    let err = convert(&cfg).unwrap_err();
    assert!(matches!(err, ConvertError::LayoutMismatch(_)), "got {err:?}");
    assert!(!out.path().join("models").exists());

    // Without --strict the partial checkpoint converts as-is.
    cfg.strict = false;
    let report = convert(&cfg).unwrap();
    assert_eq!(report.summary.tensors_written, 2);
}

#[test]
fn explicit_output_path() {
    let model = model_dir();
    let out = tempdir().unwrap();
    let mut cfg = config_for(&model, &out);
    cfg.output = Some(out.path().join("custom.bin"));

    let report = convert(&cfg).unwrap();
    assert_eq!(report.output, out.path().join("custom.bin"));
    assert!(report.output.is_file());
    assert!(!out.path().join("models").exists());
}
