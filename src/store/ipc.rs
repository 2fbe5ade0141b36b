//! Arrow IPC encoding of trained models.
//!
//! One record batch, one row per pixel, in wavelength order:
//!
//! | column         | type                          |
//! |----------------|-------------------------------|
//! | `wavelength`   | `Float64`                     |
//! | `scatter`      | `Float64`                     |
//! | `status`       | `UInt8` ([`PixelStatus::code`]) |
//! | `iterations`   | `UInt64`                      |
//! | `coefficients` | `FixedSizeList<Float64, k>`   |
//!
//! Schema metadata carries the format tag, the format version and the
//! frozen vectorizer as JSON. Floats travel as raw IEEE-754 bits in the
//! columns and as shortest round-trip decimals in the JSON, so a decoded
//! model is bit-identical to the encoded one.
use crate::{
    spectral::{
        core::vectorizer::LabelVectorizer,
        models::trained::{Model, PixelCoefficients, PixelStatus},
    },
    store::errors::{StoreError, StoreResult},
};
use arrow::{
    array::{Array, ArrayRef, FixedSizeListArray, Float64Array, UInt64Array, UInt8Array},
    datatypes::{DataType, Field, Schema},
    ipc::{reader::StreamReader, writer::StreamWriter},
    record_batch::RecordBatch,
};
use log::debug;
use ndarray::Array1;
use std::{
    collections::HashMap,
    io::{Cursor, Read, Write},
    sync::Arc,
};

/// Value of the format metadata key.
pub const FORMAT_TAG: &str = "rust_spectra/model";
/// Current format version. Streams with any other version are rejected.
pub const FORMAT_VERSION: &str = "1";

pub(crate) const KEY_FORMAT: &str = "spectra:format";
pub(crate) const KEY_VERSION: &str = "spectra:version";
pub(crate) const KEY_VECTORIZER: &str = "spectra:vectorizer";

const COL_WAVELENGTH: &str = "wavelength";
const COL_SCATTER: &str = "scatter";
const COL_STATUS: &str = "status";
const COL_ITERATIONS: &str = "iterations";
const COL_COEFFICIENTS: &str = "coefficients";

/// Encode a model into an in-memory Arrow IPC stream.
///
/// # Errors
/// - `StoreError::Json` if the vectorizer cannot be serialized.
/// - `StoreError::Arrow` on any IPC failure.
pub fn save(model: &Model) -> StoreResult<Vec<u8>> {
    let mut buffer = Vec::new();
    save_to(model, &mut buffer)?;
    Ok(buffer)
}

/// Encode a model into `writer` as an Arrow IPC stream.
///
/// # Errors
/// Same as [`save`]; I/O failures of `writer` surface as `StoreError::Arrow`.
pub fn save_to<W: Write>(model: &Model, writer: W) -> StoreResult<()> {
    let batch = to_record_batch(model)?;
    let mut stream = StreamWriter::try_new(writer, batch.schema().as_ref())?;
    stream.write(&batch)?;
    stream.finish()?;
    debug!("encoded model with {} pixels", model.n_pixels());
    Ok(())
}

/// Decode a model from an in-memory Arrow IPC stream.
///
/// # Errors
/// See [`load_from`].
pub fn load(bytes: &[u8]) -> StoreResult<Model> {
    load_from(Cursor::new(bytes))
}

/// load_from — decode a model from an Arrow IPC stream.
///
/// Errors
/// ------
/// - `StoreError::Arrow` for streams Arrow cannot read.
/// - `StoreError::MissingMetadata`, `StoreError::UnsupportedFormat`,
///   `StoreError::UnsupportedVersion` for foreign or incompatible streams.
/// - `StoreError::Json` for an unreadable vectorizer description.
/// - `StoreError::MissingColumn`, `StoreError::InvalidColumn`,
///   `StoreError::InvalidStatus` for malformed columns.
/// - `StoreError::Model` when the stored vectorizer does not rebuild to the
///   same terms, or the assembled model fails [`Model::new`].
pub fn load_from<R: Read>(reader: R) -> StoreResult<Model> {
    let stream = StreamReader::try_new(reader, None)?;
    let metadata = stream.schema().metadata().clone();
    check_header(&metadata)?;
    let vectorizer = decode_vectorizer(&metadata)?;
    let k = vectorizer.n_terms();

    let mut wavelength = Vec::new();
    let mut pixels = Vec::new();
    for batch in stream {
        let batch = batch?;
        let wl = float_column(&batch, COL_WAVELENGTH)?;
        let scatter = float_column(&batch, COL_SCATTER)?;
        let status = typed_column::<UInt8Array>(&batch, COL_STATUS, "expected UInt8")?;
        let iterations = typed_column::<UInt64Array>(&batch, COL_ITERATIONS, "expected UInt64")?;
        let coefficients = typed_column::<FixedSizeListArray>(
            &batch,
            COL_COEFFICIENTS,
            "expected FixedSizeList<Float64>",
        )?;
        if coefficients.value_length() as usize != k {
            return Err(StoreError::InvalidColumn {
                name: COL_COEFFICIENTS,
                reason: "list width differs from the vectorizer's term count",
            });
        }

        for row in 0..batch.num_rows() {
            let pixel = wavelength.len();
            let code = status.value(row);
            let status = PixelStatus::from_code(code)
                .ok_or(StoreError::InvalidStatus { pixel, code })?;
            let row_values = coefficients.value(row);
            let row_values = row_values.as_any().downcast_ref::<Float64Array>().ok_or(
                StoreError::InvalidColumn {
                    name: COL_COEFFICIENTS,
                    reason: "expected Float64 list items",
                },
            )?;
            if row_values.null_count() > 0 {
                return Err(StoreError::InvalidColumn {
                    name: COL_COEFFICIENTS,
                    reason: "contains nulls",
                });
            }
            let iterations = usize::try_from(iterations.value(row)).map_err(|_| {
                StoreError::InvalidColumn { name: COL_ITERATIONS, reason: "value exceeds usize" }
            })?;
            wavelength.push(wl.value(row));
            pixels.push(PixelCoefficients {
                coefficients: Array1::from(row_values.values().to_vec()),
                scatter: scatter.value(row),
                status,
                iterations,
            });
        }
    }

    let model = Model::new(Array1::from(wavelength), vectorizer, pixels)?;
    debug!("decoded model with {} pixels", model.n_pixels());
    Ok(model)
}

fn to_record_batch(model: &Model) -> StoreResult<RecordBatch> {
    let k = model.vectorizer().n_terms();
    let item = Arc::new(Field::new("item", DataType::Float64, false));
    let list_width = i32::try_from(k).map_err(|_| StoreError::InvalidColumn {
        name: COL_COEFFICIENTS,
        reason: "term count exceeds the IPC list width",
    })?;

    let mut metadata = HashMap::new();
    metadata.insert(KEY_FORMAT.to_string(), FORMAT_TAG.to_string());
    metadata.insert(KEY_VERSION.to_string(), FORMAT_VERSION.to_string());
    metadata.insert(KEY_VECTORIZER.to_string(), serde_json::to_string(model.vectorizer())?);

    let schema = Schema::new_with_metadata(
        vec![
            Field::new(COL_WAVELENGTH, DataType::Float64, false),
            Field::new(COL_SCATTER, DataType::Float64, false),
            Field::new(COL_STATUS, DataType::UInt8, false),
            Field::new(COL_ITERATIONS, DataType::UInt64, false),
            Field::new(COL_COEFFICIENTS, DataType::FixedSizeList(item.clone(), list_width), false),
        ],
        metadata,
    );

    let pixels = model.pixels();
    let flat: Vec<f64> = pixels.iter().flat_map(|p| p.coefficients.iter().copied()).collect();
    let coefficients =
        FixedSizeListArray::try_new(item, list_width, Arc::new(Float64Array::from(flat)), None)?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(model.wavelength().to_vec())),
        Arc::new(Float64Array::from(pixels.iter().map(|p| p.scatter).collect::<Vec<_>>())),
        Arc::new(UInt8Array::from(pixels.iter().map(|p| p.status.code()).collect::<Vec<_>>())),
        Arc::new(UInt64Array::from(
            pixels.iter().map(|p| p.iterations as u64).collect::<Vec<_>>(),
        )),
        Arc::new(coefficients),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

fn check_header(metadata: &HashMap<String, String>) -> StoreResult<()> {
    let format = metadata.get(KEY_FORMAT).ok_or(StoreError::MissingMetadata { key: KEY_FORMAT })?;
    if format != FORMAT_TAG {
        return Err(StoreError::UnsupportedFormat { found: format.clone() });
    }
    let version =
        metadata.get(KEY_VERSION).ok_or(StoreError::MissingMetadata { key: KEY_VERSION })?;
    if version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion { found: version.clone() });
    }
    Ok(())
}

/// Deserialize the stored vectorizer and check it against a fresh rebuild
/// from its own statistics, so term order cannot drift silently.
fn decode_vectorizer(metadata: &HashMap<String, String>) -> StoreResult<LabelVectorizer> {
    let text =
        metadata.get(KEY_VECTORIZER).ok_or(StoreError::MissingMetadata { key: KEY_VECTORIZER })?;
    let stored: LabelVectorizer = serde_json::from_str(text)?;
    let (lower, upper) = stored.label_bounds();
    let rebuilt = LabelVectorizer::new(
        stored.spec().clone(),
        stored.pivots().to_vec(),
        stored.scales().to_vec(),
        lower.to_vec(),
        upper.to_vec(),
    )?;
    rebuilt.ensure_compatible(&stored)?;
    Ok(stored)
}

fn typed_column<'b, A: Array + 'static>(
    batch: &'b RecordBatch, name: &'static str, reason: &'static str,
) -> StoreResult<&'b A> {
    let column = batch.column_by_name(name).ok_or(StoreError::MissingColumn { name })?;
    if column.null_count() > 0 {
        return Err(StoreError::InvalidColumn { name, reason: "contains nulls" });
    }
    column.as_any().downcast_ref::<A>().ok_or(StoreError::InvalidColumn { name, reason })
}

fn float_column<'b>(batch: &'b RecordBatch, name: &'static str) -> StoreResult<&'b Float64Array> {
    typed_column::<Float64Array>(batch, name, "expected Float64")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::{
        core::terms::LabelVectorSpec,
        errors::SpectralError,
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Bit-identical save/load of every pixel field and the vectorizer.
    // - Rejection of foreign, newer and corrupted streams.
    // - Schema-level checks on a hand-built stream.
    // -------------------------------------------------------------------------

    fn vectorizer() -> LabelVectorizer {
        LabelVectorizer::new(
            LabelVectorSpec::quadratic(&["teff", "logg"]),
            vec![4812.345678901234, 2.0 / 3.0],
            vec![301.7, 0.1 + 0.2],
            vec![4000.0, 0.5],
            vec![5600.0, 3.9],
        )
        .expect("valid vectorizer")
    }

    fn model() -> Model {
        let v = vectorizer();
        let k = v.n_terms();
        let awkward = [1.0 / 3.0, -0.0, 5e-324, 1e300, -2.718281828459045, 0.1 + 0.2];
        let pixels = vec![
            PixelCoefficients {
                coefficients: Array1::from_iter((0..k).map(|i| awkward[i % awkward.len()])),
                scatter: 0.012345678901234567,
                status: PixelStatus::Fit,
                iterations: 7,
            },
            PixelCoefficients {
                coefficients: Array1::from_iter((0..k).map(|i| (i as f64).sqrt() - 0.5)),
                scatter: 0.3,
                status: PixelStatus::LowConfidence,
                iterations: 100,
            },
            PixelCoefficients::unfit(k),
        ];
        Model::new(array![15000.1, 15000.3, 15000.7], v, pixels).expect("valid model")
    }

    fn assert_bit_identical(a: &Model, b: &Model) {
        let bits = |x: &[f64]| x.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(
            bits(a.wavelength().as_slice().expect("contiguous")),
            bits(b.wavelength().as_slice().expect("contiguous"))
        );
        assert_eq!(a.pixels().len(), b.pixels().len());
        for (pa, pb) in a.pixels().iter().zip(b.pixels()) {
            assert_eq!(
                bits(pa.coefficients.as_slice().expect("contiguous")),
                bits(pb.coefficients.as_slice().expect("contiguous"))
            );
            assert_eq!(pa.scatter.to_bits(), pb.scatter.to_bits());
            assert_eq!(pa.status, pb.status);
            assert_eq!(pa.iterations, pb.iterations);
        }
        let (va, vb) = (a.vectorizer(), b.vectorizer());
        assert_eq!(va.terms(), vb.terms());
        assert_eq!(bits(va.pivots()), bits(vb.pivots()));
        assert_eq!(bits(va.scales()), bits(vb.scales()));
        assert_eq!(bits(va.label_bounds().0), bits(vb.label_bounds().0));
        assert_eq!(bits(va.label_bounds().1), bits(vb.label_bounds().1));
    }

    fn batch_with_metadata(metadata: HashMap<String, String>) -> Vec<u8> {
        let schema = Arc::new(Schema::new_with_metadata(
            vec![Field::new(COL_WAVELENGTH, DataType::Float64, false)],
            metadata,
        ));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Float64Array::from(vec![1.0])) as ArrayRef],
        )
        .expect("valid batch");
        let mut buffer = Vec::new();
        let mut writer = StreamWriter::try_new(&mut buffer, schema.as_ref()).expect("writer");
        writer.write(&batch).expect("write");
        writer.finish().expect("finish");
        drop(writer);
        buffer
    }

    fn valid_metadata() -> HashMap<String, String> {
        HashMap::from([
            (KEY_FORMAT.to_string(), FORMAT_TAG.to_string()),
            (KEY_VERSION.to_string(), FORMAT_VERSION.to_string()),
            (KEY_VECTORIZER.to_string(), serde_json::to_string(&vectorizer()).expect("json")),
        ])
    }

    #[test]
    // Purpose
    // -------
    // Every float survives the trip with identical bits, including negative
    // zero, subnormals and values without a short decimal form.
    fn round_trip_is_bit_identical() {
        // Arrange
        let original = model();

        // Act
        let bytes = save(&original).expect("save");
        let restored = load(&bytes).expect("load");

        // Assert
        assert_bit_identical(&original, &restored);
        assert_eq!(original, restored);
    }

    #[test]
    fn writer_and_reader_variants_agree() {
        let original = model();
        let mut sink = Vec::new();
        save_to(&original, &mut sink).expect("save_to");

        assert_eq!(sink, save(&original).expect("save"));
        let restored = load_from(sink.as_slice()).expect("load_from");
        assert_bit_identical(&original, &restored);
    }

    #[test]
    fn restored_model_predicts_identically() {
        let original = model();
        let restored = load(&save(&original).expect("save")).expect("load");
        let labels = crate::spectral::core::data::LabelSet::from_pairs(&[
            ("teff", 4700.0),
            ("logg", 1.8),
        ])
        .expect("labels");

        let a = original.predict(&labels).expect("predict");
        let b = restored.predict(&labels).expect("predict");
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()));
        }
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut metadata = valid_metadata();
        metadata.insert(KEY_VERSION.to_string(), "2".to_string());

        assert_eq!(
            load(&batch_with_metadata(metadata)),
            Err(StoreError::UnsupportedVersion { found: "2".to_string() })
        );
    }

    #[test]
    fn foreign_streams_are_rejected() {
        let mut tagged = valid_metadata();
        tagged.insert(KEY_FORMAT.to_string(), "something/else".to_string());
        let mut untagged = valid_metadata();
        untagged.remove(KEY_FORMAT);

        assert_eq!(
            load(&batch_with_metadata(tagged)),
            Err(StoreError::UnsupportedFormat { found: "something/else".to_string() })
        );
        assert_eq!(
            load(&batch_with_metadata(untagged)),
            Err(StoreError::MissingMetadata { key: KEY_FORMAT })
        );
    }

    #[test]
    fn missing_columns_are_reported() {
        assert_eq!(
            load(&batch_with_metadata(valid_metadata())),
            Err(StoreError::MissingColumn { name: COL_SCATTER })
        );
    }

    #[test]
    fn corrupted_vectorizer_description_is_rejected() {
        let mut metadata = valid_metadata();
        metadata.insert(KEY_VECTORIZER.to_string(), "{\"spec\":".to_string());

        assert!(matches!(load(&batch_with_metadata(metadata)), Err(StoreError::Json { .. })));
    }

    #[test]
    fn inconsistent_vectorizer_description_is_rejected() {
        let mut json: serde_json::Value =
            serde_json::to_value(vectorizer()).expect("serializable");
        json["scales"] = serde_json::json!([-1.0, 1.0]);
        let mut metadata = valid_metadata();
        metadata.insert(KEY_VECTORIZER.to_string(), json.to_string());

        assert!(matches!(
            load(&batch_with_metadata(metadata)),
            Err(StoreError::Model(SpectralError::InvalidOption { name: "label scale", .. }))
        ));
    }

    #[test]
    fn corrupted_bytes_are_rejected() {
        let bytes = save(&model()).expect("save");

        // Cut inside the record batch body, past the end-of-stream marker.
        assert!(matches!(load(&bytes[..bytes.len() - 20]), Err(StoreError::Arrow { .. })));
        assert!(load(&[]).is_err());
    }
}
