//! Container writer.
//!
//! The header and vocabulary are committed first, then tensor records are
//! streamed one at a time. A record's converted payload is dropped as soon as
//! it has been written, so at most one converted tensor is alive at once.

use crate::error::{FormatError, Result, to_i32};
use crate::header::{FormatType, HEADER_LEN, ModelHeader};
use crate::names::{clean_tensor_name, is_excluded_tensor};
use crate::policy::select_element_type;
use crate::tensor::{ElementType, TensorEntry, record_len, squeeze_shape};
use crate::vocab::Vocab;
use std::io::Write;
use tracing::{debug, warn};

/// Counters reported once a container is complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Total bytes written to the sink.
    pub bytes_written: u64,
    /// Tensor records emitted.
    pub tensors_written: usize,
    /// Tensors dropped by the name filter.
    pub tensors_skipped: usize,
    /// Records stored as f16.
    pub f16_tensors: usize,
}

/// Description of one emitted tensor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRecord {
    /// Cleaned name as stored.
    pub name: String,
    /// Squeezed logical shape (outermost first).
    pub shape: Vec<usize>,
    pub element_type: ElementType,
    /// Size of the whole record in bytes.
    pub len: usize,
}

/// Staged writer: header and vocab on construction, then one record per
/// [`write_tensor`](Self::write_tensor) call.
pub struct ModelWriter<W: Write> {
    sink: W,
    format_type: FormatType,
    summary: EncodeSummary,
}

impl<W: Write> ModelWriter<W> {
    /// Validate the vocabulary against the header, then write both.
    ///
    /// Nothing reaches the sink if validation fails.
    pub fn new(mut sink: W, header: &ModelHeader, vocab: &Vocab) -> Result<Self> {
        let expected = header.vocab_len()?;
        if vocab.len() != expected {
            return Err(FormatError::VocabSizeMismatch { expected, actual: vocab.len() });
        }

        header.write_to(&mut sink)?;
        let vocab_bytes = vocab.write_to(&mut sink)?;
        debug!(vocab_size = vocab.len(), vocab_bytes, "wrote header and vocab");

        Ok(Self {
            sink,
            format_type: header.format_type,
            summary: EncodeSummary {
                bytes_written: (HEADER_LEN + vocab_bytes) as u64,
                ..EncodeSummary::default()
            },
        })
    }

    /// Write one tensor record, or skip it if its name is filtered out.
    ///
    /// Returns `None` for skipped tensors.
    pub fn write_tensor(&mut self, tensor: &TensorEntry<'_>) -> Result<Option<WrittenRecord>> {
        let name = clean_tensor_name(&tensor.name);
        if is_excluded_tensor(name) {
            debug!(name, "skipping tensor");
            self.summary.tensors_skipped += 1;
            return Ok(None);
        }

        let expected = tensor.num_elements() * tensor.data.dtype().element_size();
        let actual = tensor.data.as_bytes().len();
        if actual != expected {
            return Err(FormatError::PayloadSizeMismatch { name: name.to_string(), expected, actual });
        }

        let shape = squeeze_shape(&tensor.shape);
        let element_type = select_element_type(name, shape.len(), self.format_type);

        // Every i32 field is checked before the first byte of the record goes out.
        let rank = to_i32(shape.len(), "tensor rank")?;
        let name_len = to_i32(name.len(), "tensor name length")?;
        let dims = shape
            .iter()
            .rev()
            .map(|&d| {
                i32::try_from(d).map_err(|_| FormatError::FieldOverflow {
                    what: format!("dimension of `{name}`"),
                    value: d,
                })
            })
            .collect::<Result<Vec<i32>>>()?;

        let converted = tensor.data.convert(element_type);
        if converted.overflowed > 0 {
            warn!(
                name,
                count = converted.overflowed,
                "values outside the f16 range were stored as infinity"
            );
        }

        self.put_i32(rank)?;
        self.put_i32(name_len)?;
        self.put_i32(element_type.code())?;
        for d in dims {
            self.put_i32(d)?;
        }
        self.put(name.as_bytes())?;
        self.put(&converted.bytes)?;

        let len = record_len(shape.len(), name.len(), converted.bytes.len());
        debug!(name, ?shape, ?element_type, len, "wrote tensor");

        self.summary.tensors_written += 1;
        if element_type == ElementType::F16 {
            self.summary.f16_tensors += 1;
        }

        Ok(Some(WrittenRecord { name: name.to_string(), shape, element_type, len }))
    }

    /// Counters so far.
    pub fn summary(&self) -> EncodeSummary {
        self.summary
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<(W, EncodeSummary)> {
        self.sink.flush()?;
        Ok((self.sink, self.summary))
    }

    fn put_i32(&mut self, v: i32) -> Result<()> {
        self.put(&v.to_le_bytes())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        self.summary.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

/// Write a complete container to `sink`.
///
/// `tensors` is written in the order given. Any error aborts the whole
/// operation; whatever already reached the sink is not a valid container.
pub fn encode<'t, 'a: 't, W, I>(
    header: &ModelHeader,
    vocab: &Vocab,
    tensors: I,
    sink: W,
) -> Result<EncodeSummary>
where
    W: Write,
    I: IntoIterator<Item = &'t TensorEntry<'a>>,
{
    let mut writer = ModelWriter::new(sink, header, vocab)?;
    for tensor in tensors {
        writer.write_tensor(tensor)?;
    }
    let (_, summary) = writer.finish()?;
    Ok(summary)
}
