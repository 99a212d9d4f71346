use onnxruntime::ndarray::{Array, Array2};
use onnxruntime::session::Session;
use tokenizers::Tokenizer;

use crate::assets::ModelAssets;
use crate::model::EmbeddingModel;
use crate::normalize::l2_normalize_in_place;
use crate::session::{LoadedSession, SessionThread};
use crate::SemanticError;

/// Sentence embedder backed by an ONNX Runtime session and a HuggingFace tokenizer.
///
/// Token embeddings are mean-pooled with the attention mask and L2-normalized.
/// The session is built once, on a dedicated thread that serves every embed.
#[derive(Debug, Clone)]
pub struct OnnxEmbedder {
    model_name: String,
    session: SessionThread,
}

impl OnnxEmbedder {
    /// Builds the session and returns once it is ready to embed.
    pub fn load(assets: ModelAssets, max_sequence_length: usize) -> Result<Self, SemanticError> {
        let model_name = assets.model_name.clone();
        let session = SessionThread::spawn(&model_name, move || {
            let mut loaded = LoadedSession::load(&assets)?;
            tracing::debug!(model = %assets.model_name, "onnx session built");
            Ok(move |texts: &[String]| run_onnx_embeddings(&mut loaded, texts, max_sequence_length))
        })?;
        Ok(Self {
            model_name,
            session,
        })
    }

    pub fn embed_batch<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.session
            .run(texts.iter().map(|t| t.as_ref().to_string()).collect())
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| SemanticError::Embedding("model returned no outputs".into()))
    }
}

fn run_onnx_embeddings(
    loaded: &mut LoadedSession,
    texts: &[String],
    max_sequence_length: usize,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    let (encoded, max_len) = encode_documents(&loaded.tokenizer, texts, max_sequence_length)?;
    let (input_ids, attn_mask) = build_padded_arrays(encoded, max_len)?;
    let mut vectors = execute_session(&mut loaded.session, input_ids, attn_mask)?;
    for v in &mut vectors {
        l2_normalize_in_place(v);
    }
    Ok(vectors)
}

struct EncodedDoc {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

fn encode_documents<T: AsRef<str>>(
    tokenizer: &Tokenizer,
    texts: &[T],
    max_sequence_length: usize,
) -> Result<(Vec<EncodedDoc>, usize), SemanticError> {
    let mut encoded = Vec::with_capacity(texts.len());
    let mut max_len = 0usize;

    for text in texts {
        let encoding = tokenizer
            .encode(text.as_ref(), true)
            .map_err(|e| SemanticError::Embedding(e.to_string()))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let mut mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| x as i64)
            .collect();
        ids.truncate(max_sequence_length);
        mask.truncate(max_sequence_length);
        max_len = max_len.max(ids.len());
        encoded.push(EncodedDoc { ids, mask });
    }

    Ok((encoded, max_len))
}

fn build_padded_arrays(
    encoded: Vec<EncodedDoc>,
    max_len: usize,
) -> Result<(Array2<i64>, Array2<i64>), SemanticError> {
    let seq_len = max_len.max(1);
    let batch = encoded.len();
    let mut id_storage = Vec::with_capacity(batch * seq_len);
    let mut mask_storage = Vec::with_capacity(batch * seq_len);

    for EncodedDoc { ids, mask } in encoded {
        if ids.len() != mask.len() {
            return Err(SemanticError::Embedding(
                "tokenizer produced mismatched id/mask lengths".into(),
            ));
        }
        let pad = seq_len.saturating_sub(ids.len());
        id_storage.extend(ids);
        mask_storage.extend(mask);
        id_storage.extend(std::iter::repeat_n(0, pad));
        mask_storage.extend(std::iter::repeat_n(0, pad));
    }

    let input_ids = Array::from_shape_vec((batch, seq_len), id_storage)
        .map_err(|e| SemanticError::Embedding(e.to_string()))?;
    let attn_mask = Array::from_shape_vec((batch, seq_len), mask_storage)
        .map_err(|e| SemanticError::Embedding(e.to_string()))?;
    Ok((input_ids, attn_mask))
}

fn execute_session(
    session_ref: &mut Session<'static>,
    input_ids: Array2<i64>,
    attn_mask: Array2<i64>,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    let (batch, seq_len) = input_ids.dim();
    let mask_rows = attn_mask.clone();
    let mut runtime_inputs = Vec::with_capacity(session_ref.inputs.len());
    let mut input_ids_tensor = Some(input_ids);
    let mut attn_mask_tensor = Some(attn_mask);

    for input in &session_ref.inputs {
        let tensor = match input.name.as_str() {
            "input_ids" => input_ids_tensor.take(),
            "attention_mask" => attn_mask_tensor.take(),
            "token_type_ids" => Some(Array::from_elem((batch, seq_len), 0_i64)),
            other => {
                return Err(SemanticError::Embedding(format!(
                    "unsupported model input '{other}'"
                )))
            }
        };
        let tensor = tensor.ok_or_else(|| {
            SemanticError::Embedding(format!("model requested '{}' twice", input.name))
        })?;
        runtime_inputs.push(tensor.into_dyn());
    }

    if runtime_inputs.is_empty() {
        return Err(SemanticError::Embedding(
            "model did not declare any inputs".into(),
        ));
    }

    let outputs = session_ref
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| SemanticError::Embedding(e.to_string()))?;
    let output_tensor = outputs
        .into_iter()
        .next()
        .ok_or_else(|| SemanticError::Embedding("model returned no outputs".into()))?;

    let shape = output_tensor.shape().to_vec();
    let flat: Vec<f32> = output_tensor.iter().copied().collect();
    pool_output(&shape, &flat, &mask_rows)
}

/// Reduces the first model output to one vector per input row.
///
/// `[batch, seq, hidden]` outputs (`last_hidden_state`) are averaged over the
/// positions whose attention mask is set. `[batch, hidden]` outputs are
/// already pooled and pass through.
fn pool_output(
    shape: &[usize],
    flat: &[f32],
    mask: &Array2<i64>,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    let expected: usize = shape.iter().product();
    if flat.len() != expected {
        return Err(SemanticError::Embedding(format!(
            "output has {} values but shape {shape:?}",
            flat.len()
        )));
    }

    match *shape {
        [batch, hidden] => Ok((0..batch)
            .map(|b| flat[b * hidden..(b + 1) * hidden].to_vec())
            .collect()),
        [batch, seq, hidden] => {
            if mask.dim() != (batch, seq) {
                return Err(SemanticError::Embedding(format!(
                    "attention mask {:?} does not match output {shape:?}",
                    mask.dim()
                )));
            }
            let mut pooled = Vec::with_capacity(batch);
            for b in 0..batch {
                let mut sum = vec![0.0f32; hidden];
                let mut count = 0.0f32;
                for t in 0..seq {
                    if mask[[b, t]] == 0 {
                        continue;
                    }
                    count += 1.0;
                    let offset = (b * seq + t) * hidden;
                    for (acc, &x) in sum.iter_mut().zip(&flat[offset..offset + hidden]) {
                        *acc += x;
                    }
                }
                let denom = count.max(1e-9);
                for x in &mut sum {
                    *x /= denom;
                }
                pooled.push(sum);
            }
            Ok(pooled)
        }
        _ => Err(SemanticError::Embedding(format!(
            "unsupported output shape {shape:?}"
        ))),
    }
}
