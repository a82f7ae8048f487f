//! # Embedder Gateway (C4)
//!
//! Wraps a dense text encoder behind a narrow [`EmbeddingBackend`] trait so
//! the concrete model (BERT via `candle`, loaded from a config-driven HF
//! Hub repo id) can be swapped for a deterministic fake in tests.
//! Initialization is idempotent and single-flight via
//! [`tokio::sync::OnceCell`], needed because `embed_many` fans out
//! multiple awaited calls concurrently.

use std::sync::Arc;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;

use crate::error::EmbedError;

const MAX_INPUT_CHARS: usize = 512;

/// A text encoder that turns a batch of strings into L2-normalized vectors.
///
/// Implementors are not required to normalize their own output — the
/// gateway normalizes defensively in [`EmbedderGateway::embed_many`].
pub trait EmbeddingBackend: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

/// BERT-family encoder loaded from a HuggingFace Hub repo id: tokenize,
/// run the model, mean-pool over the attention mask, then L2-normalize.
pub struct BertBackend {
    model: bert::BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl BertBackend {
    pub fn load(repo_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        let api = Api::new().context("failed to create HF Hub API")?;
        let repo = api.model(repo_id.to_string());

        let config_path = repo
            .get("config.json")
            .context("failed to download config.json")?;
        let tokenizer = match repo.get("tokenizer.json") {
            Ok(path) => Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("{e}"))?,
            Err(_) => {
                let vocab_path = repo
                    .get("vocab.txt")
                    .context("failed to download vocab.txt")?;
                Self::build_wordpiece_tokenizer(
                    vocab_path.to_str().context("invalid vocab.txt path")?,
                )?
            }
        };

        let config_str = std::fs::read_to_string(&config_path)?;
        let config: bert::Config =
            serde_json::from_str(&config_str).context("failed to parse model config")?;
        let dimension = config.hidden_size;

        let vb = match repo.get("model.safetensors") {
            Ok(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)
                    .context("failed to load safetensors weights")?
            },
            Err(_) => {
                let weights_path = repo
                    .get("pytorch_model.bin")
                    .context("failed to download pytorch_model.bin")?;
                VarBuilder::from_pth(&weights_path, DType::F32, &device)
                    .context("failed to load pytorch weights")?
            }
        };

        let model = bert::BertModel::load(vb, &config).context("failed to load bert model")?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
        })
    }

    fn build_wordpiece_tokenizer(vocab_path: &str) -> Result<Tokenizer> {
        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path)
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, true)));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), 102),
            ("[CLS]".to_string(), 101),
        )));
        Ok(tokenizer)
    }

    fn pool_and_normalize(&self, output: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .to_dtype(DType::F32)?
            .broadcast_as(output.shape())?;
        let masked = (output * mask_expanded.clone())?;
        let summed = masked.sum(1)?;
        let mask_sum = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / mask_sum)?;
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        Ok(pooled.broadcast_div(&norm)?)
    }
}

impl EmbeddingBackend for BertBackend {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings: Vec<_> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("tokenizer error: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = encodings.len();
        let mut all_ids = vec![0u32; batch_size * max_len];
        let all_type_ids = vec![0u32; batch_size * max_len];
        let mut all_mask = vec![0u32; batch_size * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let ids = enc.get_ids();
            let mask = enc.get_attention_mask();
            let offset = i * max_len;
            for (j, &id) in ids.iter().enumerate() {
                all_ids[offset + j] = id;
                all_mask[offset + j] = mask[j];
            }
        }

        let input_ids = Tensor::from_vec(all_ids, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(all_type_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(all_mask, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let normalized = self.pool_and_normalize(&output, &attention_mask)?;
        Ok(normalized.to_vec2()?)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Config needed to lazily construct the default backend.
pub struct EmbedderConfig {
    pub repo_id: String,
    pub batch_size: usize,
}

/// Public gateway (C4). Owns the single-flight init cell and fans batch
/// requests out across `batch_size` concurrent encode calls.
pub struct EmbedderGateway {
    config: EmbedderConfig,
    backend: OnceCell<Arc<dyn EmbeddingBackend>>,
    /// Present only in tests: bypasses HF Hub download entirely.
    preloaded: Option<Arc<dyn EmbeddingBackend>>,
}

impl EmbedderGateway {
    pub fn new(config: EmbedderConfig) -> Self {
        Self {
            config,
            backend: OnceCell::new(),
            preloaded: None,
        }
    }

    /// Construct a gateway around an already-built backend, skipping lazy
    /// HF Hub initialization entirely. Used by tests and by deployments
    /// that inject a fake/offline embedder.
    pub fn with_backend(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            config: EmbedderConfig {
                repo_id: String::new(),
                batch_size: 20,
            },
            backend: OnceCell::new(),
            preloaded: Some(backend),
        }
    }

    async fn backend(&self) -> Result<Arc<dyn EmbeddingBackend>, EmbedError> {
        if let Some(preloaded) = &self.preloaded {
            return Ok(preloaded.clone());
        }
        self.backend
            .get_or_try_init(|| async {
                let repo_id = self.config.repo_id.clone();
                tracing::info!(repo_id = %repo_id, "initializing embedder backend");
                tokio::task::spawn_blocking(move || BertBackend::load(&repo_id))
                    .await
                    .map_err(|e| anyhow::anyhow!("embedder init task panicked: {e}"))
                    .and_then(|r| r)
                    .map(|b| Arc::new(b) as Arc<dyn EmbeddingBackend>)
            })
            .await
            .map(|b| b.clone())
            .map_err(|e| EmbedError::Unavailable(e.to_string()))
    }

    fn truncate(text: &str) -> String {
        text.chars().take(MAX_INPUT_CHARS).collect()
    }

    fn normalize(v: &mut [f32]) {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-9 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vecs = self.embed_many(std::slice::from_ref(&text.to_string())).await?;
        Ok(vecs.pop().unwrap_or_default())
    }

    /// Encode `texts` preserving input order, fanned out across up to
    /// `batch_size` concurrent encode calls.
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let backend = self.backend().await?;
        let truncated: Vec<String> = texts.iter().map(|t| Self::truncate(t)).collect();
        let batch_size = self.config.batch_size.max(1);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(batch_size));

        let mut handles = Vec::with_capacity(truncated.len());
        for text in truncated {
            let backend = backend.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("embedder fan-out semaphore closed");
                tokio::task::spawn_blocking(move || backend.encode(&[text]))
                    .await
                    .map_err(|e| EmbedError::Unavailable(format!("encode task panicked: {e}")))?
                    .map_err(|e| EmbedError::Unavailable(e.to_string()))
                    .map(|mut v| v.pop().unwrap_or_default())
            }));
        }

        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            let mut v = handle
                .await
                .map_err(|e| EmbedError::Unavailable(format!("embed task panicked: {e}")))??;
            Self::normalize(&mut v);
            out.push(v);
        }
        Ok(out)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::EmbeddingBackend;
    use anyhow::Result;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Deterministic hash-based fake: same text always yields the same
    /// vector, distinct texts yield (almost certainly) distinct vectors.
    /// Used by tests so they never touch the network or candle.
    pub struct FakeBackend {
        pub dimension: usize,
    }

    impl EmbeddingBackend for FakeBackend {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| self.hash_vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    impl FakeBackend {
        fn hash_vector(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0f32; self.dimension];
            for (i, word) in text.split_whitespace().enumerate() {
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                (i as u64).hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dimension;
                v[idx] += 1.0;
            }
            if v.iter().all(|x| *x == 0.0) {
                v[0] = 1.0;
            }
            v
        }
    }
}
