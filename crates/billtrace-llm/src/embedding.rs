use crate::error::Error;

/// Given N strings, returns N same-dimension L2-normalized float vectors,
/// deterministic for a given model version, per spec.md §6.
pub trait EmbeddingClient: std::fmt::Debug + Send + Sync + 'static {
    fn embed<'s>(
        &'s self,
        sentences: &'s [String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, Error>> + Send + 's;
}

#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpEmbeddingClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    sentences: &'a [String],
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&EmbedRequest { sentences })
            .send()
            .await
            .map_err(|source| Error::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|source| Error::Transport {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if parsed.vectors.len() != sentences.len() {
            return Err(Error::EmbeddingCountMismatch {
                endpoint: self.endpoint.clone(),
                expected: sentences.len(),
                got: parsed.vectors.len(),
            });
        }

        Ok(parsed.vectors.into_iter().map(l2_normalize).collect())
    }
}

/// L2-normalizes in place so cosine similarity reduces to a dot product
/// downstream, matching the original's `sklearn.cosine_similarity` usage
/// over normalized embeddings.
fn l2_normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    vector.into_iter().map(|v| v / norm).collect()
}

/// Cosine similarity between two equal-length vectors. Callers typically
/// pass already L2-normalized vectors, in which case this is a plain dot
/// product; the denominator is kept so unnormalized vectors still work.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_produces_unit_vector() {
        let normalized = l2_normalize(vec![3.0, 4.0]);
        let norm = (normalized[0] * normalized[0] + normalized[1] * normalized[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = l2_normalize(vec![1.0, 2.0, 3.0]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }
}
