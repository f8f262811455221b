//! BM25 Okapi lexical index.
//!
//! Built once over the whitespace-tokenized chunks and scored against the
//! whole corpus on every query. Terms whose IDF would be negative (present
//! in more than half the chunks) are floored to `epsilon × mean IDF`.
//!
//! ```text
//! idf(t)   = ln((N − df(t) + 0.5) / (df(t) + 0.5))
//! score(d) = Σ idf(t) · tf(t,d)·(k1 + 1) / (tf(t,d) + k1·(1 − b + b·|d|/avgdl))
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Split text on whitespace. Tokens keep their case and punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
    /// Fraction of the mean IDF assigned to negative-IDF terms.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn build(corpus: &[Vec<String>]) -> Self {
        Self::with_params(corpus, Bm25Params::default())
    }

    pub fn with_params(corpus: &[Vec<String>], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        // Ordered so the IDF sum is identical run to run.
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();

        for tokens in corpus {
            let mut tf: HashMap<String, u32> = HashMap::new();
            for tok in tokens {
                *tf.entry(tok.clone()).or_default() += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            doc_lens.push(tokens.len());
            term_freqs.push(tf);
        }

        let n = corpus.len() as f64;
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / n
        };

        let mut idf: HashMap<String, f64> = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0;
        let mut negative: Vec<String> = Vec::new();
        for (term, df) in doc_freq {
            let df = df as f64;
            let value = ((n - df + 0.5) / (df + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }

        if !idf.is_empty() {
            let floor = params.epsilon * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            params,
            term_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// BM25 score of the query against every chunk, in ordinal order.
    ///
    /// Repeated query tokens count once per occurrence; unknown tokens
    /// contribute nothing.
    pub fn scores(&self, query: &[String]) -> Vec<f32> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0f64; self.len()];

        for term in query {
            let idf = match self.idf.get(term) {
                Some(v) => *v,
                None => continue,
            };
            for (i, tf_map) in self.term_freqs.iter().enumerate() {
                let tf = tf_map.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let len_ratio = if self.avgdl > 0.0 {
                    self.doc_lens[i] as f64 / self.avgdl
                } else {
                    1.0
                };
                scores[i] += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_ratio));
            }
        }

        scores.into_iter().map(|s| s as f32).collect()
    }
}
