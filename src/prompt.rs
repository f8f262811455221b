//! Prompt construction for gated answers.
//!
//! The generator sees only the excerpts that cleared the gate, each tagged
//! with its rank and fused score, and is told to answer from them alone.

use multisummarizer_core::gate::Evidence;

/// Build the generation prompt for `query` over `evidence`.
///
/// `not_found` is the sentence the model must reply with when the excerpts
/// do not contain the answer.
pub fn build_prompt(query: &str, evidence: &Evidence, not_found: &str) -> String {
    let context: String = evidence
        .results
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[result-{}] (score {:.2}) {}\n", i, hit.score, hit.text))
        .collect();

    format!(
        "You are a study assistant. STRICT RULES:\n\
         \n\
         1. Answer clearly and concisely.\n\
         2. Use ONLY information literally present in the excerpts below.\n\
         3. Do not invent examples, equations, code, or explanations.\n\
         4. Do not infer beyond the exact text or combine sources into new facts.\n\
         5. If the information is NOT EXPLICITLY in the excerpts, reply EXACTLY: \"{nf}\"\n\
         \n\
         When in doubt, say you do not know.\n\
         \n\
         AUTHORIZED EXCERPTS (confidence threshold: {threshold}):\n\
         {context}\n\
         REMINDER: if the answer is not EXPLICITLY and CLEARLY in the excerpts above, reply: \"{nf}\"\n\
         \n\
         Question: {query}",
        nf = not_found,
        threshold = evidence.threshold,
        context = context,
        query = query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisummarizer_core::RetrievedChunk;

    fn evidence() -> Evidence {
        let hit = |index: usize, text: &str, score: f32| RetrievedChunk {
            index,
            text: text.to_string(),
            score,
            dense_score: score,
            sparse_score: score,
        };
        Evidence {
            results: vec![
                hit(2, "cats are mammals.", 0.912),
                hit(0, "birds can fly.", 0.4),
            ],
            threshold: 0.35,
            best_score: 0.912,
        }
    }

    #[test]
    fn test_prompt_lists_excerpts_in_rank_order() {
        let prompt = build_prompt("what are cats?", &evidence(), "Not found.");
        let first = prompt.find("[result-0] (score 0.91) cats are mammals.").unwrap();
        let second = prompt.find("[result-1] (score 0.40) birds can fly.").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_prompt_states_threshold_and_fallback() {
        let prompt = build_prompt("what are cats?", &evidence(), "Not found.");
        assert!(prompt.contains("confidence threshold: 0.35"));
        assert_eq!(prompt.matches("\"Not found.\"").count(), 2);
        assert!(prompt.ends_with("Question: what are cats?"));
    }
}
