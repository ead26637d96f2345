//! 질의응답 프롬프트 템플릿

use crate::knowledge::ScoredNode;

const CONTEXT_SEPARATOR: &str = "---------------------";

/// 검색된 청크와 질문으로 프롬프트 구성
pub fn build_qa_prompt(question: &str, sources: &[ScoredNode]) -> String {
    let context = sources
        .iter()
        .map(|s| s.node.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below.\n\
         {sep}\n\
         {context}\n\
         {sep}\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {question}\n\
         Answer: ",
        sep = CONTEXT_SEPARATOR,
        context = context,
        question = question,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{Metadata, Node};

    fn scored(text: &str) -> ScoredNode {
        ScoredNode {
            node: Node {
                node_id: "n".into(),
                ref_doc_id: "d".into(),
                chunk_index: 0,
                text: text.into(),
                metadata: Metadata::new(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_qa_prompt("Who jumps?", &[scored("The fox jumps."), scored("The dog sleeps.")]);

        assert!(prompt.starts_with("Context information is below.\n---------------------\n"));
        assert!(prompt.contains("The fox jumps.\n\nThe dog sleeps."));
        assert!(prompt.ends_with("Query: Who jumps?\nAnswer: "));
    }

    #[test]
    fn test_prompt_without_sources() {
        let prompt = build_qa_prompt("Anything?", &[]);
        assert!(prompt.contains("---------------------\n\n---------------------"));
    }
}
