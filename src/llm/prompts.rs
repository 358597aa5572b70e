//! Prompt used to evaluate candidate documents.

/// Delimiters placed around the document (and optionally the knowledge base).
pub const OPEN_DELIMITER: &str = "<<";
pub const CLOSE_DELIMITER: &str = ">>";

/// Collection of prompts used by the evaluator.
pub struct Prompts;

impl Prompts {
    /// Build the document evaluation prompt.
    ///
    /// The document is always enclosed in `<<` `>>`. The knowledge base snippets
    /// are joined with commas and, when `delimit_knowledge_base` is set, enclosed
    /// the same way. Both are embedded verbatim.
    pub fn document_evaluation(
        document: &str,
        knowledge_base: &[String],
        delimit_knowledge_base: bool,
    ) -> String {
        let joined = knowledge_base.join(",");
        let knowledge_base = if delimit_knowledge_base {
            format!("{}{}{}", OPEN_DELIMITER, joined, CLOSE_DELIMITER)
        } else {
            joined
        };

        format!(
            r#"You are an AI document evaluator for a Retrieval-Augmented Generation (RAG) system.
Your job is to analyze a given document and determine if it should be added based on specific quality conditions.
The given document is enclosed with <<>>.

**Evaluation Conditions and Scores:**
1. Relevance: Directly related to the domain. (15)
2. Uniqueness: Not a duplicate. (10)
3. Consistency: Must not contradict existing knowledge. (10)
4. Accuracy: From a reliable source, no misinformation. (10)
5. Timeliness: Up-to-date and not obsolete. (15)
6. Legal & Ethical Compliance: Must follow privacy laws. (10)
7. Contradictions: No contradictions with the database. (10)
8. Duplicates: No significant repetition. (10)
9. Outdated or Misleading Data: No incorrect information. (10)

---

**Input Data**
- New Document:
  {open}{document}{close}

- Existing Knowledge Base:
  {knowledge_base}

**Evaluation Criteria & JSON Output Format**
Analyze the document and return a JSON response:
```json
{{
  "accept": "<true/false>",
  "score": "<integer (0-100)>",
  "issues": [
    {{
      "condition": "<The failed condition>",
      "description": "<Why it failed>",
      "location": "<Specific section in the document>"
    }}
  ]
}}
```
"#,
            open = OPEN_DELIMITER,
            close = CLOSE_DELIMITER,
            document = document,
            knowledge_base = knowledge_base,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_is_delimited() {
        let prompt = Prompts::document_evaluation("Paris is the capital of France.", &[], false);
        assert!(prompt.contains("<<Paris is the capital of France.>>"));
    }

    #[test]
    fn test_knowledge_base_joined_verbatim() {
        let kb = vec![
            "Berlin is the capital of Germany.".to_string(),
            "Rome is the capital of Italy.".to_string(),
        ];
        let plain = Prompts::document_evaluation("doc", &kb, false);
        assert!(plain.contains("Berlin is the capital of Germany.,Rome is the capital of Italy."));
        assert!(!plain.contains("<<Berlin"));

        let delimited = Prompts::document_evaluation("doc", &kb, true);
        assert!(delimited.contains(
            "<<Berlin is the capital of Germany.,Rome is the capital of Italy.>>"
        ));
    }

    #[test]
    fn test_braces_in_input_are_untouched() {
        let prompt = Prompts::document_evaluation("{document} {\"a\": 1}", &[], false);
        assert!(prompt.contains("<<{document} {\"a\": 1}>>"));
    }

    #[test]
    fn test_output_format_is_listed() {
        let prompt = Prompts::document_evaluation("doc", &[], false);
        assert!(prompt.contains("\"accept\": \"<true/false>\""));
        assert!(prompt.contains("\"location\""));
        assert!(prompt.contains("Timeliness: Up-to-date and not obsolete. (15)"));
    }
}
