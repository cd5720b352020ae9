//! Language Markup Proposer - 标记非主语言片段
//!
//! 先按前序收集待检测的文本叶子，逐个询问检测器，再一次性原地替换叶子。
//! 被标记的片段语言为 `und`，等待人工确认。

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::ports::{LanguageDetectorPort, Phase, PhaseOutcome, PipelinePhase};
use crate::domain::document::{walk_tree, ChapterNode};
use crate::domain::processing::{metadata_keys, ProcessingContext, ReviewDetails};
use crate::domain::{parse_phrase_list, split_by_phrases, LanguageSegment, UNDETERMINED_LANGUAGE};

fn is_candidate(text: &str) -> bool {
    !text.trim().is_empty()
}

/// 检测并切分整棵树，返回被标记片段的数量
pub async fn propose_lang_markup(
    tree: &mut Vec<ChapterNode>,
    detector: &dyn LanguageDetectorPort,
    main_language: &str,
) -> usize {
    let mut texts: Vec<String> = Vec::new();
    walk_tree(tree, |node| {
        if let ChapterNode::CharacterRange { text, .. } = node {
            if is_candidate(text) {
                texts.push(text.clone());
            }
        }
    });
    if texts.is_empty() {
        return 0;
    }

    let mut splits: Vec<Option<Vec<LanguageSegment>>> = Vec::with_capacity(texts.len());
    for text in &texts {
        splits.push(detect_segments(detector, text, main_language).await);
    }

    let mut splits = splits.into_iter();
    replace_leaves(tree, &mut splits)
}

/// 无需切分时返回 None
async fn detect_segments(
    detector: &dyn LanguageDetectorPort,
    text: &str,
    main_language: &str,
) -> Option<Vec<LanguageSegment>> {
    let response = match detector
        .detect_non_main_language_words(text, main_language)
        .await
    {
        Ok(Some(response)) => response,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "Language detection failed, leaving text unmarked");
            return None;
        }
    };

    let phrases = parse_phrase_list(&response);
    if phrases.is_empty() {
        return None;
    }
    let segments = split_by_phrases(text, &phrases);
    segments.iter().any(|s| s.flagged).then_some(segments)
}

/// 与收集时相同的前序顺序消费切分结果
fn replace_leaves<I>(nodes: &mut Vec<ChapterNode>, splits: &mut I) -> usize
where
    I: Iterator<Item = Option<Vec<LanguageSegment>>>,
{
    let mut flagged = 0;
    let original = std::mem::take(nodes);
    nodes.reserve(original.len());

    for node in original {
        match node {
            ChapterNode::CharacterRange {
                style,
                text,
                language,
            } if is_candidate(&text) => match splits.next().flatten() {
                Some(segments) => {
                    for segment in segments {
                        let segment_language = if segment.flagged {
                            flagged += 1;
                            Some(UNDETERMINED_LANGUAGE.to_string())
                        } else {
                            language.clone()
                        };
                        nodes.push(ChapterNode::CharacterRange {
                            style: style.clone(),
                            text: segment.text,
                            language: segment_language,
                        });
                    }
                }
                None => nodes.push(ChapterNode::CharacterRange {
                    style,
                    text,
                    language,
                }),
            },
            ChapterNode::Story {
                style,
                mut children,
            } => {
                flagged += replace_leaves(&mut children, splits);
                nodes.push(ChapterNode::Story { style, children });
            }
            ChapterNode::ParagraphRange {
                style,
                mut children,
            } => {
                flagged += replace_leaves(&mut children, splits);
                nodes.push(ChapterNode::ParagraphRange { style, children });
            }
            other => nodes.push(other),
        }
    }
    flagged
}

/// 阶段七：语言标记
pub struct LangMarkupPhase {
    detector: Arc<dyn LanguageDetectorPort>,
    default_language: String,
    review_enabled: bool,
}

impl LangMarkupPhase {
    pub fn new(
        detector: Arc<dyn LanguageDetectorPort>,
        default_language: impl Into<String>,
        review_enabled: bool,
    ) -> Self {
        Self {
            detector,
            default_language: default_language.into(),
            review_enabled,
        }
    }
}

#[async_trait]
impl PipelinePhase for LangMarkupPhase {
    fn phase(&self) -> Phase {
        Phase::LangMarkup
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        let main_language = context
            .main_language(&self.default_language)
            .to_string();
        let flagged = propose_lang_markup(
            &mut context.chapter_tree,
            self.detector.as_ref(),
            &main_language,
        )
        .await;
        tracing::debug!(file_id = %context.file_id, flagged, "Language markup proposed");

        let needs_review = self.review_enabled
            && flagged > 0
            && !context.has_flag(metadata_keys::LANG_MARKUP_APPROVED);
        if needs_review {
            return PhaseOutcome::suspend(context, ReviewDetails::LangMarkup { flagged });
        }
        PhaseOutcome::proceed(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::phases::test_support::empty_context;
    use crate::application::ports::ProviderError;
    use crate::domain::document::lang_markup_occurrences;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 按文本返回固定响应，并记录收到的主语言
    struct ScriptedDetector {
        replies: HashMap<String, String>,
        seen_languages: Mutex<Vec<String>>,
    }

    impl ScriptedDetector {
        fn new(replies: &[(&str, &str)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                seen_languages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageDetectorPort for ScriptedDetector {
        async fn detect_non_main_language_words(
            &self,
            text: &str,
            main_language: &str,
        ) -> Result<Option<String>, ProviderError> {
            self.seen_languages
                .lock()
                .unwrap()
                .push(main_language.to_string());
            if text == "boom" {
                return Err(ProviderError::ServiceError("500".to_string()));
            }
            Ok(self.replies.get(text).cloned())
        }
    }

    const FINNISH: &str = "Tämä on suomea, mutta this part is English ja taas suomea.";

    fn tree_with(texts: &[&str]) -> Vec<ChapterNode> {
        vec![ChapterNode::story(vec![ChapterNode::paragraph(
            Some("Body".to_string()),
            texts.iter().map(|t| ChapterNode::text(*t)).collect(),
        )])]
    }

    #[tokio::test]
    async fn test_splits_leaf_in_place() {
        let detector = ScriptedDetector::new(&[(
            FINNISH,
            r#"{"words": ["this part", "is English"]}"#,
        )]);
        let mut tree = tree_with(&["Alku. ", FINNISH]);

        let flagged = propose_lang_markup(&mut tree, &detector, "fi").await;

        assert_eq!(flagged, 1);
        let paragraph = &tree[0].children()[0];
        let texts: Vec<String> = paragraph
            .children()
            .iter()
            .map(|n| n.text_content())
            .collect();
        assert_eq!(
            texts,
            vec![
                "Alku. ",
                "Tämä on suomea, mutta ",
                "this part is English",
                " ja taas suomea."
            ]
        );
        assert_eq!(paragraph.text_content(), format!("Alku. {}", FINNISH));
        assert!(paragraph.children().iter().all(|c| c.style().is_none()));

        let occurrences = lang_markup_occurrences(&tree);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].text, "this part is English");
        assert_eq!(occurrences[0].language, "und");
        assert_eq!(
            *detector.seen_languages.lock().unwrap(),
            vec!["fi".to_string(), "fi".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failures_and_unparseable_replies_leave_tree_unchanged() {
        let detector = ScriptedDetector::new(&[("kissa", "not json"), ("koira", "[]")]);
        let mut tree = tree_with(&["kissa", "boom", "koira", "   "]);
        let before = tree.clone();

        let flagged = propose_lang_markup(&mut tree, &detector, "fi").await;

        assert_eq!(flagged, 0);
        assert_eq!(tree, before);
        // 空白叶子不送检
        assert_eq!(detector.seen_languages.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_phase_uses_language_metadata_and_suspends() {
        let detector = Arc::new(ScriptedDetector::new(&[("Hello maailma", r#"["Hello"]"#)]));
        let phase = LangMarkupPhase::new(detector.clone(), "fi", true);
        let mut ctx = empty_context();
        ctx.set_metadata(metadata_keys::LANGUAGE, "sv");
        ctx.chapter_tree = tree_with(&["Hello maailma"]);

        match phase.run(ctx).await {
            PhaseOutcome::Suspend { details, .. } => {
                assert_eq!(details, ReviewDetails::LangMarkup { flagged: 1 })
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(*detector.seen_languages.lock().unwrap(), vec!["sv".to_string()]);
    }

    #[tokio::test]
    async fn test_phase_continues_when_nothing_flagged() {
        let detector = Arc::new(ScriptedDetector::new(&[]));
        let phase = LangMarkupPhase::new(detector, "fi", true);
        let mut ctx = empty_context();
        ctx.chapter_tree = tree_with(&["vain suomea"]);
        assert!(matches!(phase.run(ctx).await, PhaseOutcome::Continue(_)));
    }
}
