//! Offline keyword rules.

use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;

use super::{TextBackend, TextPrompt};

const EMPTY_SCREEN_REPLY: &str = "离线中，我先安静陪你。";
const LOW_MOOD_REPLY: &str = "我离线了，但还在看着你。";
const HIGH_MOOD_REPLY: &str = "离线陪伴模式启动，我一直在。";
const NEUTRAL_REPLY: &str = "网络不稳，先用本地模式陪你。";

/// Keyword groups checked in order; first hit wins.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (
        &["traceback", "exception", "error", "报错", "失败", "failed"],
        "你这报错挺明显，先看第一条异常。",
    ),
    (
        &["github", "git", "pull request", "merge"],
        "代码不少，先跑测试再提交。",
    ),
    (
        &["word", "ppt", "excel", "文档", "表格"],
        "文档先搭提纲，效率会高很多。",
    ),
    (
        &["bilibili", "youtube", "douyin", "微博"],
        "又在刷内容？别忘了正事。",
    ),
];

fn task_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(todo|fixme|deadline)\b").expect("task regex should compile")
    })
}

/// Always-available backend that answers from a fixed set of keyword rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRuleBackend;

impl OfflineRuleBackend {
    pub fn reply(screen_text: &str, mood: f32) -> &'static str {
        let text = screen_text.trim().to_lowercase();
        if text.is_empty() {
            return EMPTY_SCREEN_REPLY;
        }
        for &(keywords, reply) in KEYWORD_RULES {
            if keywords.iter().any(|key| text.contains(key)) {
                return reply;
            }
        }
        if task_pattern().is_match(&text) {
            return "先清最急那条任务，别分心。";
        }
        if mood < 0.3 {
            LOW_MOOD_REPLY
        } else if mood > 0.7 {
            HIGH_MOOD_REPLY
        } else {
            NEUTRAL_REPLY
        }
    }
}

impl TextBackend for OfflineRuleBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn generate(&mut self, prompt: &TextPrompt<'_>) -> Result<String> {
        Ok(Self::reply(prompt.screen_text, prompt.mood).to_string())
    }
}
