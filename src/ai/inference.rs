use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Item, ReviewEntry, Verdict};

pub fn build_request(
    model: &str,
    max_tokens: u32,
    topics: &[String],
    batch: &[Arc<Item>],
) -> Result<ChatCompletionRequest> {
    Ok(ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".into(),
            content: build_prompt(topics, batch)?,
        }],
        temperature: 0.0,
        max_tokens,
    })
}

pub fn build_prompt(topics: &[String], batch: &[Arc<Item>]) -> Result<String> {
    let topic_list = topics
        .iter()
        .enumerate()
        .map(|(i, topic)| format!("{}. {}", i + 1, topic))
        .collect::<Vec<_>>()
        .join("\n");

    let entries: Vec<ReviewEntry<'_>> = batch
        .iter()
        .map(|item| ReviewEntry::from(item.as_ref()))
        .collect();
    let items_json = serde_json::to_string(&entries).context("failed to serialize review batch")?;

    Ok(format!(
        r#"Review the JSON list of feed posts below and identify the ones related to the topics below. Return a JSON array with objects containing keys "id" and "topic", where "id" is the id of the post and "topic" is the name of the topic it relates to. DON'T include only slightly related or unrelated posts. If no posts match, return an empty array.

Topics:
"""
{topic_list}
"""

Posts to review:
"""
{items_json}
"""

Now return a JSON array. DON'T add any text before/after the JSON array. Something terrible will happen if you don't follow these precise instructions."#
    ))
}

/// Extracts the flagged subset from a chat-completion body.
///
/// An empty `choices` array means nothing was flagged; a body without
/// `choices` is an error reply. A choice without content, or
/// content that is not a JSON array of `{id, topic}`, fails the batch.
pub fn parse_completion(body: &str) -> Result<Vec<Verdict>> {
    let completion: ChatCompletionResponse =
        serde_json::from_str(body).context("classifier returned a non-completion body")?;

    let Some(choice) = completion.choices.into_iter().next() else {
        return Ok(Vec::new());
    };

    let content = choice
        .message
        .and_then(|msg| msg.content)
        .context("classifier response missing message content")?;

    let verdicts: Vec<Verdict> = serde_json::from_str(content.trim())
        .with_context(|| format!("classifier reply is not a JSON array of verdicts: {content}"))?;
    Ok(verdicts)
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}
